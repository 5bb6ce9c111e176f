//! # pcm-capture-devices
//!
//! Front ends for pcm-capture-core.
//!
//! Provides:
//! - `DeviceProfile` — ADC and I2S MEMS microphone layouts, converters and buffer sizing
//! - `RawStreamSource` — raw little-endian words from a device node, pipe or dump
//! - `ToneSource` — synthetic sine tone in a profile's raw encoding
//!
//! ## Usage
//! ```ignore
//! use pcm_capture_core::{CaptureEngine, TaskOptions};
//! use pcm_capture_devices::{DeviceProfile, RawStreamSource};
//!
//! let profile = DeviceProfile::Mems;
//! let source = RawStreamSource::open("/dev/i2s0".as_ref(), profile)?;
//! let mut engine = CaptureEngine::new(profile.default_config(), profile.converter(), source)?;
//! engine.start(TaskOptions::named(profile.task_name()))?;
//! ```

pub mod device_profile;
pub mod raw_stream;
pub mod tone;

pub use device_profile::{DeviceProfile, UnknownProfile, DMA_BUFFER_COUNT};
pub use raw_stream::RawStreamSource;
pub use tone::ToneSource;
