//! Front-end profiles.
//!
//! Each profile bundles what the engine needs to know about one kind of
//! hardware: how raw words are laid out, how they convert to PCM, and the
//! buffer sizing the front end supports.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use pcm_capture_core::{CaptureConfig, SampleConverter, DEFAULT_MAX_FRAME_LEN};

/// DMA descriptors the I2S driver is installed with.
pub const DMA_BUFFER_COUNT: usize = 4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown device profile: {0} (expected adc or mems)")]
pub struct UnknownProfile(pub String);

/// Supported capture front ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceProfile {
    /// Built-in ADC sampled through I2S: 12-bit codes in 16-bit words.
    Adc,
    /// I2S MEMS microphone (INMP441 class): 24-bit samples in 32-bit words.
    Mems,
}

impl DeviceProfile {
    pub fn converter(&self) -> SampleConverter {
        match self {
            Self::Adc => SampleConverter::DirectSampling,
            Self::Mems => SampleConverter::DigitalMicrophone,
        }
    }

    /// Width of one raw word on the wire.
    pub fn word_bytes(&self) -> usize {
        match self {
            Self::Adc => 2,
            Self::Mems => 4,
        }
    }

    /// Name of the acquisition thread.
    pub fn task_name(&self) -> &'static str {
        match self {
            Self::Adc => "audio_capture_dac",
            Self::Mems => "audio_capture_mems",
        }
    }

    /// Longest DMA frame the front end accepts, in samples.
    pub fn max_frame_len(&self) -> usize {
        DEFAULT_MAX_FRAME_LEN
    }

    pub fn default_config(&self) -> CaptureConfig {
        CaptureConfig::new(16000, 0.016)
    }

    /// Raw word that this profile's converter turns into `sample`.
    ///
    /// ADC codes only span 12 bits, so samples are clamped to
    /// `-2048..=2047` first.
    pub fn encode(&self, sample: i16) -> u32 {
        match self {
            Self::Adc => {
                let clamped = sample.clamp(-0x800, 0x7FF) as i32;
                (0x7FF - clamped) as u32
            }
            Self::Mems => (sample as i32).wrapping_neg() as u32,
        }
    }
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Adc => f.write_str("adc"),
            Self::Mems => f.write_str("mems"),
        }
    }
}

impl FromStr for DeviceProfile {
    type Err = UnknownProfile;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "adc" | "dac" => Ok(Self::Adc),
            "mems" | "i2s" => Ok(Self::Mems),
            _ => Err(UnknownProfile(s.to_string())),
        }
    }
}
