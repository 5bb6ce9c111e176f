use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::CaptureError;

/// Output sample width. Every converter produces signed 16-bit PCM.
pub const BITS_PER_SAMPLE_OUT: u16 = 16;

/// One buffer being consumed while the next one is filled.
pub const DEFAULT_QUEUE_CAPACITY: usize = 2;

/// Upper bound on `queue_capacity`. The channel allocates every slot up front.
pub const MAX_QUEUE_CAPACITY: usize = 1024;

/// Configuration for a capture engine.
///
/// `samples_per_buffer` is derived, never stored, so it cannot drift from
/// `sample_rate` and `seconds_per_buffer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Sample rate in Hz (default: 16000).
    pub sample_rate: u32,

    /// Length of one hardware frame in seconds (default: 0.016).
    pub seconds_per_buffer: f64,

    /// Number of channels (default: 1). Valid values: 1, 2.
    pub channels: u16,

    /// Bit depth of the converted output. Only 16 is valid.
    pub bits_per_sample_out: u16,

    /// Number of buffers the hand-off queue holds before acquisition blocks.
    pub queue_capacity: usize,
}

impl CaptureConfig {
    pub fn new(sample_rate: u32, seconds_per_buffer: f64) -> Self {
        Self {
            sample_rate,
            seconds_per_buffer,
            ..Default::default()
        }
    }

    /// `floor(sample_rate * seconds_per_buffer)`.
    pub fn samples_per_buffer(&self) -> usize {
        let exact = self.sample_rate as f64 * self.seconds_per_buffer;
        if exact.is_finite() && exact > 0.0 {
            exact.floor() as usize
        } else {
            0
        }
    }

    /// Size in bytes of one converted output sample frame.
    pub fn block_align(&self) -> u16 {
        (self.channels as u32 * self.bits_per_sample_out as u32 / 8) as u16
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if !self.seconds_per_buffer.is_finite() || self.seconds_per_buffer <= 0.0 {
            return Err(format!(
                "seconds per buffer must be positive: {}",
                self.seconds_per_buffer
            ));
        }
        if ![1, 2].contains(&self.channels) {
            return Err(format!("unsupported channel count: {}", self.channels));
        }
        if self.bits_per_sample_out != BITS_PER_SAMPLE_OUT {
            return Err(format!(
                "unsupported output bit depth: {}",
                self.bits_per_sample_out
            ));
        }
        if self.queue_capacity == 0 {
            return Err("queue capacity must be at least 1".into());
        }
        if self.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(format!(
                "queue capacity {} exceeds {}",
                self.queue_capacity, MAX_QUEUE_CAPACITY
            ));
        }
        if self.sample_rate as u64 * self.block_align() as u64 > u32::MAX as u64 {
            return Err(format!(
                "byte rate of {} Hz x {} channels overflows the WAV header",
                self.sample_rate, self.channels
            ));
        }
        if self.samples_per_buffer() == 0 {
            return Err(format!(
                "{} Hz x {} s yields an empty buffer",
                self.sample_rate, self.seconds_per_buffer
            ));
        }
        Ok(())
    }

    /// Validate against the capability of the hardware source that will
    /// deliver the frames.
    pub fn validate_for_source(&self, max_frame_len: usize) -> Result<(), CaptureError> {
        self.validate().map_err(CaptureError::ConfigurationFailed)?;
        let requested = self.samples_per_buffer();
        if requested > max_frame_len {
            return Err(CaptureError::FrameTooLong {
                requested,
                max: max_frame_len,
            });
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, CaptureError> {
        serde_json::from_str(json)
            .map_err(|e| CaptureError::ConfigurationFailed(format!("invalid config: {}", e)))
    }

    /// Load a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, CaptureError> {
        let json = fs::read_to_string(path).map_err(|e| {
            CaptureError::ConfigurationFailed(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&json)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            seconds_per_buffer: 0.016,
            channels: 1,
            bits_per_sample_out: BITS_PER_SAMPLE_OUT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Parameters for the dedicated acquisition thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOptions {
    /// Thread name, usually the source's name.
    pub name: String,

    /// Stack size in bytes (default: 64 KiB).
    pub stack_size: usize,

    /// Requested scheduling priority. Advisory: it is logged but std threads
    /// expose no portable way to apply it.
    pub priority: u8,
}

impl TaskOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self {
            name: "pcm-capture".into(),
            stack_size: 64 * 1024,
            priority: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_16k_mono() {
        let config = CaptureConfig::default();
        assert_eq!(config.sample_rate, 16000);
        assert_eq!(config.channels, 1);
        assert_eq!(config.bits_per_sample_out, 16);
        assert_eq!(config.queue_capacity, 2);
        assert_eq!(config.samples_per_buffer(), 256);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn samples_per_buffer_floors() {
        assert_eq!(CaptureConfig::new(16000, 0.0625).samples_per_buffer(), 1000);
        assert_eq!(CaptureConfig::new(44100, 0.01).samples_per_buffer(), 441);
        assert_eq!(CaptureConfig::new(1000, 0.0015).samples_per_buffer(), 1);
        assert_eq!(CaptureConfig::new(3, 0.5).samples_per_buffer(), 1);
        assert_eq!(CaptureConfig::new(16000, 0.064).samples_per_buffer(), 1024);
    }

    #[test]
    fn frame_longer_than_source_is_rejected() {
        let config = CaptureConfig::new(16000, 0.128);
        assert_eq!(config.samples_per_buffer(), 2048);
        assert!(config.validate().is_ok());
        assert_eq!(
            config.validate_for_source(1024),
            Err(CaptureError::FrameTooLong {
                requested: 2048,
                max: 1024
            })
        );
    }

    #[test]
    fn frame_at_source_limit_is_accepted() {
        let config = CaptureConfig::new(16000, 0.064);
        assert!(config.validate_for_source(1024).is_ok());
    }

    #[test]
    fn invalid_fields_are_rejected() {
        let zero_rate = CaptureConfig::new(0, 0.016);
        assert!(zero_rate.validate().is_err());

        let negative = CaptureConfig::new(16000, -0.5);
        assert!(negative.validate().is_err());

        let nan = CaptureConfig::new(16000, f64::NAN);
        assert!(nan.validate().is_err());

        let too_short = CaptureConfig::new(16000, 0.00001);
        assert_eq!(too_short.samples_per_buffer(), 0);
        assert!(too_short.validate().is_err());

        let surround = CaptureConfig {
            channels: 6,
            ..Default::default()
        };
        assert!(surround.validate().is_err());

        let wide = CaptureConfig {
            bits_per_sample_out: 24,
            ..Default::default()
        };
        assert!(wide.validate().is_err());

        let unbuffered = CaptureConfig {
            queue_capacity: 0,
            ..Default::default()
        };
        assert!(unbuffered.validate().is_err());
    }

    #[test]
    fn byte_rate_must_fit_wav_header() {
        let config = CaptureConfig::new(3_000_000_000, 1e-7);
        assert_eq!(config.samples_per_buffer(), 300);
        assert!(matches!(
            config.validate_for_source(1024),
            Err(CaptureError::ConfigurationFailed(_))
        ));

        // 2^31 - 1 Hz mono is 0xFFFF_FFFE bytes per second.
        let edge = CaptureConfig::new(i32::MAX as u32, 1e-7);
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn oversized_queue_from_json_is_rejected() {
        let config =
            CaptureConfig::from_json_str(r#"{ "queue_capacity": 18446744073709551615 }"#).unwrap();
        assert!(matches!(
            config.validate_for_source(1024),
            Err(CaptureError::ConfigurationFailed(_))
        ));

        let largest = CaptureConfig {
            queue_capacity: MAX_QUEUE_CAPACITY,
            ..Default::default()
        };
        assert!(largest.validate().is_ok());
    }

    #[test]
    fn source_check_reports_plain_validation_errors() {
        let config = CaptureConfig::new(0, 0.016);
        assert!(matches!(
            config.validate_for_source(1024),
            Err(CaptureError::ConfigurationFailed(_))
        ));
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let config = CaptureConfig::from_json_str(r#"{ "sample_rate": 8000 }"#).unwrap();
        assert_eq!(config.sample_rate, 8000);
        assert_eq!(config.channels, 1);
        assert_eq!(config.queue_capacity, 2);
        assert_eq!(config.samples_per_buffer(), 128);
    }

    #[test]
    fn malformed_json_is_a_configuration_error() {
        let result = CaptureConfig::from_json_str("{ sample_rate: ");
        assert!(matches!(result, Err(CaptureError::ConfigurationFailed(_))));
    }

    #[test]
    fn load_reads_file() {
        let path = std::env::temp_dir().join("pcm_capture_test_config.json");
        fs::write(&path, r#"{ "sample_rate": 32000, "seconds_per_buffer": 0.02 }"#).unwrap();
        let config = CaptureConfig::load(&path).unwrap();
        assert_eq!(config.samples_per_buffer(), 640);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn task_options_defaults() {
        let opts = TaskOptions::named("audio_capture_dac");
        assert_eq!(opts.name, "audio_capture_dac");
        assert_eq!(opts.priority, 5);
        assert_eq!(opts.stack_size, 64 * 1024);
    }
}
