use serde::{Deserialize, Serialize};

use super::config::CaptureConfig;
use super::state::EngineDiagnostics;

/// Totals reported when a WAV stream is finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSummary {
    /// Samples forwarded after the header.
    pub samples_written: u64,
    /// Bytes written including the 44-byte header.
    pub bytes_written: u64,
    /// SHA-256 of the PCM data bytes (header excluded), lowercase hex.
    pub checksum: String,
}

/// Metadata stored alongside a captured stream.
///
/// Besides the format it records how acquisition went: per-frame counters
/// summed over every engine run and the number of fault restarts. The
/// checksum lets the recording be verified later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamMetadata {
    pub id: String,
    pub created_at: String,
    pub source: String,
    pub converter: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub samples_written: u64,
    pub duration_secs: f64,
    pub checksum: String,
    #[serde(default)]
    pub diagnostics: EngineDiagnostics,
    #[serde(default)]
    pub restarts: u32,
}

impl StreamMetadata {
    pub fn new(
        config: &CaptureConfig,
        source: &str,
        converter: &str,
        summary: &StreamSummary,
    ) -> Self {
        let frames = summary.samples_written / config.channels.max(1) as u64;
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            source: source.to_string(),
            converter: converter.to_string(),
            sample_rate: config.sample_rate,
            channels: config.channels,
            bits_per_sample: config.bits_per_sample_out,
            samples_written: summary.samples_written,
            duration_secs: frames as f64 / config.sample_rate as f64,
            checksum: summary.checksum.clone(),
            diagnostics: EngineDiagnostics::default(),
            restarts: 0,
        }
    }

    pub fn with_capture_stats(mut self, diagnostics: EngineDiagnostics, restarts: u32) -> Self {
        self.diagnostics = diagnostics;
        self.restarts = restarts;
        self
    }

    /// Whether any frame came back shorter than requested.
    pub fn had_short_reads(&self) -> bool {
        self.diagnostics.short_reads > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn duration_from_sample_count() {
        let summary = StreamSummary {
            samples_written: 8000,
            bytes_written: 44 + 16000,
            checksum: "abc".into(),
        };
        let meta = StreamMetadata::new(&CaptureConfig::default(), "tone", "direct-sampling", &summary);

        assert_relative_eq!(meta.duration_secs, 0.5);
        assert_eq!(meta.sample_rate, 16000);
        assert_eq!(meta.checksum, "abc");
        assert_eq!(meta.id.len(), 36);
        assert_eq!(meta.restarts, 0);
        assert!(!meta.had_short_reads());
    }

    #[test]
    fn capture_stats_are_recorded() {
        let summary = StreamSummary {
            samples_written: 300,
            bytes_written: 44 + 600,
            checksum: "abc".into(),
        };
        let diagnostics = EngineDiagnostics {
            frames_read: 2,
            short_reads: 1,
            samples_captured: 300,
            buffers_published: 2,
        };
        let meta = StreamMetadata::new(&CaptureConfig::default(), "adc", "direct-sampling", &summary)
            .with_capture_stats(diagnostics.clone(), 3);

        assert_eq!(meta.diagnostics, diagnostics);
        assert_eq!(meta.restarts, 3);
        assert!(meta.had_short_reads());
    }

    #[test]
    fn sidecar_without_capture_stats_still_parses() {
        let json = r#"{
            "id": "x", "created_at": "2026-01-01T00:00:00Z", "source": "adc",
            "converter": "direct-sampling", "sample_rate": 16000, "channels": 1,
            "bits_per_sample": 16, "samples_written": 0, "duration_secs": 0.0,
            "checksum": ""
        }"#;
        let meta: StreamMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.diagnostics, EngineDiagnostics::default());
        assert_eq!(meta.restarts, 0);
    }
}
