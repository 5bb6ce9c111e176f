use serde::{Deserialize, Serialize};

use super::error::CaptureError;

/// Capture engine lifecycle.
///
/// State transitions:
/// ```text
/// idle → running → stopping → stopped
///           ↓
///        faulted
/// ```
/// `start` is only accepted from `Idle`; an engine is never restarted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EngineState {
    #[default]
    Idle,
    Running,
    Stopping,
    Stopped,
    Faulted(CaptureError),
}

impl EngineState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Faulted(_))
    }

    /// The fault that ended acquisition, if any.
    pub fn fault(&self) -> Option<&CaptureError> {
        match self {
            Self::Faulted(err) => Some(err),
            _ => None,
        }
    }
}

/// Counters maintained by the acquisition thread.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineDiagnostics {
    pub frames_read: u64,
    pub short_reads: u64,
    pub samples_captured: u64,
    pub buffers_published: u64,
}

impl EngineDiagnostics {
    /// Add the counters of a later engine run on the same stream.
    pub fn accumulate(&mut self, other: &EngineDiagnostics) {
        self.frames_read += other.frames_read;
        self.short_reads += other.short_reads;
        self.samples_captured += other.samples_captured;
        self.buffers_published += other.buffers_published;
    }
}
