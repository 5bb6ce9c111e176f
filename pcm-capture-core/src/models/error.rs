use thiserror::Error;

/// Errors that can occur during PCM capture operations.
///
/// A timeout while waiting for data is not an error: `CaptureEngine::pop`
/// reports it as `Ok(None)`. Short hardware reads are not errors either; they
/// produce a shorter `SampleBuffer`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("samples per buffer ({requested}) exceeds the source's maximum frame length ({max})")]
    FrameTooLong { requested: usize, max: usize },

    /// Unrecoverable read or device initialization failure.
    ///
    /// The engine never retries; recovery policy belongs to the owner.
    #[error("hardware fault: {0}")]
    HardwareFault(String),

    #[error("device not available")]
    DeviceNotAvailable,

    #[error("capture engine already started")]
    AlreadyStarted,

    #[error("capture engine not started")]
    NotStarted,

    /// The acquisition task has ended (stop request or end of stream)
    /// and every queued buffer has been consumed.
    #[error("capture stopped")]
    Stopped,

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl CaptureError {
    /// Whether this error means the hardware can no longer deliver frames.
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::HardwareFault(_) | Self::DeviceNotAvailable)
    }
}
