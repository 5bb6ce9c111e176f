use crate::models::error::CaptureError;

/// Frame length limit of the ESP32 I2S DMA engine, in samples.
pub const DEFAULT_MAX_FRAME_LEN: usize = 1024;

/// A hardware front end that delivers raw sample words.
///
/// Implemented by:
/// - `RawStreamSource` (device node, pipe or recorded dump)
/// - `ToneSource` (synthetic front end)
///
/// The source is moved onto the acquisition thread when the engine starts and
/// is driven by that thread only. Dropping it must release the hardware.
pub trait FrameSource: Send {
    /// Human-readable name, also used as the acquisition thread name.
    fn name(&self) -> &str;

    /// Longest frame, in samples, the hardware can deliver in one read.
    fn max_frame_len(&self) -> usize {
        DEFAULT_MAX_FRAME_LEN
    }

    /// Block until the next frame is available and copy it into `raw`.
    ///
    /// Returns the number of words written, which may be less than
    /// `raw.len()` on a short read. `Ok(0)` means the source is exhausted and
    /// acquisition should end. Errors are unrecoverable hardware faults.
    fn read_frame(&mut self, raw: &mut [u32]) -> Result<usize, CaptureError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn max_frame_len(&self) -> usize {
        (**self).max_frame_len()
    }

    fn read_frame(&mut self, raw: &mut [u32]) -> Result<usize, CaptureError> {
        (**self).read_frame(raw)
    }
}
