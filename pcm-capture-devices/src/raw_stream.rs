//! Frame source backed by any byte stream of raw little-endian words.
//!
//! Works with character devices, pipes, and recorded dumps. Reads block until
//! a full frame is available or the stream ends; only the last frame before
//! end of stream can be short.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use pcm_capture_core::{CaptureError, FrameSource};

use crate::device_profile::{DeviceProfile, DMA_BUFFER_COUNT};

pub struct RawStreamSource<R: Read + Send> {
    reader: R,
    name: String,
    word_bytes: usize,
    max_frame_len: usize,
    scratch: Vec<u8>,
}

impl RawStreamSource<BufReader<File>> {
    /// Open a device node or dump file.
    ///
    /// The read buffer holds as many frames as the driver keeps DMA
    /// descriptors for.
    pub fn open(path: &Path, profile: DeviceProfile) -> Result<Self, CaptureError> {
        let file = File::open(path).map_err(|e| {
            CaptureError::HardwareFault(format!("failed to open {}: {}", path.display(), e))
        })?;
        let capacity = DMA_BUFFER_COUNT * profile.max_frame_len() * profile.word_bytes();
        let reader = BufReader::with_capacity(capacity, file);
        Ok(Self::new(reader, profile).with_name(path.display().to_string()))
    }
}

impl<R: Read + Send> RawStreamSource<R> {
    pub fn new(reader: R, profile: DeviceProfile) -> Self {
        Self {
            reader,
            name: profile.task_name().to_string(),
            word_bytes: profile.word_bytes(),
            max_frame_len: profile.max_frame_len(),
            scratch: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    /// Fill `scratch` as far as the stream allows. Returns bytes read.
    fn fill_scratch(&mut self) -> Result<usize, CaptureError> {
        let mut filled = 0;
        while filled < self.scratch.len() {
            match self.reader.read(&mut self.scratch[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(CaptureError::HardwareFault(format!(
                        "read from {} failed: {}",
                        self.name, e
                    )))
                }
            }
        }
        Ok(filled)
    }
}

impl<R: Read + Send> FrameSource for RawStreamSource<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }

    fn read_frame(&mut self, raw: &mut [u32]) -> Result<usize, CaptureError> {
        self.scratch.resize(raw.len() * self.word_bytes, 0);
        let filled = self.fill_scratch()?;

        let words = filled / self.word_bytes;
        if filled % self.word_bytes != 0 {
            log::warn!(
                "{}: dropping {} trailing bytes of a partial word",
                self.name,
                filled % self.word_bytes
            );
        }

        let data = &self.scratch[..words * self.word_bytes];
        for (dst, chunk) in raw.iter_mut().zip(data.chunks_exact(self.word_bytes)) {
            *dst = match self.word_bytes {
                2 => u16::from_le_bytes([chunk[0], chunk[1]]) as u32,
                _ => u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]),
            };
        }
        log::trace!("{}: read {} words", self.name, words);
        Ok(words)
    }
}
