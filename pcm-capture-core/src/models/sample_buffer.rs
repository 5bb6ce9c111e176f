use std::time::Duration;

use chrono::{DateTime, Utc};

/// One timestamped block of converted 16-bit samples.
///
/// Created by the acquisition thread, moved exactly once through the hand-off
/// queue, then owned by the consumer. Samples are read-only outside this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleBuffer {
    timestamp: DateTime<Utc>,
    samples: Vec<i16>,
}

impl SampleBuffer {
    /// Allocate a zeroed buffer of `len` samples stamped with the current
    /// wall-clock time.
    pub(crate) fn allocate(len: usize) -> Self {
        Self {
            timestamp: Utc::now(),
            samples: vec![0; len],
        }
    }

    /// Build a filled buffer with an explicit timestamp.
    pub fn from_samples(timestamp: DateTime<Utc>, samples: Vec<i16>) -> Self {
        Self { timestamp, samples }
    }

    pub(crate) fn samples_mut(&mut self) -> &mut [i16] {
        &mut self.samples
    }

    /// Capture time, taken when the buffer was allocated.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Take the samples out of the buffer.
    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }

    /// Samples as little-endian bytes, the layout of a WAV data chunk.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.samples.len() * 2);
        for sample in &self.samples {
            data.extend_from_slice(&sample.to_le_bytes());
        }
        data
    }

    /// Playback duration of this buffer at `sample_rate` Hz.
    pub fn duration(&self, sample_rate: u32) -> Duration {
        if sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / sample_rate as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn allocate_is_zeroed_and_stamped() {
        let before = Utc::now();
        let buffer = SampleBuffer::allocate(256);
        let after = Utc::now();

        assert_eq!(buffer.len(), 256);
        assert!(buffer.samples().iter().all(|&s| s == 0));
        assert!(buffer.timestamp() >= before && buffer.timestamp() <= after);
    }

    #[test]
    fn empty_buffer() {
        let buffer = SampleBuffer::allocate(0);
        assert!(buffer.is_empty());
        assert!(buffer.to_le_bytes().is_empty());
    }

    #[test]
    fn le_bytes_layout() {
        let buffer = SampleBuffer::from_samples(Utc::now(), vec![1, -1, 0x1234]);
        assert_eq!(buffer.to_le_bytes(), vec![0x01, 0x00, 0xFF, 0xFF, 0x34, 0x12]);
    }

    #[test]
    fn duration_at_sample_rate() {
        let buffer = SampleBuffer::from_samples(Utc::now(), vec![0; 256]);
        assert_relative_eq!(buffer.duration(16000).as_secs_f64(), 0.016, epsilon = 1e-9);
        assert_eq!(buffer.duration(0), Duration::ZERO);
    }

    #[test]
    fn samples_mut_fills_in_place() {
        let mut buffer = SampleBuffer::allocate(3);
        buffer.samples_mut().copy_from_slice(&[7, 8, 9]);
        assert_eq!(buffer.into_samples(), vec![7, 8, 9]);
    }
}
