use std::io::{Seek, SeekFrom, Write};

use sha2::{Digest, Sha256};

use crate::models::error::CaptureError;
use crate::models::sample_buffer::SampleBuffer;
use crate::models::stream_result::StreamSummary;
use crate::processing::wav_format::{self, WavHeaderBuilder, WAV_HEADER_SIZE};

/// Streams captured buffers as a WAV byte stream.
///
/// ## Layout
/// ```text
/// [44-byte WAV header, declaring `declared_samples`]
/// [raw 16-bit little-endian PCM, forwarded verbatim...]
/// ```
///
/// For a live stream the declaration is usually larger than what is ever
/// written (see `STREAMING_SAMPLES`). When the sink is seekable, `finalize`
/// rewrites the size fields to match the real length.
pub struct WavStreamWriter<W: Write> {
    sink: W,
    header: [u8; WAV_HEADER_SIZE],
    hasher: Sha256,
    samples_written: u64,
    bytes_written: u64,
}

impl<W: Write> WavStreamWriter<W> {
    /// Write the header to `sink` and return a writer ready for samples.
    pub fn new(sink: W, builder: WavHeaderBuilder, declared_samples: u64) -> Result<Self, CaptureError> {
        let mut writer = Self {
            sink,
            header: builder.build(declared_samples),
            hasher: Sha256::new(),
            samples_written: 0,
            bytes_written: 0,
        };
        let header = writer.header;
        writer.write_raw(&header)?;
        Ok(writer)
    }

    pub fn write_buffer(&mut self, buffer: &SampleBuffer) -> Result<(), CaptureError> {
        self.write_samples(buffer.samples())
    }

    pub fn write_samples(&mut self, samples: &[i16]) -> Result<(), CaptureError> {
        if samples.is_empty() {
            return Ok(());
        }
        let mut data = Vec::with_capacity(samples.len() * 2);
        for sample in samples {
            data.extend_from_slice(&sample.to_le_bytes());
        }
        self.write_raw(&data)?;
        self.hasher.update(&data);
        self.samples_written += samples.len() as u64;
        Ok(())
    }

    /// Samples written after the header.
    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }

    /// Total bytes written so far (including the WAV header).
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Flush and hand back the sink, leaving the header as declared.
    pub fn finish(mut self) -> Result<(W, StreamSummary), CaptureError> {
        self.sink
            .flush()
            .map_err(|e| CaptureError::StorageError(format!("flush failed: {}", e)))?;
        let summary = self.summary();
        Ok((self.sink, summary))
    }

    fn summary(&self) -> StreamSummary {
        StreamSummary {
            samples_written: self.samples_written,
            bytes_written: self.bytes_written,
            checksum: hex_encode(&self.hasher.clone().finalize()),
        }
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<(), CaptureError> {
        self.sink
            .write_all(data)
            .map_err(|e| CaptureError::StorageError(format!("write failed: {}", e)))?;
        self.bytes_written += data.len() as u64;
        Ok(())
    }
}

impl<W: Write + Seek> WavStreamWriter<W> {
    /// Patch the RIFF and data sizes to the bytes actually written, then
    /// flush and hand back the sink.
    pub fn finalize(mut self) -> Result<(W, StreamSummary), CaptureError> {
        let data_size = self.bytes_written - WAV_HEADER_SIZE as u64;
        wav_format::patch_data_size(&mut self.header, data_size);
        wav_format::patch_file_size(&mut self.header, self.bytes_written);

        let end = self
            .sink
            .stream_position()
            .map_err(|e| CaptureError::StorageError(e.to_string()))?;
        let start = end - self.bytes_written;
        self.sink
            .seek(SeekFrom::Start(start))
            .map_err(|e| CaptureError::StorageError(e.to_string()))?;
        self.sink
            .write_all(&self.header)
            .map_err(|e| CaptureError::StorageError(format!("header patch failed: {}", e)))?;
        self.sink
            .seek(SeekFrom::Start(end))
            .map_err(|e| CaptureError::StorageError(e.to_string()))?;

        self.finish()
    }
}

pub(crate) fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Cursor;
    use std::path::PathBuf;

    use chrono::Utc;

    use crate::processing::wav_format::STREAMING_SAMPLES;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    fn builder() -> WavHeaderBuilder {
        WavHeaderBuilder::new(16000, 1, 16)
    }

    fn field_u32(data: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
    }

    fn temp_file_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("pcm_capture_test_{}", name))
    }

    #[test]
    fn live_stream_keeps_declared_size() {
        let mut writer = WavStreamWriter::new(Vec::new(), builder(), STREAMING_SAMPLES).unwrap();
        writer
            .write_buffer(&SampleBuffer::from_samples(Utc::now(), vec![1, -1]))
            .unwrap();
        writer
            .write_buffer(&SampleBuffer::from_samples(Utc::now(), vec![0x1234]))
            .unwrap();
        assert_eq!(writer.samples_written(), 3);
        assert_eq!(writer.bytes_written(), 44 + 6);

        let (bytes, summary) = writer.finish().unwrap();
        assert_eq!(bytes.len(), 50);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(field_u32(&bytes, 40), 0x8000_0000);
        assert_eq!(&bytes[44..], &[0x01, 0x00, 0xFF, 0xFF, 0x34, 0x12]);
        assert_eq!(summary.samples_written, 3);
        assert_eq!(summary.bytes_written, 50);
        assert_eq!(summary.checksum.len(), 64);
        assert_ne!(summary.checksum, EMPTY_SHA256);
    }

    #[test]
    fn empty_stream_checksum() {
        let writer = WavStreamWriter::new(Vec::new(), builder(), 0).unwrap();
        let (bytes, summary) = writer.finish().unwrap();
        assert_eq!(bytes.len(), 44);
        assert_eq!(summary.checksum, EMPTY_SHA256);
    }

    #[test]
    fn checksum_ignores_declared_length() {
        let mut live = WavStreamWriter::new(Vec::new(), builder(), STREAMING_SAMPLES).unwrap();
        let mut sized = WavStreamWriter::new(Vec::new(), builder(), 2).unwrap();
        live.write_samples(&[5, -5]).unwrap();
        sized.write_samples(&[5, -5]).unwrap();

        let (live_bytes, live_summary) = live.finish().unwrap();
        let (sized_bytes, sized_summary) = sized.finish().unwrap();
        assert_ne!(live_bytes[..44], sized_bytes[..44]);
        assert_eq!(live_summary.checksum, sized_summary.checksum);

        let data_only = hex_encode(&Sha256::digest(&live_bytes[44..]));
        assert_eq!(live_summary.checksum, data_only);
    }

    #[test]
    fn empty_buffers_write_nothing() {
        let mut writer = WavStreamWriter::new(Vec::new(), builder(), 0).unwrap();
        writer.write_samples(&[]).unwrap();
        assert_eq!(writer.bytes_written(), 44);
    }

    #[test]
    fn finalize_patches_sizes_in_place() {
        let mut writer = WavStreamWriter::new(Cursor::new(Vec::new()), builder(), STREAMING_SAMPLES).unwrap();
        writer.write_samples(&[0; 256]).unwrap();

        let (cursor, summary) = writer.finalize().unwrap();
        assert_eq!(cursor.position(), 44 + 512);
        let bytes = cursor.into_inner();
        assert_eq!(bytes.len(), 44 + 512);
        assert_eq!(field_u32(&bytes, 40), 512);
        assert_eq!(field_u32(&bytes, 4), 512 + 36);
        assert_eq!(summary.samples_written, 256);
    }

    #[test]
    fn finalize_respects_existing_prefix() {
        let mut cursor = Cursor::new(Vec::new());
        cursor.write_all(b"HTTP").unwrap();
        let mut writer = WavStreamWriter::new(cursor, builder(), STREAMING_SAMPLES).unwrap();
        writer.write_samples(&[7, 7]).unwrap();

        let (cursor, _) = writer.finalize().unwrap();
        let bytes = cursor.into_inner();
        assert_eq!(&bytes[0..4], b"HTTP");
        assert_eq!(&bytes[4..8], b"RIFF");
        assert_eq!(field_u32(&bytes, 4 + 40), 4);
    }

    #[test]
    fn finalized_file_on_disk() {
        let path = temp_file_path("finalized.wav");
        let file = File::create(&path).unwrap();
        let mut writer = WavStreamWriter::new(file, builder(), STREAMING_SAMPLES).unwrap();
        writer.write_samples(&[100; 8]).unwrap();
        writer.finalize().unwrap();

        let data = fs::read(&path).unwrap();
        assert_eq!(data.len(), 44 + 16);
        assert_eq!(&data[8..12], b"WAVE");
        assert_eq!(field_u32(&data, 40), 16);

        fs::remove_file(&path).ok();
    }
}
