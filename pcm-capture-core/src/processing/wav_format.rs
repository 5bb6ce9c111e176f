//! WAV header construction.
//!
//! Builds the standard 44-byte RIFF/WAVE header for a PCM stream and provides
//! helpers for fixing the size fields once the real length is known.

use crate::models::config::CaptureConfig;

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Sample count declared for an open-ended live stream (1 Gi samples).
pub const STREAMING_SAMPLES: u64 = 1024 * 1024 * 1024;

/// Builds WAV headers for a fixed stream format.
///
/// Layout (all multi-byte fields little-endian):
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    data_size + 36
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (PCM format chunk size)
/// [20-21]  1 (PCM format code)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * channels * bits_per_sample / 8
/// [32-33]  block_align = channels * bits_per_sample / 8
/// [34-35]  bits_per_sample
/// [36-39]  "data"
/// [40-43]  data_size = number_of_samples * block_align
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeaderBuilder {
    sample_rate: u32,
    channels: u16,
    bits_per_sample: u16,
}

impl WavHeaderBuilder {
    pub fn new(sample_rate: u32, channels: u16, bits_per_sample: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample,
        }
    }

    pub fn from_config(config: &CaptureConfig) -> Self {
        Self::new(config.sample_rate, config.channels, config.bits_per_sample_out)
    }

    /// Truncated to the 16-bit header field.
    pub fn block_align(&self) -> u16 {
        (self.channels as u32 * self.bits_per_sample as u32 / 8) as u16
    }

    /// Truncated to the 32-bit header field.
    pub fn byte_rate(&self) -> u32 {
        (self.sample_rate as u64 * self.block_align() as u64) as u32
    }

    /// Build the header for a stream that declares `number_of_samples`.
    ///
    /// The declaration may exceed what is eventually written, e.g.
    /// [`STREAMING_SAMPLES`] for a live stream. Sizes that do not fit the
    /// 32-bit fields are truncated.
    pub fn build(&self, number_of_samples: u64) -> [u8; WAV_HEADER_SIZE] {
        let data_size = number_of_samples.wrapping_mul(self.block_align() as u64) as u32;
        let chunk_size = data_size.wrapping_add(36);

        let mut header = [0u8; WAV_HEADER_SIZE];

        // RIFF chunk descriptor
        header[0..4].copy_from_slice(b"RIFF");
        header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
        header[8..12].copy_from_slice(b"WAVE");

        // fmt sub-chunk
        header[12..16].copy_from_slice(b"fmt ");
        header[16..20].copy_from_slice(&16u32.to_le_bytes()); // PCM format size
        header[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM format code
        header[22..24].copy_from_slice(&self.channels.to_le_bytes());
        header[24..28].copy_from_slice(&self.sample_rate.to_le_bytes());
        header[28..32].copy_from_slice(&self.byte_rate().to_le_bytes());
        header[32..34].copy_from_slice(&self.block_align().to_le_bytes());
        header[34..36].copy_from_slice(&self.bits_per_sample.to_le_bytes());

        // data sub-chunk
        header[36..40].copy_from_slice(b"data");
        header[40..44].copy_from_slice(&data_size.to_le_bytes());

        header
    }
}

/// Patch the RIFF chunk size at offset 4 (`total_file_size - 8`).
pub fn patch_file_size(header: &mut [u8], total_file_size: u64) {
    let chunk_size = total_file_size.saturating_sub(8) as u32;
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
}

/// Patch the data-size field at offset 40.
pub fn patch_data_size(header: &mut [u8], data_size: u64) {
    let data_size_u32 = data_size as u32;
    header[40..44].copy_from_slice(&data_size_u32.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_u32(header: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([header[offset], header[offset + 1], header[offset + 2], header[offset + 3]])
    }

    fn field_u16(header: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes([header[offset], header[offset + 1]])
    }

    #[test]
    fn empty_16khz_mono_header_is_bit_exact() {
        let header = WavHeaderBuilder::new(16000, 1, 16).build(0);

        #[rustfmt::skip]
        let expected: [u8; 44] = [
            b'R', b'I', b'F', b'F',
            36, 0, 0, 0,
            b'W', b'A', b'V', b'E',
            b'f', b'm', b't', b' ',
            16, 0, 0, 0,
            1, 0,
            1, 0,
            0x80, 0x3E, 0, 0,
            0x00, 0x7D, 0, 0,
            2, 0,
            16, 0,
            b'd', b'a', b't', b'a',
            0, 0, 0, 0,
        ];
        assert_eq!(header, expected);
        assert_eq!(field_u32(&header, 28), 32000);
        assert_eq!(field_u32(&header, 40), 0);
    }

    #[test]
    fn sizes_follow_sample_count() {
        let header = WavHeaderBuilder::new(16000, 1, 16).build(256);
        assert_eq!(field_u32(&header, 40), 512);
        assert_eq!(field_u32(&header, 4), 512 + 36);
    }

    #[test]
    fn stereo_derived_fields() {
        let header = WavHeaderBuilder::new(48000, 2, 16).build(4800);

        assert_eq!(field_u16(&header, 22), 2);
        assert_eq!(field_u32(&header, 24), 48000);
        assert_eq!(field_u32(&header, 28), 192000); // 48000 * 2 * 16/8
        assert_eq!(field_u16(&header, 32), 4); // 2 * 16/8
        assert_eq!(field_u16(&header, 34), 16);
        assert_eq!(field_u32(&header, 40), 19200);
        assert_eq!(field_u32(&header, 4), 36 + 19200);
    }

    #[test]
    fn streaming_declaration() {
        let header = WavHeaderBuilder::new(16000, 1, 16).build(STREAMING_SAMPLES);
        assert_eq!(field_u32(&header, 40), 0x8000_0000);
        assert_eq!(field_u32(&header, 4), 0x8000_0024);
    }

    #[test]
    fn oversized_declaration_truncates_to_32_bits() {
        let header = WavHeaderBuilder::new(16000, 1, 16).build(0x8000_0001);
        // 0x1_0000_0002 bytes truncated to 32 bits
        assert_eq!(field_u32(&header, 40), 2);
        assert_eq!(field_u32(&header, 4), 38);
    }

    #[test]
    fn from_config_uses_output_format() {
        let builder = WavHeaderBuilder::from_config(&CaptureConfig::default());
        assert_eq!(builder, WavHeaderBuilder::new(16000, 1, 16));
        assert_eq!(builder.byte_rate(), 32000);
        assert_eq!(builder.block_align(), 2);
    }

    #[test]
    fn oversized_format_fields_truncate() {
        let fast = WavHeaderBuilder::new(3_000_000_000, 1, 16);
        assert_eq!(fast.byte_rate(), (6_000_000_000u64 & 0xFFFF_FFFF) as u32);
        let header = fast.build(0);
        assert_eq!(field_u32(&header, 24), 3_000_000_000);
        assert_eq!(field_u32(&header, 28), 1_705_032_704);

        let wide = WavHeaderBuilder::new(16000, 4096, 16);
        assert_eq!(wide.block_align(), 0); // 8192 * 8 = 0x1_0000
        let header = wide.build(10);
        assert_eq!(field_u16(&header, 32), 0);
        assert_eq!(field_u32(&header, 40), 0);
    }

    #[test]
    fn patch_sizes() {
        let mut header = WavHeaderBuilder::new(16000, 1, 16).build(STREAMING_SAMPLES);

        patch_data_size(&mut header, 19200);
        assert_eq!(field_u32(&header, 40), 19200);

        patch_file_size(&mut header, 19200 + 44);
        assert_eq!(field_u32(&header, 4), 19200 + 36);
    }
}
