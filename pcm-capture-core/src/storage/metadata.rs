//! JSON sidecar for finished recordings.
//!
//! `{stem}.metadata.json` sits next to the WAV file and carries the stream
//! format, acquisition counters and a checksum of the PCM data.
//! `verify_recording` checks a WAV file against its sidecar.

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use super::wav_stream_writer::hex_encode;
use crate::models::error::CaptureError;
use crate::models::stream_result::StreamMetadata;
use crate::processing::wav_format::WAV_HEADER_SIZE;

pub fn metadata_path(recording_path: &Path) -> PathBuf {
    recording_path.with_extension("metadata.json")
}

/// Write the sidecar for `recording_path`.
///
/// Written to a temporary name first, then renamed, so a reader never sees
/// a half-written file.
pub fn write_metadata(metadata: &StreamMetadata, recording_path: &Path) -> Result<(), CaptureError> {
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| CaptureError::StorageError(format!("failed to serialize metadata: {}", e)))?;
    let path = metadata_path(recording_path);
    let partial = path.with_extension("json.partial");
    fs::write(&partial, json)
        .map_err(|e| CaptureError::StorageError(format!("failed to write {}: {}", partial.display(), e)))?;
    fs::rename(&partial, &path)
        .map_err(|e| CaptureError::StorageError(format!("failed to write {}: {}", path.display(), e)))?;
    log::debug!("Wrote sidecar {}", path.display());
    Ok(())
}

pub fn read_metadata(recording_path: &Path) -> Result<StreamMetadata, CaptureError> {
    let path = metadata_path(recording_path);
    let json = fs::read_to_string(&path)
        .map_err(|e| CaptureError::StorageError(format!("failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&json)
        .map_err(|e| CaptureError::StorageError(format!("failed to parse {}: {}", path.display(), e)))
}

/// Check a WAV recording against its sidecar.
///
/// The data after the header must hash to the recorded checksum and hold
/// exactly `samples_written` samples. Returns the sidecar on success.
pub fn verify_recording(recording_path: &Path) -> Result<StreamMetadata, CaptureError> {
    let metadata = read_metadata(recording_path)?;
    let bytes = fs::read(recording_path).map_err(|e| {
        CaptureError::StorageError(format!("failed to read {}: {}", recording_path.display(), e))
    })?;
    if bytes.len() < WAV_HEADER_SIZE || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(CaptureError::StorageError(format!(
            "{} is not a WAV file",
            recording_path.display()
        )));
    }

    let data = &bytes[WAV_HEADER_SIZE..];
    let sample_bytes = (metadata.bits_per_sample / 8).max(1) as u64;
    let samples = data.len() as u64 / sample_bytes;
    if samples != metadata.samples_written {
        return Err(CaptureError::StorageError(format!(
            "{} holds {} samples, sidecar records {}",
            recording_path.display(),
            samples,
            metadata.samples_written
        )));
    }

    let checksum = hex_encode(&Sha256::digest(data));
    if checksum != metadata.checksum {
        return Err(CaptureError::StorageError(format!(
            "checksum mismatch for {}",
            recording_path.display()
        )));
    }
    Ok(metadata)
}
