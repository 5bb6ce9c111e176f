//! # pcm-capture-core
//!
//! Platform-agnostic PCM capture core library.
//!
//! Provides the real-time acquisition engine, per-front-end sample
//! conversion, the bounded hand-off queue, and WAV stream output. Hardware
//! backends implement the `FrameSource` trait and plug into the generic
//! `CaptureEngine`.
//!
//! ## Architecture
//!
//! ```text
//! pcm-capture-core (this crate)
//! ├── traits/       ← FrameSource, EngineObserver
//! ├── models/       ← CaptureError, CaptureConfig, SampleBuffer, EngineState, etc.
//! ├── processing/   ← SampleConverter, hand-off queue, WAV header generation
//! ├── engine/       ← CaptureEngine (acquisition thread + queue)
//! └── storage/      ← WavStreamWriter, metadata sidecar
//! ```

pub mod engine;
pub mod models;
pub mod processing;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use engine::capture_engine::CaptureEngine;
pub use models::config::{
    CaptureConfig, TaskOptions, BITS_PER_SAMPLE_OUT, DEFAULT_QUEUE_CAPACITY, MAX_QUEUE_CAPACITY,
};
pub use models::error::CaptureError;
pub use models::sample_buffer::SampleBuffer;
pub use models::state::{EngineDiagnostics, EngineState};
pub use models::stream_result::{StreamMetadata, StreamSummary};
pub use processing::converter::SampleConverter;
pub use processing::handoff::{handoff_queue, stop_signal, BufferConsumer, BufferProducer, PushOutcome};
pub use processing::wav_format::{WavHeaderBuilder, STREAMING_SAMPLES, WAV_HEADER_SIZE};
pub use storage::wav_stream_writer::WavStreamWriter;
pub use traits::engine_observer::EngineObserver;
pub use traits::frame_source::{FrameSource, DEFAULT_MAX_FRAME_LEN};
