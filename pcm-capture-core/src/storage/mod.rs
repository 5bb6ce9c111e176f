pub mod metadata;
pub mod wav_stream_writer;
