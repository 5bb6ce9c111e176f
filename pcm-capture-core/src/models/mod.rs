pub mod config;
pub mod error;
pub mod sample_buffer;
pub mod state;
pub mod stream_result;
