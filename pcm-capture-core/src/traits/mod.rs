pub mod engine_observer;
pub mod frame_source;
