pub mod converter;
pub mod handoff;
pub mod wav_format;
