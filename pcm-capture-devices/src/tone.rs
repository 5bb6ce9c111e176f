//! Synthetic front end producing a sine tone.
//!
//! Samples are encoded in the profile's raw representation so they travel
//! through the same conversion path as real hardware data.

use std::f64::consts::TAU;
use std::thread;
use std::time::{Duration, Instant};

use pcm_capture_core::{CaptureError, FrameSource};

use crate::device_profile::DeviceProfile;

pub struct ToneSource {
    profile: DeviceProfile,
    name: String,
    sample_rate: u32,
    phase_step: f64,
    phase: f64,
    amplitude: f64,
    paced: bool,
    next_deadline: Option<Instant>,
    frame_limit: Option<u64>,
    frames_emitted: u64,
}

impl ToneSource {
    /// A paced tone at half of the profile's usable amplitude.
    pub fn new(profile: DeviceProfile, sample_rate: u32, frequency_hz: f64) -> Self {
        let full_scale = match profile {
            DeviceProfile::Adc => 2047.0,
            DeviceProfile::Mems => i16::MAX as f64,
        };
        Self {
            profile,
            name: format!("tone {} Hz ({})", frequency_hz, profile),
            sample_rate,
            phase_step: TAU * frequency_hz / sample_rate.max(1) as f64,
            phase: 0.0,
            amplitude: full_scale / 2.0,
            paced: true,
            next_deadline: None,
            frame_limit: None,
            frames_emitted: 0,
        }
    }

    /// Peak amplitude in output sample units.
    pub fn with_amplitude(mut self, amplitude: i16) -> Self {
        self.amplitude = amplitude.unsigned_abs() as f64;
        self
    }

    /// Report end of stream after `frames` frames.
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.frame_limit = Some(frames);
        self
    }

    /// Deliver frames as fast as they are requested instead of in real time.
    pub fn unpaced(mut self) -> Self {
        self.paced = false;
        self
    }

    /// Sleep until the wall-clock time at which this frame would be complete.
    fn pace(&mut self, samples: usize) {
        let frame = Duration::from_secs_f64(samples as f64 / self.sample_rate.max(1) as f64);
        let deadline = self.next_deadline.unwrap_or_else(Instant::now) + frame;
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        }
        self.next_deadline = Some(deadline);
    }
}

impl FrameSource for ToneSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn max_frame_len(&self) -> usize {
        self.profile.max_frame_len()
    }

    fn read_frame(&mut self, raw: &mut [u32]) -> Result<usize, CaptureError> {
        if self.frame_limit.is_some_and(|limit| self.frames_emitted >= limit) {
            return Ok(0);
        }
        if self.paced {
            self.pace(raw.len());
        }

        for word in raw.iter_mut() {
            let sample = (self.amplitude * self.phase.sin()).round() as i16;
            *word = self.profile.encode(sample);
            self.phase = (self.phase + self.phase_step) % TAU;
        }
        self.frames_emitted += 1;
        Ok(raw.len())
    }
}
