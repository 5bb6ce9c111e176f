use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Raw-to-PCM conversion for one hardware front end.
///
/// The variant is fixed per deployment and chosen when the engine is built.
/// Raw words are carried as `u32` regardless of the device's native width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SampleConverter {
    /// Built-in ADC: 12-bit unsigned code in the low bits of the word.
    DirectSampling,
    /// MEMS microphone: 24-bit two's-complement word, high-aligned.
    DigitalMicrophone,
}

impl SampleConverter {
    /// Convert `raw` into `out` index by index.
    ///
    /// Processes `min(raw.len(), out.len())` samples; the rest of `out` is
    /// left untouched. Never allocates.
    pub fn convert(&self, raw: &[u32], out: &mut [i16]) {
        match self {
            Self::DirectSampling => {
                for (dst, &word) in out.iter_mut().zip(raw) {
                    *dst = direct_sampling(word);
                }
            }
            Self::DigitalMicrophone => {
                for (dst, &word) in out.iter_mut().zip(raw) {
                    *dst = digital_microphone(word);
                }
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::DirectSampling => "direct-sampling",
            Self::DigitalMicrophone => "digital-microphone",
        }
    }
}

impl fmt::Display for SampleConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SampleConverter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct-sampling" => Ok(Self::DirectSampling),
            "digital-microphone" => Ok(Self::DigitalMicrophone),
            other => Err(format!("unknown converter: {}", other)),
        }
    }
}

/// Invert the 12-bit ADC code and re-center it around zero.
#[inline]
pub fn direct_sampling(raw: u32) -> i16 {
    ((0xFFF - (raw & 0xFFF)) as i32 - 0x800) as i16
}

/// Two's-complement negation of the whole raw word, truncated to 16 bits.
///
/// Recordings from deployed devices depend on this. There is no shift to drop the
/// low-order bits of the 24-bit value, so only the low 16 bits of the word
/// reach the output.
#[inline]
pub fn digital_microphone(raw: u32) -> i16 {
    (!raw).wrapping_add(1) as i16
}
