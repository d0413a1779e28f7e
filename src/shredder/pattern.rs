//! Overwrite patterns: the bytes written over file contents before unlink.

#![allow(missing_docs)]

use std::fmt;
use std::str::FromStr;

use rand::CryptoRng;
use serde::{Deserialize, Serialize};

use crate::core::errors::ShredError;

/// Byte pattern used to overwrite file contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillMode {
    /// Every byte 0x00.
    Zero,
    /// Every byte 0xFF.
    Max,
    /// Bytes from a cryptographically secure generator.
    #[default]
    Random,
}

impl FillMode {
    /// The constant byte for fixed patterns; `None` for `Random`.
    #[must_use]
    pub const fn constant_byte(self) -> Option<u8> {
        match self {
            Self::Zero => Some(0x00),
            Self::Max => Some(0xFF),
            Self::Random => None,
        }
    }

    /// Whether the buffer must be refilled before every chunk.
    #[must_use]
    pub const fn refills_per_chunk(self) -> bool {
        matches!(self, Self::Random)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Zero => "zero",
            Self::Max => "max",
            Self::Random => "random",
        }
    }
}

impl fmt::Display for FillMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FillMode {
    type Err = ShredError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "zero" | "zeros" | "0x00" => Ok(Self::Zero),
            "max" | "ones" | "0xff" => Ok(Self::Max),
            "random" | "rand" => Ok(Self::Random),
            other => Err(ShredError::ConfigParse {
                context: "fill_mode",
                details: format!("unknown fill mode {other:?}; expected zero, max, or random"),
            }),
        }
    }
}

/// Fill `buffer` in place according to `mode`.
///
/// The `CryptoRng` bound keeps general-purpose generators out of the random
/// path; `Zero` and `Max` never touch the generator.
pub fn fill<R: CryptoRng + ?Sized>(buffer: &mut [u8], mode: FillMode, rng: &mut R) {
    match mode.constant_byte() {
        Some(byte) => buffer.fill(byte),
        None => rng.fill_bytes(buffer),
    }
}
