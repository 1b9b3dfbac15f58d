// src/miner/target.rs
//! 256-bit difficulty targets
//!
//! Targets are stored as 32 big-endian bytes, so the derived ordering of
//! the byte array is numeric ordering.

use crate::utils::error::MinerError;
use std::fmt;

/// A 256-bit unsigned proof-of-work threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Target([u8; 32]);

impl Target {
    /// Largest possible target; every hash meets it
    pub const MAX: Target = Target([0xff; 32]);

    /// Builds a target from big-endian bytes
    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        Target(bytes)
    }

    /// Big-endian bytes of the target
    pub fn to_be_bytes(&self) -> [u8; 32] {
        self.0
    }

    /// Expands compact "bits" into a full target
    ///
    /// The top byte is a base-256 exponent, the low 23 bits a mantissa:
    /// `target = mantissa * 256^(exponent - 3)`. Bit 23 is a sign flag.
    ///
    /// # Errors
    /// `InputError` for a negative value or one that does not fit 256 bits
    pub fn from_compact(bits: u32) -> Result<Self, MinerError> {
        let exponent = (bits >> 24) as usize;
        let mantissa = bits & 0x007f_ffff;

        if bits & 0x0080_0000 != 0 && mantissa != 0 {
            return Err(MinerError::InputError(format!(
                "negative compact target {:08x}",
                bits
            )));
        }

        let mut target = [0u8; 32];
        // mantissa byte i lands at index 32 - exponent + i
        for (i, byte) in mantissa.to_be_bytes()[1..].iter().enumerate() {
            let pos = 32 + i as isize - exponent as isize;
            if pos < 0 {
                if *byte != 0 {
                    return Err(MinerError::InputError(format!(
                        "compact target {:08x} overflows 256 bits",
                        bits
                    )));
                }
            } else if (pos as usize) < 32 {
                target[pos as usize] = *byte;
            }
        }

        Ok(Target(target))
    }

    /// True if a big-endian hash value is at or below this target
    pub fn is_met_by(&self, hash: &[u8; 32]) -> bool {
        *hash <= self.0
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}
