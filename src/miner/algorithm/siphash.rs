// src/miner/algorithm/siphash.rs
//! SipHash-2-4 keyed from a block header
//!
//! The header is hashed once with SHA-256; the first 16 bytes of the digest
//! become the two SipHash keys. Every edge of the graph is then one SipHash
//! call on `2 * nonce + side`.

use sha2::{Digest, Sha256};

/// SipHash state for edge generation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SipHasher {
    k0: u64,
    k1: u64,
}

impl SipHasher {
    /// Derives the SipHash keys from the header bytes
    pub fn new(header: &[u8]) -> Self {
        let digest = Sha256::digest(header);
        let mut k0 = [0u8; 8];
        let mut k1 = [0u8; 8];
        k0.copy_from_slice(&digest[0..8]);
        k1.copy_from_slice(&digest[8..16]);

        Self {
            k0: u64::from_le_bytes(k0),
            k1: u64::from_le_bytes(k1),
        }
    }

    /// SipHash-2-4 of a single 64-bit word
    pub fn siphash24(&self, input: u64) -> u64 {
        let mut v0 = 0x736f6d6570736575u64 ^ self.k0;
        let mut v1 = 0x646f72616e646f6du64 ^ self.k1;
        let mut v2 = 0x6c7967656e657261u64 ^ self.k0;
        let mut v3 = 0x7465646279746573u64 ^ self.k1;

        v3 ^= input;
        for _ in 0..2 {
            sipround(&mut v0, &mut v1, &mut v2, &mut v3);
        }
        v0 ^= input;

        v2 ^= 0xff;
        for _ in 0..4 {
            sipround(&mut v0, &mut v1, &mut v2, &mut v3);
        }

        v0 ^ v1 ^ v2 ^ v3
    }
}

#[inline]
fn sipround(v0: &mut u64, v1: &mut u64, v2: &mut u64, v3: &mut u64) {
    *v0 = v0.wrapping_add(*v1);
    *v2 = v2.wrapping_add(*v3);
    *v1 = v1.rotate_left(13);
    *v3 = v3.rotate_left(16);
    *v1 ^= *v0;
    *v3 ^= *v2;
    *v0 = v0.rotate_left(32);

    *v2 = v2.wrapping_add(*v1);
    *v0 = v0.wrapping_add(*v3);
    *v1 = v1.rotate_left(17);
    *v3 = v3.rotate_left(21);
    *v1 ^= *v2;
    *v3 ^= *v0;
    *v2 = v2.rotate_left(32);
}
