// src/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// Nonces of a cycle found in the cuckoo graph
///
/// Nonces are kept in the ascending order in which reconstruction finds
/// them, which is also the order the verifier requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution(Vec<u32>);

impl Solution {
    /// Wraps a list of cycle nonces
    pub fn new(nonces: Vec<u32>) -> Self {
        Solution(nonces)
    }

    /// The cycle nonces
    pub fn nonces(&self) -> &[u32] {
        &self.0
    }

    /// Number of nonces (the cycle length)
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for an empty solution
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Wire form: each nonce as 4 little-endian bytes, concatenated
    ///
    /// This is the byte string hashed against the target and appended to
    /// the block header on submission.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.iter().flat_map(|n| n.to_le_bytes()).collect()
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words: Vec<String> = self.0.iter().map(|n| format!("{:x}", n)).collect();
        write!(f, "[{}]", words.join(" "))
    }
}
