// src/miner/algorithm/graph.rs
//! Edge generation and cycle verification
//!
//! Edge `n` joins node `siphash(2n) & mask` in partition A to node
//! `siphash(2n + 1) & mask` in partition B. In the cuckoo table partition B
//! is offset by N so the two partitions share one address space.

use super::CuckooParams;
use super::siphash::SipHasher;

/// One edge of the bipartite graph, both endpoints un-offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    /// Endpoint in partition A
    pub u: u32,
    /// Endpoint in partition B
    pub v: u32,
}

impl Edge {
    /// Create a new edge
    pub fn new(u: u32, v: u32) -> Self {
        Self { u, v }
    }
}

/// Pseudo-random bipartite graph keyed by a block header
#[derive(Debug, Clone)]
pub struct Graph {
    hasher: SipHasher,
    params: CuckooParams,
}

impl Graph {
    /// Keys a new graph from the header bytes
    pub fn new(header: &[u8], params: CuckooParams) -> Self {
        Self {
            hasher: SipHasher::new(header),
            params,
        }
    }

    /// Graph size parameters
    pub fn params(&self) -> CuckooParams {
        self.params
    }

    /// Raw endpoint of edge `nonce` on `side` (0 = A, 1 = B), in `[0, N)`
    #[inline]
    pub fn sipnode(&self, nonce: u32, side: u32) -> u32 {
        let word = 2 * u64::from(nonce) + u64::from(side);
        (self.hasher.siphash24(word) as u32) & self.params.node_mask()
    }

    /// Table address of an endpoint: side 1 lands in `[N, 2N)`
    #[inline]
    pub fn node(&self, nonce: u32, side: u32) -> u32 {
        let node = self.sipnode(nonce, side);
        if side == 0 {
            node
        } else {
            self.params.partition_size() + node
        }
    }

    /// Edge generated by `nonce`
    #[inline]
    pub fn sipedge(&self, nonce: u32) -> Edge {
        Edge::new(self.sipnode(nonce, 0), self.sipnode(nonce, 1))
    }

    /// Checks that `nonces` form a single cycle of the proof size
    ///
    /// Nonces must be strictly ascending and below `easiness`. Every
    /// endpoint must be shared with exactly one other edge of the proof,
    /// and walking A-B-A... from the first edge must visit every edge
    /// before returning to it.
    pub fn verify(&self, nonces: &[u32], easiness: u32) -> bool {
        let size = self.params.proof_size;
        if nonces.len() != size {
            return false;
        }

        let mut us = Vec::with_capacity(size);
        let mut vs = Vec::with_capacity(size);
        for (n, &nonce) in nonces.iter().enumerate() {
            if nonce >= easiness || (n > 0 && nonce <= nonces[n - 1]) {
                return false;
            }
            us.push(self.sipnode(nonce, 0));
            vs.push(self.sipnode(nonce, 1));
        }

        let mut i = 0;
        let mut remaining = size;
        loop {
            // unique other edge sharing the B endpoint of edge i
            let mut j = i;
            for k in 0..size {
                if k != i && vs[k] == vs[i] {
                    if j != i {
                        return false;
                    }
                    j = k;
                }
            }
            if j == i {
                return false;
            }

            // unique other edge sharing the A endpoint of edge j
            i = j;
            for k in 0..size {
                if k != j && us[k] == us[j] {
                    if i != j {
                        return false;
                    }
                    i = k;
                }
            }
            if i == j {
                return false;
            }

            remaining = match remaining.checked_sub(2) {
                Some(left) => left,
                None => return false,
            };
            if i == 0 {
                break;
            }
        }

        remaining == 0
    }
}
