// src/miner/algorithm/solve.rs
//! Shared per-job solver state
//!
//! The cuckoo table maps every node to the node it is currently matched
//! with (0 = unmatched). All solver threads of a job read and write it
//! concurrently with relaxed atomics and no locking. Races can corrupt a
//! path, which at worst loses a cycle: every candidate is rebuilt from the
//! graph in [`SolveState::solution`] and checked with [`Graph::verify`]
//! before anyone trusts it.

use super::{CuckooParams, CycleError, Edge, Graph};
use crate::types::Solution;
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

/// Cuckoo table and search bounds shared by the solver threads of one job
pub struct SolveState {
    graph: Graph,
    easiness: u32,
    threads: usize,
    cuckoo: Box<[AtomicU32]>,
    /// Serialises reconstruction only; table updates never take it
    reconstruct: Mutex<()>,
}

impl SolveState {
    /// Creates a fresh, fully unmatched table for the given header
    ///
    /// # Arguments
    /// * `header` - Header bytes keying the graph
    /// * `params` - Graph size and proof size
    /// * `easiness` - Nonces `[0, easiness)` are searched
    /// * `threads` - Number of solver threads sharing this state
    pub fn new(header: &[u8], params: CuckooParams, easiness: u32, threads: usize) -> Self {
        let cells = params.node_count() as usize + 1;
        let cuckoo = (0..cells).map(|_| AtomicU32::new(0)).collect();

        Self {
            graph: Graph::new(header, params),
            easiness,
            threads: threads.max(1),
            cuckoo,
            reconstruct: Mutex::new(()),
        }
    }

    /// The graph this state searches
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Size of the nonce search space
    pub fn easiness(&self) -> u32 {
        self.easiness
    }

    /// Number of solver threads striding over the nonce space
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Current partner of `node`, 0 if unmatched
    #[inline]
    pub fn get(&self, node: u32) -> u32 {
        self.cuckoo[node as usize].load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn set(&self, node: u32, partner: u32) {
        self.cuckoo[node as usize].store(partner, Ordering::Relaxed);
    }

    /// Follows matches from `node` to an unmatched root
    ///
    /// `trace[0]` is set to `node`; on success `trace[..=depth]` holds the
    /// visited nodes in order and the returned depth is the number of hops.
    /// The trace length is the path cap: reaching it yields
    /// [`CycleError::IllegalCycle`] when the path revisits a node and
    /// [`CycleError::PathTooLong`] otherwise.
    pub fn path(&self, node: u32, trace: &mut [u32]) -> Result<usize, CycleError> {
        let cap = trace.len();
        if cap == 0 {
            return Err(CycleError::PathTooLong { max: 0 });
        }

        trace[0] = node;
        let mut depth = 0;
        let mut u = self.get(node);
        while u != 0 {
            depth += 1;
            if depth >= cap {
                return Err(match trace[..depth].iter().rposition(|&seen| seen == u) {
                    Some(pos) => CycleError::IllegalCycle(depth - pos),
                    None => CycleError::PathTooLong { max: cap },
                });
            }
            trace[depth] = u;
            u = self.get(u);
        }

        Ok(depth)
    }

    /// Recovers the nonces of a cycle closed by two meeting paths
    ///
    /// `us[..=nu]` and `vs[..=nv]` are the traces from the new edge's two
    /// endpoints up to the node where they meet. The implied edges are
    /// collected, then every nonce in `[0, easiness)` is regenerated and
    /// matched against them. Returns `None` unless exactly `proof_size`
    /// distinct edges are recovered, which is the normal outcome when a
    /// concurrent table update corrupted one of the traces.
    pub fn solution(&self, us: &[u32], nu: usize, vs: &[u32], nv: usize) -> Option<Solution> {
        let _guard = self
            .reconstruct
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let proof_size = self.graph.params().proof_size;
        let half = self.graph.params().partition_size();

        // u's sit at even positions of us, v's at odd; the reverse in vs
        let mut cycle = HashSet::with_capacity(proof_size);
        cycle.insert(Edge::new(us[0], vs[0].wrapping_sub(half)));
        for i in (0..nu).rev() {
            cycle.insert(Edge::new(us[(i + 1) & !1], us[i | 1].wrapping_sub(half)));
        }
        for i in (0..nv).rev() {
            cycle.insert(Edge::new(vs[i | 1], vs[(i + 1) & !1].wrapping_sub(half)));
        }

        let graph = &self.graph;
        let matches: Vec<(u32, Edge)> = (0..self.easiness)
            .into_par_iter()
            .filter_map(|nonce| {
                let edge = graph.sipedge(nonce);
                cycle.contains(&edge).then_some((nonce, edge))
            })
            .collect();

        let mut nonces = Vec::with_capacity(proof_size);
        for (nonce, edge) in matches {
            if cycle.remove(&edge) {
                nonces.push(nonce);
            }
        }

        if nonces.len() == proof_size {
            Some(Solution::new(nonces))
        } else {
            log::debug!(
                "Only recovered {} of {} cycle nonces",
                nonces.len(),
                proof_size
            );
            None
        }
    }
}
