// src/miner/worker.rs
//! Worker thread implementation
//!
//! Each worker walks its own arithmetic progression of nonces
//! (`index, index + threads, ...`) and inserts the corresponding edges into
//! the job's shared cuckoo table. A closed cycle of the proof size is
//! rebuilt, verified and checked against the target; a hit is published on
//! the event bus and stops every worker of the job.

use crate::miner::algorithm::{MAX_PATH_LEN, SolveState};
use crate::miner::block::BlockCandidate;
use crate::miner::event::{EventBus, Notification};
use crate::miner::work::Work;
use crate::stats::MiningCounters;
use crate::types::Solution;
use crate::utils::error::MinerError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Edges processed between flushes into the shared counters
const EDGE_BATCH: u64 = 1 << 16;

/// One graph search: a work item, the header nonce keying its graph and
/// the table shared by all workers
#[derive(Clone)]
pub struct Job {
    /// Work being mined
    pub work: Arc<Work>,
    /// Header nonce used to key the graph
    pub header_nonce: u32,
    /// Shared cuckoo table
    pub state: Arc<SolveState>,
    stop: Arc<AtomicBool>,
}

impl Job {
    /// Creates a job that has not been stopped
    pub fn new(work: Arc<Work>, header_nonce: u32, state: Arc<SolveState>) -> Self {
        Self {
            work,
            header_nonce,
            state,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Asks every worker of this job to exit
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// True once [`Job::stop`] has been called on any clone
    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

/// Why a worker returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerExit {
    /// Found a verified cycle meeting the target
    Solved(Solution),
    /// The job was stopped
    Stopped,
    /// Every nonce of this worker's progression was tried
    Exhausted,
}

/// Solver for one thread of a job
pub struct Worker {
    index: usize,
    job: Job,
    bus: EventBus,
    counters: Arc<MiningCounters>,
}

impl Worker {
    /// Creates a new Worker instance
    ///
    /// # Arguments
    /// * `index` - Thread index, also the first nonce tried
    /// * `job` - Job shared with the other workers
    /// * `bus` - Where a found solution is published
    /// * `counters` - Shared cycle, solution and error counters
    pub fn new(index: usize, job: Job, bus: EventBus, counters: Arc<MiningCounters>) -> Self {
        Worker {
            index,
            job,
            bus,
            counters,
        }
    }

    /// Runs the search until solved, stopped or out of nonces
    pub fn run(&self) -> WorkerExit {
        log::debug!("Starting solver {}", self.index);
        let state = &self.job.state;
        let easiness = u64::from(state.easiness());
        let stride = state.threads() as u64;

        let mut us = vec![0u32; MAX_PATH_LEN];
        let mut vs = vec![0u32; MAX_PATH_LEN];
        let mut pending = 0u64;
        let mut nonce = self.index as u64;

        let exit = loop {
            if self.job.is_stopped() {
                break WorkerExit::Stopped;
            }
            if nonce >= easiness {
                break WorkerExit::Exhausted;
            }
            let current = nonce as u32;
            nonce += stride;

            match self.insert_edge(state, current, &mut us, &mut vs) {
                Ok(Some(solution)) => break WorkerExit::Solved(solution),
                Ok(None) => {}
                Err(e) => {
                    log::debug!("Solver {} skipping nonce {}: {}", self.index, current, e);
                    self.counters.add_error();
                }
            }

            pending += 1;
            if pending == EDGE_BATCH {
                self.counters.add_edges(pending);
                pending = 0;
            }
        };

        self.counters.add_edges(pending);
        log::debug!("Exiting solver {}: {:?}", self.index, exit);
        exit
    }

    /// Inserts the edge of `nonce`; returns a solution if it closed one
    ///
    /// A path anomaly leaves the table untouched and comes back as
    /// [`MinerError::Cycle`].
    fn insert_edge(
        &self,
        state: &SolveState,
        nonce: u32,
        us: &mut [u32],
        vs: &mut [u32],
    ) -> Result<Option<Solution>, MinerError> {
        let graph = state.graph();
        let u0 = graph.node(nonce, 0);
        let v0 = graph.node(nonce, 1);

        // already in the table the other way round
        if state.get(u0) == v0 || state.get(v0) == u0 {
            return Ok(None);
        }

        let mut nu = state.path(u0, us)?;
        let mut nv = state.path(v0, vs)?;

        if us[nu] == vs[nv] {
            let min = nu.min(nv);
            nu -= min;
            nv -= min;
            while us[nu] != vs[nv] {
                nu += 1;
                nv += 1;
            }
            self.counters.add_cycle();

            if nu + nv + 1 == graph.params().proof_size && !self.job.is_stopped() {
                return Ok(self.try_cycle(state, &us[..=nu], nu, &vs[..=nv], nv));
            }
            return Ok(None);
        }

        if nu < nv {
            while nu > 0 {
                nu -= 1;
                state.set(us[nu + 1], us[nu]);
            }
            state.set(u0, v0);
        } else {
            while nv > 0 {
                nv -= 1;
                state.set(vs[nv + 1], vs[nv]);
            }
            state.set(v0, u0);
        }
        Ok(None)
    }

    /// Rebuilds, verifies and target-checks a closed proof-size cycle
    fn try_cycle(
        &self,
        state: &SolveState,
        us: &[u32],
        nu: usize,
        vs: &[u32],
        nv: usize,
    ) -> Option<Solution> {
        let solution = state.solution(us, nu, vs, nv)?;
        self.counters.add_solution();

        if !state.graph().verify(solution.nonces(), state.easiness()) {
            log::debug!("Solver {} rebuilt a cycle that fails verification", self.index);
            self.counters.add_error();
            return None;
        }

        let work = &self.job.work;
        if !work.meets_target(&solution) {
            log::debug!("Solver {} cycle {} misses the target", self.index, solution);
            self.counters.add_error();
            return None;
        }

        log::info!(
            "Solver {} found a block solution at height {}",
            self.index,
            work.height()
        );
        let candidate = BlockCandidate::new(work.clone(), self.job.header_nonce, solution.clone());
        self.bus.publish(Notification::SolutionFound(Arc::new(candidate)));
        self.job.stop();
        Some(solution)
    }
}
