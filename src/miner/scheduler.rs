// src/miner/scheduler.rs
//! Mining job scheduler implementation
//!
//! Runs one job at a time on the current work: builds a fresh cuckoo table,
//! starts one worker thread per configured thread, handles events while they
//! run and joins them all before the next job starts. Two jobs never share
//! threads or tables.

use crate::miner::algorithm::{CuckooParams, SolveState};
use crate::miner::block::BlockCandidate;
use crate::miner::event::{EventBus, Notification};
use crate::miner::work::Work;
use crate::miner::worker::{Job, Worker, WorkerExit};
use crate::stats::MiningCounters;
use crate::types::Solution;
use crate::utils::error::MinerError;
use arc_swap::ArcSwapOption;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

/// How often a running job re-checks its threads between events
const SUPERVISE_TICK: Duration = Duration::from_millis(100);

/// How long an idle scheduler waits for work before re-checking `active`
const IDLE_WAIT: Duration = Duration::from_millis(500);

/// Coordinates mining jobs across worker threads
pub struct Scheduler {
    params: CuckooParams,
    easiness: u32,
    threads: usize,
    /// Work being mined (atomically swappable)
    current_work: ArcSwapOption<Work>,
    /// Header nonce of the next job; reset on new work
    generation: AtomicU32,
    bus: EventBus,
    events: Receiver<Notification>,
    /// Found blocks waiting for submission
    submissions: Sender<Arc<BlockCandidate>>,
    counters: Arc<MiningCounters>,
    /// Flag to control the job loop
    active: AtomicBool,
}

impl Scheduler {
    /// Creates a new Scheduler and subscribes it to the bus
    ///
    /// # Arguments
    /// * `params` - Graph size and proof size
    /// * `easiness` - Nonce range searched per job
    /// * `threads` - Worker threads per job, at least 1
    /// * `bus` - Event bus shared with the poller and submitter
    /// * `submissions` - Channel receiving found blocks
    /// * `counters` - Shared statistics counters
    pub fn new(
        params: CuckooParams,
        easiness: u32,
        threads: usize,
        bus: EventBus,
        submissions: Sender<Arc<BlockCandidate>>,
        counters: Arc<MiningCounters>,
    ) -> Result<Self, MinerError> {
        if threads < 1 {
            return Err(MinerError::ConfigError(format!(
                "Invalid number of threads: {}",
                threads
            )));
        }
        let easiness = params.check_easiness(easiness)?;
        let events = bus.subscribe();

        Ok(Scheduler {
            params,
            easiness,
            threads,
            current_work: ArcSwapOption::empty(),
            generation: AtomicU32::new(0),
            bus,
            events,
            submissions,
            counters,
            active: AtomicBool::new(true),
        })
    }

    /// Replaces the current work and restarts header nonces from zero
    pub fn update_work(&self, work: Arc<Work>) {
        self.current_work.store(Some(work));
        self.generation.store(0, Ordering::SeqCst);
    }

    /// Work being mined, if any
    pub fn current_work(&self) -> Option<Arc<Work>> {
        self.current_work.load_full()
    }

    /// False once halted by [`Scheduler::stop`] or a fatal event
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Halts the job loop; running workers finish their current job
    pub fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    /// Runs jobs until halted
    ///
    /// Blocks the calling thread. Each job keys a new graph with the next
    /// header nonce, so an exhausted graph is followed by a fresh one. Once
    /// a work item is solved the scheduler idles until new work replaces it.
    pub fn run(&self) -> Result<(), MinerError> {
        log::info!(
            "Using {} threads, edge bits {}, proof size {}, easiness {}",
            self.threads,
            self.params.edge_bits,
            self.params.proof_size,
            self.easiness
        );

        let mut solved: Option<Arc<Work>> = None;
        while self.is_active() {
            self.drain_events(None);
            if !self.is_active() {
                break;
            }

            let work = match self.current_work() {
                Some(work) if !solved.as_ref().is_some_and(|s| Arc::ptr_eq(s, &work)) => work,
                _ => {
                    self.idle()?;
                    continue;
                }
            };

            if self.run_job(work.clone())?.is_some() {
                log::info!("Height {} solved, waiting for new work", work.height());
                solved = Some(work);
            }
        }

        log::info!("Scheduler stopped");
        Ok(())
    }

    /// Waits for one event while there is nothing to mine
    fn idle(&self) -> Result<(), MinerError> {
        match self.events.recv_timeout(IDLE_WAIT) {
            Ok(notification) => self.handle(notification, None),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                return Err(MinerError::ChannelError("event bus closed".into()));
            }
        }
        Ok(())
    }

    /// Mines one graph of `work` with every thread and waits for them all
    ///
    /// # Returns
    /// * `Ok(Some(solution))` - A worker found a cycle meeting the target
    /// * `Ok(None)` - The graph was exhausted or the job was stopped
    /// * `Err(MinerError)` - A worker thread could not be spawned
    pub fn run_job(&self, work: Arc<Work>) -> Result<Option<Solution>, MinerError> {
        let header_nonce = self.generation.fetch_add(1, Ordering::SeqCst);
        let header = work.header(header_nonce);
        let state = SolveState::new(&header, self.params, self.easiness, self.threads);
        let job = Job::new(work.clone(), header_nonce, Arc::new(state));

        log::debug!(
            "Starting {} solvers at height {}, header nonce {}, target {}",
            self.threads,
            work.height(),
            header_nonce,
            work.target()
        );

        let mut handles: Vec<JoinHandle<WorkerExit>> = Vec::with_capacity(self.threads);
        for index in 0..self.threads {
            let worker = Worker::new(index, job.clone(), self.bus.clone(), self.counters.clone());
            let spawned = std::thread::Builder::new()
                .name(format!("solver-{}", index))
                .spawn(move || worker.run());

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    job.stop();
                    Self::join_all(handles);
                    return Err(e.into());
                }
            }
        }

        while !handles.iter().all(|h| h.is_finished()) {
            match self.events.recv_timeout(SUPERVISE_TICK) {
                Ok(notification) => self.handle(notification, Some(&job)),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    job.stop();
                    break;
                }
            }
        }

        let solution = Self::join_all(handles);
        // forward anything published while the last workers exited
        self.drain_events(None);
        Ok(solution)
    }

    /// Joins every worker; a panicked thread is logged and skipped
    fn join_all(handles: Vec<JoinHandle<WorkerExit>>) -> Option<Solution> {
        let mut solution = None;
        for handle in handles {
            match handle.join() {
                Ok(WorkerExit::Solved(found)) => solution = Some(found),
                Ok(_) => {}
                Err(_) => log::warn!("Solver thread panicked"),
            }
        }
        solution
    }

    fn drain_events(&self, job: Option<&Job>) {
        while let Ok(notification) = self.events.try_recv() {
            self.handle(notification, job);
        }
    }

    /// Reacts to one event
    ///
    /// # Arguments
    /// * `notification` - The event
    /// * `job` - The running job, stopped on new work or fatal events
    pub fn handle(&self, notification: Notification, job: Option<&Job>) {
        match notification {
            Notification::NewWork(work) => {
                log::info!("New work at height {}, target {}", work.height(), work.target());
                self.update_work(work);
                if let Some(job) = job {
                    job.stop();
                }
            }
            Notification::SolutionFound(candidate) => {
                log::info!(
                    "Submitting block at height {} with cycle {}",
                    candidate.work.height(),
                    candidate.solution
                );
                if let Err(e) = self.submissions.send(candidate).map_err(MinerError::from) {
                    log::error!("{}", e);
                }
            }
            Notification::PowTrue => {
                let (accepted, attempted) = self.counters.record_accepted();
                log::info!("Accepted block {} of {}", accepted, attempted);
            }
            Notification::PowFalse => {
                let attempted = self.counters.record_rejected();
                log::warn!("Rejected block attempt {}", attempted);
            }
            Notification::ConnectionError => log::warn!("Connection error, retrying"),
            Notification::CommunicationError => log::warn!("Communication error"),
            Notification::LongPollingFailed => log::warn!("Long polling failed"),
            Notification::LongPollingEnabled => log::info!("Long polling activated"),
            Notification::NewBlockDetected => log::debug!("Long poll detected new block"),
            fatal => {
                match fatal {
                    Notification::AuthenticationError => {
                        log::error!("Invalid RPC username or password")
                    }
                    Notification::PermissionError => log::error!("Permission error"),
                    Notification::SystemError => log::error!("System error"),
                    _ => log::info!("Work source terminated, exiting"),
                }
                self.stop();
                if let Some(job) = job {
                    job.stop();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::miner::block::CoinbaseConfig;
    use crate::miner::target::Target;
    use crate::network::template::BlockTemplate;

    fn work(height: u64) -> Arc<Work> {
        let template = BlockTemplate {
            version: 1,
            previousblockhash: "00".repeat(32),
            coinbasevalue: 1,
            curtime: 0,
            bits: "207fffff".into(),
            height,
            ..Default::default()
        };
        let config = CoinbaseConfig {
            payout_script: vec![0x51],
            coinbase_script: Vec::new(),
            vote_bits: Vec::new(),
        };
        Arc::new(Work::new(template, &config).unwrap().with_target(Target::MAX))
    }

    fn scheduler(threads: usize) -> (Scheduler, EventBus, Receiver<Arc<BlockCandidate>>) {
        let bus = EventBus::new();
        let (tx, rx) = crossbeam_channel::unbounded();
        let params = CuckooParams::new(8, 6).unwrap();
        let scheduler = Scheduler::new(
            params,
            512,
            threads,
            bus.clone(),
            tx,
            Arc::new(MiningCounters::default()),
        )
        .unwrap();
        (scheduler, bus, rx)
    }

    #[test]
    fn test_rejects_zero_threads() {
        let (tx, _rx) = crossbeam_channel::unbounded();
        let result = Scheduler::new(
            CuckooParams::default(),
            1,
            0,
            EventBus::new(),
            tx,
            Arc::new(MiningCounters::default()),
        );
        assert!(matches!(result, Err(MinerError::ConfigError(_))));
    }

    #[test]
    fn test_rejects_bad_easiness() {
        let (tx, _rx) = crossbeam_channel::unbounded();
        let result = Scheduler::new(
            CuckooParams::new(8, 6).unwrap(),
            513,
            1,
            EventBus::new(),
            tx,
            Arc::new(MiningCounters::default()),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_new_work_resets_generation_and_stops_job() {
        let (scheduler, _bus, _rx) = scheduler(1);
        scheduler.generation.store(9, Ordering::SeqCst);

        let old = work(1);
        let state = SolveState::new(&old.header(0), scheduler.params, 512, 1);
        let job = Job::new(old, 0, Arc::new(state));

        scheduler.handle(Notification::NewWork(work(2)), Some(&job));
        assert!(job.is_stopped());
        assert_eq!(scheduler.generation.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.current_work().unwrap().height(), 2);
        assert!(scheduler.is_active());
    }

    #[test]
    fn test_fatal_events_halt() {
        for fatal in [
            Notification::AuthenticationError,
            Notification::PermissionError,
            Notification::SystemError,
            Notification::Terminated,
        ] {
            let (scheduler, _bus, _rx) = scheduler(1);
            scheduler.handle(fatal, None);
            assert!(!scheduler.is_active());
        }

        let (scheduler, _bus, _rx) = scheduler(1);
        scheduler.handle(Notification::ConnectionError, None);
        scheduler.handle(Notification::LongPollingFailed, None);
        assert!(scheduler.is_active());
    }

    #[test]
    fn test_submission_results_are_tallied() {
        let (scheduler, _bus, _rx) = scheduler(1);
        scheduler.handle(Notification::PowTrue, None);
        scheduler.handle(Notification::PowFalse, None);
        let stats = scheduler.counters.snapshot();
        assert_eq!(stats.blocks_accepted, 1);
        assert_eq!(stats.blocks_attempted, 2);
    }

    #[test]
    fn test_run_job_forwards_solution() {
        let (scheduler, _bus, rx) = scheduler(2);
        let work = work(7);
        scheduler.update_work(work.clone());

        let solution = (0..500)
            .find_map(|_| scheduler.run_job(work.clone()).unwrap())
            .expect("no 6-cycle in 500 graphs");

        // both threads may finish a cycle before seeing the stop flag
        let candidates: Vec<_> = rx.try_iter().collect();
        assert!(candidates.iter().any(|c| c.solution == solution));
        for candidate in candidates {
            let header = work.header(candidate.header_nonce);
            let graph = crate::miner::algorithm::Graph::new(&header, scheduler.params);
            assert!(graph.verify(candidate.solution.nonces(), 512));
        }
    }

    #[test]
    fn test_run_idles_after_solving_until_new_work() {
        let (scheduler, bus, rx) = scheduler(1);
        let scheduler = Arc::new(scheduler);
        bus.publish(Notification::NewWork(work(3)));

        let running = scheduler.clone();
        let handle = std::thread::spawn(move || running.run());

        let first = rx
            .recv_timeout(Duration::from_secs(10))
            .expect("height 3 never solved");
        assert_eq!(first.work.height(), 3);
        // one solution per height: no more graphs are searched for it
        std::thread::sleep(Duration::from_millis(500));
        assert!(rx.try_recv().is_err());

        bus.publish(Notification::NewWork(work(4)));
        let second = rx
            .recv_timeout(Duration::from_secs(10))
            .expect("height 4 never solved");
        assert_eq!(second.work.height(), 4);

        scheduler.stop();
        assert!(handle.join().unwrap().is_ok());
    }

    #[test]
    fn test_run_returns_after_terminated() {
        let (scheduler, bus, _rx) = scheduler(1);
        bus.publish(Notification::Terminated);
        assert!(scheduler.run().is_ok());
        assert!(!scheduler.is_active());
    }
}
