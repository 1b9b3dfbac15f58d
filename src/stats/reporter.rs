// src/stats/reporter.rs
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use sysinfo::{Components, System};

/// Snapshot of the mining counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MiningStats {
    /// Edges inserted into cuckoo tables
    pub edges: u64,
    /// Cycles closed, of any length
    pub cycles: u64,
    /// Proof-size cycles reconstructed from the graph
    pub solutions: u64,
    /// Anomalies and candidates that failed verification or target
    pub errors: u64,
    /// Blocks submitted
    pub blocks_attempted: u64,
    /// Blocks the node accepted
    pub blocks_accepted: u64,
    /// Time since the counters were created
    pub elapsed: Duration,
}

/// Statistics related to hardware performance
#[derive(Debug, Clone)]
pub struct HardwareStats {
    /// Current CPU usage percentage (0-100)
    pub cpu_usage: f32,
    /// Memory currently used (in bytes)
    pub memory_used: u64,
    /// Current CPU temperature in Celsius
    pub temperature: f32,
}

/// Change in counters over one report interval
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalReport {
    /// Cycles closed in the interval
    pub cycles: u64,
    /// Solutions reconstructed in the interval
    pub solutions: u64,
    /// Errors in the interval
    pub errors: u64,
    /// Edges inserted in the interval
    pub edges: u64,
    /// Cycle rate in thousands per second
    pub kilocycles_per_sec: f64,
}

impl IntervalReport {
    /// Difference between two snapshots taken `interval` apart
    pub fn between(previous: &MiningStats, current: &MiningStats, interval: Duration) -> Self {
        let cycles = current.cycles.saturating_sub(previous.cycles);
        let millis = interval.as_millis().max(1) as f64;
        IntervalReport {
            cycles,
            solutions: current.solutions.saturating_sub(previous.solutions),
            errors: current.errors.saturating_sub(previous.errors),
            edges: current.edges.saturating_sub(previous.edges),
            kilocycles_per_sec: cycles as f64 / millis,
        }
    }
}

/// Counters shared by workers, the coordinator and the reporter
#[derive(Debug)]
pub struct MiningCounters {
    edges: AtomicU64,
    cycles: AtomicU64,
    solutions: AtomicU64,
    errors: AtomicU64,
    attempted: AtomicU64,
    accepted: AtomicU64,
    start_time: Instant,
}

impl Default for MiningCounters {
    fn default() -> Self {
        MiningCounters {
            edges: AtomicU64::new(0),
            cycles: AtomicU64::new(0),
            solutions: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            attempted: AtomicU64::new(0),
            accepted: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }
}

impl MiningCounters {
    /// Adds a batch of processed edges
    pub fn add_edges(&self, count: u64) {
        self.edges.fetch_add(count, Ordering::Relaxed);
    }

    /// Counts one closed cycle
    pub fn add_cycle(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one reconstructed solution
    pub fn add_solution(&self) {
        self.solutions.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one anomaly or rejected candidate
    pub fn add_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Tallies a block the node accepted
    ///
    /// # Returns
    /// `(accepted, attempted)` after the update
    pub fn record_accepted(&self) -> (u64, u64) {
        let accepted = self.accepted.fetch_add(1, Ordering::Relaxed) + 1;
        let attempted = self.attempted.fetch_add(1, Ordering::Relaxed) + 1;
        (accepted, attempted)
    }

    /// Tallies a block the node rejected
    ///
    /// # Returns
    /// Attempts after the update
    pub fn record_rejected(&self) -> u64 {
        self.attempted.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Current values of every counter
    pub fn snapshot(&self) -> MiningStats {
        MiningStats {
            edges: self.edges.load(Ordering::Relaxed),
            cycles: self.cycles.load(Ordering::Relaxed),
            solutions: self.solutions.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            blocks_attempted: self.attempted.load(Ordering::Relaxed),
            blocks_accepted: self.accepted.load(Ordering::Relaxed),
            elapsed: self.start_time.elapsed(),
        }
    }
}

/// Collects and reports mining and hardware statistics
pub struct StatsReporter {
    /// Counters updated by the mining threads
    counters: Arc<MiningCounters>,
    /// System information collector
    system: System,
    /// Hardware component information collector
    components: Components,
    /// Interval at which stats are reported
    report_interval: Duration,
    /// Wakes the reporting thread for shutdown
    shutdown_tx: Sender<()>,
    shutdown_rx: Receiver<()>,
}

impl Clone for StatsReporter {
    fn clone(&self) -> Self {
        StatsReporter {
            counters: self.counters.clone(),
            system: System::new_all(),
            components: Components::new_with_refreshed_list(),
            report_interval: self.report_interval,
            shutdown_tx: self.shutdown_tx.clone(),
            shutdown_rx: self.shutdown_rx.clone(),
        }
    }
}

impl StatsReporter {
    /// Creates a new StatsReporter with the specified reporting interval
    ///
    /// # Arguments
    /// * `report_interval` - How often to log statistics
    pub fn new(report_interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        StatsReporter {
            counters: Arc::new(MiningCounters::default()),
            system: System::new_all(),
            components: Components::new_with_refreshed_list(),
            report_interval,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Counters to hand to the coordinator and workers
    pub fn counters(&self) -> Arc<MiningCounters> {
        self.counters.clone()
    }

    /// Gets the current mining statistics
    pub fn get_stats(&self) -> MiningStats {
        self.counters.snapshot()
    }

    /// Gets the current hardware statistics
    ///
    /// This refreshes system information before returning the stats.
    pub fn get_hardware_stats(&mut self) -> HardwareStats {
        self.system.refresh_cpu_all();
        self.system.refresh_memory();
        self.components.refresh(true);

        let cpus = self.system.cpus();
        let cpu_usage = cpus.iter().map(|c| c.cpu_usage()).sum::<f32>() / cpus.len().max(1) as f32;

        let temperature = self
            .components
            .iter()
            .find(|c| c.label().contains("CPU"))
            .and_then(|c| c.temperature())
            .unwrap_or(0.0);

        HardwareStats {
            cpu_usage,
            memory_used: self.system.used_memory(),
            temperature,
        }
    }

    /// Starts the periodic reporting of statistics
    ///
    /// Spawns a background thread that logs the counters' change over each
    /// interval until [`StatsReporter::stop`] is called.
    pub fn start_reporting(&self) -> std::thread::JoinHandle<()> {
        let mut reporter = self.clone();

        std::thread::spawn(move || {
            let mut previous = reporter.get_stats();
            let mut last = Instant::now();

            loop {
                match reporter.shutdown_rx.recv_timeout(reporter.report_interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }

                let current = reporter.get_stats();
                let report = IntervalReport::between(&previous, &current, last.elapsed());
                let hw_stats = reporter.get_hardware_stats();

                log::info!(
                    "{} cycles, {} solutions, {} errors, {:.2} kilocycles/sec | Accepted: {}/{} | CPU: {:.1}%",
                    report.cycles,
                    report.solutions,
                    report.errors,
                    report.kilocycles_per_sec,
                    current.blocks_accepted,
                    current.blocks_attempted,
                    hw_stats.cpu_usage
                );
                log::debug!(
                    "{} edges | Mem: {} MiB | Temp: {:.1}°C",
                    report.edges,
                    hw_stats.memory_used / (1024 * 1024),
                    hw_stats.temperature
                );

                previous = current;
                last = Instant::now();
            }
            log::debug!("Stats reporter stopped");
        })
    }

    /// Stops the reporting thread started by [`StatsReporter::start_reporting`]
    pub fn stop(&self) {
        let _ = self.shutdown_tx.try_send(());
    }
}
