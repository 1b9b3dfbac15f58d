// src/main.rs
use clap::Parser;
use crossbeam_channel::unbounded;
use cuckoo_miner_rs::miner::{
    CoinbaseConfig, CuckooParams, EventBus, Notification, Scheduler, Target, Work,
};
use cuckoo_miner_rs::network::{BlockTemplate, NodeClient, Poller, submit_candidates};
use cuckoo_miner_rs::utils::logging::init_bench_logging;
use cuckoo_miner_rs::{MinerError, cli, config, stats, utils};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::runtime::Runtime;

/// Main entry point for the cuckoo miner
///
/// # Returns
/// - `Ok(())` on successful execution
/// - `Err(MinerError)` if any operation fails
///
/// # Flow
/// 1. Parses command line arguments
/// 2. Delegates to appropriate subcommand handler
/// 3. Propagates any errors upward
fn main() -> Result<(), MinerError> {
    let cli = cli::Commands::parse();

    match cli.action {
        cli::Action::Start(opts) => start_mining(opts),
        cli::Action::Benchmark(opts) => run_benchmark(opts),
        cli::Action::Config(opts) => generate_config(opts),
    }
}

/// Starts the mining operation with given configuration options
///
/// # Operations
/// 1. Initializes logging
/// 2. Loads and validates configuration
/// 3. Sets up statistics reporting
/// 4. Starts the scheduler on its own thread
/// 5. Runs the poller and block submitter until interrupted or stopped
fn start_mining(opts: cli::StartOptions) -> Result<(), MinerError> {
    utils::init_logging();

    let mut config = config::load(&opts.config)?;
    // Apply CLI overrides
    if let Some(workers) = opts.workers {
        config.worker_threads = workers;
    }
    let params = config.params()?;
    let easiness = config.easiness()?;
    let coinbase = config.node.coinbase_config()?;

    let bus = EventBus::new();
    let (candidate_sender, candidate_receiver) = unbounded();

    // Statistics reporting
    let reporter = stats::StatsReporter::new(config.report_interval());
    let reporter_thread = reporter.start_reporting();

    // Mining setup
    let scheduler = Arc::new(Scheduler::new(
        params,
        easiness,
        config.threads(),
        bus.clone(),
        candidate_sender,
        reporter.counters(),
    )?);
    let scheduler_thread = {
        let scheduler = scheduler.clone();
        std::thread::Builder::new()
            .name("scheduler".into())
            .spawn(move || scheduler.run())?
    };

    let submitter = NodeClient::new(config.node.clone());
    let poller = Poller::new(NodeClient::new(config.node.clone()), bus.clone(), coinbase)
        .with_retry_pause(config.node.retry_pause())
        .with_poll_interval(config.node.poll_interval());

    // Runtime setup
    let rt = Runtime::new()?;
    let result = rt.block_on(async {
        tokio::select! {
            result = poller.run() => result,
            result = submit_candidates(&submitter, candidate_receiver, bus.clone()) => result,
            signal = tokio::signal::ctrl_c() => {
                log::info!("Interrupted, shutting down");
                poller.shutdown();
                bus.publish(Notification::Terminated);
                signal.map_err(MinerError::from)
            }
        }
    });
    rt.shutdown_timeout(Duration::from_secs(2));

    scheduler.stop();
    bus.publish(Notification::Terminated);
    match scheduler_thread.join() {
        Ok(scheduled) => scheduled?,
        Err(_) => log::error!("Scheduler thread panicked"),
    }

    reporter.stop();
    if reporter_thread.join().is_err() {
        log::error!("Stats reporter thread panicked");
    }

    let stats = reporter.get_stats();
    log::info!(
        "Mined {} cycles, {} solutions, accepted {} of {} blocks",
        stats.cycles,
        stats.solutions,
        stats.blocks_accepted,
        stats.blocks_attempted
    );
    result
}

/// Runs solver benchmarks on synthetic work
///
/// # Operations
/// 1. Initializes benchmark-specific logging
/// 2. Builds work with a target every cycle meets
/// 3. Solves graph after graph for the requested duration
/// 4. Reports throughput
fn run_benchmark(opts: cli::BenchmarkOptions) -> Result<(), MinerError> {
    init_bench_logging();

    let params = CuckooParams::new(opts.edge_bits, opts.proof_size)?;
    let curtime = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or_default();
    let template = BlockTemplate {
        version: 1,
        previousblockhash: "00".repeat(32),
        curtime,
        bits: "207fffff".into(),
        height: 1,
        ..Default::default()
    };
    let coinbase = CoinbaseConfig {
        payout_script: vec![0x51],
        coinbase_script: b"benchmark".to_vec(),
        vote_bits: Vec::new(),
    };
    let work = Arc::new(Work::new(template, &coinbase)?.with_target(Target::MAX));

    let reporter = stats::StatsReporter::new(Duration::from_secs(5));
    let reporter_thread = reporter.start_reporting();
    let (candidate_sender, candidates) = unbounded();
    let scheduler = Scheduler::new(
        params,
        params.default_easiness(),
        opts.threads,
        EventBus::new(),
        candidate_sender,
        reporter.counters(),
    )?;
    scheduler.update_work(work.clone());

    log::info!(
        "Starting Cuckoo Cycle benchmark (edge bits {}, proof size {}, {} threads) for {} seconds",
        opts.edge_bits,
        opts.proof_size,
        opts.threads,
        opts.duration
    );

    let start_time = Instant::now();
    let duration = Duration::from_secs(opts.duration);
    let mut graphs = 0u64;
    while start_time.elapsed() < duration {
        scheduler.run_job(work.clone())?;
        graphs += 1;
    }
    let elapsed = start_time.elapsed().as_secs_f64().max(f64::EPSILON);

    reporter.stop();
    if reporter_thread.join().is_err() {
        log::error!("Stats reporter thread panicked");
    }

    // Report final results
    let stats = reporter.get_stats();
    log::info!("Benchmark results:");
    log::info!("Graphs searched: {} ({:.3} graphs/s)", graphs, graphs as f64 / elapsed);
    log::info!(
        "Edges processed: {} ({:.2} Medges/s)",
        stats.edges,
        stats.edges as f64 / elapsed / 1e6
    );
    log::info!(
        "Cycles: {} | Solutions: {} | Errors: {} | Proofs: {}",
        stats.cycles,
        stats.solutions,
        stats.errors,
        candidates.try_iter().count()
    );
    log::logger().flush(); // Ensure final results appear

    Ok(())
}

/// Generates configuration template file
///
/// # Operations
/// 1. Generates template content
/// 2. Writes template to specified output file
fn generate_config(opts: cli::ConfigOptions) -> Result<(), MinerError> {
    let config = config::generate_template();
    std::fs::write(opts.output, config)?;
    Ok(())
}
