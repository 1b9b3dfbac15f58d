// src/utils/logging.rs
//! Logging configuration
//!
//! Sets up `env_logger` for the miner. Solver threads are named
//! `solver-N`, so the thread name is part of every line.

use env_logger::{Builder, Target};
use log::LevelFilter;
use std::env;

/// Initializes logging for mining runs
///
/// Info by default, overridden by `RUST_LOG` when set.
pub fn init_logging() {
    init_with_default(LevelFilter::Info);
}

/// Initializes logging for benchmarks
///
/// Debug by default so per-job solver exits are visible.
pub fn init_bench_logging() {
    init_with_default(LevelFilter::Debug);
}

fn init_with_default(level: LevelFilter) {
    let mut builder = base_builder();
    match env::var("RUST_LOG") {
        Ok(filters) => builder.parse_filters(&filters),
        Err(_) => builder.filter_level(level),
    };

    // A second init (tests, embedding) keeps the first logger.
    let _ = builder.try_init();
}

/// Line format: `[ts level thread module:line] message`
fn base_builder() -> Builder {
    let mut builder = Builder::new();

    builder
        .format(|buf, record| {
            use std::io::Write;
            let ts = buf.timestamp_seconds();
            let thread = std::thread::current();
            writeln!(
                buf,
                "[{} {} {} {}:{}] {}",
                ts,
                record.level(),
                thread.name().unwrap_or("-"),
                record.module_path().unwrap_or_default(),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(Target::Stdout);

    builder
}
