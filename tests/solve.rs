// tests/solve.rs
//! End-to-end solving on small graphs

use cuckoo_miner_rs::miner::{
    BlockCandidate, CoinbaseConfig, CuckooParams, EventBus, Job, Notification, SolveState,
    Target, Work, Worker, WorkerExit,
};
use cuckoo_miner_rs::network::BlockTemplate;
use cuckoo_miner_rs::stats::MiningCounters;
use cuckoo_miner_rs::types::Solution;
use std::sync::Arc;

const EDGE_BITS: u8 = 8;
const PROOF: usize = 6;
// below the giant component (256 edges), so cycles do not share paths
const EASINESS: u32 = 200;

fn work() -> Arc<Work> {
    let template = BlockTemplate {
        version: 2,
        previousblockhash: "5a".repeat(32),
        coinbasevalue: 5_000,
        curtime: 1_700_000_000,
        bits: "207fffff".into(),
        height: 42,
        ..Default::default()
    };
    let coinbase = CoinbaseConfig {
        payout_script: vec![0x51],
        coinbase_script: b"/test/".to_vec(),
        vote_bits: Vec::new(),
    };
    Arc::new(
        Work::new(template, &coinbase)
            .unwrap()
            .with_target(Target::MAX),
    )
}

fn params() -> CuckooParams {
    CuckooParams::new(EDGE_BITS, PROOF).unwrap()
}

/// Searches the graph of one header nonce with `threads` workers
fn search(
    work: &Arc<Work>,
    header_nonce: u32,
    threads: usize,
    bus: &EventBus,
) -> Option<Solution> {
    let counters = Arc::new(MiningCounters::default());
    let state = SolveState::new(&work.header(header_nonce), params(), EASINESS, threads);
    let job = Job::new(work.clone(), header_nonce, Arc::new(state));

    let handles: Vec<_> = (0..threads)
        .map(|index| {
            let worker = Worker::new(index, job.clone(), bus.clone(), counters.clone());
            std::thread::spawn(move || worker.run())
        })
        .collect();

    handles
        .into_iter()
        .filter_map(|h| match h.join().unwrap() {
            WorkerExit::Solved(solution) => Some(solution),
            _ => None,
        })
        .last()
}

/// Solves graphs keyed by successive header nonces until one yields a proof
fn solve(work: &Arc<Work>, threads: usize, bus: &EventBus) -> (u32, Solution) {
    (0..2000)
        .find_map(|header_nonce| {
            search(work, header_nonce, threads, bus).map(|solution| (header_nonce, solution))
        })
        .unwrap_or_else(|| panic!("no {}-cycle found in 2000 graphs", PROOF))
}

#[test]
fn single_thread_finds_verified_cycle() {
    let work = work();
    let bus = EventBus::new();
    let events = bus.subscribe();
    let (header_nonce, solution) = solve(&work, 1, &bus);

    assert_eq!(solution.len(), PROOF);
    assert!(solution.nonces().windows(2).all(|w| w[0] < w[1]));

    let state = SolveState::new(&work.header(header_nonce), params(), EASINESS, 1);
    assert!(state.graph().verify(solution.nonces(), EASINESS));
    assert!(work.meets_target(&solution));

    let candidate: Arc<BlockCandidate> = events
        .try_iter()
        .find_map(|n| match n {
            Notification::SolutionFound(candidate) => Some(candidate),
            _ => None,
        })
        .expect("solution was not published");
    assert_eq!(candidate.solution, solution);
    assert_eq!(candidate.header_nonce, header_nonce);
}

#[test]
fn tampered_solution_is_rejected() {
    let work = work();
    let (header_nonce, solution) = solve(&work, 1, &EventBus::new());
    let graph = SolveState::new(&work.header(header_nonce), params(), EASINESS, 1)
        .graph()
        .clone();

    let mut nonces = solution.nonces().to_vec();
    let last = nonces.len() - 1;
    nonces[last] = (nonces[last] + 1..EASINESS)
        .find(|n| !solution.nonces().contains(n))
        .unwrap_or(nonces[last] - 1);
    nonces.sort_unstable();
    assert!(!graph.verify(&nonces, EASINESS));

    // same cycle under a different header key
    let other = SolveState::new(&work.header(header_nonce + 1), params(), EASINESS, 1);
    assert!(!other.graph().verify(solution.nonces(), EASINESS));

    assert!(!graph.verify(&solution.nonces()[1..], EASINESS));
}

#[test]
fn thread_count_changes_latency_not_validity() {
    let work = work();
    let (header_nonce, single) = solve(&work, 1, &EventBus::new());
    let graph = SolveState::new(&work.header(header_nonce), params(), EASINESS, 1)
        .graph()
        .clone();

    // same graph, four workers: table races may cost a run its cycle, never
    // its validity
    let found: Vec<Solution> = (0..20)
        .filter_map(|_| search(&work, header_nonce, 4, &EventBus::new()))
        .collect();
    assert!(!found.is_empty(), "4 threads never solved the graph 1 thread solved");
    for solution in &found {
        assert!(graph.verify(solution.nonces(), EASINESS));
        assert!(work.meets_target(solution));
    }
    assert!(graph.verify(single.nonces(), EASINESS));
}

#[test]
fn block_serialises_header_then_proof() {
    let work = work();
    let (header_nonce, solution) = solve(&work, 1, &EventBus::new());
    let candidate = BlockCandidate::new(work.clone(), header_nonce, solution.clone());

    let block = candidate.serialize().unwrap();
    assert_eq!(&block[..80], work.header(header_nonce).as_slice());
    assert_eq!(&block[80..80 + 4 * PROOF], solution.to_bytes().as_slice());
    // one transaction: the coinbase
    assert_eq!(block[80 + 4 * PROOF], 1);
    assert_eq!(&block[80 + 4 * PROOF + 1..], work.coinbase().raw_tx.as_slice());
    assert_eq!(candidate.to_hex().unwrap(), hex::encode(&block));
}
