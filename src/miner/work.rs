// src/miner/work.rs
//! A unit of work built from one block template
//!
//! Holds everything a job needs: the decoded target, the coinbase and the
//! header prefix that, with a 4-byte header nonce, keys the cuckoo graph.

use crate::miner::block::{self, Coinbase, CoinbaseConfig, HEADER_PREFIX_LEN};
use crate::miner::target::Target;
use crate::network::template::BlockTemplate;
use crate::types::Solution;
use crate::utils::error::MinerError;

/// Work decoded from a template, shared by every job mined on it
#[derive(Debug, Clone)]
pub struct Work {
    height: u64,
    target: Target,
    template: BlockTemplate,
    coinbase: Coinbase,
    header_prefix: Vec<u8>,
}

impl Work {
    /// Builds work from a template
    ///
    /// # Arguments
    /// * `template` - Template returned by the node
    /// * `config` - Payout, extra coinbase script and vote bits
    ///
    /// # Returns
    /// * `Ok(Work)` - Ready to mine
    /// * `Err(MinerError::InputError)` - Bad bits, hashes or hex in the template
    pub fn new(template: BlockTemplate, config: &CoinbaseConfig) -> Result<Self, MinerError> {
        let bits = u32::from_str_radix(&template.bits, 16)?;
        let target = Target::from_compact(bits)?;
        let coinbase = block::build_coinbase(&template, config)?;

        let mut txids = Vec::with_capacity(template.transactions.len() + 1);
        txids.push(coinbase.txid);
        for tx in &template.transactions {
            txids.push(block::display_hash(&tx.hash)?);
        }
        let root = block::merkle_root(&txids);
        let header_prefix = block::header_prefix(&template, &root, &config.vote_bits)?;

        Ok(Self {
            height: template.height,
            target,
            template,
            coinbase,
            header_prefix,
        })
    }

    /// Replaces the decoded target
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    /// Height of the block being mined
    pub fn height(&self) -> u64 {
        self.height
    }

    /// Proof-of-work target
    pub fn target(&self) -> Target {
        self.target
    }

    /// Template this work was built from
    pub fn template(&self) -> &BlockTemplate {
        &self.template
    }

    /// Coinbase transaction
    pub fn coinbase(&self) -> &Coinbase {
        &self.coinbase
    }

    /// Full 80-byte header for a header nonce
    pub fn header(&self, nonce: u32) -> Vec<u8> {
        let mut header = Vec::with_capacity(HEADER_PREFIX_LEN + 4);
        header.extend_from_slice(&self.header_prefix);
        header.extend_from_slice(&nonce.to_le_bytes());
        header
    }

    /// True if the solution hash is at or below the target
    ///
    /// Pure in its inputs: the same solution always gives the same answer.
    pub fn meets_target(&self, solution: &Solution) -> bool {
        self.target.is_met_by(&solution_hash(solution))
    }
}

/// Proof-of-work hash of a solution as a big-endian number
///
/// The double SHA-256 of the solution's wire bytes, byte-reversed.
pub fn solution_hash(solution: &Solution) -> [u8; 32] {
    let mut hash = block::double_sha256(&solution.to_bytes());
    hash.reverse();
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::template::TemplateTransaction;

    fn template() -> BlockTemplate {
        BlockTemplate {
            version: 4,
            previousblockhash: "ab".repeat(32),
            coinbasevalue: 50,
            curtime: 1_600_000_000,
            bits: "1d00ffff".into(),
            height: 1234,
            ..Default::default()
        }
    }

    fn config() -> CoinbaseConfig {
        CoinbaseConfig {
            payout_script: vec![0x51],
            coinbase_script: Vec::new(),
            vote_bits: Vec::new(),
        }
    }

    #[test]
    fn test_work_from_template() {
        let work = Work::new(template(), &config()).unwrap();
        assert_eq!(work.height(), 1234);
        assert_eq!(work.target(), Target::from_compact(0x1d00ffff).unwrap());

        let header = work.header(7);
        assert_eq!(header.len(), 80);
        assert_eq!(&header[76..], &7u32.to_le_bytes());
        // a lone coinbase is its own merkle root
        assert_eq!(&header[36..68], &work.coinbase().txid);
    }

    #[test]
    fn test_vote_bits_reach_header() {
        let mut voting = config();
        voting.vote_bits = vec![1, 3];
        let work = Work::new(template(), &voting).unwrap();
        assert_eq!(&work.header(0)[0..4], &(4u32 | 2 | 8).to_le_bytes());
        // the template itself is left untouched
        assert_eq!(work.template().version, 4);
    }

    #[test]
    fn test_header_nonce_changes_only_tail() {
        let work = Work::new(template(), &config()).unwrap();
        let a = work.header(0);
        let b = work.header(1);
        assert_eq!(a[..76], b[..76]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_transactions_change_merkle_root() {
        let alone = Work::new(template(), &config()).unwrap();
        let mut tpl = template();
        tpl.transactions.push(TemplateTransaction {
            data: "00".into(),
            hash: "cd".repeat(32),
            fee: 0,
        });
        let with_tx = Work::new(tpl, &config()).unwrap();
        assert_ne!(alone.header(0)[36..68], with_tx.header(0)[36..68]);
    }

    #[test]
    fn test_bad_bits_rejected() {
        let mut tpl = template();
        tpl.bits = "1d80ffff".into();
        assert!(matches!(
            Work::new(tpl, &config()),
            Err(MinerError::InputError(_))
        ));
    }

    #[test]
    fn test_meets_target_is_pure() {
        let work = Work::new(template(), &config()).unwrap();
        let solution = Solution::new((0..42).collect());
        let first = work.meets_target(&solution);
        for _ in 0..10 {
            assert_eq!(work.meets_target(&solution), first);
        }
    }

    #[test]
    fn test_meets_target_bounds() {
        let solution = Solution::new(vec![3, 9, 27, 81]);
        let hash = solution_hash(&solution);

        let max = Work::new(template(), &config()).unwrap().with_target(Target::MAX);
        assert!(max.meets_target(&solution));

        let exact = Work::new(template(), &config())
            .unwrap()
            .with_target(Target::from_be_bytes(hash));
        assert!(exact.meets_target(&solution));

        let zero = Work::new(template(), &config())
            .unwrap()
            .with_target(Target::from_be_bytes([0; 32]));
        assert!(!zero.meets_target(&solution));
    }
}
