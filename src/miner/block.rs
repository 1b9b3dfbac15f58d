// src/miner/block.rs
//! Coinbase, merkle root and header assembly
//!
//! Builds the bytes that key the cuckoo graph and the block submitted once
//! a proof is found.

use crate::miner::work::Work;
use crate::network::template::{BlockTemplate, Masternode};
use crate::types::Solution;
use crate::utils::error::MinerError;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Length of the header without its trailing 4-byte nonce
pub const HEADER_PREFIX_LEN: usize = 76;

/// Special transaction type used for the coinbase extra payload
const COINBASE_TX_TYPE: u32 = 5;

/// Miner-controlled parts of the coinbase and header
#[derive(Debug, Clone, Default)]
pub struct CoinbaseConfig {
    /// Output script receiving the block reward
    pub payout_script: Vec<u8>,
    /// Extra bytes appended to the coinbase input script
    pub coinbase_script: Vec<u8>,
    /// Version bits set in every header mined
    pub vote_bits: Vec<u8>,
}

/// A serialised coinbase transaction
#[derive(Debug, Clone)]
pub struct Coinbase {
    /// Raw transaction bytes
    pub raw_tx: Vec<u8>,
    /// Transaction id (sha256d of `raw_tx`, internal byte order)
    pub txid: [u8; 32],
}

struct TxOutput {
    value: u64,
    script_pubkey: Vec<u8>,
}

/// SHA256(SHA256(data))
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut result = [0u8; 32];
    result.copy_from_slice(&second);
    result
}

/// Builds the coinbase for a template
///
/// Secondary payments are paid out of `coinbasevalue` when the template
/// says they have started. A coinbase payload turns the transaction into a
/// version 3 special transaction carrying that payload.
pub fn build_coinbase(
    template: &BlockTemplate,
    config: &CoinbaseConfig,
) -> Result<Coinbase, MinerError> {
    let mut script_sig = encode_height(template.height);
    script_sig.extend_from_slice(&config.coinbase_script);
    if script_sig.len() < 2 {
        // consensus minimum; small heights encode to a single opcode
        script_sig.push(0x00);
    }
    if script_sig.len() > 100 {
        return Err(MinerError::InputError(format!(
            "coinbase script must be at most 100 bytes, got {}",
            script_sig.len()
        )));
    }

    let payments = if template.masternode_payments_started {
        secondary_outputs(&template.masternode)?
    } else {
        Vec::new()
    };
    let paid: u64 = payments.iter().map(|o| o.value).sum();
    let mut outputs = Vec::with_capacity(payments.len() + 1);
    outputs.push(TxOutput {
        value: template.coinbasevalue.saturating_sub(paid),
        script_pubkey: config.payout_script.clone(),
    });
    outputs.extend(payments);

    let payload = match template.coinbase_payload.as_deref() {
        Some(p) if !p.is_empty() => Some(hex::decode(p)?),
        _ => None,
    };

    let version: u32 = match payload {
        Some(_) => 3 | (COINBASE_TX_TYPE << 16),
        None => 1,
    };

    let mut raw_tx = Vec::with_capacity(128);
    raw_tx.extend_from_slice(&version.to_le_bytes());
    raw_tx.push(0x01);
    raw_tx.extend_from_slice(&[0u8; 32]);
    raw_tx.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
    encode_varint(script_sig.len() as u64, &mut raw_tx);
    raw_tx.extend_from_slice(&script_sig);
    raw_tx.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());

    encode_varint(outputs.len() as u64, &mut raw_tx);
    for output in &outputs {
        raw_tx.extend_from_slice(&output.value.to_le_bytes());
        encode_varint(output.script_pubkey.len() as u64, &mut raw_tx);
        raw_tx.extend_from_slice(&output.script_pubkey);
    }
    raw_tx.extend_from_slice(&0u32.to_le_bytes());

    if let Some(payload) = payload {
        encode_varint(payload.len() as u64, &mut raw_tx);
        raw_tx.extend_from_slice(&payload);
    }

    let txid = double_sha256(&raw_tx);
    Ok(Coinbase { raw_tx, txid })
}

fn secondary_outputs(payments: &[Masternode]) -> Result<Vec<TxOutput>, MinerError> {
    payments
        .iter()
        .map(|m| {
            Ok(TxOutput {
                value: m.amount,
                script_pubkey: hex::decode(&m.script)?,
            })
        })
        .collect()
}

/// Merkle root over transaction ids in internal byte order
pub fn merkle_root(txids: &[[u8; 32]]) -> [u8; 32] {
    if txids.is_empty() {
        return [0u8; 32];
    }

    let mut level = txids.to_vec();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                let right = pair.get(1).unwrap_or(&pair[0]);
                let mut combined = [0u8; 64];
                combined[..32].copy_from_slice(&pair[0]);
                combined[32..].copy_from_slice(right);
                double_sha256(&combined)
            })
            .collect();
    }
    level[0]
}

/// Template version with each vote bit set
pub fn block_version(version: u32, vote_bits: &[u8]) -> Result<u32, MinerError> {
    vote_bits.iter().try_fold(version, |version, &bit| {
        1u32.checked_shl(u32::from(bit))
            .map(|mask| version | mask)
            .ok_or_else(|| MinerError::InputError(format!("vote bit {} out of range", bit)))
    })
}

/// Header bytes up to, not including, the nonce
pub fn header_prefix(
    template: &BlockTemplate,
    merkle_root: &[u8; 32],
    vote_bits: &[u8],
) -> Result<Vec<u8>, MinerError> {
    let bits = u32::from_str_radix(&template.bits, 16)?;
    let version = block_version(template.version, vote_bits)?;

    let mut header = Vec::with_capacity(HEADER_PREFIX_LEN + 4);
    header.extend_from_slice(&version.to_le_bytes());
    header.extend_from_slice(&display_hash(&template.previousblockhash)?);
    header.extend_from_slice(merkle_root);
    header.extend_from_slice(&template.curtime.to_le_bytes());
    header.extend_from_slice(&bits.to_le_bytes());
    Ok(header)
}

/// Decodes a display-order hash into internal byte order
pub fn display_hash(hash: &str) -> Result<[u8; 32], MinerError> {
    let bytes = hex::decode(hash)?;
    let mut out: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
        MinerError::InputError(format!("expected a 32-byte hash, got {} bytes", bytes.len()))
    })?;
    out.reverse();
    Ok(out)
}

/// BIP34 height push: OP_0, OP_1..OP_16 or a minimal little-endian number
fn encode_height(height: u64) -> Vec<u8> {
    match height {
        0 => vec![0x00],
        1..=16 => vec![0x50 + height as u8],
        _ => {
            let mut bytes = Vec::with_capacity(9);
            let mut n = height;
            while n > 0 {
                bytes.push((n & 0xff) as u8);
                n >>= 8;
            }
            if bytes.last().is_some_and(|b| b & 0x80 != 0) {
                bytes.push(0x00);
            }
            let mut script = Vec::with_capacity(bytes.len() + 1);
            script.push(bytes.len() as u8);
            script.extend(bytes);
            script
        }
    }
}

fn encode_varint(value: u64, output: &mut Vec<u8>) {
    if value < 0xfd {
        output.push(value as u8);
    } else if value <= 0xffff {
        output.push(0xfd);
        output.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffff_ffff {
        output.push(0xfe);
        output.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        output.push(0xff);
        output.extend_from_slice(&value.to_le_bytes());
    }
}

/// A solved block waiting to be submitted
#[derive(Debug, Clone)]
pub struct BlockCandidate {
    /// Work the block was built from
    pub work: Arc<Work>,
    /// Header nonce that keyed the solved graph
    pub header_nonce: u32,
    /// The cycle
    pub solution: Solution,
}

impl BlockCandidate {
    /// Bundles a solution with the work and header nonce it belongs to
    pub fn new(work: Arc<Work>, header_nonce: u32, solution: Solution) -> Self {
        Self {
            work,
            header_nonce,
            solution,
        }
    }

    /// Block bytes: header, solution, transaction count, coinbase, transactions
    pub fn serialize(&self) -> Result<Vec<u8>, MinerError> {
        let template = self.work.template();
        let mut block = self.work.header(self.header_nonce);
        block.extend_from_slice(&self.solution.to_bytes());

        encode_varint(1 + template.transactions.len() as u64, &mut block);
        block.extend_from_slice(&self.work.coinbase().raw_tx);
        for tx in &template.transactions {
            block.extend_from_slice(&hex::decode(&tx.data)?);
        }
        Ok(block)
    }

    /// Hex form accepted by `submitblock`
    pub fn to_hex(&self) -> Result<String, MinerError> {
        Ok(hex::encode(self.serialize()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    fn template() -> BlockTemplate {
        BlockTemplate {
            version: 0x20000000,
            previousblockhash: format!("{}01", "00".repeat(31)),
            coinbasevalue: 1_000,
            curtime: 0x01020304,
            bits: "1d00ffff".into(),
            height: 500_000,
            ..Default::default()
        }
    }

    #[test]
    fn test_double_sha256_empty() {
        assert_eq!(
            double_sha256(b""),
            hex!("5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456")
        );
    }

    #[test]
    fn test_encode_height() {
        assert_eq!(encode_height(0), vec![0x00]);
        assert_eq!(encode_height(1), vec![0x51]);
        assert_eq!(encode_height(16), vec![0x60]);
        assert_eq!(encode_height(17), vec![0x01, 0x11]);
        assert_eq!(encode_height(128), vec![0x02, 0x80, 0x00]);
        assert_eq!(encode_height(500_000), vec![0x03, 0x20, 0xa1, 0x07]);
    }

    #[test]
    fn test_encode_varint() {
        let mut out = Vec::new();
        encode_varint(100, &mut out);
        encode_varint(0x1234, &mut out);
        assert_eq!(out, vec![100, 0xfd, 0x34, 0x12]);
    }

    #[test]
    fn test_merkle_root() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        let c = [3u8; 32];
        assert_eq!(merkle_root(&[]), [0u8; 32]);
        assert_eq!(merkle_root(&[a]), a);

        let mut ab = [0u8; 64];
        ab[..32].copy_from_slice(&a);
        ab[32..].copy_from_slice(&b);
        assert_eq!(merkle_root(&[a, b]), double_sha256(&ab));

        // odd levels duplicate the last hash
        let mut cc = [0u8; 64];
        cc[..32].copy_from_slice(&c);
        cc[32..].copy_from_slice(&c);
        let mut top = [0u8; 64];
        top[..32].copy_from_slice(&double_sha256(&ab));
        top[32..].copy_from_slice(&double_sha256(&cc));
        assert_eq!(merkle_root(&[a, b, c]), double_sha256(&top));
    }

    #[test]
    fn test_header_prefix_layout() {
        let header = header_prefix(&template(), &[0xaa; 32], &[]).unwrap();
        assert_eq!(header.len(), HEADER_PREFIX_LEN);
        assert_eq!(&header[0..4], &hex!("00000020"));
        // previous hash is reversed into internal order
        assert_eq!(header[4], 0x01);
        assert!(header[5..36].iter().all(|&b| b == 0));
        assert_eq!(&header[36..68], &[0xaa; 32]);
        assert_eq!(&header[68..72], &hex!("04030201"));
        assert_eq!(&header[72..76], &hex!("ffff001d"));
    }

    #[test]
    fn test_header_prefix_rejects_bad_fields() {
        let mut bad = template();
        bad.bits = "zz".into();
        assert!(matches!(
            header_prefix(&bad, &[0; 32], &[]),
            Err(MinerError::InputError(_))
        ));

        let mut short = template();
        short.previousblockhash = "abcd".into();
        assert!(header_prefix(&short, &[0; 32], &[]).is_err());
    }

    #[test]
    fn test_vote_bits_set_header_version() {
        let header = header_prefix(&template(), &[0; 32], &[0, 4, 28]).unwrap();
        assert_eq!(&header[0..4], &0x3000_0011u32.to_le_bytes());

        // already-set bits stay set
        assert_eq!(block_version(0x2000_0000, &[29]).unwrap(), 0x2000_0000);
        assert!(matches!(
            block_version(1, &[32]),
            Err(MinerError::InputError(_))
        ));
    }

    #[test]
    fn test_coinbase_pays_secondary_outputs() {
        let mut tpl = template();
        tpl.masternode_payments_started = true;
        tpl.masternode = vec![Masternode {
            payee: "mn".into(),
            script: "51".into(),
            amount: 300,
        }];
        let config = CoinbaseConfig {
            payout_script: vec![0x52],
            coinbase_script: b"/cuckoo/".to_vec(),
            vote_bits: Vec::new(),
        };

        let coinbase = build_coinbase(&tpl, &config).unwrap();
        let raw = &coinbase.raw_tx;
        assert_eq!(&raw[0..4], &1u32.to_le_bytes());
        // payout output carries the remainder
        let payout = 700u64.to_le_bytes();
        assert!(raw.windows(8).any(|w| w == payout));
        let secondary = 300u64.to_le_bytes();
        assert!(raw.windows(8).any(|w| w == secondary));
        assert_eq!(coinbase.txid, double_sha256(raw));
    }

    #[test]
    fn test_coinbase_payload_makes_special_tx() {
        let mut tpl = template();
        tpl.coinbase_payload = Some("beef".into());
        let coinbase = build_coinbase(&tpl, &CoinbaseConfig::default()).unwrap();
        assert_eq!(&coinbase.raw_tx[0..4], &hex!("03000500"));
        assert!(coinbase.raw_tx.ends_with(&[0x02, 0xbe, 0xef]));
    }
}
