use crate::core::Block;
use crate::error::{LedgerError, Result};
use crate::utils::sha256_digest;
use data_encoding::HEXLOWER;
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};

/// Leading zero hex characters required in a block hash.
pub const DIFFICULTY: usize = 3;

/// Exclusive upper bound on the nonce search.
pub const MAX_NONCE: u64 = i32::MAX as u64;

// How many nonces are tried between checks of the cancellation flag
const CANCEL_POLL_INTERVAL: u64 = 1024;

pub struct ProofOfWork<'a> {
    block: &'a Block,
    commitment: Vec<u8>,
    difficulty: usize,
    max_nonce: u64,
}

/// Digest over `(prev_hash, transactions_commitment, timestamp, nonce)`.
pub fn header_digest(pre_block_hash: &str, commitment: &[u8], timestamp: i64, nonce: u64) -> String {
    let mut data_bytes = vec![];
    data_bytes.extend(pre_block_hash.as_bytes());
    data_bytes.extend(commitment);
    data_bytes.extend(timestamp.to_be_bytes());
    data_bytes.extend(nonce.to_be_bytes());
    HEXLOWER.encode(sha256_digest(data_bytes.as_slice()).as_slice())
}

pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}

impl<'a> ProofOfWork<'a> {
    pub fn new_proof_of_work(block: &'a Block) -> Result<ProofOfWork<'a>> {
        Ok(ProofOfWork {
            block,
            commitment: block.transactions_commitment()?,
            difficulty: DIFFICULTY,
            max_nonce: MAX_NONCE,
        })
    }

    pub fn with_difficulty(mut self, difficulty: usize) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_max_nonce(mut self, max_nonce: u64) -> Self {
        self.max_nonce = max_nonce;
        self
    }

    fn prepare_hash(&self, nonce: u64) -> String {
        header_digest(
            self.block.get_pre_block_hash(),
            &self.commitment,
            self.block.get_timestamp(),
            nonce,
        )
    }

    /// Searches nonces from zero for a hash meeting the difficulty.
    ///
    /// CPU-bound and blocking. Returns `Cancelled` once `cancel` is observed set
    /// and `ExhaustedSearch` when no nonce below the ceiling qualifies.
    pub fn run(&self, cancel: &AtomicBool) -> Result<(u64, String)> {
        for nonce in 0..self.max_nonce {
            if nonce % CANCEL_POLL_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
                debug!("Proof-of-work cancelled at nonce {nonce}");
                return Err(LedgerError::Cancelled);
            }
            let hash = self.prepare_hash(nonce);
            if meets_difficulty(&hash, self.difficulty) {
                return Ok((nonce, hash));
            }
        }
        Err(LedgerError::ExhaustedSearch {
            max_nonce: self.max_nonce,
        })
    }

    /// Recomputes the header digest of a sealed block and checks it against
    /// the stored hash and the difficulty.
    pub fn validate(block: &Block) -> Result<bool> {
        let pow = ProofOfWork::new_proof_of_work(block)?;
        let hash = pow.prepare_hash(block.get_nonce());
        Ok(hash == block.get_hash() && meets_difficulty(&hash, pow.difficulty))
    }
}
