use crate::core::Transaction;
use crate::error::{LedgerError, Result};
use crate::utils::{deserialize, serialize, sha256_digest};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Block {
    index: u64,
    timestamp: i64,
    transactions: Vec<Transaction>,
    pre_block_hash: String, // Empty for genesis
    hash: String,
    nonce: u64,
}

impl Block {
    /// An unsealed block: `hash` stays empty until proof-of-work fills it in.
    pub fn new_candidate(
        index: u64,
        timestamp: i64,
        transactions: Vec<Transaction>,
        pre_block_hash: String,
    ) -> Result<Block> {
        if transactions.is_empty() {
            return Err(LedgerError::InvalidBlock(
                "Block must contain at least one transaction".to_string(),
            ));
        }

        Ok(Block {
            index,
            timestamp,
            transactions,
            pre_block_hash,
            hash: String::new(),
            nonce: 0,
        })
    }

    pub fn genesis_candidate(timestamp: i64) -> Block {
        Block {
            index: 0,
            timestamp,
            transactions: vec![Transaction::genesis()],
            pre_block_hash: String::new(),
            hash: String::new(),
            nonce: 0,
        }
    }

    /// Returns the block with the found hash and nonce attached.
    pub fn with_seal(mut self, hash: String, nonce: u64) -> Block {
        self.hash = hash;
        self.nonce = nonce;
        self
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Block> {
        deserialize::<Block>(bytes)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    // Flat commitment: SHA-256 over every transaction's canonical encoding in block order.
    // It only detects tampering with the whole list and gives no inclusion proofs;
    // replacing it with a Merkle root only has to touch this function.
    pub fn transactions_commitment(&self) -> Result<Vec<u8>> {
        let mut all = vec![];
        for transaction in &self.transactions {
            all.extend(transaction.serialize()?);
        }
        Ok(sha256_digest(all.as_slice()))
    }

    pub fn is_genesis(&self) -> bool {
        self.pre_block_hash.is_empty()
    }

    pub fn is_sealed(&self) -> bool {
        !self.hash.is_empty()
    }

    pub fn get_index(&self) -> u64 {
        self.index
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_pre_block_hash(&self) -> &str {
        self.pre_block_hash.as_str()
    }

    pub fn get_hash(&self) -> &str {
        self.hash.as_str()
    }

    pub fn get_nonce(&self) -> u64 {
        self.nonce
    }
}
