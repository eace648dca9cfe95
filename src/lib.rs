//! # Ledger Core
//!
//! A single-node UTXO ledger: proof-of-work blocks persisted in sled, an
//! in-memory pool of pending transactions and a derived index of unspent
//! outputs that balances and coin selection are answered from.
//!
//! ## Layout
//! - `core/`: blocks, transactions, proof-of-work and the `Chain` engine
//! - `storage/`: the memory pool and the UTXO index
//! - `service/`: request-layer validation and typed responses
//! - `wallet/`: ECDSA P-256 key pairs kept in a local file
//! - `config/`: settings from `ledger.toml` and `LEDGER_*` variables
//! - `utils/`: hashing, signing and the canonical bincode encoding
//! - `cli/`: command-line arguments for the binary
//!
//! Mining is serialized by one lock per chain; readers never wait on it.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod service;
pub mod storage;
pub mod utils;
pub mod wallet;

#[cfg(test)]
mod test_support;

pub use cli::{Command, Opt};
pub use config::{Settings, GLOBAL_SETTINGS};
pub use crate::core::{
    header_digest, Block, Chain, ChainIterator, ProofOfWork, Spend, TXInput, TXOutput,
    Transaction, BLOCK_REWARD, DIFFICULTY, GENESIS_OWNER, GENESIS_REWARD, MAX_NONCE,
};
pub use error::{LedgerError, Result};
pub use service::{
    BalanceResponse, LedgerService, MineResponse, SubmitResponse, TransactionLookup,
    TransactionStatus,
};
pub use storage::{utxo_key, MemoryPool, UTXOSet};
pub use utils::{current_timestamp, sha256_digest};
pub use wallet::{decode_owner_key, Wallet, Wallets};
