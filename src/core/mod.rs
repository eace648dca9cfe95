//! Core ledger functionality
//!
//! Transactions, blocks, proof-of-work sealing and the chain orchestrator that
//! ties them to the memory pool and the UTXO index.

pub mod block;
pub mod chain;
pub mod monetary;
pub mod proof_of_work;
pub mod transaction;

pub use block::Block;
pub use chain::{Chain, ChainIterator};
pub use monetary::{BLOCK_REWARD, GENESIS_OWNER, GENESIS_REWARD, TRANSACTION_VERSION};
pub use proof_of_work::{header_digest, meets_difficulty, ProofOfWork, DIFFICULTY, MAX_NONCE};
pub use transaction::{Spend, TXInput, TXOutput, Transaction};
