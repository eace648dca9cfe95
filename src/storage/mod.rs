//! Data storage and persistence
//!
//! The memory pool of pending transactions and the durable UTXO index.

pub mod memory_pool;
pub mod utxo_set;

pub use memory_pool::MemoryPool;
pub use utxo_set::{utxo_key, ProjectionReport, RemoveOutcome, UTXOSet};
