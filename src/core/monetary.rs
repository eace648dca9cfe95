//! Monetary constants for the ledger.
//!
//! Amounts are plain non-negative integers; there is no sub-unit.

/// Reward carried by the coinbase of every mined block.
pub const BLOCK_REWARD: u64 = 50;

/// Value of the single output in the genesis transaction.
pub const GENESIS_REWARD: u64 = 100;

/// Placeholder owner of the genesis output. Nobody holds a key for it.
pub const GENESIS_OWNER: &[u8] = b"genesis-reward";

/// Version tag written into every transaction this node builds.
pub const TRANSACTION_VERSION: u32 = 1;
