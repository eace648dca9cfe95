//! Error handling for the ledger
//!
//! One error type covers every engine operation. Storage and encoding failures
//! always propagate; `NotFound` is the only kind a caller may choose to tolerate.

use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Missing block, UTXO entry or transaction
    NotFound(String),
    /// Transaction already present in the memory pool
    Duplicate(String),
    /// Corrupted or unencodable bytes
    Encoding(String),
    /// Proof-of-work search ran out of nonces
    ExhaustedSearch { max_nonce: u64 },
    /// Mining attempt aborted by the caller
    Cancelled,
    /// Underlying durable store failure
    Store(String),
    /// Request-layer spend exceeds the sender's funds
    InsufficientFunds { required: u64, available: u64 },
    /// Output already claimed by another transaction
    DoubleSpend(String),
    InvalidTransaction(String),
    InvalidBlock(String),
    Crypto(String),
    Config(String),
    Io(String),
    /// Block is committed but its UTXO effects were not applied
    Projection { block_hash: String, reason: String },
    LockPoisoned(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::NotFound(what) => write!(f, "Not found: {what}"),
            LedgerError::Duplicate(what) => write!(f, "Duplicate: {what}"),
            LedgerError::Encoding(msg) => write!(f, "Encoding error: {msg}"),
            LedgerError::ExhaustedSearch { max_nonce } => {
                write!(f, "Proof-of-work exhausted nonce space below {max_nonce}")
            }
            LedgerError::Cancelled => write!(f, "Mining attempt cancelled"),
            LedgerError::Store(msg) => write!(f, "Store error: {msg}"),
            LedgerError::InsufficientFunds {
                required,
                available,
            } => {
                write!(
                    f,
                    "Insufficient funds: required {required}, available {available}"
                )
            }
            LedgerError::DoubleSpend(what) => write!(f, "Double spend: {what}"),
            LedgerError::InvalidTransaction(msg) => write!(f, "Invalid transaction: {msg}"),
            LedgerError::InvalidBlock(msg) => write!(f, "Invalid block: {msg}"),
            LedgerError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
            LedgerError::Config(msg) => write!(f, "Configuration error: {msg}"),
            LedgerError::Io(msg) => write!(f, "I/O error: {msg}"),
            LedgerError::Projection { block_hash, reason } => write!(
                f,
                "Block {block_hash} committed but UTXO projection failed: {reason}"
            ),
            LedgerError::LockPoisoned(what) => write!(f, "Lock poisoned: {what}"),
        }
    }
}

impl std::error::Error for LedgerError {}

impl LedgerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::NotFound(_))
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Io(err.to_string())
    }
}

impl From<sled::Error> for LedgerError {
    fn from(err: sled::Error) -> Self {
        LedgerError::Store(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for LedgerError {
    fn from(err: bincode::error::EncodeError) -> Self {
        LedgerError::Encoding(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for LedgerError {
    fn from(err: bincode::error::DecodeError) -> Self {
        LedgerError::Encoding(err.to_string())
    }
}

impl From<toml::de::Error> for LedgerError {
    fn from(err: toml::de::Error) -> Self {
        LedgerError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Encoding(err.to_string())
    }
}
