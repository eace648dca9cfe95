//! Key management
//!
//! Generates owner identities and signs transactions on their behalf.

pub mod wallet;
pub mod wallets;

pub use wallet::{decode_owner_key, Wallet};
pub use wallets::Wallets;
