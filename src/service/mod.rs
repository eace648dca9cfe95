//! Request layer
//!
//! Validates and routes submissions, queries and mining requests to the chain.

pub mod ledger_service;

pub use ledger_service::{
    status_for, BalanceResponse, BlockSummary, ErrorResponse, LedgerService, MineResponse,
    SubmitResponse, TransactionLookup, TransactionStatus,
};
