// Request-layer facade over the chain, the memory pool and the UTXO index.
// Every operation answers with a typed response instead of an ad-hoc map.

use crate::core::{Chain, TXInput, TXOutput, Transaction};
use crate::error::{LedgerError, Result};
use crate::storage::utxo_key;
use crate::wallet::Wallet;
use data_encoding::HEXLOWER;
use log::info;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitResponse {
    pub txid: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MineResponse {
    pub block_hash: String,
    pub index: u64,
    pub transactions: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceResponse {
    pub owner_key: String,
    pub balance: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Confirmed,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionLookup {
    pub txid: String,
    pub status: TransactionStatus,
    pub transaction: Transaction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockSummary {
    pub index: u64,
    pub hash: String,
    pub prev_hash: String,
    pub timestamp: i64,
    pub nonce: u64,
    pub transactions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub error: String,
}

/// Status a transport would report for each error kind.
pub fn status_for(err: &LedgerError) -> u16 {
    match err {
        LedgerError::NotFound(_) => 404,
        LedgerError::Duplicate(_) | LedgerError::DoubleSpend(_) => 409,
        LedgerError::InvalidTransaction(_) | LedgerError::InsufficientFunds { .. } => 400,
        LedgerError::Cancelled => 503,
        _ => 500,
    }
}

impl From<&LedgerError> for ErrorResponse {
    fn from(err: &LedgerError) -> Self {
        ErrorResponse {
            status: status_for(err),
            error: err.to_string(),
        }
    }
}

pub struct LedgerService {
    chain: Chain,
}

impl LedgerService {
    pub fn new(chain: Chain) -> LedgerService {
        LedgerService { chain }
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Validates `tx` against the confirmed UTXO index and pools it.
    ///
    /// Inputs must exist, belong to the key that signed them, and balance
    /// exactly against outputs plus fee. The UTXO index is not touched until
    /// the transaction is mined.
    pub fn submit_transaction(&self, tx: Transaction) -> Result<SubmitResponse> {
        self.validate(&tx)?;
        let txid = tx.id()?;
        self.chain.pool().submit(tx)?;
        info!("Accepted transaction {txid} into the pool");
        Ok(SubmitResponse {
            txid,
            message: "Transaction added to pool".to_string(),
        })
    }

    fn validate(&self, tx: &Transaction) -> Result<()> {
        if tx.is_coinbase() {
            return Err(LedgerError::InvalidTransaction(
                "submitted transactions must spend at least one output".to_string(),
            ));
        }
        if tx.get_vout().is_empty() {
            return Err(LedgerError::InvalidTransaction(
                "transaction has no outputs".to_string(),
            ));
        }

        tx.verify_signatures()?;

        let mut input_value = 0u64;
        for input in tx.get_vin() {
            let key = utxo_key(input.get_prev_txid(), input.get_output_index());
            let spend = self
                .chain
                .utxo_set()
                .find(input.get_prev_txid(), input.get_output_index())?
                .ok_or_else(|| LedgerError::NotFound(format!("unspent output {key}")))?;
            if !spend.is_owned_by(input.get_pub_key()) {
                return Err(LedgerError::InvalidTransaction(format!(
                    "output {key} is not owned by the signing key"
                )));
            }
            input_value = input_value
                .checked_add(spend.get_value())
                .ok_or_else(|| LedgerError::InvalidTransaction("Input value overflow".to_string()))?;
        }

        let total_spent = tx
            .get_output_value()?
            .checked_add(tx.get_fee())
            .ok_or_else(|| LedgerError::InvalidTransaction("Total spent overflow".to_string()))?;
        if input_value != total_spent {
            return Err(LedgerError::InvalidTransaction(format!(
                "inputs {input_value} do not match outputs plus fee {total_spent}"
            )));
        }
        Ok(())
    }

    /// Builds and signs a payment of `amount` to `receiver`, choosing the
    /// sender's confirmed outputs that no pooled transaction claims yet.
    pub fn create_transaction(
        &self,
        wallet: &Wallet,
        receiver: &[u8],
        amount: u64,
        fee: u64,
    ) -> Result<Transaction> {
        if amount == 0 {
            return Err(LedgerError::InvalidTransaction(
                "Amount must be positive".to_string(),
            ));
        }
        let required = amount
            .checked_add(fee)
            .ok_or_else(|| LedgerError::InvalidTransaction("Amount overflow".to_string()))?;

        let pool = self.chain.pool();
        let (accumulated, chosen) = self.chain.utxo_set().find_spendable_outputs(
            wallet.get_public_key(),
            required,
            |txid, index| !pool.is_output_claimed(txid, index),
        )?;
        if accumulated < required {
            return Err(LedgerError::InsufficientFunds {
                required,
                available: accumulated,
            });
        }

        let inputs = chosen
            .iter()
            .map(|(txid, index, _)| TXInput::new(txid, *index, wallet.get_public_key()))
            .collect();
        let mut outputs = vec![TXOutput::new(amount, receiver)];
        let change = accumulated - required;
        if change > 0 {
            outputs.push(TXOutput::new(change, wallet.get_public_key()));
        }

        let mut tx = Transaction::new(inputs, outputs, fee)?;
        tx.sign(wallet.get_pkcs8())?;
        Ok(tx)
    }

    pub fn send(
        &self,
        wallet: &Wallet,
        receiver: &[u8],
        amount: u64,
        fee: u64,
    ) -> Result<SubmitResponse> {
        let tx = self.create_transaction(wallet, receiver, amount, fee)?;
        self.submit_transaction(tx)
    }

    pub fn mine(&self, miner_key: &[u8]) -> Result<MineResponse> {
        let block = self.chain.mine_from_pool(miner_key)?;
        Ok(MineResponse {
            block_hash: block.get_hash().to_string(),
            index: block.get_index(),
            transactions: block.get_transactions().len(),
            message: "Block mined successfully".to_string(),
        })
    }

    pub fn balance(&self, owner_key: &[u8]) -> Result<BalanceResponse> {
        Ok(BalanceResponse {
            owner_key: HEXLOWER.encode(owner_key),
            balance: self.chain.balance(owner_key)?,
        })
    }

    /// Confirmed history first, then the pool.
    pub fn find_transaction(&self, txid: &str) -> Result<TransactionLookup> {
        match self.chain.find_transaction(txid) {
            Ok(transaction) => Ok(TransactionLookup {
                txid: txid.to_string(),
                status: TransactionStatus::Confirmed,
                transaction,
            }),
            Err(e) if e.is_not_found() => match self.chain.pool().find(txid)? {
                Some(transaction) => Ok(TransactionLookup {
                    txid: txid.to_string(),
                    status: TransactionStatus::Pending,
                    transaction,
                }),
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    pub fn chain_summary(&self) -> Result<Vec<BlockSummary>> {
        let mut summaries = vec![];
        for block in self.chain.iter()? {
            let block = block?;
            let transactions = block
                .get_transactions()
                .iter()
                .map(|tx| tx.id())
                .collect::<Result<Vec<_>>>()?;
            summaries.push(BlockSummary {
                index: block.get_index(),
                hash: block.get_hash().to_string(),
                prev_hash: block.get_pre_block_hash().to_string(),
                timestamp: block.get_timestamp(),
                nonce: block.get_nonce(),
                transactions,
            });
        }
        Ok(summaries)
    }
}
