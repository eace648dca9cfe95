//! Helpers shared by the unit tests

use crate::core::{Chain, TXInput, TXOutput, Transaction};
use crate::error::{LedgerError, Result};
use crate::wallet::Wallet;
use tempfile::TempDir;

/// A freshly initialised chain in its own temporary directory.
///
/// Keep the `TempDir` alive for as long as the chain is used.
pub fn create_test_chain() -> Result<(Chain, TempDir)> {
    let temp_dir = tempfile::tempdir().map_err(|e| LedgerError::Io(e.to_string()))?;
    let chain = Chain::initialize(temp_dir.path().join("chain"))?;
    Ok((chain, temp_dir))
}

/// A signed transaction from `wallet` spending one output to `receiver`,
/// returning any remainder to the wallet.
pub fn signed_spend(
    wallet: &Wallet,
    prev_txid: &str,
    output_index: u32,
    input_value: u64,
    receiver: &[u8],
    amount: u64,
    fee: u64,
) -> Result<Transaction> {
    let mut outputs = vec![TXOutput::new(amount, receiver)];
    let change = input_value
        .checked_sub(amount)
        .and_then(|rest| rest.checked_sub(fee))
        .ok_or_else(|| {
            LedgerError::InvalidTransaction(format!(
                "input {input_value} does not cover amount {amount} plus fee {fee}"
            ))
        })?;
    if change > 0 {
        outputs.push(TXOutput::new(change, wallet.get_public_key()));
    }
    let mut tx = Transaction::new(
        vec![TXInput::new(prev_txid, output_index, wallet.get_public_key())],
        outputs,
        fee,
    )?;
    tx.sign(wallet.get_pkcs8())?;
    Ok(tx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_spend_rejects_overdraw() {
        let wallet = Wallet::new().unwrap();
        let result = signed_spend(&wallet, "aa", 0, 10, b"bob", 8, 5);
        assert!(matches!(result, Err(LedgerError::InvalidTransaction(_))));

        let exact = signed_spend(&wallet, "aa", 0, 10, b"bob", 8, 2).unwrap();
        assert_eq!(exact.get_vout().len(), 1);
        exact.verify_signatures().unwrap();
    }
}
