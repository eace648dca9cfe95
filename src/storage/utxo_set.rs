use crate::core::{Block, Spend};
use crate::error::{LedgerError, Result};
use log::{info, warn};
use sled::{Batch, Tree};
use std::collections::HashMap;

/// Outcome of a single-key removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
}

/// What applying one block did to the index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionReport {
    pub added: usize,
    pub spent: usize,
    /// Inputs whose referenced entry was already absent. Tolerated, not applied.
    pub missing_inputs: Vec<String>,
}

pub fn utxo_key(txid: &str, output_index: u32) -> String {
    format!("{txid}:{output_index}")
}

// Inverse of `utxo_key`. Transaction ids are hex so the last ':' is the separator.
fn split_utxo_key(key: &str) -> Result<(String, u32)> {
    let (txid, index) = key
        .rsplit_once(':')
        .ok_or_else(|| LedgerError::Encoding(format!("Malformed UTXO key: {key}")))?;
    let index = index
        .parse::<u32>()
        .map_err(|e| LedgerError::Encoding(format!("Malformed UTXO key {key}: {e}")))?;
    Ok((txid.to_string(), index))
}

/// Durable `(txid, output_index) -> Spend` index backed by its own sled tree.
///
/// Single-key operations are atomic on their own. `apply_block` stages a whole
/// block's effects into one batch so they land together.
#[derive(Clone)]
pub struct UTXOSet {
    tree: Tree,
}

impl UTXOSet {
    pub fn new(tree: Tree) -> UTXOSet {
        UTXOSet { tree }
    }

    /// Upsert. Overwriting an existing coordinate indicates a duplicate confirmation.
    pub fn add(&self, txid: &str, output_index: u32, spend: &Spend) -> Result<()> {
        let key = utxo_key(txid, output_index);
        let value = spend.serialize()?;
        if self
            .tree
            .insert(key.as_bytes(), value)
            .map_err(|e| LedgerError::Store(format!("Failed to insert UTXO {key}: {e}")))?
            .is_some()
        {
            warn!("UTXO {key} overwritten; output confirmed twice?");
        }
        Ok(())
    }

    pub fn remove(&self, txid: &str, output_index: u32) -> Result<RemoveOutcome> {
        let key = utxo_key(txid, output_index);
        let previous = self
            .tree
            .remove(key.as_bytes())
            .map_err(|e| LedgerError::Store(format!("Failed to remove UTXO {key}: {e}")))?;
        Ok(match previous {
            Some(_) => RemoveOutcome::Removed,
            None => RemoveOutcome::NotFound,
        })
    }

    pub fn find(&self, txid: &str, output_index: u32) -> Result<Option<Spend>> {
        let key = utxo_key(txid, output_index);
        let value = self
            .tree
            .get(key.as_bytes())
            .map_err(|e| LedgerError::Store(format!("Failed to get UTXO {key}: {e}")))?;
        match value {
            Some(bytes) => Ok(Some(Spend::deserialize(bytes.as_ref()).map_err(|e| {
                LedgerError::Encoding(format!("Corrupt UTXO entry {key}: {e}"))
            })?)),
            None => Ok(None),
        }
    }

    // Full scan of the index: O(entries)
    fn for_each_entry<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&str, Spend) -> Result<bool>,
    {
        for item in self.tree.iter() {
            let (k, v) = item
                .map_err(|e| LedgerError::Store(format!("Failed to iterate UTXO tree: {e}")))?;
            let key = String::from_utf8(k.to_vec())
                .map_err(|e| LedgerError::Encoding(format!("Non-UTF-8 UTXO key: {e}")))?;
            let spend = Spend::deserialize(v.as_ref())
                .map_err(|e| LedgerError::Encoding(format!("Corrupt UTXO entry {key}: {e}")))?;
            if !f(&key, spend)? {
                break;
            }
        }
        Ok(())
    }

    /// Sum of every entry owned by `pub_key`.
    pub fn balance(&self, pub_key: &[u8]) -> Result<u64> {
        let mut balance = 0u64;
        self.for_each_entry(|_, spend| {
            if spend.is_owned_by(pub_key) {
                balance = balance.checked_add(spend.get_value()).ok_or_else(|| {
                    LedgerError::Encoding("Balance overflow".to_string())
                })?;
            }
            Ok(true)
        })?;
        Ok(balance)
    }

    /// Entries owned by `pub_key` accepted by `filter`, accumulated until `amount`
    /// is covered. Returns the accumulated value and the chosen coordinates.
    pub fn find_spendable_outputs<F>(
        &self,
        pub_key: &[u8],
        amount: u64,
        filter: F,
    ) -> Result<(u64, Vec<(String, u32, Spend)>)>
    where
        F: Fn(&str, u32) -> bool,
    {
        let mut accumulated = 0u64;
        let mut chosen = vec![];
        self.for_each_entry(|key, spend| {
            if accumulated >= amount {
                return Ok(false);
            }
            if spend.is_owned_by(pub_key) {
                let (txid, index) = split_utxo_key(key)?;
                if filter(&txid, index) {
                    accumulated = accumulated.saturating_add(spend.get_value());
                    chosen.push((txid, index, spend));
                }
            }
            Ok(true)
        })?;
        Ok((accumulated, chosen))
    }

    pub fn count(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Applies a confirmed block: adds every output and removes every entry an
    /// input consumes, as one atomic batch.
    ///
    /// An input whose entry is absent (already spent, or never indexed) is
    /// recorded in the report and skipped. An output that is already indexed,
    /// or any store or encoding failure, aborts before anything is written.
    pub fn apply_block(&self, block: &Block) -> Result<ProjectionReport> {
        let mut batch = Batch::default();
        let mut report = ProjectionReport::default();
        // key -> present after the staged writes
        let mut staged: HashMap<String, bool> = HashMap::new();

        for tx in block.get_transactions() {
            let txid = tx.id()?;

            for (idx, out) in tx.get_vout().iter().enumerate() {
                let key = utxo_key(&txid, idx as u32);
                let exists = staged.contains_key(&key)
                    || self.tree.contains_key(key.as_bytes()).map_err(|e| {
                        LedgerError::Store(format!("Failed to look up UTXO {key}: {e}"))
                    })?;
                if exists {
                    return Err(LedgerError::Duplicate(format!(
                        "output {key} of block {} is already indexed",
                        block.get_hash()
                    )));
                }
                batch.insert(key.as_bytes(), out.to_spend().serialize()?);
                staged.insert(key, true);
                report.added += 1;
            }

            for input in tx.get_vin() {
                let key = utxo_key(input.get_prev_txid(), input.get_output_index());
                let present = match staged.get(&key) {
                    Some(present) => *present,
                    None => self.tree.contains_key(key.as_bytes()).map_err(|e| {
                        LedgerError::Store(format!("Failed to look up UTXO {key}: {e}"))
                    })?,
                };
                if present {
                    batch.remove(key.as_bytes());
                    staged.insert(key, false);
                    report.spent += 1;
                } else {
                    warn!(
                        "Input {key} of transaction {txid} in block {} has no UTXO entry",
                        block.get_hash()
                    );
                    report.missing_inputs.push(key);
                }
            }
        }

        self.tree
            .apply_batch(batch)
            .map_err(|e| LedgerError::Store(format!("Failed to apply UTXO batch: {e}")))?;
        Ok(report)
    }

    /// Rebuilds the index from blocks given in chain order, genesis first.
    pub fn reindex<I>(&self, blocks: I) -> Result<usize>
    where
        I: IntoIterator<Item = Block>,
    {
        self.tree
            .clear()
            .map_err(|e| LedgerError::Store(format!("Failed to clear UTXO tree: {e}")))?;

        let mut applied = 0;
        for block in blocks {
            self.apply_block(&block)?;
            applied += 1;
        }
        info!(
            "Reindexed UTXO set from {applied} blocks, {} entries",
            self.count()
        );
        Ok(applied)
    }

    pub fn flush(&self) -> Result<()> {
        self.tree
            .flush()
            .map_err(|e| LedgerError::Store(format!("Failed to flush UTXO tree: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{TXInput, TXOutput, Transaction};

    fn temp_set() -> UTXOSet {
        let db = sled::Config::new().temporary(true).open().unwrap();
        UTXOSet::new(db.open_tree("utxo").unwrap())
    }

    #[test]
    fn test_add_find_remove() {
        let set = temp_set();
        let spend = Spend::new(100, b"alice");
        set.add("tx1", 0, &spend).unwrap();

        assert_eq!(set.find("tx1", 0).unwrap(), Some(spend));
        assert_eq!(set.find("tx1", 1).unwrap(), None);

        assert_eq!(set.remove("tx1", 0).unwrap(), RemoveOutcome::Removed);
        assert_eq!(set.remove("tx1", 0).unwrap(), RemoveOutcome::NotFound);
        assert_eq!(set.find("tx1", 0).unwrap(), None);
    }

    #[test]
    fn test_balance_sums_owner_entries_only() {
        let set = temp_set();
        set.add("tx1", 0, &Spend::new(30, b"alice")).unwrap();
        set.add("tx1", 1, &Spend::new(12, b"bob")).unwrap();
        set.add("tx2", 0, &Spend::new(8, b"alice")).unwrap();

        assert_eq!(set.balance(b"alice").unwrap(), 38);
        assert_eq!(set.balance(b"bob").unwrap(), 12);
        assert_eq!(set.balance(b"carol").unwrap(), 0);
    }

    #[test]
    fn test_key_format() {
        assert_eq!(utxo_key("abcd", 3), "abcd:3");
        assert_eq!(split_utxo_key("abcd:3").unwrap(), ("abcd".to_string(), 3));
        assert!(split_utxo_key("abcd").is_err());
    }

    #[test]
    fn test_apply_block_spends_within_same_block() {
        let set = temp_set();
        let first = Transaction::new_coinbase_tx(b"alice", 50, 1);
        let first_id = first.id().unwrap();
        let second = Transaction::from_parts(
            1,
            vec![TXInput::new(&first_id, 0, b"alice")],
            vec![TXOutput::new(50, b"bob")],
            2,
            0,
        );
        let second_id = second.id().unwrap();
        let block = Block::new_candidate(1, 1, vec![first, second], "p".into())
            .unwrap()
            .with_seal("h".into(), 0);

        let report = set.apply_block(&block).unwrap();
        assert_eq!(report.added, 2);
        assert_eq!(report.spent, 1);
        assert!(report.missing_inputs.is_empty());
        assert_eq!(set.find(&first_id, 0).unwrap(), None);
        assert_eq!(set.find(&second_id, 0).unwrap(), Some(Spend::new(50, b"bob")));
    }

    #[test]
    fn test_apply_block_rejects_already_indexed_output() {
        let set = temp_set();
        let coinbase = Transaction::new_coinbase_tx(b"alice", 50, 1);
        let coinbase_id = coinbase.id().unwrap();
        let block = Block::new_candidate(1, 1, vec![coinbase], "p".into())
            .unwrap()
            .with_seal("h".into(), 0);

        set.apply_block(&block).unwrap();
        let result = set.apply_block(&block);
        assert!(matches!(result, Err(LedgerError::Duplicate(_))));
        assert_eq!(set.count(), 1);
        assert!(set.find(&coinbase_id, 0).unwrap().is_some());
    }

    #[test]
    fn test_apply_block_reports_missing_inputs() {
        let set = temp_set();
        let tx = Transaction::from_parts(
            1,
            vec![TXInput::new("gone", 0, b"alice")],
            vec![TXOutput::new(5, b"bob")],
            2,
            0,
        );
        let block = Block::new_candidate(1, 1, vec![tx], "p".into())
            .unwrap()
            .with_seal("h".into(), 0);

        let report = set.apply_block(&block).unwrap();
        assert_eq!(report.missing_inputs, vec!["gone:0".to_string()]);
        assert_eq!(set.balance(b"bob").unwrap(), 5);
    }

    #[test]
    fn test_find_spendable_respects_filter_and_amount() {
        let set = temp_set();
        set.add("a", 0, &Spend::new(10, b"alice")).unwrap();
        set.add("b", 0, &Spend::new(10, b"alice")).unwrap();
        set.add("c", 0, &Spend::new(10, b"alice")).unwrap();

        let (total, chosen) = set
            .find_spendable_outputs(b"alice", 15, |txid, _| txid != "a")
            .unwrap();
        assert_eq!(total, 20);
        assert_eq!(chosen.len(), 2);
        assert!(chosen.iter().all(|(txid, _, _)| txid != "a"));
    }

    #[test]
    fn test_reindex_clears_stale_entries() {
        let set = temp_set();
        set.add("stale", 0, &Spend::new(1, b"x")).unwrap();
        let block = Block::genesis_candidate(1).with_seal("g".into(), 0);

        assert_eq!(set.reindex(vec![block]).unwrap(), 1);
        assert_eq!(set.find("stale", 0).unwrap(), None);
        assert_eq!(set.count(), 1);
    }
}
