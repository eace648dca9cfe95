use crate::core::Transaction;
use crate::error::{LedgerError, Result};
use log::debug;
use std::collections::HashMap;
use std::sync::RwLock;

/// Submitted but unconfirmed transactions.
///
/// ( K -> canonical encoding, V -> Transaction )
///
/// Writers take the whole-pool write lock; `list` and the other readers share
/// the read lock, so a reader never sees a half-applied insert or removal.
pub struct MemoryPool {
    inner: RwLock<HashMap<Vec<u8>, Transaction>>,
}

impl Default for MemoryPool {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPool {
    pub fn new() -> MemoryPool {
        MemoryPool {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Inserts `tx` keyed by its canonical encoding.
    ///
    /// Fails with `Duplicate` if the same encoding is pooled already, and with
    /// `DoubleSpend` if another pooled transaction spends one of its inputs.
    pub fn submit(&self, tx: Transaction) -> Result<()> {
        let key = tx.pool_key()?;
        let mut pool = self
            .inner
            .write()
            .map_err(|_| LedgerError::LockPoisoned("memory pool".to_string()))?;

        if pool.contains_key(&key) {
            return Err(LedgerError::Duplicate(format!(
                "transaction {} already in the pool",
                tx.id()?
            )));
        }

        for input in tx.get_vin() {
            let claimed = pool.values().any(|pooled| {
                pooled.get_vin().iter().any(|other| {
                    other.get_prev_txid() == input.get_prev_txid()
                        && other.get_output_index() == input.get_output_index()
                })
            });
            if claimed {
                return Err(LedgerError::DoubleSpend(format!(
                    "output {}:{} already claimed by a pooled transaction",
                    input.get_prev_txid(),
                    input.get_output_index()
                )));
            }
        }

        debug!("Pooled transaction {}", tx.id()?);
        pool.insert(key, tx);
        Ok(())
    }

    /// Snapshot copy of every pooled transaction, in no particular order.
    pub fn list(&self) -> Result<Vec<Transaction>> {
        let pool = self
            .inner
            .read()
            .map_err(|_| LedgerError::LockPoisoned("memory pool".to_string()))?;
        Ok(pool.values().cloned().collect())
    }

    /// Idempotent: removing an absent key is a no-op.
    pub fn remove(&self, key: &[u8]) {
        match self.inner.write() {
            Ok(mut pool) => {
                if pool.remove(key).is_some() {
                    debug!("Removed transaction from pool");
                }
            }
            Err(_) => {
                log::error!("Failed to acquire write lock on memory pool");
            }
        }
    }

    /// Looks up a pooled transaction by its identifier.
    pub fn find(&self, txid: &str) -> Result<Option<Transaction>> {
        let pool = self
            .inner
            .read()
            .map_err(|_| LedgerError::LockPoisoned("memory pool".to_string()))?;
        for tx in pool.values() {
            if tx.id()? == txid {
                return Ok(Some(tx.clone()));
            }
        }
        Ok(None)
    }

    /// Whether some pooled transaction already spends `txid:output_index`.
    pub fn is_output_claimed(&self, txid: &str, output_index: u32) -> bool {
        match self.inner.read() {
            Ok(pool) => pool.values().any(|tx| {
                tx.get_vin().iter().any(|input| {
                    input.get_prev_txid() == txid && input.get_output_index() == output_index
                })
            }),
            Err(_) => {
                log::error!("Failed to acquire read lock on memory pool");
                false
            }
        }
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        match self.inner.read() {
            Ok(pool) => pool.contains_key(key),
            Err(_) => {
                log::error!("Failed to acquire read lock on memory pool");
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        match self.inner.read() {
            Ok(pool) => pool.len(),
            Err(_) => {
                log::error!("Failed to acquire read lock on memory pool");
                0
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
