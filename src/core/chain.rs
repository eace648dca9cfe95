// The chain orchestrator: owns the block store and the tip pointer, assembles and seals
// new blocks, and projects every confirmed block into the UTXO index and the memory pool.
// Blocks and the UTXO index live in two separate sled trees of one database.

use crate::core::{Block, ProofOfWork, Transaction, BLOCK_REWARD};
use crate::error::{LedgerError, Result};
use crate::storage::{utxo_key, MemoryPool, ProjectionReport, UTXOSet};
use crate::utils::current_timestamp;
use log::{error, info, warn};
use sled::{Db, Tree};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

const TIP_POINTER_KEY: &str = "tip-pointer"; // Sentinel key holding the most recent block hash
const BLOCKS_TREE: &str = "blocks";
const UTXO_TREE: &str = "utxo";

#[derive(Clone)]
pub struct Chain {
    // Cached copy of the durable tip pointer; readers never wait on a miner
    tip_hash: Arc<RwLock<String>>,
    // Serializes read-tip -> build -> seal -> persist -> advance -> project
    mining_lock: Arc<Mutex<()>>,
    db: Db,
    blocks: Tree,
    pool: Arc<MemoryPool>,
    utxo_set: UTXOSet,
    db_path: PathBuf,
}

impl Chain {
    /// Opens the database at `db_path`. On an empty store the genesis block is
    /// sealed, persisted with the tip pointer, and projected into the UTXO index.
    pub fn initialize<P: AsRef<Path>>(db_path: P) -> Result<Chain> {
        let path = db_path.as_ref().to_path_buf();
        let db = sled::open(&path).map_err(|e| {
            LedgerError::Store(format!("Failed to open database at {}: {e}", path.display()))
        })?;
        let blocks = db
            .open_tree(BLOCKS_TREE)
            .map_err(|e| LedgerError::Store(format!("Failed to open blocks tree: {e}")))?;
        let utxo_tree = db
            .open_tree(UTXO_TREE)
            .map_err(|e| LedgerError::Store(format!("Failed to open UTXO tree: {e}")))?;
        let utxo_set = UTXOSet::new(utxo_tree);

        let data = blocks
            .get(TIP_POINTER_KEY)
            .map_err(|e| LedgerError::Store(format!("Failed to get tip hash: {e}")))?;

        let tip_hash = if let Some(data) = data {
            String::from_utf8(data.to_vec())
                .map_err(|e| LedgerError::Encoding(format!("Invalid tip hash format: {e}")))?
        } else {
            let candidate = Block::genesis_candidate(current_timestamp()?);
            let genesis = Self::seal(candidate, &AtomicBool::new(false))?;
            Self::update_blocks_tree(&blocks, &genesis)?;
            info!("Created genesis block {}", genesis.get_hash());
            Self::project_into(&utxo_set, &genesis)?;
            genesis.get_hash().to_string()
        };

        Ok(Chain {
            tip_hash: Arc::new(RwLock::new(tip_hash)),
            mining_lock: Arc::new(Mutex::new(())),
            db,
            blocks,
            pool: Arc::new(MemoryPool::new()),
            utxo_set,
            db_path: path,
        })
    }

    // Block and tip pointer land in one tree transaction: both or neither
    fn update_blocks_tree(blocks_tree: &Tree, block: &Block) -> Result<()> {
        let block_hash = block.get_hash();
        let block_data = block.serialize()?;

        blocks_tree
            .transaction(|tx_db| {
                tx_db.insert(block_hash, block_data.as_slice())?;
                tx_db.insert(TIP_POINTER_KEY, block_hash)?;
                Ok(())
            })
            .map_err(|e: sled::transaction::TransactionError| {
                LedgerError::Store(format!("Failed to persist block {block_hash}: {e}"))
            })?;

        blocks_tree
            .flush()
            .map_err(|e| LedgerError::Store(format!("Failed to flush blocks tree: {e}")))?;
        Ok(())
    }

    fn seal(candidate: Block, cancel: &AtomicBool) -> Result<Block> {
        let (nonce, hash) = ProofOfWork::new_proof_of_work(&candidate)?.run(cancel)?;
        Ok(candidate.with_seal(hash, nonce))
    }

    fn project_into(utxo_set: &UTXOSet, block: &Block) -> Result<ProjectionReport> {
        let report = utxo_set.apply_block(block).map_err(|e| {
            error!(
                "Block {} is committed but its UTXO effects were not applied: {e}",
                block.get_hash()
            );
            LedgerError::Projection {
                block_hash: block.get_hash().to_string(),
                reason: e.to_string(),
            }
        })?;
        if !report.missing_inputs.is_empty() {
            warn!(
                "Block {} spent {} inputs with no UTXO entry: {:?}",
                block.get_hash(),
                report.missing_inputs.len(),
                report.missing_inputs
            );
        }
        Ok(report)
    }

    fn lock_mining(&self) -> Result<MutexGuard<'_, ()>> {
        self.mining_lock
            .lock()
            .map_err(|_| LedgerError::LockPoisoned("mining lock".to_string()))
    }

    pub fn get_db(&self) -> &Db {
        &self.db
    }

    pub fn get_db_path(&self) -> &PathBuf {
        &self.db_path
    }

    pub fn pool(&self) -> &MemoryPool {
        &self.pool
    }

    pub fn utxo_set(&self) -> &UTXOSet {
        &self.utxo_set
    }

    pub fn get_tip_hash(&self) -> Result<String> {
        let tip_hash = self
            .tip_hash
            .read()
            .map_err(|_| LedgerError::LockPoisoned("tip hash".to_string()))?;
        Ok(tip_hash.clone())
    }

    fn set_tip_hash(&self, new_tip_hash: &str) -> Result<()> {
        let mut tip_hash = self
            .tip_hash
            .write()
            .map_err(|_| LedgerError::LockPoisoned("tip hash".to_string()))?;
        *tip_hash = String::from(new_tip_hash);
        Ok(())
    }

    pub fn get_block(&self, block_hash: &str) -> Result<Option<Block>> {
        load_block(&self.blocks, block_hash)
    }

    pub fn get_tip_block(&self) -> Result<Block> {
        let tip_hash = self.get_tip_hash()?;
        self.get_block(&tip_hash)?
            .ok_or_else(|| LedgerError::NotFound(format!("tip block {tip_hash}")))
    }

    pub fn get_best_height(&self) -> Result<u64> {
        Ok(self.get_tip_block()?.get_index())
    }

    pub fn balance(&self, pub_key: &[u8]) -> Result<u64> {
        self.utxo_set.balance(pub_key)
    }

    pub fn iter(&self) -> Result<ChainIterator> {
        Ok(ChainIterator::new(self.get_tip_hash()?, self.blocks.clone()))
    }

    // Strictly after the tip, so every block (and its coinbase) gets a distinct timestamp
    fn next_timestamp(tip: &Block) -> Result<i64> {
        Ok(current_timestamp()?.max(tip.get_timestamp() + 1))
    }

    // Builds, seals and commits the successor of `tip`. Nothing durable changes
    // unless every step succeeds.
    fn commit_successor(
        &self,
        tip: &Block,
        timestamp: i64,
        transactions: Vec<Transaction>,
        cancel: &AtomicBool,
    ) -> Result<Block> {
        check_for_double_spending(&transactions)?;
        self.check_unconfirmed(&transactions)?;

        let next_index = tip.get_index() + 1;
        info!(
            "Mining block {} with {} transactions",
            next_index,
            transactions.len()
        );
        let candidate = Block::new_candidate(
            next_index,
            timestamp,
            transactions,
            tip.get_hash().to_string(),
        )?;
        let block = Self::seal(candidate, cancel)?;

        Self::update_blocks_tree(&self.blocks, &block)?;
        self.set_tip_hash(block.get_hash())?;
        info!(
            "Committed block {} at index {} (nonce {})",
            block.get_hash(),
            block.get_index(),
            block.get_nonce()
        );
        Ok(block)
    }

    // A transaction may land in exactly one block. Rejects ids already on the
    // chain, and spends whose inputs are all gone from the index.
    fn check_unconfirmed(&self, transactions: &[Transaction]) -> Result<()> {
        let mut candidate_ids = HashSet::new();
        let mut created: HashSet<String> = HashSet::new();

        for tx in transactions {
            let txid = tx.id()?;
            if !tx.is_coinbase() {
                let mut live_input = false;
                for input in tx.get_vin() {
                    let key = utxo_key(input.get_prev_txid(), input.get_output_index());
                    if created.contains(&key)
                        || self
                            .utxo_set
                            .find(input.get_prev_txid(), input.get_output_index())?
                            .is_some()
                    {
                        live_input = true;
                        break;
                    }
                }
                if !live_input {
                    return Err(LedgerError::DoubleSpend(format!(
                        "transaction {txid} only spends outputs that are already spent"
                    )));
                }
            }
            for idx in 0..tx.get_vout().len() {
                created.insert(utxo_key(&txid, idx as u32));
            }
            if !candidate_ids.insert(txid.clone()) {
                return Err(LedgerError::DoubleSpend(format!(
                    "transaction {txid} appears twice in the block"
                )));
            }
        }

        for block in self.iter()? {
            let block = block?;
            for tx in block.get_transactions() {
                let txid = tx.id()?;
                if candidate_ids.contains(&txid) {
                    return Err(LedgerError::DoubleSpend(format!(
                        "transaction {txid} is already confirmed in block {}",
                        block.get_hash()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Mines an explicit, ordered transaction list on top of the tip and applies
    /// its UTXO effects. Does not touch the memory pool or add a coinbase.
    pub fn mine_block(&self, transactions: &[Transaction]) -> Result<Block> {
        self.mine_block_cancellable(transactions, &AtomicBool::new(false))
    }

    pub fn mine_block_cancellable(
        &self,
        transactions: &[Transaction],
        cancel: &AtomicBool,
    ) -> Result<Block> {
        let _guard = self.lock_mining()?;
        let tip = self.get_tip_block()?;
        let timestamp = Self::next_timestamp(&tip)?;
        let block = self.commit_successor(&tip, timestamp, transactions.to_vec(), cancel)?;
        Self::project_into(&self.utxo_set, &block)?;
        Ok(block)
    }

    /// Mines `[coinbase(miner_key), ...pool snapshot]`, applies the block's UTXO
    /// effects and drops the included transactions from the pool.
    pub fn mine_from_pool(&self, miner_key: &[u8]) -> Result<Block> {
        self.mine_from_pool_cancellable(miner_key, &AtomicBool::new(false))
    }

    pub fn mine_from_pool_cancellable(
        &self,
        miner_key: &[u8],
        cancel: &AtomicBool,
    ) -> Result<Block> {
        let _guard = self.lock_mining()?;
        let pooled = self.select_pool_transactions()?;

        let tip = self.get_tip_block()?;
        let timestamp = Self::next_timestamp(&tip)?;
        let coinbase = Transaction::new_coinbase_tx(miner_key, BLOCK_REWARD, timestamp);

        let mut transactions = Vec::with_capacity(pooled.len() + 1);
        transactions.push(coinbase);
        transactions.extend(pooled.iter().map(|(_, tx)| tx.clone()));

        let block = self.commit_successor(&tip, timestamp, transactions, cancel)?;

        // The block is confirmed from here on: its transactions leave the pool
        // even if the projection below fails
        let projection = Self::project_into(&self.utxo_set, &block);
        for (key, _) in &pooled {
            self.pool.remove(key);
        }
        projection?;

        Ok(block)
    }

    // Pool snapshot in a stable order, paired with pool keys, minus entries whose
    // inputs are no longer spendable. Those are dropped from the pool for good.
    fn select_pool_transactions(&self) -> Result<Vec<(Vec<u8>, Transaction)>> {
        let mut snapshot = vec![];
        for tx in self.pool.list()? {
            let txid = tx.id()?;
            let key = tx.pool_key()?;
            snapshot.push((tx.get_timestamp(), txid, key, tx));
        }
        snapshot.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));

        let mut selected = vec![];
        for (_, txid, key, tx) in snapshot {
            let mut spendable = true;
            for input in tx.get_vin() {
                if self
                    .utxo_set
                    .find(input.get_prev_txid(), input.get_output_index())?
                    .is_none()
                {
                    spendable = false;
                    break;
                }
            }
            if spendable {
                selected.push((key, tx));
            } else {
                warn!("Dropping stale pooled transaction {txid}: an input is already spent");
                self.pool.remove(&key);
            }
        }
        Ok(selected)
    }

    /// Walks back from the tip to genesis looking for `txid`.
    pub fn find_transaction(&self, txid: &str) -> Result<Transaction> {
        for block in self.iter()? {
            let block = block?;
            for transaction in block.get_transactions() {
                if transaction.id()? == txid {
                    return Ok(transaction.clone());
                }
            }
        }
        Err(LedgerError::NotFound(format!("transaction {txid}")))
    }

    /// Clears the UTXO index and re-derives it from the block store, genesis
    /// first. The recovery path after a crash mid-projection.
    pub fn reindex_utxo(&self) -> Result<usize> {
        let _guard = self.lock_mining()?;
        let mut blocks = self.iter()?.collect::<Result<Vec<Block>>>()?;
        blocks.reverse();
        self.utxo_set.reindex(blocks)
    }

    /// Checks proof-of-work, hash links and indexes from the tip down to
    /// genesis. Returns the number of blocks checked.
    pub fn verify_integrity(&self) -> Result<u64> {
        let mut child: Option<Block> = None;
        let mut checked = 0u64;

        for block in self.iter()? {
            let block = block?;
            if !ProofOfWork::validate(&block)? {
                return Err(LedgerError::InvalidBlock(format!(
                    "block {} fails proof-of-work",
                    block.get_hash()
                )));
            }
            if let Some(child) = &child {
                if child.get_pre_block_hash() != block.get_hash()
                    || child.get_index() != block.get_index() + 1
                {
                    return Err(LedgerError::InvalidBlock(format!(
                        "block {} does not link to {}",
                        child.get_hash(),
                        block.get_hash()
                    )));
                }
            }
            checked += 1;
            child = Some(block);
        }

        match child {
            Some(genesis) if genesis.is_genesis() && genesis.get_index() == 0 => Ok(checked),
            _ => Err(LedgerError::InvalidBlock(
                "chain does not end at a genesis block".to_string(),
            )),
        }
    }

    pub fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| LedgerError::Store(format!("Failed to flush database: {e}")))?;
        Ok(())
    }
}

fn load_block(blocks: &Tree, block_hash: &str) -> Result<Option<Block>> {
    let data = blocks
        .get(block_hash)
        .map_err(|e| LedgerError::Store(format!("Failed to get block {block_hash}: {e}")))?;
    match data {
        Some(bytes) => Ok(Some(Block::deserialize(bytes.as_ref()).map_err(|e| {
            LedgerError::Encoding(format!("Corrupt block {block_hash}: {e}"))
        })?)),
        None => Ok(None),
    }
}

// The same output may not be spent twice within one block
fn check_for_double_spending(transactions: &[Transaction]) -> Result<()> {
    let mut spent_outputs: HashSet<(&str, u32)> = HashSet::new();

    for (tx_index, transaction) in transactions.iter().enumerate() {
        for input in transaction.get_vin() {
            let output_reference = (input.get_prev_txid(), input.get_output_index());
            if !spent_outputs.insert(output_reference) {
                return Err(LedgerError::DoubleSpend(format!(
                    "transaction {} spends {}:{} already spent in this block",
                    tx_index,
                    input.get_prev_txid(),
                    input.get_output_index()
                )));
            }
        }
    }
    Ok(())
}

/// Walks tip -> genesis. A missing or undecodable block is yielded as an error
/// and ends the walk.
pub struct ChainIterator {
    blocks: Tree,
    current_hash: Option<String>,
}

impl ChainIterator {
    fn new(tip_hash: String, blocks: Tree) -> ChainIterator {
        ChainIterator {
            blocks,
            current_hash: Some(tip_hash),
        }
    }
}

impl Iterator for ChainIterator {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        let hash = self.current_hash.take()?;
        match load_block(&self.blocks, &hash) {
            Ok(Some(block)) => {
                if !block.is_genesis() {
                    self.current_hash = Some(block.get_pre_block_hash().to_string());
                }
                Some(Ok(block))
            }
            Ok(None) => Some(Err(LedgerError::NotFound(format!("block {hash}")))),
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Spend, TXInput, TXOutput, GENESIS_OWNER, GENESIS_REWARD};
    use crate::test_support::create_test_chain;

    #[test]
    fn test_initialize_creates_single_genesis() {
        let (chain, _dir) = create_test_chain().unwrap();

        let blocks = chain.iter().unwrap().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(blocks.len(), 1);
        let genesis = &blocks[0];
        assert_eq!(genesis.get_index(), 0);
        assert!(genesis.get_pre_block_hash().is_empty());
        assert_eq!(chain.get_tip_hash().unwrap(), genesis.get_hash());
        assert!(ProofOfWork::validate(genesis).unwrap());
    }

    #[test]
    fn test_reopen_keeps_tip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain");
        let tip = {
            let chain = Chain::initialize(&path).unwrap();
            chain.mine_from_pool(b"miner").unwrap();
            chain.flush().unwrap();
            chain.get_tip_hash().unwrap()
        };

        let reopened = Chain::initialize(&path).unwrap();
        assert_eq!(reopened.get_tip_hash().unwrap(), tip);
        assert_eq!(reopened.get_best_height().unwrap(), 1);
        assert_eq!(reopened.balance(b"miner").unwrap(), BLOCK_REWARD);
    }

    #[test]
    fn test_genesis_output_is_indexed() {
        let (chain, _dir) = create_test_chain().unwrap();
        let genesis_id = Transaction::genesis().id().unwrap();
        let spend = chain.utxo_set().find(&genesis_id, 0).unwrap().unwrap();
        assert_eq!(spend.get_value(), GENESIS_REWARD);
    }

    #[test]
    fn test_mine_block_links_to_tip() {
        let (chain, _dir) = create_test_chain().unwrap();
        let before = chain.get_tip_block().unwrap();

        let coinbase = Transaction::new_coinbase_tx(b"a", BLOCK_REWARD, 1);
        let block = chain.mine_block(&[coinbase]).unwrap();

        assert_eq!(block.get_index(), before.get_index() + 1);
        assert_eq!(block.get_pre_block_hash(), before.get_hash());
        assert!(block.get_timestamp() > before.get_timestamp());
        assert_eq!(chain.get_tip_hash().unwrap(), block.get_hash());
        assert!(chain.pool().is_empty());
    }

    #[test]
    fn test_mine_block_rejects_in_block_double_spend() {
        let (chain, _dir) = create_test_chain().unwrap();
        let genesis_id = Transaction::genesis().id().unwrap();
        let spend = |to: &[u8]| {
            Transaction::from_parts(
                1,
                vec![TXInput::new(&genesis_id, 0, b"genesis-reward")],
                vec![TXOutput::new(100, to)],
                1,
                0,
            )
        };
        let tip_before = chain.get_tip_hash().unwrap();

        let result = chain.mine_block(&[spend(b"a"), spend(b"b")]);
        assert!(matches!(result, Err(LedgerError::DoubleSpend(_))));
        assert_eq!(chain.get_tip_hash().unwrap(), tip_before);
    }

    fn genesis_split(receiver: &[u8], amount: u64) -> Transaction {
        Transaction::from_parts(
            1,
            vec![TXInput::new(&Transaction::genesis().id().unwrap(), 0, GENESIS_OWNER)],
            vec![
                TXOutput::new(amount, receiver),
                TXOutput::new(GENESIS_REWARD - amount, GENESIS_OWNER),
            ],
            1,
            0,
        )
    }

    #[test]
    fn test_confirmed_transaction_cannot_be_mined_again() {
        let (chain, _dir) = create_test_chain().unwrap();
        let first = genesis_split(b"r", 30);
        let first_id = first.id().unwrap();
        chain.mine_block(&[first.clone()]).unwrap();

        let second = Transaction::from_parts(
            1,
            vec![TXInput::new(&first_id, 0, b"r")],
            vec![TXOutput::new(30, b"s")],
            2,
            0,
        );
        chain.mine_block(&[second]).unwrap();
        let tip_before = chain.get_tip_hash().unwrap();

        let again = chain.mine_block(&[first.clone()]);
        assert!(matches!(again, Err(LedgerError::DoubleSpend(_))));
        let with_coinbase = chain.mine_block(&[
            Transaction::new_coinbase_tx(b"m", BLOCK_REWARD, 3),
            first,
        ]);
        assert!(matches!(with_coinbase, Err(LedgerError::DoubleSpend(_))));

        assert_eq!(chain.get_tip_hash().unwrap(), tip_before);
        assert_eq!(chain.balance(b"r").unwrap(), 0);
        assert_eq!(chain.balance(b"s").unwrap(), 30);
        assert_eq!(chain.balance(b"m").unwrap(), 0);
    }

    #[test]
    fn test_confirmed_coinbase_cannot_be_mined_again() {
        let (chain, _dir) = create_test_chain().unwrap();
        let coinbase = Transaction::new_coinbase_tx(b"a", BLOCK_REWARD, 1);
        chain.mine_block(&[coinbase.clone()]).unwrap();

        let result = chain.mine_block(&[coinbase]);
        assert!(matches!(result, Err(LedgerError::DoubleSpend(_))));
        assert_eq!(chain.get_best_height().unwrap(), 1);
        assert_eq!(chain.balance(b"a").unwrap(), BLOCK_REWARD);
    }

    #[test]
    fn test_projection_failure_keeps_block_and_clears_pool() {
        let (chain, _dir) = create_test_chain().unwrap();
        let tx = genesis_split(b"r", 30);
        // A stray entry where the transaction's first output will be indexed
        chain
            .utxo_set()
            .add(&tx.id().unwrap(), 0, &Spend::new(30, b"r"))
            .unwrap();
        chain.pool().submit(tx).unwrap();
        let tip_before = chain.get_tip_hash().unwrap();

        match chain.mine_from_pool(b"miner") {
            Err(LedgerError::Projection { block_hash, .. }) => {
                assert_ne!(block_hash, tip_before);
                assert_eq!(chain.get_tip_hash().unwrap(), block_hash);
            }
            other => panic!("expected a projection failure, got {other:?}"),
        }
        assert!(chain.pool().is_empty());
        assert_eq!(chain.balance(b"miner").unwrap(), 0);

        chain.reindex_utxo().unwrap();
        assert_eq!(chain.balance(b"miner").unwrap(), BLOCK_REWARD);
        assert_eq!(chain.balance(b"r").unwrap(), 30);
        assert_eq!(chain.balance(GENESIS_OWNER).unwrap(), GENESIS_REWARD - 30);
        assert_eq!(chain.verify_integrity().unwrap(), 2);
    }

    #[test]
    fn test_cancelled_mining_leaves_store_untouched() {
        let (chain, _dir) = create_test_chain().unwrap();
        let tip_before = chain.get_tip_hash().unwrap();

        let cancel = AtomicBool::new(true);
        let result = chain.mine_from_pool_cancellable(b"miner", &cancel);
        assert_eq!(result, Err(LedgerError::Cancelled));
        assert_eq!(chain.get_tip_hash().unwrap(), tip_before);
        assert_eq!(chain.balance(b"miner").unwrap(), 0);
    }

    #[test]
    fn test_find_transaction_walks_back() {
        let (chain, _dir) = create_test_chain().unwrap();
        let first = chain.mine_from_pool(b"a").unwrap();
        chain.mine_from_pool(b"b").unwrap();

        let coinbase = &first.get_transactions()[0];
        let found = chain.find_transaction(&coinbase.id().unwrap()).unwrap();
        assert_eq!(&found, coinbase);

        let genesis = chain
            .find_transaction(&Transaction::genesis().id().unwrap())
            .unwrap();
        assert_eq!(genesis, Transaction::genesis());

        assert!(chain.find_transaction("absent").unwrap_err().is_not_found());
    }

    #[test]
    fn test_reindex_matches_incremental_projection() {
        let (chain, _dir) = create_test_chain().unwrap();
        chain.mine_from_pool(b"a").unwrap();
        chain.mine_from_pool(b"b").unwrap();
        chain.mine_from_pool(b"a").unwrap();
        let count = chain.utxo_set().count();

        chain.utxo_set().remove(&Transaction::genesis().id().unwrap(), 0).unwrap();
        assert_eq!(chain.reindex_utxo().unwrap(), 4);

        assert_eq!(chain.utxo_set().count(), count);
        assert_eq!(chain.balance(b"a").unwrap(), 2 * BLOCK_REWARD);
        assert_eq!(chain.balance(b"b").unwrap(), BLOCK_REWARD);
        assert_eq!(chain.balance(b"genesis-reward").unwrap(), GENESIS_REWARD);
    }

    #[test]
    fn test_verify_integrity() {
        let (chain, _dir) = create_test_chain().unwrap();
        chain.mine_from_pool(b"a").unwrap();
        chain.mine_from_pool(b"a").unwrap();
        assert_eq!(chain.verify_integrity().unwrap(), 3);
    }

    #[test]
    fn test_corrupt_block_propagates() {
        let (chain, _dir) = create_test_chain().unwrap();
        chain.mine_from_pool(b"a").unwrap();
        let genesis_hash = chain.get_tip_block().unwrap().get_pre_block_hash().to_string();
        chain
            .get_db()
            .open_tree(BLOCKS_TREE)
            .unwrap()
            .insert(genesis_hash.as_bytes(), vec![0xFFu8; 3])
            .unwrap();

        let result = chain.find_transaction("absent");
        assert!(matches!(result, Err(LedgerError::Encoding(_))));
    }

    #[test]
    fn test_concurrent_miners_extend_distinct_positions() {
        let (chain, _dir) = create_test_chain().unwrap();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let chain = chain.clone();
                std::thread::spawn(move || chain.mine_from_pool(format!("m{i}").as_bytes()))
            })
            .collect();
        let mut indexes: Vec<u64> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap().get_index())
            .collect();
        indexes.sort();

        assert_eq!(indexes, vec![1, 2, 3, 4]);
        assert_eq!(chain.verify_integrity().unwrap(), 5);
    }
}
