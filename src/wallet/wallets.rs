use crate::error::{LedgerError, Result};
use crate::utils::{deserialize, serialize};
use crate::wallet::Wallet;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Wallets kept in one bincode file, keyed by hex owner key.
pub struct Wallets {
    wallets: HashMap<String, Wallet>,
    path: PathBuf,
}

impl Wallets {
    /// Loads the wallet file at `path`; a missing file means no wallets yet.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Wallets> {
        let path = path.as_ref().to_path_buf();
        let wallets = if path.exists() {
            let buf = fs::read(&path)?;
            deserialize(&buf[..]).map_err(|e| {
                LedgerError::Encoding(format!("Corrupt wallet file {}: {e}", path.display()))
            })?
        } else {
            HashMap::new()
        };
        Ok(Wallets { wallets, path })
    }

    pub fn create_wallet(&mut self) -> Result<String> {
        let wallet = Wallet::new()?;
        let owner_key = wallet.get_owner_key();
        self.wallets.insert(owner_key.clone(), wallet);
        self.save()?;
        Ok(owner_key)
    }

    pub fn get_owner_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.wallets.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn get_wallet(&self, owner_key: &str) -> Option<&Wallet> {
        self.wallets.get(&owner_key.to_lowercase())
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file: File = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);
        let wallets_bytes = serialize(&self.wallets)?;
        writer.write_all(wallets_bytes.as_slice())?;
        writer.flush()?;
        Ok(())
    }
}
