use crate::error::{LedgerError, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Settings used by the binary: `ledger.toml` in the working directory, then
/// environment overrides.
pub static GLOBAL_SETTINGS: Lazy<Settings> = Lazy::new(|| {
    Settings::load(None).unwrap_or_else(|e| {
        log::warn!("Falling back to default settings: {e}");
        Settings::default()
    })
});

pub const DEFAULT_CONFIG_FILE: &str = "ledger.toml";

const DATA_DIR_KEY: &str = "LEDGER_DATA_DIR";
const LOG_LEVEL_KEY: &str = "LEDGER_LOG_LEVEL";
const WALLET_FILE_KEY: &str = "LEDGER_WALLET_FILE";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub log_level: String,
    pub wallet_file: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            data_dir: PathBuf::from("data"),
            log_level: "info".to_string(),
            wallet_file: "wallet.dat".to_string(),
        }
    }
}

impl Settings {
    /// Defaults, overlaid by the TOML file at `path` (or `ledger.toml` if it
    /// exists), overlaid by `LEDGER_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Settings> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Settings::default(),
        };
        settings.apply_env();
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Settings> {
        let text = fs::read_to_string(path).map_err(|e| {
            LedgerError::Config(format!("Cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Settings> {
        Ok(toml::from_str(text)?)
    }

    fn apply_env(&mut self) {
        if let Ok(dir) = env::var(DATA_DIR_KEY) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(level) = env::var(LOG_LEVEL_KEY) {
            self.log_level = level;
        }
        if let Ok(file) = env::var(WALLET_FILE_KEY) {
            self.wallet_file = file;
        }
    }

    pub fn chain_db_path(&self) -> PathBuf {
        self.data_dir.join("chain")
    }

    pub fn wallet_path(&self) -> PathBuf {
        self.data_dir.join(&self.wallet_file)
    }

    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level
            .parse()
            .unwrap_or(log::LevelFilter::Info)
    }
}
