use crate::error::{LedgerError, Result};
use crate::utils::{new_key_pair, public_key_from_pkcs8};
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};

/// An owner identity: a P-256 private key (PKCS#8) and its public key.
/// The public key bytes are what outputs are locked to.
#[derive(Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Wallet {
    pkcs8: Vec<u8>,
    public_key: Vec<u8>,
}

impl Wallet {
    pub fn new() -> Result<Wallet> {
        let pkcs8 = new_key_pair()?;
        let public_key = public_key_from_pkcs8(&pkcs8)?;
        Ok(Wallet { pkcs8, public_key })
    }

    pub fn get_public_key(&self) -> &[u8] {
        self.public_key.as_slice()
    }

    pub fn get_pkcs8(&self) -> &[u8] {
        self.pkcs8.as_slice()
    }

    /// Hex form of the public key, as shown on the command line.
    pub fn get_owner_key(&self) -> String {
        HEXLOWER.encode(&self.public_key)
    }
}

pub fn decode_owner_key(owner_key: &str) -> Result<Vec<u8>> {
    HEXLOWER
        .decode(owner_key.to_lowercase().as_bytes())
        .map_err(|e| LedgerError::InvalidTransaction(format!("Invalid owner key {owner_key}: {e}")))
}
