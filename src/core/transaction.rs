// Transactions are immutable value objects: inputs consume earlier outputs, outputs create new ones.
// A transaction is identified by the SHA-256 of its canonical encoding (its content address).

use crate::core::{GENESIS_OWNER, GENESIS_REWARD, TRANSACTION_VERSION};
use crate::error::{LedgerError, Result};
use crate::utils::{
    current_timestamp, deserialize, ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify,
    serialize, sha256_digest,
};
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};

// A reference to output `output_index` of transaction `prev_txid`, plus the proof of ownership
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct TXInput {
    prev_txid: String,  // Hex identifier of the transaction that created the output
    output_index: u32,  // Position of the output in that transaction
    signature: Vec<u8>, // Signature over the transaction's signing digest
    pub_key: Vec<u8>,   // Claimed owner of the referenced output
}

impl TXInput {
    // Unsigned input; the signature is attached later by `Transaction::sign`
    pub fn new(prev_txid: &str, output_index: u32, pub_key: &[u8]) -> TXInput {
        TXInput {
            prev_txid: prev_txid.to_string(),
            output_index,
            signature: vec![],
            pub_key: pub_key.to_vec(),
        }
    }

    pub fn get_prev_txid(&self) -> &str {
        self.prev_txid.as_str()
    }

    pub fn get_output_index(&self) -> u32 {
        self.output_index
    }

    pub fn get_signature(&self) -> &[u8] {
        self.signature.as_slice()
    }

    pub fn get_pub_key(&self) -> &[u8] {
        self.pub_key.as_slice()
    }
}

#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct TXOutput {
    value: u64,
    pub_key: Vec<u8>,
}

impl TXOutput {
    pub fn new(value: u64, pub_key: &[u8]) -> TXOutput {
        TXOutput {
            value,
            pub_key: pub_key.to_vec(),
        }
    }

    pub fn get_value(&self) -> u64 {
        self.value
    }

    pub fn get_pub_key(&self) -> &[u8] {
        self.pub_key.as_slice()
    }

    pub fn is_locked_with_key(&self, pub_key: &[u8]) -> bool {
        self.pub_key.as_slice() == pub_key
    }

    pub fn to_spend(&self) -> Spend {
        Spend::new(self.value, &self.pub_key)
    }
}

/// A spendable output as stored in the UTXO index.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Spend {
    value: u64,
    pub_key: Vec<u8>,
}

impl Spend {
    pub fn new(value: u64, pub_key: &[u8]) -> Spend {
        Spend {
            value,
            pub_key: pub_key.to_vec(),
        }
    }

    pub fn get_value(&self) -> u64 {
        self.value
    }

    pub fn get_pub_key(&self) -> &[u8] {
        self.pub_key.as_slice()
    }

    pub fn is_owned_by(&self, pub_key: &[u8]) -> bool {
        self.pub_key.as_slice() == pub_key
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Spend> {
        deserialize(bytes)
    }
}

#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Transaction {
    version: u32,
    vin: Vec<TXInput>,
    vout: Vec<TXOutput>,
    timestamp: i64,
    fee: u64,
}

impl Transaction {
    pub fn new(vin: Vec<TXInput>, vout: Vec<TXOutput>, fee: u64) -> Result<Transaction> {
        Ok(Transaction {
            version: TRANSACTION_VERSION,
            vin,
            vout,
            timestamp: current_timestamp()?,
            fee,
        })
    }

    /// Builds a transaction with every field given explicitly.
    pub fn from_parts(
        version: u32,
        vin: Vec<TXInput>,
        vout: Vec<TXOutput>,
        timestamp: i64,
        fee: u64,
    ) -> Transaction {
        Transaction {
            version,
            vin,
            vout,
            timestamp,
            fee,
        }
    }

    // The reward transaction of a mined block: no inputs, one output to the miner.
    // It carries the block timestamp, which the chain keeps strictly increasing,
    // so coinbases to the same miner never collide on their identifier.
    pub fn new_coinbase_tx(miner_key: &[u8], reward: u64, timestamp: i64) -> Transaction {
        Transaction {
            version: TRANSACTION_VERSION,
            vin: vec![],
            vout: vec![TXOutput::new(reward, miner_key)],
            timestamp,
            fee: 0,
        }
    }

    /// The fixed transaction seeding the first block. Identical on every node.
    pub fn genesis() -> Transaction {
        Transaction {
            version: TRANSACTION_VERSION,
            vin: vec![],
            vout: vec![TXOutput::new(GENESIS_REWARD, GENESIS_OWNER)],
            timestamp: 0,
            fee: 0,
        }
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Transaction> {
        deserialize(bytes)
    }

    /// Hex SHA-256 of the canonical encoding, signatures included.
    pub fn id(&self) -> Result<String> {
        let encoded = self.serialize()?;
        Ok(HEXLOWER.encode(&sha256_digest(&encoded)))
    }

    /// Deduplication key used by the memory pool.
    pub fn pool_key(&self) -> Result<Vec<u8>> {
        self.serialize()
    }

    // Same transaction with every input signature cleared
    fn trimmed_copy(&self) -> Transaction {
        let mut tx_copy = self.clone();
        for input in tx_copy.vin.iter_mut() {
            input.signature = vec![];
        }
        tx_copy
    }

    /// Digest that input signatures commit to. Attaching signatures does not change it.
    pub fn signing_digest(&self) -> Result<Vec<u8>> {
        let encoded = self.trimmed_copy().serialize()?;
        Ok(sha256_digest(&encoded))
    }

    /// Signs every input with the given PKCS#8 key.
    pub fn sign(&mut self, pkcs8: &[u8]) -> Result<()> {
        let digest = self.signing_digest()?;
        let signature = ecdsa_p256_sha256_sign_digest(pkcs8, &digest)?;
        for input in self.vin.iter_mut() {
            input.signature = signature.clone();
        }
        Ok(())
    }

    /// Checks each input's signature against the key the input claims.
    pub fn verify_signatures(&self) -> Result<()> {
        let digest = self.signing_digest()?;
        for (idx, input) in self.vin.iter().enumerate() {
            if !ecdsa_p256_sha256_sign_verify(&input.pub_key, &input.signature, &digest) {
                return Err(LedgerError::InvalidTransaction(format!(
                    "bad signature on input {idx} spending {}:{}",
                    input.prev_txid, input.output_index
                )));
            }
        }
        Ok(())
    }

    pub fn is_coinbase(&self) -> bool {
        self.vin.is_empty()
    }

    pub fn get_version(&self) -> u32 {
        self.version
    }

    pub fn get_vin(&self) -> &[TXInput] {
        self.vin.as_slice()
    }

    pub fn get_vout(&self) -> &[TXOutput] {
        self.vout.as_slice()
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_fee(&self) -> u64 {
        self.fee
    }

    pub fn get_output_value(&self) -> Result<u64> {
        let mut total = 0u64;
        for vout in &self.vout {
            total = total
                .checked_add(vout.get_value())
                .ok_or_else(|| LedgerError::InvalidTransaction("Output value overflow".to_string()))?;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{new_key_pair, public_key_from_pkcs8};

    fn sample_tx() -> Transaction {
        Transaction::from_parts(
            1,
            vec![TXInput::new("aa", 0, b"alice")],
            vec![TXOutput::new(30, b"bob"), TXOutput::new(65, b"alice")],
            1_700_000_000_000,
            5,
        )
    }

    #[test]
    fn test_round_trip() {
        let tx = sample_tx();
        let decoded = Transaction::deserialize(&tx.serialize().unwrap()).unwrap();
        assert_eq!(tx, decoded);
        assert_eq!(tx.id().unwrap(), decoded.id().unwrap());
    }

    #[test]
    fn test_round_trip_empty_sequences() {
        let tx = Transaction::from_parts(1, vec![], vec![], 0, 0);
        let decoded = Transaction::deserialize(&tx.serialize().unwrap()).unwrap();
        assert_eq!(tx, decoded);
    }

    #[test]
    fn test_id_changes_with_any_field() {
        let base = sample_tx().id().unwrap();
        let variants = [
            Transaction::from_parts(2, sample_tx().vin, sample_tx().vout, 1_700_000_000_000, 5),
            Transaction::from_parts(1, vec![], sample_tx().vout, 1_700_000_000_000, 5),
            Transaction::from_parts(1, sample_tx().vin, vec![], 1_700_000_000_000, 5),
            Transaction::from_parts(1, sample_tx().vin, sample_tx().vout, 1, 5),
            Transaction::from_parts(1, sample_tx().vin, sample_tx().vout, 1_700_000_000_000, 6),
        ];
        for variant in variants {
            assert_ne!(variant.id().unwrap(), base);
        }
    }

    #[test]
    fn test_id_is_order_sensitive() {
        let tx = sample_tx();
        let mut outputs = tx.get_vout().to_vec();
        outputs.reverse();
        let swapped = Transaction::from_parts(1, tx.get_vin().to_vec(), outputs, 1_700_000_000_000, 5);
        assert_ne!(tx.id().unwrap(), swapped.id().unwrap());
    }

    #[test]
    fn test_signing_digest_stable_under_signing() {
        let pkcs8 = new_key_pair().unwrap();
        let pub_key = public_key_from_pkcs8(&pkcs8).unwrap();
        let mut tx = Transaction::from_parts(
            1,
            vec![TXInput::new("aa", 0, &pub_key)],
            vec![TXOutput::new(10, b"bob")],
            1,
            0,
        );

        let digest_before = tx.signing_digest().unwrap();
        let id_before = tx.id().unwrap();
        tx.sign(&pkcs8).unwrap();

        assert_eq!(tx.signing_digest().unwrap(), digest_before);
        assert_ne!(tx.id().unwrap(), id_before);
        assert!(tx.verify_signatures().is_ok());
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let signer = new_key_pair().unwrap();
        let other_pub = public_key_from_pkcs8(&new_key_pair().unwrap()).unwrap();
        let mut tx = Transaction::from_parts(
            1,
            vec![TXInput::new("aa", 0, &other_pub)],
            vec![TXOutput::new(10, b"bob")],
            1,
            0,
        );
        tx.sign(&signer).unwrap();
        assert!(matches!(
            tx.verify_signatures(),
            Err(LedgerError::InvalidTransaction(_))
        ));
    }

    #[test]
    fn test_genesis_is_fixed() {
        let genesis = Transaction::genesis();
        assert!(genesis.is_coinbase());
        assert_eq!(genesis.get_vout().len(), 1);
        assert_eq!(genesis.get_vout()[0].get_value(), GENESIS_REWARD);
        assert_eq!(genesis.id().unwrap(), Transaction::genesis().id().unwrap());
    }

    #[test]
    fn test_coinbase_shape() {
        let coinbase = Transaction::new_coinbase_tx(b"miner", 50, 42);
        assert!(coinbase.is_coinbase());
        assert_eq!(coinbase.get_fee(), 0);
        assert!(coinbase.get_vout()[0].is_locked_with_key(b"miner"));
        assert_ne!(
            coinbase.id().unwrap(),
            Transaction::new_coinbase_tx(b"miner", 50, 43).id().unwrap()
        );
    }
}
