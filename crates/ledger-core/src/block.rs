use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::constants::{GENESIS_ADDRESS, GENESIS_ID_SIZE, GENESIS_SUPPLY, ROOT_HASH};
use crate::error::Result;

/// A value transfer. A transfer without a sender is a mint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub from_address: Option<String>,
    pub to_address: String,
    pub amount: u128,
}

impl Transaction {
    pub fn transfer(from: impl Into<String>, to: impl Into<String>, amount: u128) -> Self {
        Self {
            from_address: Some(from.into()),
            to_address: to.into(),
            amount,
        }
    }

    pub fn mint(to: impl Into<String>, amount: u128) -> Self {
        Self {
            from_address: None,
            to_address: to.into(),
            amount,
        }
    }

    pub fn is_mint(&self) -> bool {
        self.from_address.is_none()
    }
}

/// A request to have a candidate hash checked, recorded on chain as-is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    pub from_address: String,
    pub candidate_hash: String,
    pub timestamp: u64,
}

impl CheckRequest {
    /// Builds a request stamped with the current time.
    pub fn new(from: impl Into<String>, candidate_hash: impl Into<String>) -> Self {
        Self {
            from_address: from.into(),
            candidate_hash: candidate_hash.into(),
            timestamp: now_millis(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub index: u64,
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    pub requests: Vec<CheckRequest>,
    pub previous_hash: String,
    pub hash: String,
}

impl Block {
    /// Builds a block and fills in its content hash.
    pub fn seal(
        index: u64,
        timestamp: u64,
        transactions: Vec<Transaction>,
        requests: Vec<CheckRequest>,
        previous_hash: String,
    ) -> Result<Self> {
        let hash = canonical_hash(index, timestamp, &transactions, &requests, &previous_hash)?;
        Ok(Self {
            index,
            timestamp,
            transactions,
            requests,
            previous_hash,
            hash,
        })
    }

    /// Recomputes the content hash from this block's own fields.
    pub fn compute_hash(&self) -> Result<String> {
        canonical_hash(
            self.index,
            self.timestamp,
            &self.transactions,
            &self.requests,
            &self.previous_hash,
        )
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }
}

/// Pre-image fed to the block hash. Variable-length fields carry a u64 length
/// prefix so that no two distinct field tuples share a pre-image.
pub fn hash_bytes(
    index: u64,
    timestamp: u64,
    transactions: &[Transaction],
    requests: &[CheckRequest],
    previous_hash: &str,
) -> Result<Vec<u8>> {
    let txs = serde_json::to_vec(transactions)?;
    let reqs = serde_json::to_vec(requests)?;

    let mut bytes = Vec::with_capacity(8 * 5 + txs.len() + reqs.len() + previous_hash.len());
    bytes.extend_from_slice(&index.to_le_bytes());
    bytes.extend_from_slice(&timestamp.to_le_bytes());
    for field in [txs.as_slice(), reqs.as_slice(), previous_hash.as_bytes()] {
        bytes.extend_from_slice(&(field.len() as u64).to_le_bytes());
        bytes.extend_from_slice(field);
    }
    Ok(bytes)
}

/// SHA-256 of [`hash_bytes`], lowercase hex.
pub fn canonical_hash(
    index: u64,
    timestamp: u64,
    transactions: &[Transaction],
    requests: &[CheckRequest],
    previous_hash: &str,
) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(hash_bytes(
        index,
        timestamp,
        transactions,
        requests,
        previous_hash,
    )?);
    Ok(hex::encode(hasher.finalize()))
}

/// The first block of every chain: a single mint of the full supply to the
/// bridge address. Its hash is a random identifier, not a content hash.
pub fn genesis_block() -> Block {
    Block {
        index: 0,
        timestamp: now_millis(),
        transactions: vec![Transaction::mint(GENESIS_ADDRESS, GENESIS_SUPPLY)],
        requests: vec![],
        previous_hash: ROOT_HASH.to_string(),
        hash: random_id(),
    }
}

fn random_id() -> String {
    let bytes: [u8; GENESIS_ID_SIZE] = rand::thread_rng().gen();
    hex::encode(bytes)
}

/// Milliseconds since the unix epoch; zero if the clock is before it.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::HASH_HEX_SIZE;

    fn sample_block() -> Block {
        Block::seal(
            1,
            1_600_000_000_000,
            vec![
                Transaction::transfer("Alice", "Bob", 10),
                Transaction::mint("miner", 50),
            ],
            vec![CheckRequest {
                from_address: "Alice".to_string(),
                candidate_hash: "deadbeef".to_string(),
                timestamp: 1_599_999_999_000,
            }],
            "abc123".to_string(),
        )
        .unwrap()
    }

    #[test]
    fn sealed_hash_matches_recomputed_hash() {
        let block = sample_block();
        assert_eq!(block.hash.len(), HASH_HEX_SIZE);
        assert_eq!(block.compute_hash().unwrap(), block.hash);
    }

    #[test]
    fn hash_changes_with_each_field() {
        let block = sample_block();

        let mut other = block.clone();
        other.timestamp += 1;
        assert_ne!(other.compute_hash().unwrap(), block.hash);

        let mut other = block.clone();
        other.transactions[0].amount = 11;
        assert_ne!(other.compute_hash().unwrap(), block.hash);

        let mut other = block.clone();
        other.requests.clear();
        assert_ne!(other.compute_hash().unwrap(), block.hash);

        let mut other = block.clone();
        other.previous_hash = "abc124".to_string();
        assert_ne!(other.compute_hash().unwrap(), block.hash);
    }

    #[test]
    fn length_prefixes_separate_adjacent_fields() {
        let a = hash_bytes(1, 2, &[], &[], "ab").unwrap();
        let b = hash_bytes(1, 2, &[], &[], "a").unwrap();
        assert_ne!(a, b);
        // index + timestamp + three length prefixes + "[]" + "[]" + "ab"
        assert_eq!(a.len(), 8 + 8 + 8 + 2 + 8 + 2 + 8 + 2);
        assert_eq!(&a[0..8], &1u64.to_le_bytes());
        assert_eq!(&a[8..16], &2u64.to_le_bytes());
    }

    #[test]
    fn genesis_block_example() {
        let genesis = genesis_block();
        assert_eq!(genesis.index, 0);
        assert!(genesis.is_genesis());
        assert_eq!(genesis.previous_hash, ROOT_HASH);
        assert_eq!(genesis.hash.len(), GENESIS_ID_SIZE * 2);
        assert_eq!(
            genesis.transactions,
            vec![Transaction::mint(GENESIS_ADDRESS, GENESIS_SUPPLY)]
        );
        assert!(genesis.requests.is_empty());
        // Two genesis blocks never share an identifier.
        assert_ne!(genesis.hash, genesis_block().hash);
    }

    #[test]
    fn block_serializes_with_camel_case_fields() {
        let block = sample_block();
        let value = serde_json::to_value(&block).unwrap();
        let obj = value.as_object().unwrap();
        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            ["hash", "index", "previousHash", "requests", "timestamp", "transactions"]
        );
        assert_eq!(value["transactions"][1]["fromAddress"], serde_json::Value::Null);
        assert_eq!(value["requests"][0]["candidateHash"], "deadbeef");
    }

    #[test]
    fn transaction_without_sender_deserializes_as_mint() {
        let tx: Transaction = serde_json::from_str(r#"{"toAddress":"m","amount":50}"#).unwrap();
        assert!(tx.is_mint());
        let tx: Transaction =
            serde_json::from_str(r#"{"fromAddress":"a","toAddress":"b","amount":10}"#).unwrap();
        assert_eq!(tx, Transaction::transfer("a", "b", 10));
    }

    #[test]
    fn genesis_supply_survives_json() {
        let genesis = genesis_block();
        let json = serde_json::to_string_pretty(&genesis).unwrap();
        let back: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(back, genesis);
    }
}
