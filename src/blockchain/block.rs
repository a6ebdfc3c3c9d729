use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use super::crypto::sha256_hex;
use super::transaction::Transaction;

/// `previous_hash` carried by the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "0";

#[derive(Debug, Error)]
pub enum BlockError {
    #[error("previous hash {0:?} is not a base-16 integer")]
    MalformedPreviousHash(String),
}

/// Represents a block in the blockchain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Block {
    /// 1-based position of the block in the chain
    pub block_number: u64,

    /// Hash of the previous block, `0` for genesis
    #[serde(with = "previous_hash")]
    pub previous_hash: String,

    /// Transactions included in this block
    #[serde(default)]
    pub transactions: Vec<Transaction>,

    /// Proof of work
    pub nonce: u64,

    /// Hash of the block, found by mining
    pub hash: String,
}

impl Block {
    /// Creates an unmined block. `nonce` and `hash` are set by `ProofOfWork::mine`.
    pub fn new(block_number: u64, previous_hash: String, transactions: Vec<Transaction>) -> Self {
        Block {
            block_number,
            previous_hash,
            transactions,
            nonce: 0,
            hash: String::new(),
        }
    }
}

/// Genesis stores its previous hash as the number `0` on the wire, every
/// other block as a hex string. Both forms are accepted when reading.
mod previous_hash {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::GENESIS_PREVIOUS_HASH;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Number(u64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &str, serializer: S) -> Result<S::Ok, S::Error> {
        if value == GENESIS_PREVIOUS_HASH {
            0u64.serialize(serializer)
        } else {
            value.serialize(serializer)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(match Wire::deserialize(deserializer)? {
            Wire::Number(number) => number.to_string(),
            Wire::Text(text) => text,
        })
    }
}

/// The two block-hash formulas. They are separate protocol versions: a chain
/// is mined and validated with exactly one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HashScheme {
    /// `sha256(str(nonce² - int(previous_hash, 16)² - block_number²))`, no transactions
    Plain,
    /// `sha256(block_number || nonce || previous_hash || transaction ids)`
    Currency,
}

impl HashScheme {
    pub fn default_difficulty(self) -> usize {
        match self {
            HashScheme::Plain => 4,
            HashScheme::Currency => 5,
        }
    }

    pub fn carries_transactions(self) -> bool {
        matches!(self, HashScheme::Currency)
    }
}

/// Hash input with everything except the nonce already folded in, so the
/// mining loop does not redo the big-integer work on each attempt.
enum Preimage {
    Plain { offset: BigInt },
    Currency { head: String, tail: String },
}

impl Preimage {
    fn prepare(scheme: HashScheme, block: &Block) -> Result<Self, BlockError> {
        match scheme {
            HashScheme::Plain => {
                let previous = BigInt::parse_bytes(block.previous_hash.as_bytes(), 16)
                    .ok_or_else(|| BlockError::MalformedPreviousHash(block.previous_hash.clone()))?;
                let number = BigInt::from(block.block_number);
                Ok(Preimage::Plain {
                    offset: &previous * &previous + &number * &number,
                })
            }
            HashScheme::Currency => {
                let ids: String = block.transactions.iter().map(|tx| tx.id.as_str()).collect();
                Ok(Preimage::Currency {
                    head: block.block_number.to_string(),
                    tail: format!("{}{}", block.previous_hash, ids),
                })
            }
        }
    }

    fn digest(&self, nonce: u64) -> String {
        match self {
            Preimage::Plain { offset } => {
                let nonce = BigInt::from(nonce);
                let value = &nonce * &nonce - offset;
                sha256_hex(value.to_string().as_bytes())
            }
            Preimage::Currency { head, tail } => {
                sha256_hex(format!("{}{}{}", head, nonce, tail).as_bytes())
            }
        }
    }
}

/// Hash scheme plus the number of leading zero hex digits a block hash needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofOfWork {
    scheme: HashScheme,
    difficulty: usize,
}

impl ProofOfWork {
    pub fn new(scheme: HashScheme, difficulty: usize) -> Self {
        ProofOfWork { scheme, difficulty }
    }

    pub fn scheme(&self) -> HashScheme {
        self.scheme
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    /// Recomputes the hash of `block` from its fields and current nonce
    pub fn hash(&self, block: &Block) -> Result<String, BlockError> {
        Ok(Preimage::prepare(self.scheme, block)?.digest(block.nonce))
    }

    pub fn meets_target(&self, hash: &str) -> bool {
        hash.len() >= self.difficulty && hash.bytes().take(self.difficulty).all(|b| b == b'0')
    }

    /// Searches nonces upward from 1 until the hash meets the target, then
    /// stores both on the block.
    ///
    /// There is no iteration limit; expect about 16^difficulty attempts. This
    /// blocks the calling thread for the whole search.
    pub fn mine(&self, block: &mut Block) -> Result<(), BlockError> {
        let preimage = Preimage::prepare(self.scheme, block)?;
        let mut nonce = 1u64;

        loop {
            let hash = preimage.digest(nonce);
            if self.meets_target(&hash) {
                block.nonce = nonce;
                block.hash = hash;
                return Ok(());
            }
            nonce += 1;
        }
    }
}
