use chrono::Local;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use super::crypto::{self, Address, CryptoError, Wallet};

/// Format of the creation timestamp. It is part of the signed data, so it
/// must be stable across nodes.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Errors that can occur during transaction operations
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("Transaction already signed")]
    AlreadySigned,

    #[error("Crypto error: {0}")]
    CryptoError(#[from] CryptoError),
}

/// Represents a transfer of value between two addresses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(from = "TransactionRecord")]
pub struct Transaction {
    /// Sender's address (empty for genesis allocations)
    pub sender: Address,

    /// Recipient's address
    pub recipient: Address,

    /// Amount being transferred
    pub amount: i64,

    /// Hex ECDSA signature over `transaction_data()`
    pub signature: Option<String>,

    /// Sender's public key, x-coordinate only
    pub public_key: String,

    /// Local creation time, `YYYY-MM-DD HH:MM:SS.ffffff`
    pub timestamp: String,

    /// sha256 of `transaction_data()`
    pub id: String,
}

/// Wire form of a transaction.
///
/// Signing requests leave out `signature`, `timestamp` and `id`, so all three
/// are optional here and filled in when converting.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TransactionRecord {
    pub sender: Address,
    pub recipient: Address,
    pub amount: i64,
    pub public_key: String,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

impl From<TransactionRecord> for Transaction {
    fn from(record: TransactionRecord) -> Self {
        let timestamp = record.timestamp.unwrap_or_else(current_timestamp);
        let mut transaction = Transaction::with_timestamp(
            record.sender,
            record.recipient,
            record.amount,
            record.public_key,
            timestamp,
        );
        transaction.signature = record.signature;
        if let Some(id) = record.id {
            transaction.id = id;
        }
        transaction
    }
}

fn current_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

impl Transaction {
    /// Creates a new unsigned transaction stamped with the current time
    ///
    /// # Arguments
    ///
    /// * `sender` - The address of the sender
    /// * `recipient` - The address of the recipient
    /// * `amount` - The amount to transfer
    /// * `public_key` - The sender's public key
    pub fn new(sender: Address, recipient: Address, amount: i64, public_key: String) -> Self {
        Self::with_timestamp(sender, recipient, amount, public_key, current_timestamp())
    }

    /// Creates a new unsigned transaction with an explicit timestamp
    pub fn with_timestamp(
        sender: Address,
        recipient: Address,
        amount: i64,
        public_key: String,
        timestamp: String,
    ) -> Self {
        let mut transaction = Transaction {
            sender,
            recipient,
            amount,
            signature: None,
            public_key,
            timestamp,
            id: String::new(),
        };
        transaction.id = transaction.compute_id();
        transaction
    }

    /// Creates an unsigned allocation with no sender, used only in genesis
    pub fn genesis_allocation(recipient: Address, amount: i64) -> Self {
        let mut transaction =
            Self::new(Address::default(), recipient, amount, String::new());
        transaction.signature = Some(String::new());
        transaction
    }

    /// The exact byte string that is hashed and signed: sender, recipient,
    /// amount and timestamp concatenated with no separators.
    pub fn transaction_data(&self) -> String {
        format!(
            "{}{}{}{}",
            self.sender, self.recipient, self.amount, self.timestamp
        )
    }

    pub fn compute_id(&self) -> String {
        crypto::sha256_hex(self.transaction_data().as_bytes())
    }

    /// Signs the transaction with the sender's wallet
    ///
    /// A signed transaction cannot be signed again.
    ///
    /// # Arguments
    ///
    /// * `wallet` - The wallet to sign with
    pub fn sign(&mut self, wallet: &Wallet) -> Result<(), TransactionError> {
        if self.signature.is_some() {
            return Err(TransactionError::AlreadySigned);
        }

        let signature = wallet.sign(self.transaction_data().as_bytes())?;
        self.signature = Some(signature);

        Ok(())
    }

    /// Checks the signature against `public_key`. Unsigned transactions and
    /// malformed signatures are simply invalid.
    pub fn verify_signature(&self) -> bool {
        match &self.signature {
            Some(signature) => crypto::verify_signature(
                &self.public_key,
                self.transaction_data().as_bytes(),
                signature,
            ),
            None => false,
        }
    }

    /// Whether `sender` is the address derived from `public_key`
    pub fn sender_matches_key(&self) -> bool {
        self.sender == crypto::public_to_address(&self.public_key)
    }

    pub fn involves(&self, address: &Address) -> bool {
        &self.sender == address || &self.recipient == address
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn transfer(sender: &Wallet, recipient: &Wallet, amount: i64) -> Transaction {
        Transaction::new(
            sender.address().clone(),
            recipient.address().clone(),
            amount,
            sender.public_key().to_string(),
        )
    }

    #[test]
    fn test_new_transaction() {
        let sender_wallet = Wallet::generate().unwrap();
        let recipient_wallet = Wallet::generate().unwrap();

        let transaction = transfer(&sender_wallet, &recipient_wallet, 10);

        assert_eq!(transaction.sender, *sender_wallet.address());
        assert_eq!(transaction.recipient, *recipient_wallet.address());
        assert_eq!(transaction.amount, 10);
        assert_eq!(transaction.id, transaction.compute_id());
        assert!(transaction.signature.is_none());
    }

    #[test]
    fn test_transaction_data_has_no_separators() {
        let transaction = Transaction::with_timestamp(
            Address::from("alice"),
            Address::from("bob"),
            100,
            "pk".to_string(),
            "2024-01-01 00:00:00.000000".to_string(),
        );

        assert_eq!(
            transaction.transaction_data(),
            "alicebob1002024-01-01 00:00:00.000000"
        );
        assert_eq!(
            transaction.id,
            crypto::sha256_hex(b"alicebob1002024-01-01 00:00:00.000000")
        );
    }

    #[test]
    fn test_timestamp_format() {
        let transaction = Transaction::new(Address::from("a"), Address::from("b"), 1, String::new());
        // e.g. 2024-01-01 12:00:00.123456
        assert_eq!(transaction.timestamp.len(), 26);
        assert_eq!(&transaction.timestamp[10..11], " ");
        assert_eq!(&transaction.timestamp[19..20], ".");
    }

    #[test]
    fn test_sign_transaction() {
        let sender_wallet = Wallet::generate().unwrap();
        let recipient_wallet = Wallet::generate().unwrap();
        let mut transaction = transfer(&sender_wallet, &recipient_wallet, 10);

        assert!(!transaction.verify_signature());

        transaction.sign(&sender_wallet).unwrap();
        assert!(transaction.signature.is_some());
        assert!(transaction.verify_signature());
        assert!(transaction.sender_matches_key());

        assert!(matches!(
            transaction.sign(&sender_wallet),
            Err(TransactionError::AlreadySigned)
        ));
    }

    #[test]
    fn test_tampered_transaction_fails_verification() {
        let sender_wallet = Wallet::generate().unwrap();
        let recipient_wallet = Wallet::generate().unwrap();
        let mut transaction = transfer(&sender_wallet, &recipient_wallet, 10);
        transaction.sign(&sender_wallet).unwrap();

        let mut tampered = transaction.clone();
        tampered.amount = 1000;
        assert!(!tampered.verify_signature());

        let mut tampered = transaction.clone();
        tampered.public_key = recipient_wallet.public_key().to_string();
        assert!(!tampered.verify_signature());

        let mut tampered = transaction;
        tampered.signature = Some("not a signature".to_string());
        assert!(!tampered.verify_signature());
    }

    #[test]
    fn test_serde_round_trip() {
        let sender_wallet = Wallet::generate().unwrap();
        let recipient_wallet = Wallet::generate().unwrap();
        let mut transaction = transfer(&sender_wallet, &recipient_wallet, 42);
        transaction.sign(&sender_wallet).unwrap();

        let value = serde_json::to_value(&transaction).unwrap();
        assert_eq!(value["public_key"], json!(sender_wallet.public_key()));
        assert_eq!(value["sender"], json!(sender_wallet.address().0));

        let decoded: Transaction = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(decoded, transaction);
        assert_eq!(serde_json::to_value(&decoded).unwrap(), value);
    }

    #[test]
    fn test_partial_record_is_completed() {
        let decoded: Transaction = serde_json::from_value(json!({
            "sender": "alice",
            "recipient": "bob",
            "amount": 5,
            "public_key": "pk",
        }))
        .unwrap();

        assert!(decoded.signature.is_none());
        assert!(!decoded.timestamp.is_empty());
        assert_eq!(decoded.id, decoded.compute_id());
    }

    #[test]
    fn test_supplied_id_is_kept() {
        let decoded: Transaction = serde_json::from_value(json!({
            "sender": "alice",
            "recipient": "bob",
            "amount": 5,
            "public_key": "pk",
            "signature": null,
            "timestamp": "2024-01-01 00:00:00.000000",
            "id": "deadbeef",
        }))
        .unwrap();

        assert_eq!(decoded.id, "deadbeef");
        assert_ne!(decoded.id, decoded.compute_id());
    }

    #[test]
    fn test_genesis_allocation() {
        let transaction = Transaction::genesis_allocation(Address::from("faucet"), 1000);
        assert_eq!(transaction.sender, Address::default());
        assert_eq!(transaction.signature.as_deref(), Some(""));
        assert!(transaction.public_key.is_empty());
        assert!(transaction.involves(&Address::from("faucet")));
    }
}
