use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use ripemd::Ripemd160;
use secp256k1::{ecdsa::Signature, All, Message, PublicKey, Secp256k1, SecretKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use utoipa::ToSchema;

use std::fmt;

/// Shared secp256k1 context, built once.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// Parity prefixes of a compressed point, tried in this order when a
/// public key has been stored without its prefix byte.
const COMPRESSED_PREFIXES: [u8; 2] = [0x02, 0x03];

/// Errors that can occur during cryptographic operations
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),
}

/// Represents a wallet address (base58 of ripemd160(sha256(public key hex)))
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct Address(pub String);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Address(value.to_string())
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Address(value)
    }
}

/// A key pair plus the address derived from it.
///
/// All three values are hex/base58 strings so they can be handed to a client
/// unchanged. Nothing here is persisted.
#[derive(Clone)]
pub struct Wallet {
    private_key: String,
    public_key: String,
    address: Address,
}

impl Wallet {
    /// Creates a wallet from a freshly generated private key
    pub fn generate() -> Result<Self, CryptoError> {
        Self::from_private_key(&generate_private_key())
    }

    /// Rebuilds a wallet from a hex-encoded private key
    pub fn from_private_key(private_key: &str) -> Result<Self, CryptoError> {
        let public_key = private_to_public(private_key)?;
        let address = public_to_address(&public_key);

        Ok(Wallet {
            private_key: private_key.to_lowercase(),
            public_key,
            address,
        })
    }

    pub fn private_key(&self) -> &str {
        &self.private_key
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Signs a message with the wallet's private key, returning hex
    pub fn sign(&self, message: &[u8]) -> Result<String, CryptoError> {
        sign_message(&self.private_key, message)
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("public_key", &self.public_key)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Generates 32 random bytes that form a valid secp256k1 scalar, as hex.
pub fn generate_private_key() -> String {
    let secret = SecretKey::new(&mut OsRng);
    hex::encode(secret.secret_bytes())
}

/// Derives the public key for `private_key`.
///
/// The point is serialised compressed and then the parity byte is dropped, so
/// only the 32-byte x-coordinate is returned. Addresses are derived from this
/// exact string, so the prefix must stay stripped.
pub fn private_to_public(private_key: &str) -> Result<String, CryptoError> {
    let secret = parse_secret_key(private_key)?;
    let public = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret);
    Ok(hex::encode(&public.serialize()[1..]))
}

/// `base58(ripemd160(sha256(public_key_hex)))`, with no version byte and no checksum.
///
/// The hex string itself is hashed (its UTF-8 bytes), not the decoded key.
pub fn public_to_address(public_key: &str) -> Address {
    let sha = Sha256::digest(public_key.as_bytes());
    let ripemd = Ripemd160::digest(sha);
    Address(base58_encode(&ripemd))
}

/// Big-integer base58 conversion with the Bitcoin alphabet.
///
/// Leading zero bytes vanish in the integer conversion, so unlike Bitcoin's
/// encoding they are not emitted as `1`s.
pub fn base58_encode(data: &[u8]) -> String {
    let encoded = bs58::encode(data).into_string();
    encoded.trim_start_matches('1').to_string()
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// ECDSA over secp256k1 of `sha256(message)`; the compact `r || s` form, hex encoded.
///
/// The digest is SHA-256, not the SHA-1 that python-ecdsa's `sign()` uses by
/// default, so signatures from such clients do not verify here.
pub fn sign_message(private_key: &str, message: &[u8]) -> Result<String, CryptoError> {
    let secret = parse_secret_key(private_key)?;
    let signature = SECP256K1_CONTEXT.sign_ecdsa(&message_digest(message), &secret);
    Ok(hex::encode(signature.serialize_compact()))
}

/// Verifies a hex signature against a prefix-less public key.
///
/// Both parities of the x-coordinate are tried. Malformed hex, a point that is
/// not on the curve, or a bad signature all yield `false`.
pub fn verify_signature(public_key: &str, message: &[u8], signature: &str) -> bool {
    let Ok(signature_bytes) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut signature) = Signature::from_compact(&signature_bytes) else {
        return false;
    };
    signature.normalize_s();

    let Ok(x_only) = hex::decode(public_key) else {
        return false;
    };
    if x_only.len() != 32 {
        return false;
    }

    let digest = message_digest(message);
    COMPRESSED_PREFIXES.iter().any(|prefix| {
        let mut compressed = Vec::with_capacity(33);
        compressed.push(*prefix);
        compressed.extend_from_slice(&x_only);

        match PublicKey::from_slice(&compressed) {
            Ok(key) => SECP256K1_CONTEXT
                .verify_ecdsa(&digest, &signature, &key)
                .is_ok(),
            Err(_) => false,
        }
    })
}

fn message_digest(message: &[u8]) -> Message {
    let digest: [u8; 32] = Sha256::digest(message).into();
    Message::from_digest(digest)
}

fn parse_secret_key(private_key: &str) -> Result<SecretKey, CryptoError> {
    let bytes = hex::decode(private_key)
        .map_err(|e| CryptoError::DecodingError(format!("private key is not hex: {}", e)))?;

    SecretKey::from_slice(&bytes).map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))
}
