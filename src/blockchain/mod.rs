// Blockchain module
//
// This module contains the ledger implementation including:
// - Wallets, addresses and signatures
// - Transactions and the pending pool
// - Blocks and the two proof-of-work hash schemes
// - Chain validation and balance replay
// - Longest-chain consensus with peers

pub mod account;
pub mod block;
pub mod chain;
pub mod consensus;
pub mod crypto;
pub mod ledger;
pub mod pool;
pub mod transaction;

// Re-export main components for easier access
pub use block::{Block, HashScheme, ProofOfWork};
pub use chain::GenesisAllocation;
pub use consensus::{ChainSnapshot, ConsensusEngine, HttpPeerFetcher};
pub use crypto::{Address, Wallet};
pub use ledger::Ledger;
pub use transaction::{Transaction, TransactionRecord};
