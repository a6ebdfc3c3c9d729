use std::collections::HashSet;

use log::{debug, info};
use serde::Deserialize;
use thiserror::Error;

use super::account::{AccountError, BalanceSheet};
use super::block::{Block, BlockError, ProofOfWork, GENESIS_PREVIOUS_HASH};
use super::crypto::Address;
use super::transaction::Transaction;

/// Errors that can occur while validating a chain.
///
/// Block numbers are 1-based positions in the chain being validated.
#[derive(Debug, Error)]
pub enum ChainIntegrityError {
    #[error("Chain contains no blocks")]
    EmptyChain,

    #[error("Block number {block_number} has mismatching previous hash with prior blocks hash")]
    PreviousHashMismatch { block_number: usize },

    #[error("Hash of block number {block_number} does not meet leading zeroes requirement")]
    InsufficientWork { block_number: usize },

    #[error("Stored hash of block number {block_number} does not match its contents")]
    HashMismatch { block_number: usize },

    #[error("Block at position {block_number} claims block number {found}")]
    BlockNumberMismatch { block_number: usize, found: u64 },

    #[error("Block number {block_number} is malformed: {source}")]
    MalformedBlock {
        block_number: usize,
        #[source]
        source: BlockError,
    },

    #[error("Transaction {id} in block number {block_number} does not match its contents")]
    TransactionIdMismatch { block_number: usize, id: String },

    #[error("Invalid transaction signature for transaction {id} in block number {block_number}")]
    InvalidSignature { block_number: usize, id: String },

    #[error("Public key ({public_key}) not associated with sender address ({sender}) in block number {block_number}")]
    KeyMismatch {
        block_number: usize,
        public_key: String,
        sender: Address,
    },

    #[error("Transaction {id} in block number {block_number} has non-positive amount {amount}")]
    NonPositiveAmount {
        block_number: usize,
        id: String,
        amount: i64,
    },

    #[error("Address {sender} can not afford transaction with id: {id} in block number {block_number}")]
    Unaffordable {
        block_number: usize,
        sender: Address,
        id: String,
    },

    #[error("Transaction {id} in block number {block_number} overflows the balance of {address}")]
    BalanceOverflow {
        block_number: usize,
        address: Address,
        id: String,
    },

    #[error("Transaction {id} in block number {block_number} already appears earlier in the chain")]
    DuplicateTransaction { block_number: usize, id: String },
}

/// A genesis credit: an unsigned transfer from nowhere to `address`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GenesisAllocation {
    pub address: Address,
    pub amount: i64,
}

impl GenesisAllocation {
    pub fn new(address: Address, amount: i64) -> Self {
        GenesisAllocation { address, amount }
    }
}

/// An ordered sequence of blocks, genesis first, mined under one proof of work
#[derive(Debug, Clone)]
pub struct Chain {
    blocks: Vec<Block>,
    pow: ProofOfWork,
}

impl Chain {
    /// Creates a chain holding only a freshly mined genesis block
    ///
    /// # Arguments
    ///
    /// * `pow` - The hash scheme and difficulty for every block of this chain
    /// * `allocations` - Genesis credits; ignored by schemes without transactions
    ///
    /// # Returns
    ///
    /// The new chain, or an error if the genesis block cannot be hashed
    pub fn new(pow: ProofOfWork, allocations: &[GenesisAllocation]) -> Result<Self, BlockError> {
        let transactions = if pow.scheme().carries_transactions() {
            allocations
                .iter()
                .map(|allocation| {
                    Transaction::genesis_allocation(allocation.address.clone(), allocation.amount)
                })
                .collect()
        } else {
            Vec::new()
        };

        let mut genesis = Block::new(1, GENESIS_PREVIOUS_HASH.to_string(), transactions);
        pow.mine(&mut genesis)?;
        info!("Mined genesis block with hash {}", genesis.hash);

        Ok(Chain {
            blocks: vec![genesis],
            pow,
        })
    }

    pub fn pow(&self) -> ProofOfWork {
        self.pow
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Mines a block on top of the current tip and appends it
    ///
    /// # Arguments
    ///
    /// * `transactions` - The transactions to include, in order
    ///
    /// # Returns
    ///
    /// A copy of the appended block
    pub fn mine_next(&mut self, transactions: Vec<Transaction>) -> Result<Block, BlockError> {
        let (block_number, previous_hash) = match self.blocks.last() {
            Some(last) => (last.block_number + 1, last.hash.clone()),
            None => (1, GENESIS_PREVIOUS_HASH.to_string()),
        };

        let mut block = Block::new(block_number, previous_hash, transactions);
        debug!(
            "Mining block {} with {} transactions at difficulty {}",
            block_number,
            block.transactions.len(),
            self.pow.difficulty()
        );
        self.pow.mine(&mut block)?;

        self.blocks.push(block.clone());
        Ok(block)
    }

    /// Swaps in a whole new block sequence
    pub fn replace_blocks(&mut self, blocks: Vec<Block>) {
        self.blocks = blocks;
    }

    pub fn validate(&self) -> Result<(), ChainIntegrityError> {
        validate_blocks(&self.pow, &self.blocks)
    }

    /// Validation as a success flag plus a human-readable reason
    pub fn is_valid(&self) -> (bool, String) {
        match self.validate() {
            Ok(()) => (true, "Chain is valid".to_string()),
            Err(err) => (false, err.to_string()),
        }
    }

    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.blocks.iter().flat_map(|block| block.transactions.iter())
    }

    /// Confirmed transactions in which `address` is sender or recipient
    pub fn transaction_history(&self, address: &Address) -> Vec<Transaction> {
        self.transactions()
            .filter(|tx| tx.involves(address))
            .cloned()
            .collect()
    }

    pub fn has_history(&self, address: &Address) -> bool {
        self.transactions().any(|tx| tx.involves(address))
    }

    /// Credits minus debits of `address` over every confirmed transaction,
    /// saturating at the bounds of `i64`
    pub fn confirmed_balance(&self, address: &Address) -> i64 {
        self.transactions().fold(0i64, |balance, tx| {
            let mut balance = balance;
            if &tx.sender == address {
                balance = balance.saturating_sub(tx.amount);
            }
            if &tx.recipient == address {
                balance = balance.saturating_add(tx.amount);
            }
            balance
        })
    }

    pub fn find_transaction(&self, id: &str) -> Option<&Transaction> {
        self.transactions().find(|tx| tx.id == id)
    }
}

/// Checks a block sequence from genesis to tip, stopping at the first problem.
///
/// Genesis is trusted: its allocations are credited without signature checks,
/// but its own work is still checked and every allocation must be positive. Every later block must, in order, link
/// to its predecessor's hash, carry enough work, have the right number, and
/// (for schemes with transactions) replay cleanly against balances accumulated
/// from scratch for this call.
///
/// A block's stored hash is checked by the link from its successor, so a
/// tampered hash is reported against the following block. The tip has no
/// successor and is compared with its own recomputed hash at the end.
///
/// A transaction id may appear only once across the whole chain. Balances
/// that would leave the range of `i64` are an error, never a wrap.
///
/// No check is made that two chains share a genesis block.
pub fn validate_blocks(pow: &ProofOfWork, blocks: &[Block]) -> Result<(), ChainIntegrityError> {
    let genesis = blocks.first().ok_or(ChainIntegrityError::EmptyChain)?;
    let mut balances = BalanceSheet::new();
    let mut seen = HashSet::new();

    if genesis.block_number != 1 {
        return Err(ChainIntegrityError::BlockNumberMismatch {
            block_number: 1,
            found: genesis.block_number,
        });
    }
    check_work(pow, genesis, 1)?;
    if pow.scheme().carries_transactions() {
        for tx in &genesis.transactions {
            check_id(tx, 1)?;
            check_unique(tx, 1, &mut seen)?;
            check_amount(tx, 1)?;
            balances
                .credit(&tx.recipient, tx.amount)
                .map_err(|err| account_error(err, tx, 1))?;
        }
    }

    for (index, pair) in blocks.windows(2).enumerate() {
        let (previous, block) = (&pair[0], &pair[1]);
        let block_number = index + 2;

        let previous_hash = recompute(pow, previous, block_number - 1)?;
        if block.previous_hash != previous_hash || block.previous_hash != previous.hash {
            return Err(ChainIntegrityError::PreviousHashMismatch { block_number });
        }

        check_work(pow, block, block_number)?;

        if block.block_number != block_number as u64 {
            return Err(ChainIntegrityError::BlockNumberMismatch {
                block_number,
                found: block.block_number,
            });
        }

        if pow.scheme().carries_transactions() {
            for tx in &block.transactions {
                check_unique(tx, block_number, &mut seen)?;
                replay_transaction(tx, block_number, &mut balances)?;
            }
        }
    }

    let block_number = blocks.len();
    if let Some(tip) = blocks.last() {
        if recompute(pow, tip, block_number)? != tip.hash {
            return Err(ChainIntegrityError::HashMismatch { block_number });
        }
    }

    Ok(())
}

fn recompute(pow: &ProofOfWork, block: &Block, block_number: usize) -> Result<String, ChainIntegrityError> {
    pow.hash(block)
        .map_err(|source| ChainIntegrityError::MalformedBlock { block_number, source })
}

fn check_work(pow: &ProofOfWork, block: &Block, block_number: usize) -> Result<(), ChainIntegrityError> {
    let hash = recompute(pow, block, block_number)?;
    if !pow.meets_target(&hash) {
        return Err(ChainIntegrityError::InsufficientWork { block_number });
    }
    Ok(())
}

fn check_id(tx: &Transaction, block_number: usize) -> Result<(), ChainIntegrityError> {
    if tx.id != tx.compute_id() {
        return Err(ChainIntegrityError::TransactionIdMismatch {
            block_number,
            id: tx.id.clone(),
        });
    }
    Ok(())
}

fn check_unique<'a>(
    tx: &'a Transaction,
    block_number: usize,
    seen: &mut HashSet<&'a str>,
) -> Result<(), ChainIntegrityError> {
    if !seen.insert(tx.id.as_str()) {
        return Err(ChainIntegrityError::DuplicateTransaction {
            block_number,
            id: tx.id.clone(),
        });
    }
    Ok(())
}

fn check_amount(tx: &Transaction, block_number: usize) -> Result<(), ChainIntegrityError> {
    if tx.amount <= 0 {
        return Err(ChainIntegrityError::NonPositiveAmount {
            block_number,
            id: tx.id.clone(),
            amount: tx.amount,
        });
    }
    Ok(())
}

fn account_error(err: AccountError, tx: &Transaction, block_number: usize) -> ChainIntegrityError {
    match err {
        AccountError::InsufficientFunds { .. } => ChainIntegrityError::Unaffordable {
            block_number,
            sender: tx.sender.clone(),
            id: tx.id.clone(),
        },
        AccountError::Overflow(address) => ChainIntegrityError::BalanceOverflow {
            block_number,
            address,
            id: tx.id.clone(),
        },
    }
}

fn replay_transaction(
    tx: &Transaction,
    block_number: usize,
    balances: &mut BalanceSheet,
) -> Result<(), ChainIntegrityError> {
    check_id(tx, block_number)?;

    if !tx.verify_signature() {
        return Err(ChainIntegrityError::InvalidSignature {
            block_number,
            id: tx.id.clone(),
        });
    }

    if !tx.sender_matches_key() {
        return Err(ChainIntegrityError::KeyMismatch {
            block_number,
            public_key: tx.public_key.clone(),
            sender: tx.sender.clone(),
        });
    }

    check_amount(tx, block_number)?;

    balances
        .transfer(&tx.sender, &tx.recipient, tx.amount)
        .map_err(|err| account_error(err, tx, block_number))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::block::HashScheme;
    use crate::blockchain::crypto::Wallet;

    fn currency_pow() -> ProofOfWork {
        ProofOfWork::new(HashScheme::Currency, 2)
    }

    fn signed(sender: &Wallet, recipient: &Address, amount: i64) -> Transaction {
        let mut tx = Transaction::new(
            sender.address().clone(),
            recipient.clone(),
            amount,
            sender.public_key().to_string(),
        );
        tx.sign(sender).unwrap();
        tx
    }

    /// genesis funds `faucet` with 1000, block 2 moves 100 to `recipient`
    fn funded_chain(faucet: &Wallet, recipient: &Address) -> Chain {
        let allocations = vec![GenesisAllocation::new(faucet.address().clone(), 1000)];
        let mut chain = Chain::new(currency_pow(), &allocations).unwrap();
        chain.mine_next(vec![signed(faucet, recipient, 100)]).unwrap();
        chain
    }

    #[test]
    fn test_new_chain() {
        for scheme in [HashScheme::Plain, HashScheme::Currency] {
            let chain = Chain::new(ProofOfWork::new(scheme, 2), &[]).unwrap();
            assert_eq!(chain.len(), 1);
            assert!(!chain.is_empty());
            assert_eq!(chain.blocks()[0].block_number, 1);
            assert_eq!(chain.blocks()[0].previous_hash, GENESIS_PREVIOUS_HASH);
            assert!(chain.validate().is_ok());
        }
    }

    #[test]
    fn test_plain_genesis_has_no_transactions() {
        let allocations = vec![GenesisAllocation::new(Address::from("faucet"), 1000)];
        let chain = Chain::new(ProofOfWork::new(HashScheme::Plain, 1), &allocations).unwrap();
        assert!(chain.blocks()[0].transactions.is_empty());
    }

    #[test]
    fn test_valid_chain_every_hash_has_prefix() {
        let pow = ProofOfWork::new(HashScheme::Plain, 3);
        let mut chain = Chain::new(pow, &[]).unwrap();
        for _ in 0..3 {
            chain.mine_next(Vec::new()).unwrap();
        }

        assert_eq!(chain.len(), 4);
        for (index, block) in chain.blocks().iter().enumerate() {
            assert!(block.hash.starts_with("000"));
            assert_eq!(block.block_number, index as u64 + 1);
        }
        assert_eq!(chain.is_valid(), (true, "Chain is valid".to_string()));
    }

    #[test]
    fn test_two_block_plain_chain_link() {
        let mut chain = Chain::new(ProofOfWork::new(HashScheme::Plain, 2), &[]).unwrap();
        let second = chain.mine_next(Vec::new()).unwrap();
        assert_eq!(second.previous_hash, chain.blocks()[0].hash);
        assert!(chain.validate().is_ok());

        let mut blocks = chain.blocks().to_vec();
        let flipped = if blocks[0].hash.ends_with('a') { 'b' } else { 'a' };
        blocks[0].hash.pop();
        blocks[0].hash.push(flipped);

        let mut tampered = chain.clone();
        tampered.replace_blocks(blocks);
        let (valid, reason) = tampered.is_valid();
        assert!(!valid);
        assert!(matches!(
            tampered.validate(),
            Err(ChainIntegrityError::PreviousHashMismatch { block_number: 2 })
        ));
        assert!(reason.contains("Block number 2"));
    }

    #[test]
    fn test_tampered_nonce_fails_work() {
        let mut chain = Chain::new(ProofOfWork::new(HashScheme::Plain, 3), &[]).unwrap();
        chain.mine_next(Vec::new()).unwrap();
        chain.mine_next(Vec::new()).unwrap();

        let mut blocks = chain.blocks().to_vec();
        blocks[2].nonce += 1;
        let result = validate_blocks(&chain.pow(), &blocks);
        // either the work or the stored hash gives it away
        assert!(matches!(
            result,
            Err(ChainIntegrityError::InsufficientWork { block_number: 3 })
                | Err(ChainIntegrityError::HashMismatch { block_number: 3 })
        ));
    }

    #[test]
    fn test_tampered_tip_hash() {
        let mut chain = Chain::new(ProofOfWork::new(HashScheme::Plain, 2), &[]).unwrap();
        chain.mine_next(Vec::new()).unwrap();

        let mut blocks = chain.blocks().to_vec();
        blocks[1].hash = format!("00{}", "f".repeat(62));
        assert!(matches!(
            validate_blocks(&chain.pow(), &blocks),
            Err(ChainIntegrityError::HashMismatch { block_number: 2 })
        ));
    }

    #[test]
    fn test_wrong_block_number() {
        let pow = ProofOfWork::new(HashScheme::Currency, 2);
        let mut chain = Chain::new(pow, &[]).unwrap();
        chain.mine_next(Vec::new()).unwrap();

        // re-mine block 2 under the wrong number so its work is genuine
        let mut blocks = chain.blocks().to_vec();
        let mut wrong = Block::new(5, blocks[0].hash.clone(), Vec::new());
        pow.mine(&mut wrong).unwrap();
        blocks[1] = wrong;

        assert!(matches!(
            validate_blocks(&pow, &blocks),
            Err(ChainIntegrityError::BlockNumberMismatch {
                block_number: 2,
                found: 5
            })
        ));
    }

    #[test]
    fn test_empty_chain() {
        assert!(matches!(
            validate_blocks(&currency_pow(), &[]),
            Err(ChainIntegrityError::EmptyChain)
        ));
    }

    #[test]
    fn test_malformed_previous_hash_is_reported() {
        let pow = ProofOfWork::new(HashScheme::Plain, 1);
        let mut chain = Chain::new(pow, &[]).unwrap();
        chain.mine_next(Vec::new()).unwrap();

        let mut blocks = chain.blocks().to_vec();
        blocks[0].previous_hash = "zz".to_string();
        assert!(matches!(
            validate_blocks(&pow, &blocks),
            Err(ChainIntegrityError::MalformedBlock { block_number: 1, .. })
        ));

        chain.replace_blocks(blocks);
        let (valid, reason) = chain.is_valid();
        assert!(!valid);
        assert!(reason.contains("malformed"));
    }

    #[test]
    fn test_single_block_chain_checks_stored_hash() {
        let chain = Chain::new(ProofOfWork::new(HashScheme::Plain, 2), &[]).unwrap();
        let mut blocks = chain.blocks().to_vec();
        blocks[0].hash = "00".to_string();
        assert!(matches!(
            validate_blocks(&chain.pow(), &blocks),
            Err(ChainIntegrityError::HashMismatch { block_number: 1 })
        ));
    }

    #[test]
    fn test_currency_chain_replays_balances() {
        let faucet = Wallet::generate().unwrap();
        let recipient = Wallet::generate().unwrap();
        let mut chain = funded_chain(&faucet, recipient.address());

        assert!(chain.validate().is_ok());
        assert_eq!(chain.confirmed_balance(faucet.address()), 900);
        assert_eq!(chain.confirmed_balance(recipient.address()), 100);

        // the recipient can spend what it received
        chain
            .mine_next(vec![signed(&recipient, faucet.address(), 100)])
            .unwrap();
        assert!(chain.validate().is_ok());
    }

    #[test]
    fn test_unaffordable_transaction() {
        let faucet = Wallet::generate().unwrap();
        let recipient = Wallet::generate().unwrap();
        let mut chain = funded_chain(&faucet, recipient.address());

        chain
            .mine_next(vec![signed(&recipient, faucet.address(), 101)])
            .unwrap();

        let err = chain.validate().unwrap_err();
        assert!(matches!(
            err,
            ChainIntegrityError::Unaffordable { block_number: 3, .. }
        ));
        assert!(err.to_string().contains("can not afford"));
    }

    #[test]
    fn test_tampered_amount_breaks_signature() {
        let faucet = Wallet::generate().unwrap();
        let recipient = Wallet::generate().unwrap();
        let chain = funded_chain(&faucet, recipient.address());

        let mut blocks = chain.blocks().to_vec();
        blocks[1].transactions[0].amount = 999;
        assert!(matches!(
            validate_blocks(&chain.pow(), &blocks),
            Err(ChainIntegrityError::TransactionIdMismatch { block_number: 2, .. })
        ));

        // keep the id in step so the signature check is what trips
        blocks[1].transactions[0].id = blocks[1].transactions[0].compute_id();
        let result = validate_blocks(&chain.pow(), &blocks);
        assert!(result.is_err());
    }

    #[test]
    fn test_tampered_signature() {
        let faucet = Wallet::generate().unwrap();
        let recipient = Wallet::generate().unwrap();
        let chain = funded_chain(&faucet, recipient.address());

        let mut blocks = chain.blocks().to_vec();
        let other = signed(&recipient, faucet.address(), 100);
        blocks[1].transactions[0].signature = other.signature;

        assert!(matches!(
            validate_blocks(&chain.pow(), &blocks),
            Err(ChainIntegrityError::InvalidSignature { block_number: 2, .. })
        ));
    }

    #[test]
    fn test_sender_must_match_public_key() {
        let faucet = Wallet::generate().unwrap();
        let impostor = Wallet::generate().unwrap();
        let allocations = vec![GenesisAllocation::new(faucet.address().clone(), 1000)];
        let mut chain = Chain::new(currency_pow(), &allocations).unwrap();

        // signed by the impostor's key but claiming the faucet as sender
        let mut tx = Transaction::new(
            faucet.address().clone(),
            impostor.address().clone(),
            10,
            impostor.public_key().to_string(),
        );
        tx.sign(&impostor).unwrap();
        chain.mine_next(vec![tx]).unwrap();

        assert!(matches!(
            chain.validate(),
            Err(ChainIntegrityError::KeyMismatch { block_number: 2, .. })
        ));
    }

    #[test]
    fn test_non_positive_amount_in_block() {
        let faucet = Wallet::generate().unwrap();
        let allocations = vec![GenesisAllocation::new(faucet.address().clone(), 1000)];
        let mut chain = Chain::new(currency_pow(), &allocations).unwrap();
        chain
            .mine_next(vec![signed(&faucet, &Address::from("x"), -5)])
            .unwrap();

        assert!(matches!(
            chain.validate(),
            Err(ChainIntegrityError::NonPositiveAmount { amount: -5, .. })
        ));
    }

    #[test]
    fn test_tampered_genesis_allocation() {
        let faucet = Wallet::generate().unwrap();
        let recipient = Wallet::generate().unwrap();
        let chain = funded_chain(&faucet, recipient.address());

        let mut blocks = chain.blocks().to_vec();
        blocks[0].transactions[0].amount = 1_000_000;
        assert!(matches!(
            validate_blocks(&chain.pow(), &blocks),
            Err(ChainIntegrityError::TransactionIdMismatch { block_number: 1, .. })
        ));
    }

    #[test]
    fn test_genesis_allocations_that_overflow() {
        let evil = Address::from("evil");
        let allocations = vec![
            GenesisAllocation::new(evil.clone(), i64::MAX),
            GenesisAllocation::new(evil.clone(), i64::MAX - 1),
        ];
        let chain = Chain::new(currency_pow(), &allocations).unwrap();

        let err = chain.validate().unwrap_err();
        assert!(matches!(
            err,
            ChainIntegrityError::BalanceOverflow { block_number: 1, ref address, .. } if address == &evil
        ));
        assert!(err.to_string().contains("overflows"));
        assert_eq!(chain.confirmed_balance(&evil), i64::MAX);
    }

    #[test]
    fn test_transfer_that_overflows_recipient() {
        let faucet = Wallet::generate().unwrap();
        let rich = Address::from("rich");
        let allocations = vec![
            GenesisAllocation::new(faucet.address().clone(), 10),
            GenesisAllocation::new(rich.clone(), i64::MAX),
        ];
        let mut chain = Chain::new(currency_pow(), &allocations).unwrap();
        chain.mine_next(vec![signed(&faucet, &rich, 5)]).unwrap();

        assert!(matches!(
            chain.validate(),
            Err(ChainIntegrityError::BalanceOverflow { block_number: 2, .. })
        ));
    }

    #[test]
    fn test_non_positive_genesis_allocation() {
        let allocations = vec![GenesisAllocation::new(Address::from("sink"), -1)];
        let chain = Chain::new(currency_pow(), &allocations).unwrap();

        assert!(matches!(
            chain.validate(),
            Err(ChainIntegrityError::NonPositiveAmount {
                block_number: 1,
                amount: -1,
                ..
            })
        ));
    }

    #[test]
    fn test_repeated_transaction_in_later_block() {
        let faucet = Wallet::generate().unwrap();
        let recipient = Wallet::generate().unwrap();
        let mut chain = funded_chain(&faucet, recipient.address());

        let replayed = chain.blocks()[1].transactions[0].clone();
        chain.mine_next(vec![replayed]).unwrap();

        let err = chain.validate().unwrap_err();
        assert!(matches!(
            err,
            ChainIntegrityError::DuplicateTransaction { block_number: 3, .. }
        ));
        assert!(err.to_string().contains("already appears"));
    }

    #[test]
    fn test_history_and_lookup() {
        let faucet = Wallet::generate().unwrap();
        let recipient = Wallet::generate().unwrap();
        let chain = funded_chain(&faucet, recipient.address());

        assert_eq!(chain.transaction_history(faucet.address()).len(), 2);
        assert_eq!(chain.transaction_history(recipient.address()).len(), 1);
        assert!(chain.has_history(recipient.address()));
        assert!(!chain.has_history(&Address::from("stranger")));

        let id = chain.blocks()[1].transactions[0].id.clone();
        assert!(chain.find_transaction(&id).is_some());
        assert!(chain.find_transaction("missing").is_none());
    }
}
