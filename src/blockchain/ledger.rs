use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{info, warn};
use thiserror::Error;

use super::block::{Block, BlockError, ProofOfWork};
use super::chain::{Chain, GenesisAllocation};
use super::crypto::{public_to_address, Address, Wallet};
use super::pool::TransactionPool;
use super::transaction::{Transaction, TransactionError};

/// Genesis credit given to the node's own wallet
pub const NODE_WALLET_ALLOCATION: i64 = 1;

/// Business-rule rejections of a submitted transaction
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Transaction must be from a valid account")]
    UnknownSender,

    #[error("Cannot afford transaction")]
    InsufficientFunds { required: i64, available: i64 },

    #[error("Amount must be positive")]
    NonPositiveAmount,

    #[error("Public key ({public_key}) not associated with sender address ({sender}, hash={derived})")]
    KeyMismatch {
        public_key: String,
        sender: Address,
        derived: Address,
    },

    #[error("Invalid transaction signature for transaction {0}")]
    InvalidSignature(String),

    #[error("Transaction {0} is already pending")]
    Duplicate(String),

    #[error("Transaction {0} is already confirmed")]
    AlreadyConfirmed(String),

    #[error("This ledger does not carry transactions")]
    TransactionsUnsupported,
}

/// Errors that can occur during ledger operations
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error("Block error: {0}")]
    Block(#[from] BlockError),

    #[error("Transaction not found")]
    NotFound,

    #[error("Transaction not found in the pool")]
    NotInPool,
}

/// Where a transaction currently lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Pending,
    Confirmed,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "Transaction is pending in the pool"),
            TransactionStatus::Confirmed => write!(f, "Transaction is confirmed in the blockchain"),
        }
    }
}

struct LedgerState {
    chain: Chain,
    pool: TransactionPool,
}

/// The node's ledger: the chain, the pending pool and the node wallet.
///
/// Chain and pool sit behind one mutex. Every operation that reads and then
/// writes either of them (mining, admission, cancellation, chain replacement)
/// holds it for its whole duration, so a block is never mined while the pool
/// is being changed and a chain swap never interleaves with mining.
pub struct Ledger {
    state: Mutex<LedgerState>,
    wallet: Wallet,
}

impl Ledger {
    /// Creates a ledger with a freshly mined genesis block
    ///
    /// # Arguments
    ///
    /// * `pow` - The hash scheme and difficulty for this ledger's chain
    /// * `wallet` - The node's own wallet; it receives `NODE_WALLET_ALLOCATION` in genesis
    /// * `allocations` - Further genesis credits, placed before the wallet's
    pub fn new(
        pow: ProofOfWork,
        wallet: Wallet,
        allocations: &[GenesisAllocation],
    ) -> Result<Self, LedgerError> {
        let mut allocations = allocations.to_vec();
        allocations.push(GenesisAllocation::new(
            wallet.address().clone(),
            NODE_WALLET_ALLOCATION,
        ));

        let chain = Chain::new(pow, &allocations)?;
        info!(
            "Created {:?} ledger at difficulty {} for wallet {}",
            pow.scheme(),
            pow.difficulty(),
            wallet.address()
        );

        Ok(Ledger {
            state: Mutex::new(LedgerState {
                chain,
                pool: TransactionPool::new(),
            }),
            wallet,
        })
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        // The state is only mutated after every fallible step has succeeded,
        // so a panic elsewhere never leaves it half-written.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn pow(&self) -> ProofOfWork {
        self.state().chain.pow()
    }

    /// Copy of every block, genesis first
    pub fn chain(&self) -> Vec<Block> {
        self.state().chain.blocks().to_vec()
    }

    pub fn len(&self) -> usize {
        self.state().chain.len()
    }

    /// Always false once constructed; genesis is mined up front
    pub fn is_empty(&self) -> bool {
        self.state().chain.is_empty()
    }

    /// Copy of the pending transactions in arrival order
    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.state().pool.transactions().to_vec()
    }

    /// Mines every pending transaction into a new block
    ///
    /// The pool is emptied only once the block is on the chain. This blocks
    /// for as long as the proof-of-work search takes.
    ///
    /// # Returns
    ///
    /// The newly mined block
    pub fn create_block(&self) -> Result<Block, LedgerError> {
        let mut state = self.state();
        let transactions = state.pool.transactions().to_vec();

        let block = state.chain.mine_next(transactions)?;
        state.pool.drain();

        info!(
            "Mined block {} with {} transactions (nonce {}, hash {})",
            block.block_number,
            block.transactions.len(),
            block.nonce,
            block.hash
        );
        Ok(block)
    }

    /// Admits a transaction to the pool
    ///
    /// The sender must already appear in the confirmed chain, be able to
    /// afford `amount` after pending debits, send a positive amount, own the
    /// public key, and have signed the transaction with it.
    ///
    /// # Returns
    ///
    /// A confirmation message, or the first rule the transaction broke
    pub fn add_transaction(&self, transaction: Transaction) -> Result<String, LedgerError> {
        let mut state = self.state();

        if let Err(err) = Self::admit(&state, &transaction) {
            warn!("Rejected transaction {}: {}", transaction.id, err);
            return Err(err.into());
        }

        let id = transaction.id.clone();
        state.pool.insert(transaction);
        info!("Transaction {} added to pool", id);

        Ok(format!("Transaction {} successfully added to pool", id))
    }

    fn admit(state: &LedgerState, tx: &Transaction) -> Result<(), ValidationError> {
        if !state.chain.pow().scheme().carries_transactions() {
            return Err(ValidationError::TransactionsUnsupported);
        }

        if !state.chain.has_history(&tx.sender) {
            return Err(ValidationError::UnknownSender);
        }

        let available = Self::spendable(state, &tx.sender);
        if tx.amount > available {
            return Err(ValidationError::InsufficientFunds {
                required: tx.amount,
                available,
            });
        }

        if tx.amount <= 0 {
            return Err(ValidationError::NonPositiveAmount);
        }

        let derived = public_to_address(&tx.public_key);
        if tx.sender != derived {
            return Err(ValidationError::KeyMismatch {
                public_key: tx.public_key.clone(),
                sender: tx.sender.clone(),
                derived,
            });
        }

        if !tx.verify_signature() {
            return Err(ValidationError::InvalidSignature(tx.id.clone()));
        }

        if state.pool.contains(&tx.id) {
            return Err(ValidationError::Duplicate(tx.id.clone()));
        }

        if state.chain.find_transaction(&tx.id).is_some() {
            return Err(ValidationError::AlreadyConfirmed(tx.id.clone()));
        }

        Ok(())
    }

    /// Confirmed balance minus pending debits. Pending credits only count once mined.
    fn spendable(state: &LedgerState, address: &Address) -> i64 {
        state
            .chain
            .confirmed_balance(address)
            .saturating_sub(state.pool.pending_debits(address))
    }

    /// Signs a transfer from the node's own wallet and submits it
    pub fn sign_and_submit(&self, recipient: Address, amount: i64) -> Result<String, LedgerError> {
        let mut transaction = Transaction::new(
            self.wallet.address().clone(),
            recipient,
            amount,
            self.wallet.public_key().to_string(),
        );
        transaction.sign(&self.wallet)?;

        self.add_transaction(transaction)
    }

    pub fn get_balance(&self, address: &Address) -> i64 {
        Self::spendable(&self.state(), address)
    }

    /// Confirmed transactions in which `address` takes part
    pub fn transaction_history(&self, address: &Address) -> Vec<Transaction> {
        self.state().chain.transaction_history(address)
    }

    pub fn is_valid(&self) -> (bool, String) {
        self.state().chain.is_valid()
    }

    /// Looks in the pool first, then in the chain
    pub fn get_transaction_status(&self, id: &str) -> Result<TransactionStatus, LedgerError> {
        let state = self.state();

        if state.pool.contains(id) {
            return Ok(TransactionStatus::Pending);
        }
        if state.chain.find_transaction(id).is_some() {
            return Ok(TransactionStatus::Confirmed);
        }
        Err(LedgerError::NotFound)
    }

    /// Withdraws a pending transaction. Confirmed transactions cannot be cancelled.
    pub fn cancel_transaction(&self, id: &str) -> Result<Transaction, LedgerError> {
        let removed = self.state().pool.remove(id).ok_or(LedgerError::NotInPool)?;
        info!("Transaction {} cancelled", id);
        Ok(removed)
    }

    /// Runs `select` against the current chain under the ledger lock and, if
    /// it returns blocks, installs them as the new chain in one step.
    ///
    /// The pool is left as it is.
    pub fn replace_chain_with<F>(&self, select: F) -> bool
    where
        F: FnOnce(&Chain) -> Option<Vec<Block>>,
    {
        let mut state = self.state();

        match select(&state.chain) {
            Some(blocks) => {
                info!(
                    "Replacing local chain of length {} with chain of length {}",
                    state.chain.len(),
                    blocks.len()
                );
                state.chain.replace_blocks(blocks);
                true
            }
            None => false,
        }
    }
}
