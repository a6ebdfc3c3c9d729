use super::crypto::Address;
use super::transaction::Transaction;

/// Transactions admitted by the ledger but not yet mined.
///
/// Entries are unique by id and kept in arrival order, which is the order
/// they end up in the next block.
#[derive(Debug, Clone, Default)]
pub struct TransactionPool {
    transactions: Vec<Transaction>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a transaction; returns `false` if one with the same id is already pending
    pub fn insert(&mut self, transaction: Transaction) -> bool {
        if self.contains(&transaction.id) {
            return false;
        }
        self.transactions.push(transaction);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.transactions.iter().any(|tx| tx.id == id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Transaction> {
        let position = self.transactions.iter().position(|tx| tx.id == id)?;
        Some(self.transactions.remove(position))
    }

    /// Empties the pool, returning everything that was pending
    pub fn drain(&mut self) -> Vec<Transaction> {
        std::mem::take(&mut self.transactions)
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Sum of pending amounts sent by `address`, saturating at `i64::MAX`.
    /// Pending credits are not counted.
    pub fn pending_debits(&self, address: &Address) -> i64 {
        self.transactions
            .iter()
            .filter(|tx| &tx.sender == address)
            .fold(0i64, |total, tx| total.saturating_add(tx.amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transaction(sender: &str, recipient: &str, amount: i64, timestamp: &str) -> Transaction {
        Transaction::with_timestamp(
            Address::from(sender),
            Address::from(recipient),
            amount,
            String::new(),
            timestamp.to_string(),
        )
    }

    #[test]
    fn test_insert_rejects_duplicate_ids() {
        let mut pool = TransactionPool::new();
        let tx = transaction("a", "b", 5, "t1");

        assert!(pool.insert(tx.clone()));
        assert!(!pool.insert(tx.clone()));
        assert_eq!(pool.transactions().len(), 1);
        assert!(pool.contains(&tx.id));
    }

    #[test]
    fn test_remove_and_drain() {
        let mut pool = TransactionPool::new();
        let first = transaction("a", "b", 5, "t1");
        let second = transaction("a", "c", 6, "t2");
        pool.insert(first.clone());
        pool.insert(second.clone());

        assert_eq!(pool.remove(&first.id), Some(first.clone()));
        assert_eq!(pool.remove(&first.id), None);

        let drained = pool.drain();
        assert_eq!(drained, vec![second]);
        assert!(pool.transactions().is_empty());
    }

    #[test]
    fn test_pending_debits_ignore_credits() {
        let mut pool = TransactionPool::new();
        pool.insert(transaction("a", "b", 5, "t1"));
        pool.insert(transaction("a", "c", 7, "t2"));
        pool.insert(transaction("b", "a", 100, "t3"));

        assert_eq!(pool.pending_debits(&Address::from("a")), 12);
        assert_eq!(pool.pending_debits(&Address::from("b")), 100);
        assert_eq!(pool.pending_debits(&Address::from("c")), 0);

        pool.insert(transaction("a", "d", i64::MAX, "t4"));
        assert_eq!(pool.pending_debits(&Address::from("a")), i64::MAX);
    }

    #[test]
    fn test_drain_keeps_arrival_order() {
        let mut pool = TransactionPool::new();
        let ids: Vec<String> = (0..5)
            .map(|i| {
                let tx = transaction("a", "b", i + 1, &format!("t{}", i));
                let id = tx.id.clone();
                pool.insert(tx);
                id
            })
            .collect();

        let drained: Vec<String> = pool.drain().into_iter().map(|tx| tx.id).collect();
        assert_eq!(drained, ids);
    }
}
