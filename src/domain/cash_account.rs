//! Append-only cash ledger.
//!
//! Entries are kept in settlement order behind a `parking_lot::RwLock`, so
//! every operation takes `&self` and many threads may append at once.
//! Entries with equal settlement keep their arrival order.

use chrono::NaiveDateTime;
use parking_lot::RwLock;
use rust_decimal::Decimal;

use super::error::FolioError;
use super::transaction::Transaction;

#[derive(Debug, Default, Clone)]
struct Ledger {
    entries: Vec<Transaction>,
    total: Decimal,
}

impl Ledger {
    /// Index a transaction settling at `at` is inserted at: after every
    /// entry settling at or before it.
    fn insertion_point(&self, at: NaiveDateTime) -> usize {
        self.entries.partition_point(|e| e.settlement() <= at)
    }

    /// Balance of the first `end` entries, taken off the cached total.
    /// Falls back to summing the prefix when the suffix sum overflows;
    /// every prefix is itself a recorded balance.
    fn balance_through(&self, end: usize) -> Decimal {
        let after = self.entries[end..]
            .iter()
            .try_fold(Decimal::ZERO, |acc, e| acc.checked_add(e.cash_flow()));
        match after {
            Some(after) => self.total - after,
            None => self.entries[..end].iter().map(Transaction::cash_flow).sum(),
        }
    }

    /// Whether inserting `tx` keeps the running balance non-negative from
    /// its insertion point onward. Earlier entries are unaffected and
    /// already non-negative. Fails when a running balance would overflow.
    fn keeps_balance(&self, tx: &Transaction) -> Result<bool, FolioError> {
        let overflow = || FolioError::invalid("amount", "cash balance would overflow");
        let at = self.insertion_point(tx.settlement());
        self.total.checked_add(tx.cash_flow()).ok_or_else(overflow)?;
        let mut running = self
            .balance_through(at)
            .checked_add(tx.cash_flow())
            .ok_or_else(overflow)?;
        if running < Decimal::ZERO {
            return Ok(false);
        }
        for e in &self.entries[at..] {
            running = running.checked_add(e.cash_flow()).ok_or_else(overflow)?;
            if running < Decimal::ZERO {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Callers check [`Ledger::keeps_balance`] first, which rules out
    /// overflow of the total.
    fn insert(&mut self, tx: Transaction) {
        let at = self.insertion_point(tx.settlement());
        self.total += tx.cash_flow();
        self.entries.insert(at, tx);
    }
}

#[derive(Debug, Default)]
pub struct CashAccount {
    ledger: RwLock<Ledger>,
}

impl Clone for CashAccount {
    fn clone(&self) -> Self {
        CashAccount {
            ledger: RwLock::new(self.ledger.read().clone()),
        }
    }
}

impl CashAccount {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deposit(&self, settlement: NaiveDateTime, amount: Decimal) -> Result<(), FolioError> {
        self.add(Transaction::deposit(settlement, amount)?)
    }

    pub fn withdraw(&self, settlement: NaiveDateTime, amount: Decimal) -> Result<(), FolioError> {
        self.add(Transaction::withdrawal(settlement, amount)?)
    }

    /// Record a deposit, withdrawal or dividend receipt. A withdrawal that
    /// would overdraw the account at any point is rejected.
    pub fn add(&self, tx: Transaction) -> Result<(), FolioError> {
        if !tx.order_type().is_cash() {
            return Err(FolioError::invalid(
                "transaction",
                format!("{} is not a cash transaction", tx.order_type()),
            ));
        }

        let mut ledger = self.ledger.write();
        if !ledger.keeps_balance(&tx)? {
            let balance = ledger.balance_through(ledger.insertion_point(tx.settlement()));
            tracing::warn!(
                date = %tx.settlement(),
                %balance,
                requested = %tx.cash_flow().abs(),
                "withdrawal rejected"
            );
            return Err(FolioError::InsufficientFunds {
                date: tx.settlement(),
                balance,
                requested: tx.cash_flow().abs(),
            });
        }
        ledger.insert(tx);
        Ok(())
    }

    /// Sum of every entry settled on or before `as_of`.
    pub fn balance(&self, as_of: NaiveDateTime) -> Decimal {
        let ledger = self.ledger.read();
        ledger.balance_through(ledger.insertion_point(as_of))
    }

    /// Whether adding `tx` would succeed. Never mutates the ledger; share
    /// transactions are never valid here.
    pub fn transaction_is_valid(&self, tx: &Transaction) -> bool {
        self.admits(tx).unwrap_or(false)
    }

    /// Like [`CashAccount::transaction_is_valid`], but reports an overflowing
    /// balance as an error instead of `false`.
    pub(crate) fn admits(&self, tx: &Transaction) -> Result<bool, FolioError> {
        if !tx.order_type().is_cash() {
            return Ok(false);
        }
        self.ledger.read().keeps_balance(tx)
    }

    /// Snapshot of the ledger in settlement order.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.ledger.read().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.ledger.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledger.read().entries.is_empty()
    }

    pub fn head(&self) -> Option<NaiveDateTime> {
        self.ledger.read().entries.first().map(Transaction::settlement)
    }

    pub fn tail(&self) -> Option<NaiveDateTime> {
        self.ledger.read().entries.last().map(Transaction::settlement)
    }
}
