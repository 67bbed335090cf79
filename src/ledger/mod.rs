use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::account::AccountId;

pub mod in_memory_store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Sent,
    Received,
}

/// One line of an account's history. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    #[serde(rename = "type")]
    direction: Direction,
    #[serde(with = "rust_decimal::serde::float")]
    amount: Decimal,
    #[serde(rename = "date")]
    timestamp: DateTime<Utc>,
    #[serde(with = "rust_decimal::serde::float")]
    balance_after: Decimal,
}

impl TransactionRecord {
    pub fn new(
        direction: Direction,
        amount: Decimal,
        timestamp: DateTime<Utc>,
        balance_after: Decimal,
    ) -> Self {
        Self {
            direction,
            amount,
            timestamp,
            balance_after,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn balance_after(&self) -> Decimal {
        self.balance_after
    }

    /// Effect of this record on the owning account's balance.
    pub fn signed_amount(&self) -> Decimal {
        match self.direction {
            Direction::Sent => -self.amount,
            Direction::Received => self.amount,
        }
    }
}

/// Balance plus chronological (oldest first) history of one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    balance: Decimal,
    history: Vec<TransactionRecord>,
}

impl LedgerEntry {
    /// Entry as created at provisioning: the starting balance arrives as a
    /// single `Received` record. An account opened empty has no history.
    pub fn opening(starting_balance: Decimal, at: DateTime<Utc>) -> Self {
        let history = if starting_balance > Decimal::ZERO {
            vec![TransactionRecord::new(
                Direction::Received,
                starting_balance,
                at,
                starting_balance,
            )]
        } else {
            Vec::new()
        };
        Self {
            balance: starting_balance,
            history,
        }
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn history(&self) -> &[TransactionRecord] {
        &self.history
    }

    pub(crate) fn append(
        &mut self,
        balance: Decimal,
        records: impl IntoIterator<Item = TransactionRecord>,
    ) {
        self.balance = balance;
        self.history.extend(records);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Timed out after {timeout:?} waiting for the lock on account `{account}`")]
    LockTimeout { account: AccountId, timeout: Duration },
    #[error("Account `{account}` is already locked by this unit of work")]
    AlreadyLocked { account: AccountId },
    #[error("Account `{account}` must be locked before it is updated")]
    NotLocked { account: String },
    #[error("Ledger entry for `{account}` already exists")]
    DuplicateEntry { account: AccountId },
    #[error("Ledger store unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Durable home of every account's [`LedgerEntry`].
///
/// Writers go through a [`UnitOfWork`]; the read accessors only ever observe
/// committed state.
pub trait LedgerStore: Send + Sync {
    type Unit<'a>: UnitOfWork
    where
        Self: 'a;

    fn begin(&self) -> Self::Unit<'_>;

    /// Provisioning only, transfers never create entries.
    fn create_initial(
        &self,
        account: &AccountId,
        starting_balance: Decimal,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    fn balance(&self, account: &str) -> Result<Option<Decimal>, StoreError>;

    fn history(&self, account: &str) -> Result<Option<Vec<TransactionRecord>>, StoreError>;
}

/// All-or-nothing batch of ledger writes.
///
/// Dropping a unit of work without calling [`UnitOfWork::commit`] rolls it
/// back: nothing staged becomes visible and every held lock is released.
pub trait UnitOfWork {
    /// Takes the exclusive write-intent lock on `account` and returns its
    /// current state, or `None` when no such entry exists. Blocks while
    /// another unit of work holds the same lock.
    fn lock_for_update(&mut self, account: &str) -> Result<Option<LedgerEntry>, StoreError>;

    /// Stages a new balance and appends `record` to the history of a locked
    /// account. Visible to others only after commit.
    fn update(
        &mut self,
        account: &str,
        new_balance: Decimal,
        record: TransactionRecord,
    ) -> Result<(), StoreError>;

    fn commit(self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal::prelude::FromPrimitive;
    use serde_json::json;

    use super::*;

    #[test]
    fn record_serialized_shape() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let record = TransactionRecord::new(
            Direction::Sent,
            Decimal::new(3005, 1),
            at,
            Decimal::new(6995, 1),
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "Sent",
                "amount": 300.5,
                "date": "2024-03-01T12:30:00Z",
                "balanceAfter": 699.5,
            })
        );

        let parsed: TransactionRecord = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn read_history_written_elsewhere() {
        let raw = r#"[{"type":"Received","amount":1000,"date":"2024-03-01T12:30:00.000Z","balanceAfter":1000}]"#;
        let history: Vec<TransactionRecord> = serde_json::from_str(raw).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].direction(), Direction::Received);
        assert_eq!(history[0].amount(), Decimal::from_u32(1000).unwrap());
        assert_eq!(history[0].balance_after(), Decimal::from_u32(1000).unwrap());
    }

    #[test]
    fn opening_entry() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut entry = LedgerEntry::opening(Decimal::ONE_THOUSAND, at);
        assert_eq!(entry.balance(), Decimal::ONE_THOUSAND);
        assert_eq!(entry.history().len(), 1);
        assert_eq!(entry.history()[0].signed_amount(), Decimal::ONE_THOUSAND);

        let sent = TransactionRecord::new(
            Direction::Sent,
            Decimal::ONE_HUNDRED,
            at,
            Decimal::from_u32(900).unwrap(),
        );
        assert_eq!(sent.signed_amount(), -Decimal::ONE_HUNDRED);
        entry.append(sent.balance_after(), [sent.clone()]);
        assert_eq!(entry.balance(), Decimal::from_u32(900).unwrap());
        assert_eq!(entry.history().last(), Some(&sent));
    }

    #[test]
    fn empty_opening_entry_has_no_record() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let entry = LedgerEntry::opening(Decimal::ZERO, at);
        assert_eq!(entry.balance(), Decimal::ZERO);
        assert!(entry.history().is_empty());
    }
}
