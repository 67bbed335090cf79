use rust_decimal::Decimal;
use thiserror::Error;

use crate::ledger::{LedgerStore, StoreError, TransactionRecord};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Account `{0}` not found")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    #[error("Record {index} says the balance is {recorded}, replay gives {replayed}")]
    Mismatch {
        index: usize,
        recorded: Decimal,
        replayed: Decimal,
    },
    #[error("Replaying record {index} overflows the balance")]
    Overflow { index: usize },
}

/// Read-only view over committed ledger state.
pub struct QueryService<'a, L> {
    ledger: &'a L,
}

impl<'a, L> QueryService<'a, L>
where
    L: LedgerStore,
{
    pub fn new(ledger: &'a L) -> Self {
        Self { ledger }
    }

    pub fn get_balance(&self, account: &str) -> Result<Decimal, QueryError> {
        self.ledger
            .balance(account)?
            .ok_or_else(|| QueryError::NotFound(account.to_string()))
    }

    /// History oldest first.
    pub fn get_history(&self, account: &str) -> Result<Vec<TransactionRecord>, QueryError> {
        self.ledger
            .history(account)?
            .ok_or_else(|| QueryError::NotFound(account.to_string()))
    }
}

/// Applies `history` in order to an empty balance, checking each record's
/// `balance_after` along the way. Returns the final balance.
///
/// The opening `Received` record carries the starting balance, so for a
/// consistent account the result equals its current balance.
pub fn replay_history(history: &[TransactionRecord]) -> Result<Decimal, ReplayError> {
    history
        .iter()
        .enumerate()
        .try_fold(Decimal::ZERO, |balance, (index, record)| {
            let replayed = balance
                .checked_add(record.signed_amount())
                .ok_or(ReplayError::Overflow { index })?;
            if replayed == record.balance_after() {
                Ok(replayed)
            } else {
                Err(ReplayError::Mismatch {
                    index,
                    recorded: record.balance_after(),
                    replayed,
                })
            }
        })
}
