use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    account::AccountStore,
    clock::Clock,
    command::{TransferCommand, TransferCommandError},
    ledger::{Direction, LedgerStore, StoreError, TransactionRecord, UnitOfWork},
};

#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    Command(#[from] TransferCommandError),
    #[error("Incorrect account number or PIN")]
    AuthenticationFailed,
    #[error("Sender account `{0}` not found")]
    SenderNotFound(String),
    #[error("Receiver account `{0}` not found")]
    ReceiverNotFound(String),
    #[error("Insufficient balance: {available} available, {requested} requested")]
    InsufficientFunds {
        available: Decimal,
        requested: Decimal,
    },
    #[error("Balance of account `{0}` would overflow")]
    BalanceOverflow(String),
    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),
}

/// Stable, serializable name of a [`TransferError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransferErrorKind {
    InvalidAmount,
    SelfTransfer,
    AuthenticationFailed,
    SenderNotFound,
    ReceiverNotFound,
    InsufficientFunds,
    BalanceOverflow,
    StoreUnavailable,
}

impl TransferError {
    pub fn kind(&self) -> TransferErrorKind {
        match self {
            Self::Command(TransferCommandError::InvalidAmount(_)) => TransferErrorKind::InvalidAmount,
            Self::Command(TransferCommandError::SelfTransfer) => TransferErrorKind::SelfTransfer,
            Self::AuthenticationFailed => TransferErrorKind::AuthenticationFailed,
            Self::SenderNotFound(_) => TransferErrorKind::SenderNotFound,
            Self::ReceiverNotFound(_) => TransferErrorKind::ReceiverNotFound,
            Self::InsufficientFunds { .. } => TransferErrorKind::InsufficientFunds,
            Self::BalanceOverflow(_) => TransferErrorKind::BalanceOverflow,
            Self::StoreUnavailable(_) => TransferErrorKind::StoreUnavailable,
        }
    }

    /// Nothing was committed, so a retry of the same request is safe.
    /// Only store failures are worth retrying though; anything else will
    /// fail again until the input changes.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub sender: String,
    pub receiver: String,
    pub amount: Decimal,
    pub sender_balance_after: Decimal,
    pub receiver_balance_after: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Transfer result as handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<TransferErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&Result<TransferReceipt, TransferError>> for TransferOutcome {
    fn from(result: &Result<TransferReceipt, TransferError>) -> Self {
        match result {
            Ok(_) => Self {
                success: true,
                reason: None,
                message: None,
            },
            Err(err) => Self {
                success: false,
                reason: Some(err.kind()),
                message: Some(err.to_string()),
            },
        }
    }
}

/// Moves money between two accounts as one unit of work against the ledger.
pub struct TransferEngine<'a, L> {
    accounts: &'a AccountStore,
    ledger: &'a L,
    clock: &'a dyn Clock,
}

impl<'a, L> TransferEngine<'a, L>
where
    L: LedgerStore,
{
    pub fn new(accounts: &'a AccountStore, ledger: &'a L, clock: &'a dyn Clock) -> Self {
        Self {
            accounts,
            ledger,
            clock,
        }
    }

    /// Debits `sender`, credits `receiver` and appends the matching history
    /// records, or changes nothing at all.
    pub fn execute(
        &self,
        sender: &str,
        receiver: &str,
        amount: &str,
        pin: &str,
    ) -> Result<TransferReceipt, TransferError> {
        let result = self.try_execute(sender, receiver, amount, pin);
        match &result {
            Ok(receipt) => debug!(
                sender,
                receiver,
                amount = %receipt.amount,
                "transfer committed"
            ),
            Err(err) => warn!(
                sender,
                receiver,
                reason = ?err.kind(),
                retryable = err.is_retryable(),
                "transfer rejected: {err}"
            ),
        }
        result
    }

    fn try_execute(
        &self,
        sender: &str,
        receiver: &str,
        amount: &str,
        pin: &str,
    ) -> Result<TransferReceipt, TransferError> {
        let TransferCommand {
            sender,
            receiver,
            amount,
        } = TransferCommand::parse(sender, receiver, amount)?;

        if self.accounts.lookup_by_credentials(&sender, pin).is_none() {
            return Err(TransferError::AuthenticationFailed);
        }

        // Dropping `unit` on any early return rolls it back.
        let mut unit = self.ledger.begin();

        // Lock in identifier order, whatever the direction of the transfer,
        // so that A->B and B->A running together cannot deadlock.
        let (sender_entry, receiver_entry) = if sender < receiver {
            let sender_entry = unit.lock_for_update(&sender)?;
            (sender_entry, unit.lock_for_update(&receiver)?)
        } else {
            let receiver_entry = unit.lock_for_update(&receiver)?;
            (unit.lock_for_update(&sender)?, receiver_entry)
        };
        let Some(sender_entry) = sender_entry else {
            return Err(TransferError::SenderNotFound(sender));
        };
        let Some(receiver_entry) = receiver_entry else {
            return Err(TransferError::ReceiverNotFound(receiver));
        };

        let available = sender_entry.balance();
        if available < amount {
            return Err(TransferError::InsufficientFunds {
                available,
                requested: amount,
            });
        }

        let timestamp = self.clock.now();
        let Some(sender_balance_after) = available.checked_sub(amount) else {
            return Err(TransferError::BalanceOverflow(sender));
        };
        let Some(receiver_balance_after) = receiver_entry.balance().checked_add(amount) else {
            return Err(TransferError::BalanceOverflow(receiver));
        };
        let sender_balance_after = sender_balance_after.normalize();
        let receiver_balance_after = receiver_balance_after.normalize();
        unit.update(
            &sender,
            sender_balance_after,
            TransactionRecord::new(Direction::Sent, amount, timestamp, sender_balance_after),
        )?;
        unit.update(
            &receiver,
            receiver_balance_after,
            TransactionRecord::new(
                Direction::Received,
                amount,
                timestamp,
                receiver_balance_after,
            ),
        )?;
        unit.commit()?;

        Ok(TransferReceipt {
            sender,
            receiver,
            amount,
            sender_balance_after,
            receiver_balance_after,
            timestamp,
        })
    }
}
