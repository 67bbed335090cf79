use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

/// Amounts are held in minor units of a two-decimal currency.
pub const MAX_AMOUNT_SCALE: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("`{input}` is not a valid amount")]
    Unparseable { input: String },
    #[error("Amount must be positive, got {amount}")]
    NotPositive { amount: Decimal },
    #[error("Amount {amount} has more than 2 decimal places")]
    TooPrecise { amount: Decimal },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferCommandError {
    #[error(transparent)]
    InvalidAmount(#[from] AmountError),
    #[error("Cannot transfer to the same account")]
    SelfTransfer,
}

/// Parses a caller supplied amount into an exact decimal.
///
/// Surrounding whitespace is ignored, trailing zeros are dropped
/// (`"300.00"` becomes `300`).
pub fn parse_amount(input: &str) -> Result<Decimal, AmountError> {
    let trimmed = input.trim();
    let amount = Decimal::from_str(trimmed).map_err(|_| AmountError::Unparseable {
        input: trimmed.to_string(),
    })?;
    if amount <= Decimal::ZERO {
        return Err(AmountError::NotPositive { amount });
    }
    let amount = amount.normalize();
    if amount.scale() > MAX_AMOUNT_SCALE {
        return Err(AmountError::TooPrecise { amount });
    }
    Ok(amount)
}

/// Transfer request whose shape has been validated, but not yet checked
/// against the account or ledger stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferCommand {
    pub sender: String,
    pub receiver: String,
    pub amount: Decimal,
}

impl TransferCommand {
    pub fn parse(sender: &str, receiver: &str, amount: &str) -> Result<Self, TransferCommandError> {
        let amount = parse_amount(amount)?;
        if sender == receiver {
            return Err(TransferCommandError::SelfTransfer);
        }
        Ok(Self {
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            amount,
        })
    }
}
