use std::{str::FromStr, time::Duration};

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

/// Balance every account is provisioned with unless configured otherwise.
pub const STARTING_BALANCE: Decimal = Decimal::ONE_THOUSAND;

const STARTING_BALANCE_VAR: &str = "LEDGER_STARTING_BALANCE";
const LOCK_TIMEOUT_VAR: &str = "LEDGER_LOCK_TIMEOUT_MS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}=`{value}` is not valid: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LedgerConfig {
    /// Balance of a freshly provisioned account.
    #[serde(with = "rust_decimal::serde::float")]
    pub starting_balance: Decimal,
    /// How long a transfer waits for an account lock before giving up.
    pub lock_timeout_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            starting_balance: STARTING_BALANCE,
            lock_timeout_ms: 5_000,
        }
    }
}

impl LedgerConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Defaults, overridden by `LEDGER_STARTING_BALANCE` and
    /// `LEDGER_LOCK_TIMEOUT_MS` when set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(value) = lookup(STARTING_BALANCE_VAR) {
            config.starting_balance = match Decimal::from_str(value.trim()) {
                Ok(balance) if balance > Decimal::ZERO => balance,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: STARTING_BALANCE_VAR,
                        value,
                        reason: "expected a positive number",
                    });
                }
            };
        }
        if let Some(value) = lookup(LOCK_TIMEOUT_VAR) {
            config.lock_timeout_ms =
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        var: LOCK_TIMEOUT_VAR,
                        value: value.clone(),
                        reason: "expected milliseconds",
                    })?;
        }
        Ok(config)
    }
}
