//! This module could be a separate crate on its own, to bootstrap [`custody_ledger`] within
//! a binary, but it lives here so the integration tests can use it too.

use std::io::{Read, Write};

use anyhow::Result;
use csv_parser::{AccountRow, CsvRowParser, TransferRow};
use csv_printer::{BalanceRow, print_balances};
use history_printer::{AccountHistory, print_histories};
use thiserror::Error;

use crate::{
    bank::{Bank, ProvisioningError},
    config::LedgerConfig,
    transfer::TransferError,
};

pub mod csv_parser;
pub mod csv_printer;
pub mod history_printer;

#[derive(Debug, Error)]
pub enum RowError {
    #[error("Malformed row: {0}")]
    Malformed(#[from] csv::Error),
    #[error("Cannot open account: {0}")]
    Provisioning(#[from] ProvisioningError),
    #[error("Transfer rejected: {0}")]
    Transfer(#[from] TransferError),
}

/// Provisions every account of `accounts`, then runs every transfer of
/// `transfers` in order and prints the resulting balances.
pub struct Service<'w, A, T, W: 'w> {
    pub accounts: A,
    pub transfers: T,
    pub output: &'w mut W,
    pub config: LedgerConfig,
    /// Also print every account's history as JSON lines after the balances.
    pub print_history: bool,
    pub error_printer: Box<dyn FnMut(u64, RowError)>,
}

impl<'w, A, T, W> Service<'w, A, T, W>
where
    A: Read,
    T: Read,
    W: Write + 'w,
{
    pub fn run(mut self) -> Result<()> {
        let bank = Bank::new(self.config);

        for (line, row) in CsvRowParser::<_, AccountRow>::new(self.accounts) {
            let opened = row
                .map_err(RowError::from)
                .and_then(|row| Ok(bank.open_account(&row.account, &row.pin, &row.name)?));
            if let Err(err) = opened {
                (self.error_printer)(line, err);
            }
        }

        let engine = bank.transfers();
        for (line, row) in CsvRowParser::<_, TransferRow>::new(self.transfers) {
            let executed = row.map_err(RowError::from).and_then(|row| {
                Ok(engine.execute(&row.sender, &row.receiver, &row.amount, &row.pin)?)
            });
            if let Err(err) = executed {
                (self.error_printer)(line, err);
            }
        }

        let queries = bank.queries();
        let ids = bank.account_ids();
        let balances = ids
            .iter()
            .map(|id| -> Result<BalanceRow> {
                Ok(BalanceRow {
                    account: id.to_string(),
                    name: bank.search(id.as_str()).unwrap_or_default(),
                    balance: queries.get_balance(id.as_str())?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        print_balances(&mut *self.output, balances.into_iter())?;

        if self.print_history {
            let histories = ids
                .iter()
                .map(|id| -> Result<_> { Ok((id.as_str(), queries.get_history(id.as_str())?)) })
                .collect::<Result<Vec<_>>>()?;
            print_histories(
                &mut *self.output,
                histories
                    .iter()
                    .map(|(account, history)| AccountHistory { account, history }),
            )?;
        }
        Ok(())
    }
}
