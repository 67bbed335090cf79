use std::io::Write;

use anyhow::Context;
use serde::Serialize;

use crate::ledger::TransactionRecord;

#[derive(Debug, Serialize)]
pub struct AccountHistory<'a> {
    pub account: &'a str,
    pub history: &'a [TransactionRecord],
}

/// Writes one JSON document per line.
pub fn print_histories<'a, W>(
    output: &mut W,
    histories: impl Iterator<Item = AccountHistory<'a>>,
) -> anyhow::Result<()>
where
    W: Write,
{
    for history in histories {
        serde_json::to_writer(&mut *output, &history)
            .with_context(|| format!("Failed to write history of `{}`", history.account))?;
        writeln!(output)?;
    }
    output.flush().context("Failed to flush history output")
}
