use std::fs::File;

use anyhow::{Context, Result, bail};
use custody_ledger::{
    bin_utils::{RowError, Service},
    config::LedgerConfig,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut args = std::env::args().skip(1);
    let accounts_file = args
        .next()
        .context("Expected the accounts CSV file name as the first argument")?;
    let transfers_file = args
        .next()
        .context("Expected the transfers CSV file name as the second argument")?;
    let print_history = match args.next().as_deref() {
        None => false,
        Some("--history") => true,
        Some(other) => bail!("Unexpected argument `{other}`, only `--history` is supported"),
    };

    let accounts = File::open(&accounts_file)
        .with_context(|| format!("Failed to open `{accounts_file}`"))?;
    let transfers = File::open(&transfers_file)
        .with_context(|| format!("Failed to open `{transfers_file}`"))?;
    let config = LedgerConfig::from_env().context("Invalid ledger configuration")?;

    let service = Service {
        accounts,
        transfers,
        output: &mut std::io::stdout(),
        config,
        print_history,
        error_printer: Box::new(|line: u64, err: RowError| {
            eprintln!("Error at line {line}: {err}")
        }),
    };
    service.run()
}
