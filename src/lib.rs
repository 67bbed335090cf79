/// Account credentials and identity, plus the session token handed out on login.
pub mod account;

/// Validates raw transfer input (amount, sender/receiver pair) before any
/// store is touched.
pub mod command;

/// Ledger entries, transaction records and the store interface, plus an
/// "in memory" implementation with per-account locking.
///
/// NOTE: the [`ledger::LedgerStore`] trait is the point to plug in a
/// database backed store.
pub mod ledger;

/// Atomic transfer between two accounts.
pub mod transfer;

/// Read-only balance and history accessors.
pub mod query;

/// Entry point wiring the stores, transfer engine and query service together.
pub mod bank;

pub mod clock;

pub mod config;

/// CSV/JSON adapters used by the binary. Kept in the library so the
/// integration tests can drive the same code path.
pub mod bin_utils;
