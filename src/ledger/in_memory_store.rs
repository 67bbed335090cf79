use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex, RwLock};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::account::AccountId;

use super::{LedgerEntry, LedgerStore, StoreError, TransactionRecord, UnitOfWork};

/// Exclusive per-account lock that can be held across calls by a unit of work.
#[derive(Debug, Default)]
struct WriteIntent {
    locked: Mutex<bool>,
    released: Condvar,
}

impl WriteIntent {
    fn acquire(self: &Arc<Self>, timeout: Duration) -> Option<WriteIntentGuard> {
        let deadline = Instant::now() + timeout;
        let mut locked = self.locked.lock();
        while *locked {
            if self.released.wait_until(&mut locked, deadline).timed_out() && *locked {
                return None;
            }
        }
        *locked = true;
        Some(WriteIntentGuard(Arc::clone(self)))
    }
}

#[derive(Debug)]
struct WriteIntentGuard(Arc<WriteIntent>);

impl Drop for WriteIntentGuard {
    fn drop(&mut self) {
        *self.0.locked.lock() = false;
        self.0.released.notify_one();
    }
}

/// Storage for a single account.
///
/// `write_intent` serializes units of work touching the account, while
/// `committed` is what readers see. Readers therefore never wait for a
/// transfer in flight, only for the short moment a commit is being applied.
#[derive(Debug)]
struct Slot {
    write_intent: Arc<WriteIntent>,
    committed: RwLock<LedgerEntry>,
}

#[derive(Debug)]
pub struct InMemoryLedgerStore {
    slots: RwLock<HashMap<AccountId, Arc<Slot>>>,
    lock_timeout: Duration,
}

impl InMemoryLedgerStore {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            slots: RwLock::default(),
            lock_timeout,
        }
    }

    fn slot(&self, account: &str) -> Option<(AccountId, Arc<Slot>)> {
        self.slots
            .read()
            .get_key_value(account)
            .map(|(id, slot)| (id.clone(), Arc::clone(slot)))
    }
}

impl LedgerStore for InMemoryLedgerStore {
    type Unit<'a> = InMemoryUnitOfWork<'a>;

    fn begin(&self) -> InMemoryUnitOfWork<'_> {
        InMemoryUnitOfWork {
            store: self,
            held: Vec::new(),
            committed: false,
        }
    }

    fn create_initial(
        &self,
        account: &AccountId,
        starting_balance: Decimal,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut slots = self.slots.write();
        if slots.contains_key(account) {
            return Err(StoreError::DuplicateEntry {
                account: account.clone(),
            });
        }
        slots.insert(
            account.clone(),
            Arc::new(Slot {
                write_intent: Arc::default(),
                committed: RwLock::new(LedgerEntry::opening(starting_balance, at)),
            }),
        );
        Ok(())
    }

    fn balance(&self, account: &str) -> Result<Option<Decimal>, StoreError> {
        Ok(self
            .slot(account)
            .map(|(_, slot)| slot.committed.read().balance()))
    }

    fn history(&self, account: &str) -> Result<Option<Vec<TransactionRecord>>, StoreError> {
        Ok(self
            .slot(account)
            .map(|(_, slot)| slot.committed.read().history().to_vec()))
    }
}

struct Staged {
    balance: Decimal,
    appended: Vec<TransactionRecord>,
}

struct Held {
    account: AccountId,
    slot: Arc<Slot>,
    staged: Option<Staged>,
    // released when the unit of work is dropped, after any commit
    _guard: WriteIntentGuard,
}

pub struct InMemoryUnitOfWork<'a> {
    store: &'a InMemoryLedgerStore,
    held: Vec<Held>,
    committed: bool,
}

impl InMemoryUnitOfWork<'_> {
    fn held_mut(&mut self, account: &str) -> Option<&mut Held> {
        self.held.iter_mut().find(|h| h.account.as_str() == account)
    }
}

impl UnitOfWork for InMemoryUnitOfWork<'_> {
    fn lock_for_update(&mut self, account: &str) -> Result<Option<LedgerEntry>, StoreError> {
        if let Some(held) = self.held_mut(account) {
            return Err(StoreError::AlreadyLocked {
                account: held.account.clone(),
            });
        }
        let Some((account, slot)) = self.store.slot(account) else {
            return Ok(None);
        };
        let timeout = self.store.lock_timeout;
        let Some(guard) = slot.write_intent.acquire(timeout) else {
            return Err(StoreError::LockTimeout { account, timeout });
        };
        // nobody else can commit to this slot while we hold the guard
        let entry = slot.committed.read().clone();
        self.held.push(Held {
            account,
            slot,
            staged: None,
            _guard: guard,
        });
        Ok(Some(entry))
    }

    fn update(
        &mut self,
        account: &str,
        new_balance: Decimal,
        record: TransactionRecord,
    ) -> Result<(), StoreError> {
        let Some(held) = self.held_mut(account) else {
            return Err(StoreError::NotLocked {
                account: account.to_string(),
            });
        };
        match &mut held.staged {
            Some(staged) => {
                staged.balance = new_balance;
                staged.appended.push(record);
            }
            None => {
                held.staged = Some(Staged {
                    balance: new_balance,
                    appended: vec![record],
                });
            }
        }
        Ok(())
    }

    fn commit(mut self) -> Result<(), StoreError> {
        // take every write lock first so the whole batch lands at once
        let mut writes: Vec<_> = self
            .held
            .iter_mut()
            .filter_map(|held| {
                let staged = held.staged.take()?;
                Some((held.slot.committed.write(), staged))
            })
            .collect();
        for (entry, staged) in writes.iter_mut() {
            entry.append(staged.balance, staged.appended.drain(..));
        }
        drop(writes);
        self.committed = true;
        debug!(
            accounts = ?self.held.iter().map(|h| h.account.as_str()).collect::<Vec<_>>(),
            "unit of work committed"
        );
        Ok(())
    }
}

impl Drop for InMemoryUnitOfWork<'_> {
    fn drop(&mut self) {
        if !self.committed && self.held.iter().any(|h| h.staged.is_some()) {
            warn!(
                accounts = ?self.held.iter().map(|h| h.account.as_str()).collect::<Vec<_>>(),
                "unit of work rolled back"
            );
        }
    }
}
