use thiserror::Error;
use tracing::info;

use crate::{
    account::{AccountError, AccountId, AccountStore, Pin, Session},
    clock::{Clock, SystemClock},
    config::LedgerConfig,
    ledger::{LedgerStore, StoreError, in_memory_store::InMemoryLedgerStore},
    query::QueryService,
    transfer::{TransferEngine, TransferError, TransferReceipt},
};

#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Account and ledger stores wired to the transfer engine and query service.
pub struct Bank<L = InMemoryLedgerStore> {
    accounts: AccountStore,
    ledger: L,
    clock: Box<dyn Clock>,
    config: LedgerConfig,
}

impl Bank {
    pub fn new(config: LedgerConfig) -> Self {
        let ledger = InMemoryLedgerStore::new(config.lock_timeout());
        Self::with_ledger(config, ledger, SystemClock)
    }
}

impl<L> Bank<L>
where
    L: LedgerStore,
{
    pub fn with_ledger(config: LedgerConfig, ledger: L, clock: impl Clock + 'static) -> Self {
        Self {
            accounts: AccountStore::default(),
            ledger,
            clock: Box::new(clock),
            config,
        }
    }

    /// Creates the account together with its ledger entry, which opens with
    /// the configured starting balance. Either both exist afterwards or
    /// neither does.
    pub fn open_account(
        &self,
        account_id: &str,
        pin: &str,
        display_name: &str,
    ) -> Result<AccountId, ProvisioningError> {
        let id = AccountId::parse(account_id)?;
        let pin = Pin::parse(pin)?;
        self.accounts.create(id.clone(), pin, display_name)?;
        let opened = self
            .ledger
            .create_initial(&id, self.config.starting_balance, self.clock.now());
        if let Err(err) = opened {
            self.accounts.remove(id.as_str());
            return Err(err.into());
        }
        info!(account = %id, balance = %self.config.starting_balance, "account opened");
        Ok(id)
    }

    pub fn login(&self, account_id: &str, pin: &str) -> Result<Session, AccountError> {
        self.accounts.login(account_id, pin)
    }

    /// Display name of a prospective payee.
    pub fn search(&self, account_id: &str) -> Option<String> {
        self.accounts.find(account_id)
    }

    pub fn transfers(&self) -> TransferEngine<'_, L> {
        TransferEngine::new(&self.accounts, &self.ledger, &*self.clock)
    }

    pub fn queries(&self) -> QueryService<'_, L> {
        QueryService::new(&self.ledger)
    }

    /// Transfer from the account the session belongs to. The PIN is checked
    /// again, a session alone does not authorize payments.
    pub fn pay(
        &self,
        session: &Session,
        receiver: &str,
        amount: &str,
        pin: &str,
    ) -> Result<TransferReceipt, TransferError> {
        self.transfers()
            .execute(session.account_id().as_str(), receiver, amount, pin)
    }

    pub fn account_ids(&self) -> Vec<AccountId> {
        self.accounts.ids()
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }
}
