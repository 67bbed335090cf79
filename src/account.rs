use std::{borrow::Borrow, collections::HashMap, fmt};

use parking_lot::RwLock;
use thiserror::Error;
use tracing::info;

/// Accepted PIN lengths, all digits.
const PIN_LENGTHS: [usize; 2] = [4, 6];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("`{raw}` is not a valid account identifier")]
    InvalidAccountId { raw: String },
    #[error("PIN must be 4 or 6 digits")]
    InvalidPin,
    #[error("Display name must not be empty")]
    EmptyDisplayName,
    #[error("Account `{id}` already exists")]
    DuplicateAccount { id: AccountId },
    #[error("Incorrect account number or PIN")]
    InvalidCredentials,
}

/// Opaque account identifier, immutable once the account is provisioned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId(String);

impl AccountId {
    pub fn parse(raw: &str) -> Result<Self, AccountError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
            return Err(AccountError::InvalidAccountId {
                raw: raw.to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for AccountId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Account credential. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Pin(String);

impl Pin {
    pub fn parse(raw: &str) -> Result<Self, AccountError> {
        if PIN_LENGTHS.contains(&raw.len()) && raw.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(raw.to_string()))
        } else {
            Err(AccountError::InvalidPin)
        }
    }

    fn matches(&self, candidate: &str) -> bool {
        self.0 == candidate
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Pin(****)")
    }
}

#[derive(Debug, Clone)]
struct Account {
    pin: Pin,
    display_name: String,
}

/// Proof that the holder presented valid credentials for an account.
///
/// Can only be obtained from [`AccountStore::login`], and is passed explicitly
/// wherever the "current user" matters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    account_id: AccountId,
    display_name: String,
}

impl Session {
    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

/// Credentials and identity of every provisioned account.
/// Written once per account, read on every transfer.
#[derive(Debug, Default)]
pub struct AccountStore {
    accounts: RwLock<HashMap<AccountId, Account>>,
}

impl AccountStore {
    pub fn create(&self, id: AccountId, pin: Pin, display_name: &str) -> Result<(), AccountError> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(AccountError::EmptyDisplayName);
        }
        let mut accounts = self.accounts.write();
        if accounts.contains_key(&id) {
            return Err(AccountError::DuplicateAccount { id });
        }
        info!(account = %id, "account created");
        accounts.insert(
            id,
            Account {
                pin,
                display_name: display_name.to_string(),
            },
        );
        Ok(())
    }

    pub fn exists(&self, id: &str) -> bool {
        self.accounts.read().contains_key(id)
    }

    /// Returns the display name when `pin` is the credential of `id`.
    pub fn lookup_by_credentials(&self, id: &str, pin: &str) -> Option<String> {
        self.accounts
            .read()
            .get(id)
            .filter(|acc| acc.pin.matches(pin))
            .map(|acc| acc.display_name.clone())
    }

    /// Payee search: display name of an account, no credentials needed.
    pub fn find(&self, id: &str) -> Option<String> {
        self.accounts
            .read()
            .get(id)
            .map(|acc| acc.display_name.clone())
    }

    pub fn login(&self, id: &str, pin: &str) -> Result<Session, AccountError> {
        let accounts = self.accounts.read();
        let Some((account_id, account)) = accounts.get_key_value(id) else {
            return Err(AccountError::InvalidCredentials);
        };
        if !account.pin.matches(pin) {
            return Err(AccountError::InvalidCredentials);
        }
        Ok(Session {
            account_id: account_id.clone(),
            display_name: account.display_name.clone(),
        })
    }

    /// All account identifiers, sorted.
    pub fn ids(&self) -> Vec<AccountId> {
        let mut ids: Vec<_> = self.accounts.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Undoes [`AccountStore::create`] when the rest of provisioning fails.
    pub(crate) fn remove(&self, id: &str) {
        self.accounts.write().remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_alice() -> AccountStore {
        let store = AccountStore::default();
        store
            .create(
                AccountId::parse("alice").unwrap(),
                Pin::parse("1234").unwrap(),
                "Alice",
            )
            .unwrap();
        store
    }

    #[test]
    fn parse_account_id() {
        assert_eq!(AccountId::parse(" acc-1 ").unwrap().as_str(), "acc-1");
        assert!(matches!(
            AccountId::parse("   ").unwrap_err(),
            AccountError::InvalidAccountId { .. }
        ));
        assert!(matches!(
            AccountId::parse("acc 1").unwrap_err(),
            AccountError::InvalidAccountId { .. }
        ));
    }

    #[test]
    fn parse_pin() {
        assert!(Pin::parse("1234").is_ok());
        assert!(Pin::parse("012345").is_ok());
        assert_eq!(Pin::parse("12345").unwrap_err(), AccountError::InvalidPin);
        assert_eq!(Pin::parse("12a4").unwrap_err(), AccountError::InvalidPin);
        assert_eq!(Pin::parse("").unwrap_err(), AccountError::InvalidPin);
        assert_eq!(format!("{:?}", Pin::parse("1234").unwrap()), "Pin(****)");
    }

    #[test]
    fn create_and_lookup() {
        let store = store_with_alice();
        assert!(store.exists("alice"));
        assert!(!store.exists("bob"));
        assert_eq!(
            store.lookup_by_credentials("alice", "1234"),
            Some("Alice".to_string())
        );
        assert_eq!(store.lookup_by_credentials("alice", "4321"), None);
        assert_eq!(store.lookup_by_credentials("bob", "1234"), None);
        assert_eq!(store.find("alice"), Some("Alice".to_string()));
        assert_eq!(store.find("bob"), None);
    }

    #[test]
    fn duplicate_account_rejected() {
        let store = store_with_alice();
        let err = store
            .create(
                AccountId::parse("alice").unwrap(),
                Pin::parse("9999").unwrap(),
                "Other Alice",
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "Account `alice` already exists");
        // original credential still applies
        assert!(store.lookup_by_credentials("alice", "1234").is_some());

        let err = store
            .create(
                AccountId::parse("bob").unwrap(),
                Pin::parse("9999").unwrap(),
                "  ",
            )
            .unwrap_err();
        assert_eq!(err, AccountError::EmptyDisplayName);
    }

    #[test]
    fn login_returns_session() {
        let store = store_with_alice();
        let session = store.login("alice", "1234").unwrap();
        assert_eq!(session.account_id().as_str(), "alice");
        assert_eq!(session.display_name(), "Alice");

        assert_eq!(
            store.login("alice", "0000").unwrap_err(),
            AccountError::InvalidCredentials
        );
        assert_eq!(
            store.login("nobody", "1234").unwrap_err(),
            AccountError::InvalidCredentials
        );
    }

    #[test]
    fn ids_are_sorted() {
        let store = store_with_alice();
        for id in ["carol", "bob"] {
            store
                .create(AccountId::parse(id).unwrap(), Pin::parse("1111").unwrap(), id)
                .unwrap();
        }
        let ids: Vec<_> = store.ids().iter().map(|id| id.to_string()).collect();
        assert_eq!(ids, ["alice", "bob", "carol"]);

        store.remove("bob");
        assert!(!store.exists("bob"));
    }
}
