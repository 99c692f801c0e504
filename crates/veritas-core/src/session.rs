//! Wallet session.
//!
//! The signed-in account lives in an explicit `WalletSession` value that is
//! loaded from a `SessionStore` at startup and cleared on sign-out. Callers
//! pass it to whatever needs it; there is no process-wide session.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::SessionConfig;
use crate::error::SessionError;

const MIN_ACCOUNT_LEN: usize = 2;
const MAX_ACCOUNT_LEN: usize = 64;

/// What a store persists for a signed-in session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionRecord {
    pub account_id: String,
    pub network_id: String,
}

/// Persistence for the signed-in account.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<SessionRecord>, SessionError>;
    fn save(&self, record: &SessionRecord) -> Result<(), SessionError>;
    fn clear(&self) -> Result<(), SessionError>;
}

/// Session store backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<SessionRecord>, SessionError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, record: &SessionRecord) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(record)?)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// NEAR-style account id: 2..=64 chars of `a-z`, `0-9`, `_`, `-`, `.`,
/// with no leading, trailing or doubled separators.
pub fn is_valid_account_id(account_id: &str) -> bool {
    let len_ok = (MIN_ACCOUNT_LEN..=MAX_ACCOUNT_LEN).contains(&account_id.len());
    let is_sep = |c: char| matches!(c, '_' | '-' | '.');
    let chars_ok = account_id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || is_sep(c));
    let edges_ok = !account_id.starts_with(is_sep) && !account_id.ends_with(is_sep);
    let no_double = !account_id
        .as_bytes()
        .windows(2)
        .any(|w| is_sep(w[0] as char) && is_sep(w[1] as char));
    len_ok && chars_ok && edges_ok && no_double
}

/// The current sign-in state.
pub struct WalletSession<S: SessionStore> {
    store: S,
    config: SessionConfig,
    account_id: Option<String>,
}

impl<S: SessionStore> WalletSession<S> {
    /// Restore whatever the store holds. A record for another network is ignored.
    pub fn load(store: S, config: SessionConfig) -> Result<Self, SessionError> {
        let account_id = store
            .load()?
            .filter(|r| r.network_id == config.network_id)
            .map(|r| r.account_id);
        Ok(Self {
            store,
            config,
            account_id,
        })
    }

    pub fn account_id(&self) -> Option<&str> {
        self.account_id.as_deref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.account_id.is_some()
    }

    pub fn network_id(&self) -> &str {
        &self.config.network_id
    }

    pub fn contract_id(&self) -> &str {
        &self.config.contract_id
    }

    pub fn sign_in(&mut self, account_id: &str) -> Result<(), SessionError> {
        if !is_valid_account_id(account_id) {
            return Err(SessionError::InvalidAccountId(account_id.to_string()));
        }
        self.store.save(&SessionRecord {
            account_id: account_id.to_string(),
            network_id: self.config.network_id.clone(),
        })?;
        tracing::info!(account_id = %account_id, network = %self.config.network_id, "signed in");
        self.account_id = Some(account_id.to_string());
        Ok(())
    }

    /// Sign in as a fabricated `user<N>.<network>` account, N in `0..10000`.
    pub fn sign_in_mock(&mut self, rng: &mut impl Rng) -> Result<String, SessionError> {
        let account = format!("user{}.{}", rng.gen_range(0..10_000), self.config.network_id);
        self.sign_in(&account)?;
        Ok(account)
    }

    pub fn sign_out(&mut self) -> Result<(), SessionError> {
        self.store.clear()?;
        if let Some(account) = self.account_id.take() {
            tracing::info!(account_id = %account, "signed out");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::MemorySessionStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config() -> SessionConfig {
        SessionConfig::at(PathBuf::from("unused.json"))
    }

    #[test]
    fn test_account_id_rules() {
        assert!(is_valid_account_id("alice.testnet"));
        assert!(is_valid_account_id("user42.testnet"));
        assert!(is_valid_account_id("a_b-c.near"));
        assert!(!is_valid_account_id("a"));
        assert!(!is_valid_account_id("Alice.testnet"));
        assert!(!is_valid_account_id(".alice"));
        assert!(!is_valid_account_id("alice."));
        assert!(!is_valid_account_id("al..ice"));
        assert!(!is_valid_account_id(&"a".repeat(65)));
    }

    #[test]
    fn test_sign_in_and_out() {
        let mut session = WalletSession::load(MemorySessionStore::new(), config()).unwrap();
        assert!(!session.is_signed_in());

        session.sign_in("alice.testnet").unwrap();
        assert_eq!(session.account_id(), Some("alice.testnet"));

        session.sign_out().unwrap();
        assert!(!session.is_signed_in());
    }

    #[test]
    fn test_invalid_account_rejected_without_saving() {
        let mut session = WalletSession::load(MemorySessionStore::new(), config()).unwrap();
        let err = session.sign_in("NOT VALID").unwrap_err();
        assert!(matches!(err, SessionError::InvalidAccountId(_)));
        assert!(!session.is_signed_in());
    }

    #[test]
    fn test_mock_sign_in_shape() {
        let mut session = WalletSession::load(MemorySessionStore::new(), config()).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let account = session.sign_in_mock(&mut rng).unwrap();
        assert!(account.starts_with("user"));
        assert!(account.ends_with(".testnet"));
        let n: u32 = account["user".len()..account.len() - ".testnet".len()]
            .parse()
            .unwrap();
        assert!(n < 10_000);
    }

    #[test]
    fn test_record_for_other_network_is_ignored() {
        let store = MemorySessionStore::new();
        store
            .save(&SessionRecord {
                account_id: "bob.near".to_string(),
                network_id: "mainnet".to_string(),
            })
            .unwrap();
        let session = WalletSession::load(store, config()).unwrap();
        assert!(!session.is_signed_in());
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("nope.json"));
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
    }
}
