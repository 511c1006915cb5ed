//! Storage for the single session credential attached to outbound requests.
//!
//! [`KeyringCredentialStore`] keeps it in the OS secure store;
//! [`MemoryCredentialStore`] keeps it in process and is what tests use.

use std::fmt::Debug;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use thiserror::Error;
use tracing::debug;
use tracing::warn;

/// Default keyring service name.
pub const DEFAULT_SERVICE: &str = "relay";
/// Default keyring account name.
pub const DEFAULT_ACCOUNT: &str = "session-token";

#[derive(Debug, Error)]
pub enum CredentialStoreError {
    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

/// A place the session credential lives between requests.
pub trait CredentialStore: Debug + Send + Sync {
    /// The stored credential, if any.
    fn load(&self) -> Result<Option<String>, CredentialStoreError>;

    fn save(&self, credential: &str) -> Result<(), CredentialStoreError>;

    /// Removes the credential. Returns whether one was present.
    fn delete(&self) -> Result<bool, CredentialStoreError>;
}

/// Credential held by the platform keyring under `service` / `account`.
#[derive(Debug, Clone)]
pub struct KeyringCredentialStore {
    service: String,
    account: String,
}

impl KeyringCredentialStore {
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry, CredentialStoreError> {
        Ok(keyring::Entry::new(&self.service, &self.account)?)
    }
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE, DEFAULT_ACCOUNT)
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn load(&self) -> Result<Option<String>, CredentialStoreError> {
        match self.entry()?.get_password() {
            Ok(credential) => Ok(Some(credential)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => {
                warn!(
                    service = %self.service,
                    error = %err,
                    "failed to read credential from keyring"
                );
                Err(err.into())
            }
        }
    }

    fn save(&self, credential: &str) -> Result<(), CredentialStoreError> {
        self.entry()?.set_password(credential)?;
        debug!(service = %self.service, "stored credential in keyring");
        Ok(())
    }

    fn delete(&self) -> Result<bool, CredentialStoreError> {
        match self.entry()?.delete_credential() {
            Ok(()) => {
                debug!(service = %self.service, "deleted credential from keyring");
                Ok(true)
            }
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-process credential store. Counts deletions so callers can assert on
/// session-expiry handling.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    credential: Mutex<Option<String>>,
    deletions: AtomicUsize,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: impl Into<String>) -> Self {
        Self {
            credential: Mutex::new(Some(credential.into())),
            deletions: AtomicUsize::new(0),
        }
    }

    /// Number of `delete` calls that removed a credential.
    pub fn deletions(&self) -> usize {
        self.deletions.load(Ordering::SeqCst)
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<String>, CredentialStoreError> {
        Ok(self
            .credential
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, credential: &str) -> Result<(), CredentialStoreError> {
        *self
            .credential
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(credential.to_string());
        Ok(())
    }

    fn delete(&self) -> Result<bool, CredentialStoreError> {
        let removed = self
            .credential
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some();
        if removed {
            self.deletions.fetch_add(1, Ordering::SeqCst);
        }
        Ok(removed)
    }
}
