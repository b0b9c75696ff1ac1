//! System keyring credential store (Secret Service / Keychain / Credential Manager).

use async_trait::async_trait;
use tracing::debug;

use super::{upsert, CredentialStore};
use crate::error::SocialError;
use crate::types::Account;

/// Keeps each service's accounts as one JSON blob in the system keyring.
#[derive(Debug, Clone)]
pub struct KeyringCredentialStore {
    service: String,
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyringCredentialStore {
    const SERVICE_NAME: &'static str = "socialkit";

    pub fn new() -> Self {
        Self::with_service(Self::SERVICE_NAME)
    }

    /// Use a custom keyring service name.
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(keyring_service: &str, service_id: &str) -> Result<keyring::Entry, SocialError> {
        keyring::Entry::new(keyring_service, service_id)
            .map_err(|e| SocialError::Storage(format!("failed to open keyring entry: {e}")))
    }

    fn read_blocking(keyring_service: &str, service_id: &str) -> Result<Vec<Account>, SocialError> {
        match Self::entry(keyring_service, service_id)?.get_password() {
            Ok(json) => serde_json::from_str(&json).map_err(|e| {
                SocialError::Storage(format!("failed to parse accounts from keyring: {e}"))
            }),
            Err(keyring::Error::NoEntry) => Ok(Vec::new()),
            Err(e) => Err(SocialError::Storage(format!("keyring error: {e}"))),
        }
    }

    fn write_blocking(
        keyring_service: &str,
        service_id: &str,
        accounts: &[Account],
    ) -> Result<(), SocialError> {
        let entry = Self::entry(keyring_service, service_id)?;
        if accounts.is_empty() {
            return match entry.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(SocialError::Storage(format!("keyring error: {e}"))),
            };
        }
        let json = serde_json::to_string(accounts)
            .map_err(|e| SocialError::Storage(format!("failed to serialize accounts: {e}")))?;
        entry
            .set_password(&json)
            .map_err(|e| SocialError::Storage(format!("keyring error: {e}")))
    }

    /// Run a read-modify-write cycle off the async runtime.
    async fn modify<F>(&self, service_id: &str, change: F) -> Result<(), SocialError>
    where
        F: FnOnce(&mut Vec<Account>) + Send + 'static,
    {
        let keyring_service = self.service.clone();
        let service_id = service_id.to_string();
        tokio::task::spawn_blocking(move || {
            let mut accounts = Self::read_blocking(&keyring_service, &service_id)?;
            change(&mut accounts);
            Self::write_blocking(&keyring_service, &service_id, &accounts)
        })
        .await
        .map_err(|e| SocialError::Storage(format!("keyring task failed: {e}")))?
    }
}

#[async_trait]
impl CredentialStore for KeyringCredentialStore {
    async fn save(&self, service_id: &str, account: &Account) -> Result<(), SocialError> {
        let account = account.clone();
        self.modify(service_id, move |accounts| upsert(accounts, &account))
            .await?;
        debug!(service = service_id, "Saved account to keyring");
        Ok(())
    }

    async fn load_all(&self, service_id: &str) -> Result<Vec<Account>, SocialError> {
        let keyring_service = self.service.clone();
        let service_id = service_id.to_string();
        tokio::task::spawn_blocking(move || Self::read_blocking(&keyring_service, &service_id))
            .await
            .map_err(|e| SocialError::Storage(format!("keyring task failed: {e}")))?
    }

    async fn delete(&self, service_id: &str, account: &Account) -> Result<(), SocialError> {
        let id = account.id().to_string();
        self.modify(service_id, move |accounts| accounts.retain(|a| a.id() != id))
            .await
    }

    fn name(&self) -> &str {
        "keyring"
    }
}
