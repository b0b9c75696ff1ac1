use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::{upsert, CredentialStore};
use crate::error::SocialError;
use crate::types::Account;

/// In-memory credential store. Clones share the same accounts.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    inner: Arc<RwLock<HashMap<String, Vec<Account>>>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> SocialError {
        SocialError::Storage("memory store lock poisoned".to_string())
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn save(&self, service_id: &str, account: &Account) -> Result<(), SocialError> {
        let mut guard = self.inner.write().map_err(|_| Self::poisoned())?;
        upsert(guard.entry(service_id.to_string()).or_default(), account);
        Ok(())
    }

    async fn load_all(&self, service_id: &str) -> Result<Vec<Account>, SocialError> {
        let guard = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(guard.get(service_id).cloned().unwrap_or_default())
    }

    async fn delete(&self, service_id: &str, account: &Account) -> Result<(), SocialError> {
        let mut guard = self.inner.write().map_err(|_| Self::poisoned())?;
        if let Some(accounts) = guard.get_mut(service_id) {
            accounts.retain(|a| a.id() != account.id());
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
