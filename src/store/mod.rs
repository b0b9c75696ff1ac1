//! Credential persistence.
//!
//! - [`MemoryCredentialStore`] - process-local, for tests and ephemeral sessions
//! - [`FileCredentialStore`] - one TOML file per service
//! - [`KeyringCredentialStore`] - system keyring (requires `system-keyring`)

mod file;
#[cfg(feature = "system-keyring")]
mod system_keyring;
mod memory;

pub use file::FileCredentialStore;
#[cfg(feature = "system-keyring")]
pub use system_keyring::KeyringCredentialStore;
pub use memory::MemoryCredentialStore;

use async_trait::async_trait;

use crate::error::SocialError;
use crate::types::Account;

/// Async save/load/delete of accounts keyed by service id.
///
/// `save` is idempotent by [`Account::id`]: saving an account whose id is
/// already stored replaces the stored properties.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn save(&self, service_id: &str, account: &Account) -> Result<(), SocialError>;
    async fn load_all(&self, service_id: &str) -> Result<Vec<Account>, SocialError>;
    async fn delete(&self, service_id: &str, account: &Account) -> Result<(), SocialError>;

    fn name(&self) -> &str;
}

/// Replace the entry with the same id, or append.
pub(crate) fn upsert(accounts: &mut Vec<Account>, account: &Account) {
    match accounts.iter_mut().find(|a| a.id() == account.id()) {
        Some(existing) => *existing = account.clone(),
        None => accounts.push(account.clone()),
    }
}
