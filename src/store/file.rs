use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use super::{upsert, CredentialStore};
use crate::error::SocialError;
use crate::types::Account;

const FILE_VERSION: u32 = 1;

/// File-backed credential store using one TOML file per service.
///
/// # Example
/// ```no_run
/// use socialkit::store::{CredentialStore, FileCredentialStore};
/// use socialkit::types::{Account, AccountKind};
///
/// # async fn demo() -> Result<(), socialkit::error::SocialError> {
/// let store = FileCredentialStore::new_default();
/// let account = Account::new("alice", "facebook", AccountKind::OAuth2);
/// store.save("facebook", &account).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    base_dir: PathBuf,
}

impl FileCredentialStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Store under `~/.socialkit/accounts`.
    pub fn new_default() -> Self {
        Self::new(crate::config::default_socialkit_dir().join("accounts"))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn service_path(&self, service_id: &str) -> PathBuf {
        self.base_dir
            .join(format!("{}.toml", file_label(service_id)))
    }

    async fn read(&self, path: &Path, service_id: &str) -> Result<Vec<Account>, SocialError> {
        let raw = match fs::read_to_string(path).await {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(io_error(path, err)),
        };
        let file: AccountsFile = toml::from_str(&raw).map_err(|e| {
            SocialError::Storage(format!("{} is not a valid accounts file: {e}", path.display()))
        })?;
        if file.service_id != service_id {
            return Err(SocialError::Storage(format!(
                "{} holds accounts for '{}', not '{service_id}'",
                path.display(),
                file.service_id
            )));
        }
        Ok(file.accounts)
    }

    async fn write(
        &self,
        path: &Path,
        service_id: &str,
        accounts: Vec<Account>,
    ) -> Result<(), SocialError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }
        let file = AccountsFile {
            version: FILE_VERSION,
            service_id: service_id.to_string(),
            saved_at: Utc::now(),
            accounts,
        };
        let serialized = toml::to_string(&file)
            .map_err(|e| SocialError::Storage(format!("failed to serialize accounts: {e}")))?;
        fs::write(path, serialized)
            .await
            .map_err(|e| io_error(path, e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| io_error(path, e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn save(&self, service_id: &str, account: &Account) -> Result<(), SocialError> {
        let path = self.service_path(service_id);
        let mut accounts = self.read(&path, service_id).await?;
        upsert(&mut accounts, account);
        self.write(&path, service_id, accounts).await?;
        debug!(service = service_id, account = account.id(), path = %path.display(), "Saved account");
        Ok(())
    }

    async fn load_all(&self, service_id: &str) -> Result<Vec<Account>, SocialError> {
        self.read(&self.service_path(service_id), service_id).await
    }

    async fn delete(&self, service_id: &str, account: &Account) -> Result<(), SocialError> {
        let path = self.service_path(service_id);
        let mut accounts = self.read(&path, service_id).await?;
        let before = accounts.len();
        accounts.retain(|a| a.id() != account.id());
        if accounts.len() == before {
            return Ok(());
        }
        if accounts.is_empty() {
            return match fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
                Err(err) => Err(io_error(&path, err)),
            };
        }
        self.write(&path, service_id, accounts).await
    }

    fn name(&self) -> &str {
        "file"
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AccountsFile {
    version: u32,
    service_id: String,
    saved_at: DateTime<Utc>,
    #[serde(default)]
    accounts: Vec<Account>,
}

fn io_error(path: &Path, err: std::io::Error) -> SocialError {
    SocialError::Storage(format!("{}: {err}", path.display()))
}

/// File stem for a service id. Distinct ids map to distinct stems; `.` is
/// escaped as well so no stem can name a parent or hidden path.
fn file_label(service_id: &str) -> String {
    if service_id.is_empty() {
        return "%".to_string();
    }
    urlencoding::encode(service_id).replace('.', "%2E")
}
