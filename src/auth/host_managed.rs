//! Accounts whose lifecycle belongs to the host platform.
//!
//! The platform account store is an explicit resource handed in at
//! construction and held for the authenticator's lifetime, so handles it
//! issues stay valid while the owning service is alive.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{require, AuthenticationUi};
use crate::error::SocialError;
use crate::request::transport::{PreparedRequest, TransportResponse};
use crate::types::{Account, AccountKind, USERNAME};

/// Provider-specific options passed along with an access request.
pub type AccessOptions = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostManagedConfig {
    /// Platform identifier of the account type, e.g. `com.example.social`.
    pub account_type: String,
    #[serde(default)]
    pub access_options: AccessOptions,
    /// Report a denied access request as a failure instead of an empty list.
    #[serde(default)]
    pub fail_on_denied_access: bool,
}

/// Opaque platform account reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostAccountHandle {
    pub identifier: String,
    pub username: Option<String>,
    pub properties: BTreeMap<String, String>,
}

impl HostAccountHandle {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            username: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    fn from_account(account: &Account) -> Self {
        Self {
            identifier: account.id().to_string(),
            username: account.username().map(String::from),
            properties: account.properties().clone(),
        }
    }

    fn into_account(self, service_id: &str) -> Account {
        let mut properties = self.properties;
        if let Some(username) = self.username {
            properties.insert(USERNAME.to_string(), username);
        }
        Account::new(self.identifier, service_id, AccountKind::HostManaged).with_properties(properties)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewResult {
    Renewed,
    Rejected,
    Failed(String),
}

/// Platform account store boundary.
#[async_trait]
pub trait HostAccountStore: Send + Sync {
    /// Accounts of `account_type` the app has already been granted.
    async fn find_accounts(&self, account_type: &str) -> Result<Vec<HostAccountHandle>, SocialError>;

    /// Ask the platform for access. May prompt the user; `false` means denied.
    async fn request_access(
        &self,
        account_type: &str,
        options: &AccessOptions,
    ) -> Result<bool, SocialError>;

    async fn renew_credentials(&self, handle: &HostAccountHandle) -> Result<RenewResult, SocialError>;

    /// Execute a call with the platform's native authenticated request.
    async fn perform_request(
        &self,
        handle: &HostAccountHandle,
        request: PreparedRequest,
    ) -> Result<TransportResponse, SocialError>;
}

pub struct HostManagedAuthenticator {
    service_id: String,
    config: HostManagedConfig,
    store: Arc<dyn HostAccountStore>,
}

impl fmt::Debug for HostManagedAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostManagedAuthenticator")
            .field("service_id", &self.service_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HostManagedAuthenticator {
    pub fn new(
        service_id: impl Into<String>,
        config: HostManagedConfig,
        store: Arc<dyn HostAccountStore>,
    ) -> Result<Self, SocialError> {
        require("account_type", &config.account_type)?;
        Ok(Self {
            service_id: service_id.into(),
            config,
            store,
        })
    }

    pub fn config(&self) -> &HostManagedConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn HostAccountStore> {
        &self.store
    }

    pub async fn begin_authentication(
        &self,
        _ui: &dyn AuthenticationUi,
    ) -> Result<Account, SocialError> {
        Err(SocialError::NotSupported(format!(
            "{} accounts are managed by the platform; add one in the system account settings",
            self.service_id
        )))
    }

    /// Accounts granted to the app.
    ///
    /// With `allow_prompt` the platform is asked for access first, which may
    /// show its own UI. Otherwise only already granted accounts are returned.
    pub async fn list_accounts(&self, allow_prompt: bool) -> Result<Vec<Account>, SocialError> {
        if allow_prompt {
            let granted = self
                .store
                .request_access(&self.config.account_type, &self.config.access_options)
                .await?;
            if !granted {
                if self.config.fail_on_denied_access {
                    return Err(SocialError::AuthenticationFailed(format!(
                        "access to {} accounts was denied",
                        self.config.account_type
                    )));
                }
                warn!(
                    service = %self.service_id,
                    account_type = %self.config.account_type,
                    "Platform denied account access; returning no accounts"
                );
                return Ok(Vec::new());
            }
        }
        let handles = self.store.find_accounts(&self.config.account_type).await?;
        Ok(handles
            .into_iter()
            .map(|handle| handle.into_account(&self.service_id))
            .collect())
    }

    pub async fn reauthorize(&self, account: &Account) -> Result<Account, SocialError> {
        let handle = HostAccountHandle::from_account(account);
        match self.store.renew_credentials(&handle).await? {
            RenewResult::Renewed => {
                info!(service = %self.service_id, account = %account.id(), "Platform renewed credentials");
                let refreshed = self
                    .store
                    .find_accounts(&self.config.account_type)
                    .await?
                    .into_iter()
                    .find(|h| h.identifier == account.id());
                Ok(refreshed
                    .map(|h| h.into_account(&self.service_id))
                    .unwrap_or_else(|| account.clone()))
            }
            RenewResult::Rejected => Err(SocialError::AuthenticationFailed(
                "platform rejected credential renewal".to_string(),
            )),
            RenewResult::Failed(reason) => Err(SocialError::AuthenticationFailed(reason)),
        }
    }
}

/// Route a call through the platform for `account`.
pub(crate) async fn perform_with(
    store: &dyn HostAccountStore,
    account: &Account,
    request: PreparedRequest,
) -> Result<TransportResponse, SocialError> {
    store
        .perform_request(&HostAccountHandle::from_account(account), request)
        .await
}
