//! The per-service front door.
//!
//! A [`Service`] composes an [`Authenticator`] with a credential store and
//! a transport. It decides when stored accounts are reused, renewed or
//! replaced by an interactive login, and it is the factory for requests
//! bound to one of its accounts.

pub mod presets;
mod share;

pub use share::ShareEndpoint;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::{
    AuthenticationUi, Authenticator, HostAccountStore, HostManagedAuthenticator,
    OAuth1Authenticator, OAuth2Authenticator, UsernameResolver,
};
use crate::config::{Limit, ProtocolConfig, ServiceConfig, ServiceLimits};
use crate::error::SocialError;
use crate::request::{Pipeline, ReqwestTransport, Request, Transport};
use crate::store::{CredentialStore, MemoryCredentialStore};
use crate::types::{Account, AccountKind};

/// Collaborators for a [`Service`]. Anything left unset gets a default:
/// an in-memory credential store and the shared reqwest transport.
pub struct ServiceBuilder {
    config: ServiceConfig,
    credential_store: Option<Arc<dyn CredentialStore>>,
    transport: Option<Arc<dyn Transport>>,
    host_store: Option<Arc<dyn HostAccountStore>>,
    username_resolver: Option<UsernameResolver>,
}

impl ServiceBuilder {
    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credential_store = Some(store);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Platform account store; required for host-managed services.
    pub fn host_account_store(mut self, store: Arc<dyn HostAccountStore>) -> Self {
        self.host_store = Some(store);
        self
    }

    /// Callback resolving the display identity of a fresh account.
    pub fn username_resolver(mut self, resolver: UsernameResolver) -> Self {
        self.username_resolver = Some(resolver);
        self
    }

    /// Validate the configuration and build the service.
    pub fn build(self) -> Result<Service, SocialError> {
        let Self {
            config,
            credential_store,
            transport,
            host_store,
            username_resolver,
        } = self;
        let transport = transport.unwrap_or_else(|| Arc::new(ReqwestTransport::shared()));
        let service_id = config.service_id.clone();

        let authenticator = match &config.protocol {
            ProtocolConfig::OAuth1(oauth) => {
                let mut auth = OAuth1Authenticator::new(&service_id, oauth.clone())?
                    .with_transport(transport.clone());
                if let Some(resolver) = username_resolver {
                    auth = auth.with_username_resolver(resolver);
                }
                Authenticator::OAuth1(auth)
            }
            ProtocolConfig::OAuth2(oauth) => {
                let mut auth = OAuth2Authenticator::new(&service_id, oauth.clone())?
                    .with_transport(transport.clone());
                if let Some(resolver) = username_resolver {
                    auth = auth.with_username_resolver(resolver);
                }
                Authenticator::OAuth2(auth)
            }
            ProtocolConfig::HostManaged(host) => {
                let store = host_store.ok_or_else(|| {
                    SocialError::Configuration(format!(
                        "{service_id} is host-managed and needs a host account store"
                    ))
                })?;
                Authenticator::HostManaged(HostManagedAuthenticator::new(
                    &service_id,
                    host.clone(),
                    store,
                )?)
            }
        };

        let share = config
            .share
            .as_ref()
            .map(|endpoint| endpoint.validate())
            .transpose()?;

        let credential_store = match authenticator.kind() {
            AccountKind::HostManaged => None,
            _ => Some(
                credential_store
                    .unwrap_or_else(|| Arc::new(MemoryCredentialStore::new()) as Arc<dyn CredentialStore>),
            ),
        };

        debug!(service = %service_id, kind = %authenticator.kind(), "Built service");
        Ok(Service {
            config,
            authenticator,
            credential_store,
            transport,
            share_url: share,
        })
    }
}

/// One configured third-party service.
///
/// # Example
/// ```
/// use socialkit::auth::OAuth2Config;
/// use socialkit::config::{ProtocolConfig, ServiceConfig};
/// use socialkit::service::Service;
///
/// let config = ServiceConfig::builder()
///     .service_id("example")
///     .title("Example")
///     .protocol(ProtocolConfig::OAuth2(OAuth2Config {
///         client_id: "abc".into(),
///         scope: "read,write".into(),
///         authorize_url: "https://auth.example/authorize".into(),
///         redirect_url: "https://app.example/done".into(),
///         ..Default::default()
///     }))
///     .build();
/// let service = Service::new(config)?;
/// assert!(service.supports_authentication());
/// # Ok::<(), socialkit::error::SocialError>(())
/// ```
pub struct Service {
    config: ServiceConfig,
    authenticator: Authenticator,
    credential_store: Option<Arc<dyn CredentialStore>>,
    transport: Arc<dyn Transport>,
    share_url: Option<Url>,
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("service_id", &self.config.service_id)
            .field("authenticator", &self.authenticator)
            .field(
                "credential_store",
                &self.credential_store.as_ref().map(|s| s.name().to_string()),
            )
            .finish_non_exhaustive()
    }
}

impl Service {
    pub fn builder(config: ServiceConfig) -> ServiceBuilder {
        ServiceBuilder {
            config,
            credential_store: None,
            transport: None,
            host_store: None,
            username_resolver: None,
        }
    }

    pub fn new(config: ServiceConfig) -> Result<Self, SocialError> {
        Self::builder(config).build()
    }

    pub fn service_id(&self) -> &str {
        &self.config.service_id
    }

    pub fn title(&self) -> &str {
        &self.config.title
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn kind(&self) -> AccountKind {
        self.authenticator.kind()
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub fn limits(&self) -> &ServiceLimits {
        &self.config.limits
    }

    pub fn max_text_length(&self) -> Limit {
        self.config.limits.max_text_length
    }

    pub fn max_links(&self) -> Limit {
        self.config.limits.max_links
    }

    pub fn max_images(&self) -> Limit {
        self.config.limits.max_images
    }

    pub fn max_files(&self) -> Limit {
        self.config.limits.max_files
    }

    pub fn supports_authentication(&self) -> bool {
        self.authenticator.supports_authentication()
    }

    pub fn supports_reauthorization(&self) -> bool {
        self.authenticator.supports_reauthorization()
    }

    /// Host-managed services leave the account lifecycle to the platform.
    pub fn supports_save(&self) -> bool {
        self.credential_store.is_some()
    }

    pub fn supports_delete(&self) -> bool {
        self.credential_store.is_some()
    }

    pub fn supports_share(&self) -> bool {
        self.share_url.is_some()
    }

    /// Accounts ready for use.
    ///
    /// Stored accounts are returned first; expired ones are renewed when the
    /// service supports it and dropped otherwise. With nothing usable left and
    /// interactive accounts allowed, `ui` drives a login whose account is
    /// persisted before it is returned.
    pub async fn list_accounts(
        &self,
        ui: Option<&dyn AuthenticationUi>,
    ) -> Result<Vec<Account>, SocialError> {
        if let Authenticator::HostManaged(host) = &self.authenticator {
            return host.list_accounts(self.config.allow_interactive_accounts).await;
        }
        let store = self.store()?;

        let now = Utc::now();
        let (mut accounts, stale): (Vec<_>, Vec<_>) = store
            .load_all(self.service_id())
            .await?
            .into_iter()
            .partition(|account| !account.is_expired(now));

        for account in stale {
            if !self.supports_reauthorization() {
                debug!(service = %self.service_id(), account = %account.id(), "Skipping expired account");
                continue;
            }
            match self.reauthorize(&account).await {
                Ok(renewed) => accounts.push(renewed),
                Err(err) => {
                    warn!(service = %self.service_id(), account = %account.id(), error = %err, "Could not renew expired account");
                }
            }
        }

        if !accounts.is_empty() || !self.config.allow_interactive_accounts {
            return Ok(accounts);
        }
        match ui {
            Some(ui) => Ok(vec![self.begin_authentication(ui).await?]),
            None => Ok(accounts),
        }
    }

    /// Run an interactive login and persist the resulting account.
    pub async fn begin_authentication(
        &self,
        ui: &dyn AuthenticationUi,
    ) -> Result<Account, SocialError> {
        let account = self.authenticator.begin_authentication(ui).await?;
        self.store()?.save(self.service_id(), &account).await?;
        info!(service = %self.service_id(), account = %account.id(), "Persisted new account");
        Ok(account)
    }

    /// Renew `account`, persisting the replacement when this service owns
    /// storage.
    pub async fn reauthorize(&self, account: &Account) -> Result<Account, SocialError> {
        if !self.supports_reauthorization() {
            return Err(SocialError::NotSupported(format!(
                "{} does not support reauthorization",
                self.title()
            )));
        }
        let renewed = self.authenticator.reauthorize(account).await?;
        if let Some(store) = &self.credential_store {
            store.save(self.service_id(), &renewed).await?;
        }
        Ok(renewed)
    }

    pub async fn save_account(&self, account: &Account) -> Result<(), SocialError> {
        self.store()?.save(self.service_id(), account).await
    }

    pub async fn delete_account(&self, account: &Account) -> Result<(), SocialError> {
        self.store()?.delete(self.service_id(), account).await?;
        info!(service = %self.service_id(), account = %account.id(), "Deleted account");
        Ok(())
    }

    /// Build a request bound to this service's pipeline.
    ///
    /// Fails with [`SocialError::UnsupportedAccountType`] when `account`
    /// belongs to another protocol.
    pub fn create_request(
        &self,
        method: Method,
        url: Url,
        parameters: BTreeMap<String, String>,
        account: Option<Account>,
    ) -> Result<Request, SocialError> {
        let mut request = Request::new(
            method,
            url,
            parameters,
            self.pipeline(),
            self.transport.clone(),
        );
        request.set_timeout(self.config.request_timeout());
        request.set_account(account)?;
        Ok(request)
    }

    fn pipeline(&self) -> Pipeline {
        match &self.authenticator {
            Authenticator::OAuth1(auth) => Pipeline::OAuth1 {
                consumer_key: auth.config().consumer_key.clone(),
                consumer_secret: auth.config().consumer_secret.clone(),
            },
            Authenticator::OAuth2(auth) => Pipeline::OAuth2 {
                placement: auth.token_placement().clone(),
            },
            Authenticator::HostManaged(auth) => Pipeline::HostManaged {
                store: auth.store().clone(),
            },
        }
    }

    fn store(&self) -> Result<&Arc<dyn CredentialStore>, SocialError> {
        self.credential_store.as_ref().ok_or_else(|| {
            SocialError::NotSupported(format!(
                "{} accounts are managed by the platform",
                self.title()
            ))
        })
    }
}
