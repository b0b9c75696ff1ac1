//! Authentication strategies and the interactive-UI boundary.
//!
//! An [`Authenticator`] is a tagged variant over the supported protocols.
//! Each variant drives its own handshake and yields an [`Account`]:
//!
//! - [`OAuth2Authenticator`] - implicit and authorization-code grants
//! - [`OAuth1Authenticator`] - three-legged OAuth 1.0a
//! - [`HostManagedAuthenticator`] - accounts owned by the platform
//!
//! Interactive flows never render anything themselves. They hand an
//! [`AuthorizationPrompt`] to an [`AuthenticationUi`] and wait for the
//! redirected URL or a cancellation.

pub mod host_managed;
pub mod oauth1;
pub mod oauth2;
pub mod pkce;
pub mod signature;
pub mod token_response;

pub use host_managed::{
    AccessOptions, HostAccountHandle, HostAccountStore, HostManagedAuthenticator,
    HostManagedConfig, RenewResult,
};
pub use oauth1::{OAuth1Authenticator, OAuth1Config};
pub use oauth2::{OAuth2Authenticator, OAuth2Config, TokenPlacement};

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use url::Url;
use uuid::Uuid;

use crate::error::SocialError;
use crate::types::{Account, AccountKind, USERNAME};

/// Async callback resolving a display identity from freshly issued
/// account properties.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use socialkit::auth::UsernameResolver;
///
/// let resolver: UsernameResolver = Arc::new(|props| {
///     Box::pin(async move { Ok(props.get("user_id").cloned().unwrap_or_default()) })
/// });
/// ```
pub type UsernameResolver = Arc<
    dyn Fn(BTreeMap<String, String>) -> Pin<Box<dyn Future<Output = Result<String, SocialError>> + Send>>
        + Send
        + Sync,
>;

/// Matches navigations against a configured redirect URL.
///
/// Scheme, host, port and path must be identical; query and fragment are
/// ignored because they carry the protocol response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectMatcher {
    redirect_url: Url,
}

impl RedirectMatcher {
    pub fn new(redirect_url: Url) -> Self {
        Self { redirect_url }
    }

    pub fn redirect_url(&self) -> &Url {
        &self.redirect_url
    }

    pub fn matches(&self, candidate: &Url) -> bool {
        candidate.scheme() == self.redirect_url.scheme()
            && candidate.host_str() == self.redirect_url.host_str()
            && candidate.port_or_known_default() == self.redirect_url.port_or_known_default()
            && candidate.path() == self.redirect_url.path()
    }
}

/// What the UI collaborator must show for one authentication attempt.
#[derive(Debug, Clone)]
pub struct AuthorizationPrompt {
    pub service_id: String,
    pub authorize_url: Url,
    pub redirect: RedirectMatcher,
}

/// Result reported back by the UI collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiOutcome {
    /// The browsing surface navigated to a URL accepted by the matcher.
    Redirected(Url),
    Cancelled,
}

/// Presents an authorize URL and intercepts the redirect.
#[async_trait]
pub trait AuthenticationUi: Send + Sync {
    async fn present(&self, prompt: &AuthorizationPrompt) -> UiOutcome;
}

/// Progress of the current authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Idle,
    AwaitingUserAction,
    AwaitingTokenExchange,
    Complete,
    Cancelled,
    Failed(String),
}

impl AuthState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Cancelled | Self::Failed(_))
    }
}

/// Per-authenticator state cell. A terminal state sticks until the next
/// attempt begins.
#[derive(Debug)]
pub(crate) struct AttemptState(Mutex<AuthState>);

impl AttemptState {
    pub(crate) fn new() -> Self {
        Self(Mutex::new(AuthState::Idle))
    }

    pub(crate) fn get(&self) -> AuthState {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub(crate) fn begin(&self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = AuthState::Idle;
    }

    pub(crate) fn advance(&self, next: AuthState) {
        let mut state = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.is_terminal() {
            *state = next;
        }
    }

    pub(crate) fn finish(&self, result: &Result<Account, SocialError>) {
        self.advance(match result {
            Ok(_) => AuthState::Complete,
            Err(SocialError::AuthenticationCancelled) => AuthState::Cancelled,
            Err(err) => AuthState::Failed(err.to_string()),
        });
    }
}

/// Pick the account id for freshly issued properties.
///
/// Without a resolver, well-known identity properties are tried before
/// falling back to a random id.
pub(crate) async fn resolve_identity(
    resolver: Option<&UsernameResolver>,
    properties: &BTreeMap<String, String>,
) -> Result<String, SocialError> {
    if let Some(resolve) = resolver {
        return resolve(properties.clone()).await;
    }
    Ok(["screen_name", USERNAME, "user_id"]
        .iter()
        .find_map(|key| properties.get(*key).filter(|v| !v.is_empty()).cloned())
        .unwrap_or_else(|| Uuid::new_v4().to_string()))
}

/// Protocol strategy owned by a [`crate::service::Service`].
#[derive(Debug)]
pub enum Authenticator {
    OAuth1(OAuth1Authenticator),
    OAuth2(OAuth2Authenticator),
    HostManaged(HostManagedAuthenticator),
}

impl Authenticator {
    pub fn kind(&self) -> AccountKind {
        match self {
            Self::OAuth1(_) => AccountKind::OAuth1,
            Self::OAuth2(_) => AccountKind::OAuth2,
            Self::HostManaged(_) => AccountKind::HostManaged,
        }
    }

    /// Run an interactive handshake.
    ///
    /// Host-managed services fail with [`SocialError::NotSupported`].
    pub async fn begin_authentication(
        &self,
        ui: &dyn AuthenticationUi,
    ) -> Result<Account, SocialError> {
        match self {
            Self::OAuth1(auth) => auth.begin_authentication(ui).await,
            Self::OAuth2(auth) => auth.begin_authentication(ui).await,
            Self::HostManaged(auth) => auth.begin_authentication(ui).await,
        }
    }

    pub fn supports_authentication(&self) -> bool {
        !matches!(self, Self::HostManaged(_))
    }

    pub fn supports_reauthorization(&self) -> bool {
        match self {
            Self::OAuth1(_) => false,
            Self::OAuth2(auth) => auth.supports_reauthorization(),
            Self::HostManaged(_) => true,
        }
    }

    /// Renew `account`, returning its replacement.
    pub async fn reauthorize(&self, account: &Account) -> Result<Account, SocialError> {
        if account.kind() != self.kind() {
            return Err(SocialError::UnsupportedAccountType {
                account: account.kind(),
                pipeline: kind_label(self.kind()),
            });
        }
        match self {
            Self::OAuth1(_) => Err(SocialError::NotSupported(
                "OAuth 1.0a credentials cannot be renewed".to_string(),
            )),
            Self::OAuth2(auth) => auth.reauthorize(account).await,
            Self::HostManaged(auth) => auth.reauthorize(account).await,
        }
    }

    /// State of the current or last interactive attempt.
    pub fn state(&self) -> AuthState {
        match self {
            Self::OAuth1(auth) => auth.state(),
            Self::OAuth2(auth) => auth.state(),
            Self::HostManaged(_) => AuthState::Idle,
        }
    }
}

pub(crate) fn kind_label(kind: AccountKind) -> &'static str {
    match kind {
        AccountKind::OAuth1 => "OAuth 1.0a",
        AccountKind::OAuth2 => "OAuth 2.0",
        AccountKind::HostManaged => "host-managed",
    }
}

/// Parse a configured URL, reporting the field name on failure.
pub(crate) fn parse_config_url(field: &str, value: &str) -> Result<Url, SocialError> {
    if value.trim().is_empty() {
        return Err(SocialError::Configuration(format!("{field} is required")));
    }
    Url::parse(value)
        .map_err(|e| SocialError::Configuration(format!("{field} is not a valid URL: {e}")))
}

/// Reject empty required string settings.
pub(crate) fn require(field: &str, value: &str) -> Result<(), SocialError> {
    if value.trim().is_empty() {
        return Err(SocialError::Configuration(format!("{field} is required")));
    }
    Ok(())
}
