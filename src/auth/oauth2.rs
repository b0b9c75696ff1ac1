//! OAuth 2.0 implicit and authorization-code grants (RFC 6749 §4.1, §4.2).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use super::pkce::{self, Pkce};
use super::token_response;
use super::{
    parse_config_url, require, resolve_identity, AttemptState, AuthState, AuthenticationUi,
    AuthorizationPrompt, RedirectMatcher, UiOutcome, UsernameResolver,
};
use crate::error::SocialError;
use crate::request::transport::{PreparedRequest, ReqwestTransport, Transport};
use crate::types::{Account, AccountKind, ACCESS_TOKEN, EXPIRES_AT, EXPIRES_IN, REFRESH_TOKEN, USERNAME};

const SCOPE_SEPARATOR: char = ',';

fn default_query_parameter() -> String {
    ACCESS_TOKEN.to_string()
}

/// Where the access token travels on authenticated requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "placement", rename_all = "snake_case")]
pub enum TokenPlacement {
    /// `Authorization: Bearer <token>`.
    #[default]
    Header,
    /// `?<parameter>=<token>`.
    Query {
        #[serde(default = "default_query_parameter")]
        parameter: String,
    },
}

/// Static OAuth 2.0 client settings.
///
/// URLs stay as strings here; they are validated when an
/// [`OAuth2Authenticator`] is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2Config {
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Comma separated scope list.
    pub scope: String,
    pub authorize_url: String,
    pub redirect_url: String,
    /// Switches the flow to the authorization-code grant when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_url: Option<String>,
    #[serde(default)]
    pub use_pkce: bool,
    #[serde(default)]
    pub token_placement: TokenPlacement,
}

impl OAuth2Config {
    pub fn scopes(&self) -> Vec<String> {
        self.scope
            .split(SCOPE_SEPARATOR)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }

    /// Replace the scope list. Individual scopes may not contain a comma.
    pub fn set_scopes<I, S>(&mut self, scopes: I) -> Result<(), SocialError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let scopes: Vec<String> = scopes.into_iter().map(Into::into).collect();
        if let Some(bad) = scopes.iter().find(|s| s.contains(SCOPE_SEPARATOR)) {
            return Err(SocialError::Configuration(format!(
                "scope '{bad}' contains the '{SCOPE_SEPARATOR}' separator"
            )));
        }
        self.scope = scopes.join(&SCOPE_SEPARATOR.to_string());
        Ok(())
    }
}

/// Drives the OAuth 2.0 browser handshake for one service.
///
/// # Example
/// ```
/// use socialkit::auth::{OAuth2Authenticator, OAuth2Config};
///
/// let config = OAuth2Config {
///     client_id: "abc".into(),
///     scope: "read,write".into(),
///     authorize_url: "https://auth.example/authorize".into(),
///     redirect_url: "https://app.example/done".into(),
///     ..Default::default()
/// };
/// let auth = OAuth2Authenticator::new("example", config)?;
/// assert!(!auth.supports_reauthorization());
/// # Ok::<(), socialkit::error::SocialError>(())
/// ```
pub struct OAuth2Authenticator {
    service_id: String,
    config: OAuth2Config,
    authorize_url: Url,
    redirect_url: Url,
    access_token_url: Option<Url>,
    transport: Arc<dyn Transport>,
    username_resolver: Option<UsernameResolver>,
    state: AttemptState,
}

impl fmt::Debug for OAuth2Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Authenticator")
            .field("service_id", &self.service_id)
            .field("authorize_url", &self.authorize_url)
            .field("redirect_url", &self.redirect_url)
            .field("access_token_url", &self.access_token_url)
            .field("state", &self.state.get())
            .finish_non_exhaustive()
    }
}

impl OAuth2Authenticator {
    /// Validate `config` and build the authenticator.
    ///
    /// Fails with [`SocialError::Configuration`] when `client_id`, `scope`,
    /// `authorize_url` or `redirect_url` is missing or malformed.
    pub fn new(service_id: impl Into<String>, config: OAuth2Config) -> Result<Self, SocialError> {
        require("client_id", &config.client_id)?;
        require("scope", &config.scope)?;
        let authorize_url = parse_config_url("authorize_url", &config.authorize_url)?;
        let redirect_url = parse_config_url("redirect_url", &config.redirect_url)?;
        let access_token_url = match config.access_token_url.as_deref() {
            Some(raw) if !raw.trim().is_empty() => Some(parse_config_url("access_token_url", raw)?),
            _ => None,
        };
        Ok(Self {
            service_id: service_id.into(),
            config,
            authorize_url,
            redirect_url,
            access_token_url,
            transport: Arc::new(ReqwestTransport::shared()),
            username_resolver: None,
            state: AttemptState::new(),
        })
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_username_resolver(mut self, resolver: UsernameResolver) -> Self {
        self.username_resolver = Some(resolver);
        self
    }

    pub fn config(&self) -> &OAuth2Config {
        &self.config
    }

    pub fn token_placement(&self) -> &TokenPlacement {
        &self.config.token_placement
    }

    /// Whether redirects carry a code to exchange rather than a token.
    pub fn uses_code_grant(&self) -> bool {
        self.access_token_url.is_some()
    }

    pub fn supports_reauthorization(&self) -> bool {
        self.access_token_url.is_some()
    }

    pub fn state(&self) -> AuthState {
        self.state.get()
    }

    /// Authorize URL for one attempt.
    pub fn authorization_url(&self, state: &str, pkce: Option<&Pkce>) -> Url {
        let mut url = self.authorize_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.config.client_id)
                .append_pair("redirect_uri", self.redirect_url.as_str())
                .append_pair(
                    "response_type",
                    if self.uses_code_grant() { "code" } else { "token" },
                )
                .append_pair("scope", &self.config.scope)
                .append_pair("state", state);
            if let Some(pkce) = pkce {
                query
                    .append_pair("code_challenge", &pkce.challenge)
                    .append_pair("code_challenge_method", pkce::CHALLENGE_METHOD);
            }
        }
        url
    }

    /// Present the authorize URL and turn the intercepted redirect into an
    /// [`Account`].
    pub async fn begin_authentication(
        &self,
        ui: &dyn AuthenticationUi,
    ) -> Result<Account, SocialError> {
        self.state.begin();
        let result = self.authenticate(ui).await;
        self.state.finish(&result);
        result
    }

    async fn authenticate(&self, ui: &dyn AuthenticationUi) -> Result<Account, SocialError> {
        let csrf = Uuid::new_v4().simple().to_string();
        let pkce = (self.config.use_pkce && self.uses_code_grant()).then(Pkce::generate);
        let prompt = AuthorizationPrompt {
            service_id: self.service_id.clone(),
            authorize_url: self.authorization_url(&csrf, pkce.as_ref()),
            redirect: RedirectMatcher::new(self.redirect_url.clone()),
        };

        self.state.advance(AuthState::AwaitingUserAction);
        info!(service = %self.service_id, "Presenting OAuth 2.0 authorize URL");
        let redirected = match ui.present(&prompt).await {
            UiOutcome::Redirected(url) => url,
            UiOutcome::Cancelled => {
                info!(service = %self.service_id, "OAuth 2.0 authentication cancelled");
                return Err(SocialError::AuthenticationCancelled);
            }
        };
        if !prompt.redirect.matches(&redirected) {
            return Err(SocialError::AuthenticationFailed(
                "redirect does not match the configured redirect URL".to_string(),
            ));
        }
        debug!(service = %self.service_id, "Intercepted OAuth 2.0 redirect");

        let mut params = redirect_parameters(&redirected);
        token_response::ensure_no_error(&params)?;
        if params.remove("state").is_some_and(|echoed| echoed != csrf) {
            return Err(SocialError::AuthenticationFailed(
                "state parameter mismatch, possible forgery".to_string(),
            ));
        }

        let properties = match &self.access_token_url {
            Some(token_url) => {
                let code = params.get("code").filter(|c| !c.is_empty()).ok_or_else(|| {
                    SocialError::AuthenticationFailed(
                        "redirect is missing the authorization code".to_string(),
                    )
                })?;
                self.state.advance(AuthState::AwaitingTokenExchange);
                self.exchange_code(token_url, code, pkce.as_ref()).await?
            }
            None => {
                if params.get(ACCESS_TOKEN).map_or(true, |t| t.is_empty()) {
                    return Err(SocialError::AuthenticationFailed(
                        "redirect is missing the access token".to_string(),
                    ));
                }
                params
            }
        };
        self.materialize(properties).await
    }

    async fn exchange_code(
        &self,
        token_url: &Url,
        code: &str,
        pkce: Option<&Pkce>,
    ) -> Result<BTreeMap<String, String>, SocialError> {
        let mut form = self.client_credentials();
        form.insert("grant_type".to_string(), "authorization_code".to_string());
        form.insert("code".to_string(), code.to_string());
        form.insert("redirect_uri".to_string(), self.redirect_url.to_string());
        if let Some(pkce) = pkce {
            form.insert("code_verifier".to_string(), pkce.verifier.clone());
        }
        debug!(service = %self.service_id, url = %token_url, "Exchanging authorization code");
        self.token_request(token_url, form).await
    }

    /// Renew an account through its refresh token.
    pub async fn reauthorize(&self, account: &Account) -> Result<Account, SocialError> {
        let Some(token_url) = &self.access_token_url else {
            return Err(SocialError::NotSupported(format!(
                "{} has no token endpoint for renewal",
                self.service_id
            )));
        };
        let refresh_token = account.property(REFRESH_TOKEN).ok_or_else(|| {
            SocialError::AuthenticationFailed("account has no refresh token".to_string())
        })?;

        let mut form = self.client_credentials();
        form.insert("grant_type".to_string(), "refresh_token".to_string());
        form.insert("refresh_token".to_string(), refresh_token.to_string());
        let mut updates = self.token_request(token_url, form).await?;
        stamp_expiry(&mut updates);
        info!(service = %self.service_id, account = %account.id(), "Renewed OAuth 2.0 account");
        // The old expiry never outlives a renewal; only the new response sets one.
        Ok(account.clone().without_expiry().renewed(updates))
    }

    fn client_credentials(&self) -> BTreeMap<String, String> {
        let mut form = BTreeMap::new();
        form.insert("client_id".to_string(), self.config.client_id.clone());
        if let Some(secret) = &self.config.client_secret {
            form.insert("client_secret".to_string(), secret.clone());
        }
        form
    }

    async fn token_request(
        &self,
        token_url: &Url,
        form: BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>, SocialError> {
        let mut request = PreparedRequest::new(Method::POST, token_url.clone());
        request
            .headers
            .insert(ACCEPT, HeaderValue::from_static("application/json"));
        request.parameters = form;

        let response = self.transport.send(request).await?;
        let body = String::from_utf8_lossy(&response.body);
        if response.status > 399 {
            if let Ok(props) = token_response::parse(&body) {
                token_response::ensure_no_error(&props)?;
            }
            return Err(SocialError::AuthenticationFailed(format!(
                "token endpoint returned status {}",
                response.status
            )));
        }

        let props = token_response::parse(&body)?;
        token_response::ensure_no_error(&props)?;
        if props.get(ACCESS_TOKEN).map_or(true, |t| t.is_empty()) {
            return Err(SocialError::AuthenticationFailed(
                "token response did not include an access token".to_string(),
            ));
        }
        Ok(props)
    }

    async fn materialize(
        &self,
        mut properties: BTreeMap<String, String>,
    ) -> Result<Account, SocialError> {
        stamp_expiry(&mut properties);
        let id = resolve_identity(self.username_resolver.as_ref(), &properties).await?;
        properties
            .entry(USERNAME.to_string())
            .or_insert_with(|| id.clone());
        info!(service = %self.service_id, account = %id, "OAuth 2.0 authentication complete");
        Ok(Account::new(id, self.service_id.clone(), AccountKind::OAuth2).with_properties(properties))
    }
}

/// Query and fragment pairs of a redirect. Fragment pairs win.
pub(crate) fn redirect_parameters(url: &Url) -> BTreeMap<String, String> {
    let mut params: BTreeMap<String, String> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if let Some(fragment) = url.fragment() {
        params.extend(
            url::form_urlencoded::parse(fragment.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned())),
        );
    }
    params
}

/// Record `expires_at` from a provider's relative `expires_in`.
///
/// Negative, malformed or out-of-range lifetimes leave the account without
/// an expiry.
fn stamp_expiry(properties: &mut BTreeMap<String, String>) {
    let Some(raw) = properties.get(EXPIRES_IN) else {
        return;
    };
    let expires_at = raw
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|secs| *secs >= 0)
        .and_then(|secs| Utc::now().timestamp().checked_add(secs));
    match expires_at {
        Some(at) => {
            properties.insert(EXPIRES_AT.to_string(), at.to_string());
        }
        None => debug!(expires_in = %raw, "Ignoring unusable token lifetime"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OAuth2Config {
        OAuth2Config {
            client_id: "abc".into(),
            scope: "read,write".into(),
            authorize_url: "https://auth.example/authorize".into(),
            redirect_url: "https://app.example/done".into(),
            ..Default::default()
        }
    }

    #[test]
    fn missing_required_settings_fail_fast() {
        let cases: [fn(&mut OAuth2Config); 4] = [
            |c| c.client_id.clear(),
            |c| c.scope.clear(),
            |c| c.authorize_url.clear(),
            |c| c.redirect_url.clear(),
        ];
        for clear in cases {
            let mut cfg = config();
            clear(&mut cfg);
            assert!(matches!(
                OAuth2Authenticator::new("example", cfg),
                Err(SocialError::Configuration(_))
            ));
        }
    }

    #[test]
    fn malformed_url_is_a_configuration_error() {
        let mut cfg = config();
        cfg.redirect_url = "not a url".into();
        assert!(matches!(
            OAuth2Authenticator::new("example", cfg),
            Err(SocialError::Configuration(_))
        ));
    }

    #[test]
    fn implicit_authorize_url_requests_a_token() {
        let auth = OAuth2Authenticator::new("example", config()).unwrap();
        let url = auth.authorization_url("xyz", None);
        let pairs: BTreeMap<String, String> = url.query_pairs().into_owned().collect();

        assert_eq!(pairs["client_id"], "abc");
        assert_eq!(pairs["redirect_uri"], "https://app.example/done");
        assert_eq!(pairs["response_type"], "token");
        assert_eq!(pairs["scope"], "read,write");
        assert_eq!(pairs["state"], "xyz");
        assert!(!pairs.contains_key("code_challenge"));
    }

    #[test]
    fn code_grant_authorize_url_carries_pkce_challenge() {
        let mut cfg = config();
        cfg.access_token_url = Some("https://auth.example/token".into());
        cfg.use_pkce = true;
        let auth = OAuth2Authenticator::new("example", cfg).unwrap();
        let pkce = Pkce::generate();
        let url = auth.authorization_url("s", Some(&pkce));
        let pairs: BTreeMap<String, String> = url.query_pairs().into_owned().collect();

        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["code_challenge"], pkce.challenge);
        assert_eq!(pairs["code_challenge_method"], "S256");
        assert!(auth.supports_reauthorization());
    }

    #[test]
    fn scopes_split_and_join_on_commas() {
        let mut cfg = config();
        assert_eq!(cfg.scopes(), vec!["read", "write"]);
        cfg.set_scopes(["email", "public_profile"]).unwrap();
        assert_eq!(cfg.scope, "email,public_profile");
        assert!(cfg.set_scopes(["a,b"]).is_err());
    }

    #[test]
    fn redirect_fragment_overrides_query() {
        let url: Url = "https://app.example/done?state=q&x=1#access_token=T&state=f"
            .parse()
            .unwrap();
        let params = redirect_parameters(&url);
        assert_eq!(params["access_token"], "T");
        assert_eq!(params["state"], "f");
        assert_eq!(params["x"], "1");
    }

    #[test]
    fn expiry_is_stamped_from_expires_in() {
        let mut props = BTreeMap::new();
        props.insert(EXPIRES_IN.to_string(), "60".to_string());
        stamp_expiry(&mut props);
        let at: i64 = props[EXPIRES_AT].parse().unwrap();
        assert!(at > Utc::now().timestamp());
    }

    #[test]
    fn unusable_lifetimes_record_no_expiry() {
        for raw in ["9223372036854775807", "-30", "soon"] {
            let mut props = BTreeMap::new();
            props.insert(EXPIRES_IN.to_string(), raw.to_string());
            stamp_expiry(&mut props);
            assert!(!props.contains_key(EXPIRES_AT), "{raw}");
        }
    }

    #[test]
    fn token_placement_deserializes_with_default_parameter() {
        let placement: TokenPlacement = toml::from_str("placement = \"query\"").unwrap();
        assert_eq!(
            placement,
            TokenPlacement::Query {
                parameter: "access_token".into()
            }
        );
    }
}
