//! Three-legged OAuth 1.0a handshake (RFC 5849 §2).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use super::oauth2::redirect_parameters;
use super::signature::{OAuth1Signer, SigningKeys};
use super::token_response;
use super::{
    parse_config_url, require, resolve_identity, AttemptState, AuthState, AuthenticationUi,
    AuthorizationPrompt, RedirectMatcher, UiOutcome, UsernameResolver,
};
use crate::error::SocialError;
use crate::request::transport::{insert_authorization, PreparedRequest, ReqwestTransport, Transport};
use crate::types::{Account, AccountKind, OAUTH_TOKEN, OAUTH_TOKEN_SECRET, USERNAME};

/// Static OAuth 1.0a consumer settings. Every field is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth1Config {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub request_token_url: String,
    pub authorize_url: String,
    pub access_token_url: String,
    pub callback_url: String,
}

/// Drives the request-token, authorize, access-token dance.
pub struct OAuth1Authenticator {
    service_id: String,
    config: OAuth1Config,
    request_token_url: Url,
    authorize_url: Url,
    access_token_url: Url,
    callback_url: Url,
    transport: Arc<dyn Transport>,
    username_resolver: Option<UsernameResolver>,
    state: AttemptState,
}

impl fmt::Debug for OAuth1Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth1Authenticator")
            .field("service_id", &self.service_id)
            .field("authorize_url", &self.authorize_url)
            .field("callback_url", &self.callback_url)
            .field("state", &self.state.get())
            .finish_non_exhaustive()
    }
}

impl OAuth1Authenticator {
    pub fn new(service_id: impl Into<String>, config: OAuth1Config) -> Result<Self, SocialError> {
        require("consumer_key", &config.consumer_key)?;
        require("consumer_secret", &config.consumer_secret)?;
        let request_token_url = parse_config_url("request_token_url", &config.request_token_url)?;
        let authorize_url = parse_config_url("authorize_url", &config.authorize_url)?;
        let access_token_url = parse_config_url("access_token_url", &config.access_token_url)?;
        let callback_url = parse_config_url("callback_url", &config.callback_url)?;
        Ok(Self {
            service_id: service_id.into(),
            config,
            request_token_url,
            authorize_url,
            access_token_url,
            callback_url,
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

    pub fn config(&self) -> &OAuth1Config {
        &self.config
    }

    pub fn state(&self) -> AuthState {
        self.state.get()
    }

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
        let request_token = self
            .signed_post(
                &self.request_token_url,
                None,
                &[("oauth_callback", self.callback_url.as_str())],
            )
            .await?;
        let (token, token_secret) = token_pair(&request_token)?;

        let mut authorize_url = self.authorize_url.clone();
        authorize_url
            .query_pairs_mut()
            .append_pair(OAUTH_TOKEN, token);
        let prompt = AuthorizationPrompt {
            service_id: self.service_id.clone(),
            authorize_url,
            redirect: RedirectMatcher::new(self.callback_url.clone()),
        };

        self.state.advance(AuthState::AwaitingUserAction);
        info!(service = %self.service_id, "Presenting OAuth 1.0a authorize URL");
        let redirected = match ui.present(&prompt).await {
            UiOutcome::Redirected(url) => url,
            UiOutcome::Cancelled => return Err(SocialError::AuthenticationCancelled),
        };
        if !prompt.redirect.matches(&redirected) {
            return Err(SocialError::AuthenticationFailed(
                "callback does not match the configured callback URL".to_string(),
            ));
        }

        let callback = redirect_parameters(&redirected);
        if callback.contains_key("denied") {
            info!(service = %self.service_id, "OAuth 1.0a authorization denied by the user");
            return Err(SocialError::AuthenticationCancelled);
        }
        if callback.get(OAUTH_TOKEN).is_some_and(|echoed| echoed != token) {
            return Err(SocialError::AuthenticationFailed(
                "callback token does not match the request token".to_string(),
            ));
        }
        let verifier = callback.get("oauth_verifier").ok_or_else(|| {
            SocialError::AuthenticationFailed("callback is missing oauth_verifier".to_string())
        })?;
        debug!(service = %self.service_id, "Intercepted OAuth 1.0a callback");

        self.state.advance(AuthState::AwaitingTokenExchange);
        let mut properties = self
            .signed_post(
                &self.access_token_url,
                Some((token, token_secret)),
                &[("oauth_verifier", verifier.as_str())],
            )
            .await?;
        token_pair(&properties)?;
        properties.remove("oauth_callback_confirmed");

        let id = resolve_identity(self.username_resolver.as_ref(), &properties).await?;
        properties
            .entry(USERNAME.to_string())
            .or_insert_with(|| id.clone());
        info!(service = %self.service_id, account = %id, "OAuth 1.0a authentication complete");
        Ok(Account::new(id, self.service_id.clone(), AccountKind::OAuth1).with_properties(properties))
    }

    async fn signed_post(
        &self,
        url: &Url,
        token: Option<(&str, &str)>,
        protocol_params: &[(&str, &str)],
    ) -> Result<BTreeMap<String, String>, SocialError> {
        let keys = SigningKeys {
            consumer_key: &self.config.consumer_key,
            consumer_secret: &self.config.consumer_secret,
            token: token.map(|(t, _)| t),
            token_secret: token.map(|(_, s)| s),
        };
        let signer = protocol_params
            .iter()
            .fold(OAuth1Signer::new(keys), |signer, (k, v)| {
                signer.with_protocol_param(*k, *v)
            });

        let mut request = PreparedRequest::new(Method::POST, url.clone());
        insert_authorization(
            &mut request.headers,
            &signer.authorization_header(&Method::POST, url, &[]),
        )?;
        debug!(service = %self.service_id, url = %url, "Requesting OAuth 1.0a token");

        let response = self.transport.send(request).await?;
        let body = String::from_utf8_lossy(&response.body);
        if response.status > 399 {
            return Err(SocialError::AuthenticationFailed(format!(
                "token endpoint returned status {}: {}",
                response.status, body
            )));
        }
        let properties = token_response::parse(&body)?;
        token_response::ensure_no_error(&properties)?;
        Ok(properties)
    }
}

fn token_pair(properties: &BTreeMap<String, String>) -> Result<(&str, &str), SocialError> {
    match (properties.get(OAUTH_TOKEN), properties.get(OAUTH_TOKEN_SECRET)) {
        (Some(token), Some(secret)) if !token.is_empty() => Ok((token, secret)),
        _ => Err(SocialError::AuthenticationFailed(
            "token response is missing oauth_token or oauth_token_secret".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OAuth1Config {
        OAuth1Config {
            consumer_key: "ck".into(),
            consumer_secret: "cs".into(),
            request_token_url: "https://api.example/oauth/request_token".into(),
            authorize_url: "https://api.example/oauth/authorize".into(),
            access_token_url: "https://api.example/oauth/access_token".into(),
            callback_url: "https://app.example/cb".into(),
        }
    }

    #[test]
    fn every_setting_is_required() {
        assert!(OAuth1Authenticator::new("x", config()).is_ok());

        let mut missing_secret = config();
        missing_secret.consumer_secret.clear();
        assert!(matches!(
            OAuth1Authenticator::new("x", missing_secret),
            Err(SocialError::Configuration(_))
        ));

        let mut missing_callback = config();
        missing_callback.callback_url.clear();
        assert!(matches!(
            OAuth1Authenticator::new("x", missing_callback),
            Err(SocialError::Configuration(_))
        ));
    }

    #[test]
    fn token_pair_requires_both_values() {
        let mut props = BTreeMap::new();
        props.insert(OAUTH_TOKEN.to_string(), "t".to_string());
        assert!(token_pair(&props).is_err());
        props.insert(OAUTH_TOKEN_SECRET.to_string(), "s".to_string());
        assert_eq!(token_pair(&props).unwrap(), ("t", "s"));
    }
}
