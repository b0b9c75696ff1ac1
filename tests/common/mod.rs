//! Shared test helpers: scripted UI, in-memory host account store and
//! sample service configurations.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use url::Url;

use socialkit::auth::{
    AccessOptions, AuthenticationUi, AuthorizationPrompt, HostAccountHandle, HostAccountStore,
    HostManagedConfig, OAuth1Config, OAuth2Config, RenewResult, UiOutcome,
};
use socialkit::config::{ProtocolConfig, ServiceConfig};
use socialkit::error::SocialError;
use socialkit::request::{PreparedRequest, TransportResponse};

type Script = Box<dyn Fn(&AuthorizationPrompt) -> UiOutcome + Send + Sync>;

/// UI that answers every prompt with a scripted outcome and records prompts.
pub struct ScriptedUi {
    script: Script,
    prompts: Mutex<Vec<AuthorizationPrompt>>,
}

impl ScriptedUi {
    pub fn new(script: impl Fn(&AuthorizationPrompt) -> UiOutcome + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always navigate to `url`.
    pub fn redirect_to(url: &str) -> Self {
        let url: Url = url.parse().unwrap();
        Self::new(move |_| UiOutcome::Redirected(url.clone()))
    }

    pub fn cancelling() -> Self {
        Self::new(|_| UiOutcome::Cancelled)
    }

    /// Navigate to `redirect` with `extra` query pairs plus the `state` the
    /// authorize URL carried.
    pub fn echoing_state(redirect: &str, extra: &[(&str, &str)]) -> Self {
        let base: Url = redirect.parse().unwrap();
        let extra: Vec<(String, String)> = extra
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self::new(move |prompt| {
            let mut url = base.clone();
            {
                let mut query = url.query_pairs_mut();
                for (k, v) in &extra {
                    query.append_pair(k, v);
                }
                if let Some(state) = query_value(&prompt.authorize_url, "state") {
                    query.append_pair("state", &state);
                }
            }
            UiOutcome::Redirected(url)
        })
    }

    pub fn prompts(&self) -> Vec<AuthorizationPrompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthenticationUi for ScriptedUi {
    async fn present(&self, prompt: &AuthorizationPrompt) -> UiOutcome {
        self.prompts.lock().unwrap().push(prompt.clone());
        (self.script)(prompt)
    }
}

pub fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Platform account store kept in memory.
pub struct InMemoryHostStore {
    pub accounts: Mutex<Vec<HostAccountHandle>>,
    pub grant_access: bool,
    pub renew_result: RenewResult,
    pub performed: Mutex<Vec<(String, PreparedRequest)>>,
    pub access_requests: Mutex<usize>,
}

impl InMemoryHostStore {
    pub fn new(accounts: Vec<HostAccountHandle>) -> Self {
        Self {
            accounts: Mutex::new(accounts),
            grant_access: true,
            renew_result: RenewResult::Renewed,
            performed: Mutex::new(Vec::new()),
            access_requests: Mutex::new(0),
        }
    }

    pub fn denying(mut self) -> Self {
        self.grant_access = false;
        self
    }

    pub fn with_renew_result(mut self, result: RenewResult) -> Self {
        self.renew_result = result;
        self
    }
}

#[async_trait]
impl HostAccountStore for InMemoryHostStore {
    async fn find_accounts(&self, _account_type: &str) -> Result<Vec<HostAccountHandle>, SocialError> {
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn request_access(
        &self,
        _account_type: &str,
        _options: &AccessOptions,
    ) -> Result<bool, SocialError> {
        *self.access_requests.lock().unwrap() += 1;
        Ok(self.grant_access)
    }

    async fn renew_credentials(&self, _handle: &HostAccountHandle) -> Result<RenewResult, SocialError> {
        Ok(self.renew_result.clone())
    }

    async fn perform_request(
        &self,
        handle: &HostAccountHandle,
        request: PreparedRequest,
    ) -> Result<TransportResponse, SocialError> {
        let body = format!("performed for {}", handle.identifier);
        self.performed
            .lock()
            .unwrap()
            .push((handle.identifier.clone(), request));
        Ok(TransportResponse {
            status: 200,
            headers: HeaderMap::new(),
            body: Bytes::from(body),
        })
    }
}

pub fn oauth2_config() -> OAuth2Config {
    OAuth2Config {
        client_id: "abc".into(),
        scope: "read,write".into(),
        authorize_url: "https://auth.example/authorize".into(),
        redirect_url: "https://app.example/done".into(),
        ..Default::default()
    }
}

/// Authorization-code configuration whose token endpoint lives on `server_uri`.
pub fn oauth2_code_config(server_uri: &str) -> OAuth2Config {
    OAuth2Config {
        client_secret: Some("shh".into()),
        access_token_url: Some(format!("{server_uri}/token")),
        ..oauth2_config()
    }
}

pub fn oauth1_config(server_uri: &str) -> OAuth1Config {
    OAuth1Config {
        consumer_key: "ck".into(),
        consumer_secret: "cs".into(),
        request_token_url: format!("{server_uri}/oauth/request_token"),
        authorize_url: format!("{server_uri}/oauth/authorize"),
        access_token_url: format!("{server_uri}/oauth/access_token"),
        callback_url: "https://app.example/cb".into(),
    }
}

pub fn service_config(service_id: &str, protocol: ProtocolConfig) -> ServiceConfig {
    ServiceConfig::builder()
        .service_id(service_id)
        .title(service_id.to_uppercase())
        .protocol(protocol)
        .build()
}

pub fn host_config() -> HostManagedConfig {
    HostManagedConfig {
        account_type: "com.example.social".into(),
        ..Default::default()
    }
}

pub fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
