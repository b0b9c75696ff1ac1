//! Static per-service configuration.

use std::time::Duration;

use bon::Builder;
use serde::{Deserialize, Serialize};

use super::limits::ServiceLimits;
use crate::auth::{HostManagedConfig, OAuth1Config, OAuth2Config};
use crate::service::ShareEndpoint;
use crate::types::AccountKind;

fn default_true() -> bool {
    true
}

/// Protocol parameters, tagged by `protocol`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "protocol", rename_all = "snake_case")]
pub enum ProtocolConfig {
    #[serde(rename = "oauth1")]
    OAuth1(OAuth1Config),
    #[serde(rename = "oauth2")]
    OAuth2(OAuth2Config),
    HostManaged(HostManagedConfig),
}

impl ProtocolConfig {
    pub fn kind(&self) -> AccountKind {
        match self {
            Self::OAuth1(_) => AccountKind::OAuth1,
            Self::OAuth2(_) => AccountKind::OAuth2,
            Self::HostManaged(_) => AccountKind::HostManaged,
        }
    }
}

/// Everything needed to build a [`crate::service::Service`].
///
/// Set once before first use. Protocol parameters are validated when the
/// service is built, not when the file is parsed.
///
/// # Example
/// ```
/// use socialkit::auth::OAuth2Config;
/// use socialkit::config::{ProtocolConfig, ServiceConfig};
///
/// let config = ServiceConfig::builder()
///     .service_id("example")
///     .title("Example")
///     .protocol(ProtocolConfig::OAuth2(OAuth2Config::default()))
///     .build();
/// assert!(config.allow_interactive_accounts);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
pub struct ServiceConfig {
    #[builder(into)]
    pub service_id: String,
    #[builder(into)]
    pub title: String,
    #[serde(default)]
    #[builder(default)]
    pub limits: ServiceLimits,
    /// Whether account retrieval may show any interactive UI.
    #[serde(default = "default_true")]
    #[builder(default = true)]
    pub allow_interactive_accounts: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    #[serde(rename = "auth")]
    pub protocol: ProtocolConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share: Option<ShareEndpoint>,
}

impl ServiceConfig {
    pub fn kind(&self) -> AccountKind {
        self.protocol.kind()
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Prefix of the environment variables overriding this service's secrets.
    pub fn env_prefix(&self) -> String {
        let id: String = self
            .service_id
            .chars()
            .map(|ch| {
                if ch.is_ascii_alphanumeric() {
                    ch.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("SOCIALKIT_{id}")
    }

    /// Override client/consumer secrets from `lookup`.
    pub(crate) fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        let prefix = self.env_prefix();
        let var = |suffix: &str| lookup(&format!("{prefix}_{suffix}"));
        match &mut self.protocol {
            ProtocolConfig::OAuth2(oauth) => {
                if let Some(id) = var("CLIENT_ID") {
                    oauth.client_id = id;
                }
                if let Some(secret) = var("CLIENT_SECRET") {
                    oauth.client_secret = Some(secret);
                }
            }
            ProtocolConfig::OAuth1(oauth) => {
                if let Some(key) = var("CONSUMER_KEY") {
                    oauth.consumer_key = key;
                }
                if let Some(secret) = var("CONSUMER_SECRET") {
                    oauth.consumer_secret = secret;
                }
            }
            ProtocolConfig::HostManaged(_) => {}
        }
    }
}
