//! Configuration system (layered: code > env > services file).
//!
//! ```toml
//! [store]
//! backend = "file"
//!
//! [[services]]
//! service_id = "facebook"
//! title = "Facebook"
//!
//! [services.limits]
//! max_text_length = 63206
//!
//! [services.auth]
//! protocol = "oauth2"
//! client_id = "..."
//! scope = "public_profile,publish_actions"
//! authorize_url = "https://www.facebook.com/dialog/oauth"
//! redirect_url = "https://www.facebook.com/connect/login_success.html"
//! ```

pub mod limits;
pub mod service;

pub use limits::{Limit, ServiceLimits};
pub use service::{ProtocolConfig, ServiceConfig};

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::debug;

use crate::error::SocialError;
use crate::store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};

/// Which credential store backs persisted accounts.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    File,
    Memory,
    Keyring,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Directory for the file backend; defaults to `~/.socialkit/accounts`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

/// A services file: credential store settings plus service definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
}

impl SocialConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, SocialError> {
        let config: Self = toml::from_str(raw)
            .map_err(|e| SocialError::Configuration(format!("invalid services file: {e}")))?;
        let mut seen = HashSet::new();
        if let Some(dup) = config
            .services
            .iter()
            .find(|s| !seen.insert(s.service_id.as_str()))
        {
            return Err(SocialError::Configuration(format!(
                "service '{}' is defined more than once",
                dup.service_id
            )));
        }
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SocialError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SocialError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), "Loaded services file");
        Self::from_toml_str(&raw)
    }

    /// Load `~/.socialkit/services.toml`, or an empty config when absent.
    pub fn load_default() -> Result<Self, SocialError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Override secrets from the environment (loading `.env` if present).
    ///
    /// Reads `SOCIALKIT_<SERVICE_ID>_CLIENT_ID`, `_CLIENT_SECRET`,
    /// `_CONSUMER_KEY` and `_CONSUMER_SECRET`.
    pub fn apply_env(&mut self) {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for service in &mut self.services {
            service.apply_overrides(&lookup);
        }
    }

    pub fn service(&self, service_id: &str) -> Option<&ServiceConfig> {
        self.services.iter().find(|s| s.service_id == service_id)
    }

    /// Instantiate the configured credential store.
    pub fn build_store(&self) -> Result<Arc<dyn CredentialStore>, SocialError> {
        match self.store.backend {
            StoreBackend::File => Ok(Arc::new(match &self.store.directory {
                Some(dir) => FileCredentialStore::new(dir.clone()),
                None => FileCredentialStore::new_default(),
            })),
            StoreBackend::Memory => Ok(Arc::new(MemoryCredentialStore::new())),
            #[cfg(feature = "system-keyring")]
            StoreBackend::Keyring => Ok(Arc::new(crate::store::KeyringCredentialStore::new())),
            #[cfg(not(feature = "system-keyring"))]
            StoreBackend::Keyring => Err(SocialError::Configuration(
                "keyring backend requires the system-keyring feature".to_string(),
            )),
        }
    }
}

pub fn default_socialkit_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".socialkit"))
        .unwrap_or_else(|| PathBuf::from(".socialkit"))
}

pub fn default_config_path() -> PathBuf {
    default_socialkit_dir().join("services.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::OAuth2Config;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"
[store]
backend = "memory"

[[services]]
service_id = "example-net"
title = "Example"
request_timeout_secs = 30

[services.limits]
max_text_length = 140

[services.auth]
protocol = "oauth2"
client_id = "abc"
scope = "read,write"
authorize_url = "https://auth.example/authorize"
redirect_url = "https://app.example/done"

[[services]]
service_id = "platform"
title = "Platform"
allow_interactive_accounts = false

[services.auth]
protocol = "host_managed"
account_type = "com.example.platform"
"#;

    #[test]
    fn parses_services_file() {
        let config = SocialConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.services.len(), 2);

        let example = config.service("example-net").unwrap();
        assert_eq!(example.limits.max_text_length, Limit::at_most(140));
        assert!(example.limits.max_links.is_unbounded());
        assert!(example.allow_interactive_accounts);
        assert_eq!(
            example.protocol,
            ProtocolConfig::OAuth2(OAuth2Config {
                client_id: "abc".into(),
                scope: "read,write".into(),
                authorize_url: "https://auth.example/authorize".into(),
                redirect_url: "https://app.example/done".into(),
                ..Default::default()
            })
        );

        let platform = config.service("platform").unwrap();
        assert!(!platform.allow_interactive_accounts);
        assert!(matches!(platform.protocol, ProtocolConfig::HostManaged(_)));
    }

    #[test]
    fn duplicate_service_ids_are_rejected() {
        let raw = r#"
[[services]]
service_id = "a"
title = "A"
[services.auth]
protocol = "host_managed"
account_type = "x"

[[services]]
service_id = "a"
title = "A again"
[services.auth]
protocol = "host_managed"
account_type = "x"
"#;
        assert!(matches!(
            SocialConfig::from_toml_str(raw),
            Err(SocialError::Configuration(_))
        ));
    }

    #[test]
    fn overrides_replace_client_secrets() {
        let mut config = SocialConfig::from_toml_str(SAMPLE).unwrap();
        config.apply_overrides(|key| match key {
            "SOCIALKIT_EXAMPLE_NET_CLIENT_ID" => Some("from-env".to_string()),
            "SOCIALKIT_EXAMPLE_NET_CLIENT_SECRET" => Some("shh".to_string()),
            _ => None,
        });
        let ProtocolConfig::OAuth2(oauth) = &config.services[0].protocol else {
            panic!("expected oauth2");
        };
        assert_eq!(oauth.client_id, "from-env");
        assert_eq!(oauth.client_secret.as_deref(), Some("shh"));
    }

    #[test]
    fn round_trips_through_toml() {
        let config = SocialConfig::from_toml_str(SAMPLE).unwrap();
        let serialized = toml::to_string(&config).unwrap();
        assert_eq!(SocialConfig::from_toml_str(&serialized).unwrap(), config);
    }
}
