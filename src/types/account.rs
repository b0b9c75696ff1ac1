use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Property holding an OAuth 2.0 access token.
pub const ACCESS_TOKEN: &str = "access_token";
/// Property holding an OAuth 2.0 refresh token.
pub const REFRESH_TOKEN: &str = "refresh_token";
/// Lifetime in seconds reported by the token endpoint.
pub const EXPIRES_IN: &str = "expires_in";
/// Absolute expiry (unix seconds) derived from `expires_in` at issue time.
pub const EXPIRES_AT: &str = "expires_at";
/// Property holding an OAuth 1.0a token.
pub const OAUTH_TOKEN: &str = "oauth_token";
/// Property holding an OAuth 1.0a token secret.
pub const OAUTH_TOKEN_SECRET: &str = "oauth_token_secret";
/// Display identity of the account.
pub const USERNAME: &str = "username";

/// Authentication protocol an [`Account`] was issued by.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AccountKind {
    #[strum(serialize = "oauth1")]
    #[serde(rename = "oauth1")]
    OAuth1,
    #[strum(serialize = "oauth2")]
    #[serde(rename = "oauth2")]
    OAuth2,
    HostManaged,
}

/// A named bundle of protocol secrets for one identity on one service.
///
/// Accounts are never mutated once issued. Renewal produces a replacement
/// with the same [`Account::id`] via [`Account::renewed`].
///
/// # Example
/// ```
/// use socialkit::types::{Account, AccountKind, ACCESS_TOKEN};
///
/// let account = Account::new("alice", "facebook", AccountKind::OAuth2)
///     .with_property(ACCESS_TOKEN, "TOK123");
/// assert_eq!(account.property(ACCESS_TOKEN), Some("TOK123"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    id: String,
    service_id: String,
    kind: AccountKind,
    #[serde(default)]
    properties: BTreeMap<String, String>,
}

impl Account {
    pub fn new(id: impl Into<String>, service_id: impl Into<String>, kind: AccountKind) -> Self {
        Self {
            id: id.into(),
            service_id: service_id.into(),
            kind,
            properties: BTreeMap::new(),
        }
    }

    /// Add a property while the account is being assembled.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Replace all properties while the account is being assembled.
    pub fn with_properties(mut self, properties: BTreeMap<String, String>) -> Self {
        self.properties = properties;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    pub fn kind(&self) -> AccountKind {
        self.kind
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn username(&self) -> Option<&str> {
        self.property(USERNAME)
    }

    /// Build the replacement issued by a credential renewal.
    ///
    /// `updates` are merged over the current properties; the id, service and
    /// kind are carried over.
    pub fn renewed(&self, updates: BTreeMap<String, String>) -> Self {
        let mut properties = self.properties.clone();
        properties.extend(updates);
        Self {
            id: self.id.clone(),
            service_id: self.service_id.clone(),
            kind: self.kind,
            properties,
        }
    }

    /// Drop any recorded lifetime.
    pub fn without_expiry(mut self) -> Self {
        self.properties.remove(EXPIRES_AT);
        self.properties.remove(EXPIRES_IN);
        self
    }

    /// Expiry recorded in the `expires_at` property, if any.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.property(EXPIRES_AT)
            .and_then(|raw| raw.parse::<i64>().ok())
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    }

    /// Accounts without a recorded expiry never go stale.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|expires| expires <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn renewed_keeps_identity_and_merges_properties() {
        let original = Account::new("alice", "facebook", AccountKind::OAuth2)
            .with_property(ACCESS_TOKEN, "old")
            .with_property(REFRESH_TOKEN, "refresh");
        let mut updates = BTreeMap::new();
        updates.insert(ACCESS_TOKEN.to_string(), "new".to_string());

        let renewed = original.renewed(updates);

        assert_eq!(renewed.id(), "alice");
        assert_eq!(renewed.service_id(), "facebook");
        assert_eq!(renewed.property(ACCESS_TOKEN), Some("new"));
        assert_eq!(renewed.property(REFRESH_TOKEN), Some("refresh"));
        assert_eq!(original.property(ACCESS_TOKEN), Some("old"));
    }

    #[test]
    fn expiry_is_read_from_expires_at() {
        let now = Utc::now();
        let past = (now - Duration::minutes(5)).timestamp().to_string();
        let future = (now + Duration::minutes(5)).timestamp().to_string();

        let stale = Account::new("a", "s", AccountKind::OAuth2).with_property(EXPIRES_AT, past);
        let fresh = Account::new("b", "s", AccountKind::OAuth2).with_property(EXPIRES_AT, future);
        let forever = Account::new("c", "s", AccountKind::OAuth1);

        assert!(stale.is_expired(now));
        assert!(!fresh.is_expired(now));
        assert!(!forever.is_expired(now));
    }

    #[test]
    fn account_kind_round_trips_through_strings() {
        assert_eq!(AccountKind::OAuth1.to_string(), "oauth1");
        assert_eq!(AccountKind::HostManaged.to_string(), "host_managed");
        assert_eq!("oauth2".parse::<AccountKind>().unwrap(), AccountKind::OAuth2);
    }
}
