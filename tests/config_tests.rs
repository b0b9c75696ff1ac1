use pretty_assertions::assert_eq;
use tempfile::TempDir;

use socialkit::auth::TokenPlacement;
use socialkit::config::{Limit, ProtocolConfig, SocialConfig};
use socialkit::error::SocialError;
use socialkit::service::{presets, Service};
use socialkit::types::{Account, AccountKind};

#[test]
fn services_file_loads_from_disk() {
    let dir = TempDir::new().unwrap();
    let accounts_dir = dir.path().join("accounts");
    let path = dir.path().join("services.toml");
    std::fs::write(
        &path,
        format!(
            r#"
[store]
backend = "file"
directory = "{}"

[[services]]
service_id = "example"
title = "Example"

[services.auth]
protocol = "oauth2"
client_id = "abc"
scope = "read"
authorize_url = "https://auth.example/authorize"
redirect_url = "https://app.example/done"
access_token_url = "https://auth.example/token"
use_pkce = true

[services.auth.token_placement]
placement = "query"
parameter = "oauth_token"

[services.share]
url = "https://api.example/feed"
"#,
            accounts_dir.display()
        ),
    )
    .unwrap();

    let config = SocialConfig::load(&path).unwrap();
    let example = config.service("example").unwrap();
    let ProtocolConfig::OAuth2(oauth) = &example.protocol else {
        panic!("expected oauth2");
    };
    assert!(oauth.use_pkce);
    assert_eq!(
        oauth.token_placement,
        TokenPlacement::Query {
            parameter: "oauth_token".into()
        }
    );
    let share = example.share.as_ref().unwrap();
    assert_eq!(share.text_field, "message");

    let store = config.build_store().unwrap();
    assert_eq!(store.name(), "file");

    let service = Service::builder(example.clone())
        .credential_store(store)
        .build()
        .unwrap();
    assert!(service.supports_share());
    assert!(service.supports_reauthorization());
}

#[tokio::test]
async fn configured_file_store_writes_into_directory() {
    let dir = TempDir::new().unwrap();
    let raw = format!(
        "[store]\nbackend = \"file\"\ndirectory = \"{}\"\n",
        dir.path().display()
    );
    let store = SocialConfig::from_toml_str(&raw).unwrap().build_store().unwrap();
    store
        .save("example", &Account::new("a", "example", AccountKind::OAuth2))
        .await
        .unwrap();
    assert!(dir.path().join("example.toml").exists());
}

#[test]
fn missing_file_is_a_configuration_error() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        SocialConfig::load(dir.path().join("absent.toml")),
        Err(SocialError::Configuration(_))
    ));
}

#[test]
fn zero_limit_is_rejected_in_files() {
    let raw = r#"
[[services]]
service_id = "x"
title = "X"
[services.limits]
max_images = 0
[services.auth]
protocol = "host_managed"
account_type = "t"
"#;
    assert!(SocialConfig::from_toml_str(raw).is_err());
}

#[test]
fn invalid_protocol_values_fail_when_the_service_is_built() {
    let raw = r#"
[[services]]
service_id = "broken"
title = "Broken"
[services.auth]
protocol = "oauth2"
client_id = ""
scope = "read"
authorize_url = "not a url"
redirect_url = "https://app.example/done"
"#;
    let config = SocialConfig::from_toml_str(raw).expect("parsing does not validate");
    let err = Service::new(config.services[0].clone()).unwrap_err();
    assert!(matches!(err, SocialError::Configuration(_)));
}

#[test]
fn presets_round_trip_through_services_file() {
    let config = SocialConfig {
        services: vec![
            presets::facebook("fb-app"),
            presets::twitter("ck", "cs", "https://app.example/cb"),
            presets::flickr("ck", "cs", "https://app.example/cb"),
        ],
        ..Default::default()
    };
    let serialized = toml::to_string(&config).unwrap();
    let parsed = SocialConfig::from_toml_str(&serialized).unwrap();
    assert_eq!(parsed, config);

    let twitter = parsed.service("twitter").unwrap();
    assert_eq!(twitter.limits.max_text_length, Limit::at_most(280));
    assert_eq!(twitter.kind(), AccountKind::OAuth1);
}

#[test]
fn env_overrides_fill_in_consumer_secrets() {
    let mut config = SocialConfig {
        services: vec![presets::twitter("", "", "https://app.example/cb")],
        ..Default::default()
    };
    assert!(Service::new(config.services[0].clone()).is_err());

    config.apply_overrides(|key| match key {
        "SOCIALKIT_TWITTER_CONSUMER_KEY" => Some("ck".into()),
        "SOCIALKIT_TWITTER_CONSUMER_SECRET" => Some("cs".into()),
        _ => None,
    });
    assert!(Service::new(config.services[0].clone()).is_ok());
}
