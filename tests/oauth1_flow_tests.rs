mod common;

use pretty_assertions::assert_eq;
use wiremock::matchers::{header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use socialkit::auth::{AuthState, OAuth1Authenticator};
use socialkit::config::ProtocolConfig;
use socialkit::error::SocialError;
use socialkit::service::Service;
use socialkit::types::{Account, AccountKind, OAUTH_TOKEN, OAUTH_TOKEN_SECRET};

use common::{oauth1_config, query_value, service_config, ScriptedUi};

async fn mount_request_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth/request_token"))
        .and(header_regex("authorization", r"^OAuth "))
        .and(header_regex(
            "authorization",
            r#"oauth_callback="https%3A%2F%2Fapp\.example%2Fcb""#,
        ))
        .and(header_regex("authorization", r#"oauth_signature_method="HMAC-SHA1""#))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "oauth_token=RT&oauth_token_secret=RTS&oauth_callback_confirmed=true",
        ))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn three_legged_handshake_issues_access_token() {
    let server = MockServer::start().await;
    mount_request_token(&server).await;
    Mock::given(method("POST"))
        .and(path("/oauth/access_token"))
        .and(header_regex("authorization", r#"oauth_verifier="V1""#))
        .and(header_regex("authorization", r#"oauth_token="RT""#))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "oauth_token=AT&oauth_token_secret=ATS&user_id=42&screen_name=bob",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let auth = OAuth1Authenticator::new("twitter", oauth1_config(&server.uri())).expect("auth");
    let ui = ScriptedUi::redirect_to("https://app.example/cb?oauth_token=RT&oauth_verifier=V1");

    let account = auth.begin_authentication(&ui).await.expect("authenticated");

    assert_eq!(account.kind(), AccountKind::OAuth1);
    assert_eq!(account.id(), "bob");
    assert_eq!(account.property(OAUTH_TOKEN), Some("AT"));
    assert_eq!(account.property(OAUTH_TOKEN_SECRET), Some("ATS"));
    assert_eq!(account.property("user_id"), Some("42"));
    assert!(account.property("oauth_callback_confirmed").is_none());
    assert_eq!(auth.state(), AuthState::Complete);

    let prompt = &ui.prompts()[0];
    assert_eq!(query_value(&prompt.authorize_url, "oauth_token").as_deref(), Some("RT"));
    assert_eq!(prompt.authorize_url.path(), "/oauth/authorize");
}

#[tokio::test]
async fn denied_callback_is_cancellation() {
    let server = MockServer::start().await;
    mount_request_token(&server).await;
    Mock::given(method("POST"))
        .and(path("/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let auth = OAuth1Authenticator::new("twitter", oauth1_config(&server.uri())).expect("auth");
    let ui = ScriptedUi::redirect_to("https://app.example/cb?denied=RT");

    let err = auth.begin_authentication(&ui).await.unwrap_err();
    assert!(err.is_cancellation());
    assert_eq!(auth.state(), AuthState::Cancelled);
}

#[tokio::test]
async fn callback_for_another_token_is_rejected() {
    let server = MockServer::start().await;
    mount_request_token(&server).await;

    let auth = OAuth1Authenticator::new("twitter", oauth1_config(&server.uri())).expect("auth");
    let ui = ScriptedUi::redirect_to("https://app.example/cb?oauth_token=OTHER&oauth_verifier=V1");

    let err = auth.begin_authentication(&ui).await.unwrap_err();
    assert!(matches!(err, SocialError::AuthenticationFailed(_)));
}

#[tokio::test]
async fn request_token_failure_never_prompts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/request_token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad consumer key"))
        .mount(&server)
        .await;

    let auth = OAuth1Authenticator::new("twitter", oauth1_config(&server.uri())).expect("auth");
    let ui = ScriptedUi::cancelling();

    let err = auth.begin_authentication(&ui).await.unwrap_err();
    assert!(matches!(err, SocialError::AuthenticationFailed(ref msg) if msg.contains("401")));
    assert!(ui.prompts().is_empty());
}

#[tokio::test]
async fn oauth1_services_do_not_reauthorize() {
    let server = MockServer::start().await;
    let service = Service::new(service_config(
        "twitter",
        ProtocolConfig::OAuth1(oauth1_config(&server.uri())),
    ))
    .expect("service");
    let account = Account::new("bob", "twitter", AccountKind::OAuth1)
        .with_property(OAUTH_TOKEN, "AT")
        .with_property(OAUTH_TOKEN_SECRET, "ATS");

    assert!(service.supports_authentication());
    assert!(!service.supports_reauthorization());
    assert!(matches!(
        service.reauthorize(&account).await,
        Err(SocialError::NotSupported(_))
    ));
}
