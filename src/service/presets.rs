//! Ready-made configurations for well-known services.
//!
//! Only app credentials are needed; endpoints and limits follow each
//! provider's published documentation.

use crate::auth::{OAuth1Config, OAuth2Config};
use crate::config::{Limit, ProtocolConfig, ServiceConfig, ServiceLimits};

use super::ShareEndpoint;

pub const FACEBOOK_REDIRECT_URL: &str = "https://www.facebook.com/connect/login_success.html";

/// Facebook, OAuth 2.0 implicit grant.
pub fn facebook(client_id: impl Into<String>) -> ServiceConfig {
    ServiceConfig::builder()
        .service_id("facebook")
        .title("Facebook")
        .limits(ServiceLimits {
            max_text_length: Limit::at_most(63_206),
            max_links: Limit::at_most(1),
            max_images: Limit::at_most(1),
            max_files: Limit::Unbounded,
        })
        .protocol(ProtocolConfig::OAuth2(OAuth2Config {
            client_id: client_id.into(),
            scope: "public_profile,publish_actions".to_string(),
            authorize_url: "https://m.facebook.com/dialog/oauth/".to_string(),
            redirect_url: FACEBOOK_REDIRECT_URL.to_string(),
            ..Default::default()
        }))
        .share(ShareEndpoint {
            link_field: Some("link".to_string()),
            ..ShareEndpoint::new("https://graph.facebook.com/me/feed")
        })
        .build()
}

/// Twitter, OAuth 1.0a.
pub fn twitter(
    consumer_key: impl Into<String>,
    consumer_secret: impl Into<String>,
    callback_url: impl Into<String>,
) -> ServiceConfig {
    ServiceConfig::builder()
        .service_id("twitter")
        .title("Twitter")
        .limits(ServiceLimits {
            max_text_length: Limit::at_most(280),
            max_images: Limit::at_most(4),
            ..ServiceLimits::UNBOUNDED
        })
        .protocol(ProtocolConfig::OAuth1(OAuth1Config {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            request_token_url: "https://api.twitter.com/oauth/request_token".to_string(),
            authorize_url: "https://api.twitter.com/oauth/authorize".to_string(),
            access_token_url: "https://api.twitter.com/oauth/access_token".to_string(),
            callback_url: callback_url.into(),
        }))
        .share(ShareEndpoint {
            text_field: "status".to_string(),
            ..ShareEndpoint::new("https://api.twitter.com/1.1/statuses/update.json")
        })
        .build()
}

/// Flickr, OAuth 1.0a. Sharing uploads a single photo or video.
pub fn flickr(
    consumer_key: impl Into<String>,
    consumer_secret: impl Into<String>,
    callback_url: impl Into<String>,
) -> ServiceConfig {
    ServiceConfig::builder()
        .service_id("flickr")
        .title("Flickr")
        .limits(ServiceLimits {
            max_images: Limit::at_most(1),
            max_files: Limit::at_most(1),
            ..ServiceLimits::UNBOUNDED
        })
        .protocol(ProtocolConfig::OAuth1(OAuth1Config {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            request_token_url: "https://www.flickr.com/services/oauth/request_token".to_string(),
            authorize_url: "https://www.flickr.com/services/oauth/authorize".to_string(),
            access_token_url: "https://www.flickr.com/services/oauth/access_token".to_string(),
            callback_url: callback_url.into(),
        }))
        .share(ShareEndpoint {
            text_field: "description".to_string(),
            image_field: Some("photo".to_string()),
            file_field: Some("photo".to_string()),
            ..ShareEndpoint::new("https://up.flickr.com/services/upload/")
        })
        .build()
}
