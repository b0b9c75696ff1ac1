//! OAuth 1.0a HMAC-SHA1 request signing (RFC 5849 §3.4).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::Method;
use sha1::Sha1;
use url::Url;
use uuid::Uuid;

type HmacSha1 = Hmac<Sha1>;

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const VERSION: &str = "1.0";

/// Consumer and (optional) token credentials used to sign a request.
#[derive(Debug, Clone, Copy)]
pub struct SigningKeys<'a> {
    pub consumer_key: &'a str,
    pub consumer_secret: &'a str,
    pub token: Option<&'a str>,
    pub token_secret: Option<&'a str>,
}

/// RFC 3986 percent-encoding: everything except `A-Z a-z 0-9 - . _ ~`.
pub fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Scheme, authority and path of `url`, lower-cased, default port dropped.
pub fn base_string_uri(url: &Url) -> String {
    let scheme = url.scheme().to_ascii_lowercase();
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let port = match (url.port(), scheme.as_str()) {
        (Some(80), "http") | (Some(443), "https") | (None, _) => String::new(),
        (Some(port), _) => format!(":{port}"),
    };
    format!("{scheme}://{host}{port}{}", url.path())
}

/// Build the signature base string over every signed parameter.
///
/// `parameters` must already include the URL query pairs, form body pairs
/// and `oauth_*` protocol parameters (but not `oauth_signature`).
pub fn signature_base_string(method: &Method, url: &Url, parameters: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = parameters
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();
    let normalized = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.as_str().to_ascii_uppercase(),
        percent_encode(&base_string_uri(url)),
        percent_encode(&normalized)
    )
}

/// HMAC-SHA1 over `base_string`, base64-encoded.
pub fn sign(base_string: &str, consumer_secret: &str, token_secret: Option<&str>) -> String {
    let key = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret.unwrap_or_default())
    );
    // HMAC accepts keys of any length.
    let mut mac = match HmacSha1::new_from_slice(key.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(base_string.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Signs requests on behalf of one consumer/token pair.
#[derive(Debug, Clone)]
pub struct OAuth1Signer<'a> {
    keys: SigningKeys<'a>,
    extra: Vec<(String, String)>,
}

impl<'a> OAuth1Signer<'a> {
    pub fn new(keys: SigningKeys<'a>) -> Self {
        Self {
            keys,
            extra: Vec::new(),
        }
    }

    /// Add a protocol parameter such as `oauth_callback` or `oauth_verifier`.
    pub fn with_protocol_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((key.into(), value.into()));
        self
    }

    /// `Authorization` header value with a fresh nonce and timestamp.
    pub fn authorization_header(
        &self,
        method: &Method,
        url: &Url,
        body_parameters: &[(String, String)],
    ) -> String {
        let nonce = Uuid::new_v4().simple().to_string();
        let timestamp = chrono::Utc::now().timestamp();
        self.authorization_header_with(method, url, body_parameters, &nonce, timestamp)
    }

    /// Deterministic variant of [`Self::authorization_header`].
    pub fn authorization_header_with(
        &self,
        method: &Method,
        url: &Url,
        body_parameters: &[(String, String)],
        nonce: &str,
        timestamp: i64,
    ) -> String {
        let mut protocol = vec![
            ("oauth_consumer_key".to_string(), self.keys.consumer_key.to_string()),
            ("oauth_nonce".to_string(), nonce.to_string()),
            ("oauth_signature_method".to_string(), SIGNATURE_METHOD.to_string()),
            ("oauth_timestamp".to_string(), timestamp.to_string()),
            ("oauth_version".to_string(), VERSION.to_string()),
        ];
        if let Some(token) = self.keys.token {
            protocol.push(("oauth_token".to_string(), token.to_string()));
        }
        protocol.extend(self.extra.iter().cloned());

        let mut signed: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        signed.extend(body_parameters.iter().cloned());
        signed.extend(protocol.iter().cloned());

        let base = signature_base_string(method, url, &signed);
        let signature = sign(&base, self.keys.consumer_secret, self.keys.token_secret);
        protocol.push(("oauth_signature".to_string(), signature));
        protocol.sort();

        let fields = protocol
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join(", ");
        format!("OAuth {fields}")
    }
}
