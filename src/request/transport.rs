//! HTTP execution boundary and its reqwest implementation.

use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use url::Url;

use super::multipart::{self, MultipartPart};
use crate::error::SocialError;

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .pool_max_idle_per_host(10)
            .build()
            .unwrap_or_default()
    })
}

/// A fully authenticated call, ready for the wire.
///
/// `parameters` travel in the query string for methods without a body, as a
/// form body otherwise, or as leading multipart fields when `parts` is not
/// empty.
#[derive(Debug)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub parameters: BTreeMap<String, String>,
    pub parts: Vec<MultipartPart>,
}

impl PreparedRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            parameters: BTreeMap::new(),
            parts: Vec::new(),
        }
    }

    /// Whether `parameters` are sent as a urlencoded form body.
    pub fn has_form_body(&self) -> bool {
        self.parts.is_empty() && method_has_body(&self.method)
    }

    pub fn is_multipart(&self) -> bool {
        !self.parts.is_empty()
    }
}

/// Raw outcome of a transport call, before status normalization.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// HTTP execution primitive.
///
/// Implementations report network failures as [`SocialError::Transport`] and
/// return every HTTP status, including errors, as a [`TransportResponse`].
/// Dropping the returned future must abandon the call.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: PreparedRequest) -> Result<TransportResponse, SocialError>;
}

/// [`Transport`] backed by a reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Transport sharing the process-wide client pool.
    pub fn shared() -> Self {
        Self::new(shared_client().clone())
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::shared()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: PreparedRequest) -> Result<TransportResponse, SocialError> {
        let has_form_body = request.has_form_body();
        let PreparedRequest {
            method,
            url,
            headers,
            parameters,
            parts,
        } = request;

        let mut builder = self.client.request(method, url).headers(headers);
        if !parts.is_empty() {
            let boundary = multipart::boundary();
            builder = builder
                .header(CONTENT_TYPE, multipart::content_type(&boundary))
                .body(reqwest::Body::wrap_stream(multipart::body_stream(
                    &boundary,
                    &parameters,
                    parts,
                )));
        } else if has_form_body {
            builder = builder.form(&parameters);
        } else if !parameters.is_empty() {
            builder = builder.query(&parameters);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

/// Methods whose parameters travel in the request body.
pub fn method_has_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

/// Set `Authorization: Bearer <token>`.
pub fn insert_bearer(headers: &mut HeaderMap, token: &str) -> Result<(), SocialError> {
    insert_authorization(headers, &format!("Bearer {token}"))
}

/// Set a raw `Authorization` header value.
pub fn insert_authorization(headers: &mut HeaderMap, value: &str) -> Result<(), SocialError> {
    let value = HeaderValue::from_str(value).map_err(|e| {
        SocialError::AuthenticationFailed(format!("credential is not a valid header value: {e}"))
    })?;
    headers.insert(AUTHORIZATION, value);
    Ok(())
}
