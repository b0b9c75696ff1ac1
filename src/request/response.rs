use bytes::Bytes;
use reqwest::header::HeaderMap;

/// Normalized result of an executed request.
///
/// Only statuses below 400 become a `Response`; anything else is reported as
/// [`crate::error::SocialError::Api`].
#[derive(Debug, Clone)]
pub struct Response {
    status_code: u16,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    pub fn new(status_code: u16, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status_code,
            headers,
            body,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Value of a header as text, if present and valid.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    pub fn into_bytes(self) -> Bytes {
        self.body
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
