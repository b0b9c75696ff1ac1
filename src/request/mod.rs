//! Authenticated, cancellable HTTP requests.
//!
//! A [`Request`] is bound to a [`Pipeline`] matching its service's protocol.
//! Credentials are injected when the request executes, so parameters changed
//! after the account was set still reach the signed call.

pub mod multipart;
pub mod response;
pub mod transport;

pub use multipart::{ByteStream, MultipartPart, PartData};
pub use response::Response;
pub use transport::{PreparedRequest, ReqwestTransport, Transport, TransportResponse};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::Method;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::host_managed::{perform_with, HostAccountStore};
use crate::auth::signature::{OAuth1Signer, SigningKeys};
use crate::auth::{kind_label, TokenPlacement};
use crate::error::SocialError;
use crate::types::{Account, AccountKind, Completion, ACCESS_TOKEN, OAUTH_TOKEN, OAUTH_TOKEN_SECRET};
use crate::util::timeout::with_timeout;

/// How credentials are attached for one protocol.
#[derive(Clone)]
pub enum Pipeline {
    /// HMAC-SHA1 signed `Authorization: OAuth` header.
    OAuth1 {
        consumer_key: String,
        consumer_secret: String,
    },
    OAuth2 { placement: TokenPlacement },
    /// The platform performs the call on the account's behalf.
    HostManaged { store: Arc<dyn HostAccountStore> },
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OAuth1 { consumer_key, .. } => f
                .debug_struct("OAuth1")
                .field("consumer_key", consumer_key)
                .finish_non_exhaustive(),
            Self::OAuth2 { placement } => f
                .debug_struct("OAuth2")
                .field("placement", placement)
                .finish(),
            Self::HostManaged { .. } => f.debug_struct("HostManaged").finish_non_exhaustive(),
        }
    }
}

impl Pipeline {
    pub fn kind(&self) -> AccountKind {
        match self {
            Self::OAuth1 { .. } => AccountKind::OAuth1,
            Self::OAuth2 { .. } => AccountKind::OAuth2,
            Self::HostManaged { .. } => AccountKind::HostManaged,
        }
    }

    pub fn supports(&self, kind: AccountKind) -> bool {
        self.kind() == kind
    }

    fn check(&self, account: &Account) -> Result<(), SocialError> {
        if self.supports(account.kind()) {
            Ok(())
        } else {
            Err(SocialError::UnsupportedAccountType {
                account: account.kind(),
                pipeline: kind_label(self.kind()),
            })
        }
    }

    async fn dispatch(
        &self,
        account: Option<&Account>,
        mut request: PreparedRequest,
        transport: &dyn Transport,
    ) -> Result<TransportResponse, SocialError> {
        match self {
            Self::OAuth1 {
                consumer_key,
                consumer_secret,
            } => {
                let (token, token_secret) = match account {
                    Some(account) => (
                        Some(required(account, OAUTH_TOKEN)?),
                        Some(required(account, OAUTH_TOKEN_SECRET)?),
                    ),
                    None => (None, None),
                };
                let keys = SigningKeys {
                    consumer_key,
                    consumer_secret,
                    token,
                    token_secret,
                };
                // Multipart fields are not part of the signature base string.
                let signed: Vec<(String, String)> = if request.is_multipart() {
                    Vec::new()
                } else {
                    request
                        .parameters
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect()
                };
                let header =
                    OAuth1Signer::new(keys).authorization_header(&request.method, &request.url, &signed);
                transport::insert_authorization(&mut request.headers, &header)?;
                transport.send(request).await
            }
            Self::OAuth2 { placement } => {
                if let Some(account) = account {
                    let token = required(account, ACCESS_TOKEN)?;
                    match placement {
                        TokenPlacement::Header => transport::insert_bearer(&mut request.headers, token)?,
                        TokenPlacement::Query { parameter } => {
                            request.url.query_pairs_mut().append_pair(parameter, token);
                        }
                    }
                }
                transport.send(request).await
            }
            Self::HostManaged { store } => match account {
                Some(account) => perform_with(store.as_ref(), account, request).await,
                None => transport.send(request).await,
            },
        }
    }
}

fn required<'a>(account: &'a Account, key: &str) -> Result<&'a str, SocialError> {
    account.property(key).ok_or_else(|| {
        SocialError::AuthenticationFailed(format!("account {} has no {key}", account.id()))
    })
}

/// A pending API call: method, URL, parameters, optional account and parts.
pub struct Request {
    method: Method,
    url: Url,
    parameters: BTreeMap<String, String>,
    headers: HeaderMap,
    account: Option<Account>,
    parts: Vec<MultipartPart>,
    pipeline: Pipeline,
    transport: Arc<dyn Transport>,
    timeout: Option<Duration>,
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("parameters", &self.parameters.keys().collect::<Vec<_>>())
            .field("account", &self.account.as_ref().map(Account::id))
            .field("parts", &self.parts.len())
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

impl Request {
    pub fn new(
        method: Method,
        url: Url,
        parameters: BTreeMap<String, String>,
        pipeline: Pipeline,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            method,
            url,
            parameters,
            headers: HeaderMap::new(),
            account: None,
            parts: Vec::new(),
            pipeline,
            transport,
            timeout: None,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.parameters
    }

    pub fn set_parameter(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.parameters.insert(key.into(), value.into());
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    /// Bind (or clear) the account used to authenticate.
    ///
    /// An account this request's pipeline cannot carry is rejected with
    /// [`SocialError::UnsupportedAccountType`] and the previous account stays.
    pub fn set_account(&mut self, account: Option<Account>) -> Result<(), SocialError> {
        if let Some(account) = &account {
            self.pipeline.check(account)?;
        }
        self.account = account;
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Append a streamed multipart part. Parts are sent in call order.
    pub fn add_multipart_data(
        &mut self,
        field_name: impl Into<String>,
        stream: ByteStream,
        mime_type: impl Into<String>,
        filename: Option<String>,
    ) {
        self.parts.push(MultipartPart::new(
            field_name,
            PartData::Stream(stream),
            mime_type,
            filename,
        ));
    }

    pub fn add_multipart_bytes(
        &mut self,
        field_name: impl Into<String>,
        data: impl Into<Bytes>,
        mime_type: impl Into<String>,
        filename: Option<String>,
    ) {
        self.parts.push(MultipartPart::new(
            field_name,
            PartData::Bytes(data.into()),
            mime_type,
            filename,
        ));
    }

    pub fn multipart_parts(&self) -> &[MultipartPart] {
        &self.parts
    }

    /// Send the request.
    ///
    /// Resolves to [`Completion::Cancelled`] when `cancel` fires first; the
    /// in-flight call is dropped. Statuses above 399 become
    /// [`SocialError::Api`].
    pub async fn execute(
        self,
        cancel: &CancellationToken,
    ) -> Result<Completion<Response>, SocialError> {
        let Self {
            method,
            url,
            parameters,
            headers,
            account,
            parts,
            pipeline,
            transport,
            timeout,
        } = self;

        let host = url.host_str().unwrap_or_default().to_string();
        let path = url.path().to_string();
        let prepared = PreparedRequest {
            method: method.clone(),
            url,
            headers,
            parameters,
            parts,
        };
        debug!(%method, %host, %path, kind = %pipeline.kind(), "Dispatching request");

        let call = pipeline.dispatch(account.as_ref(), prepared, transport.as_ref());
        let call = async {
            match timeout {
                Some(duration) => with_timeout(duration, call).await,
                None => call.await,
            }
        };

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(%method, %host, %path, "Request cancelled");
                return Ok(Completion::Cancelled);
            }
            result = call => result,
        };

        let response = match response {
            Ok(response) => response,
            Err(err) => {
                warn!(%method, %host, %path, error = %err, "Request failed");
                return Err(err);
            }
        };
        if response.status > 399 {
            warn!(%method, %host, %path, status = response.status, "Request returned an error status");
            return Err(SocialError::api(
                response.status,
                String::from_utf8_lossy(&response.body).into_owned(),
            ));
        }
        Ok(Completion::Completed(Response::new(
            response.status,
            response.headers,
            response.body,
        )))
    }

    /// Execute on the runtime, returning a handle that can cancel it.
    pub fn spawn(self) -> PendingRequest {
        let token = CancellationToken::new();
        let task_token = token.clone();
        let handle = tokio::spawn(async move { self.execute(&task_token).await });
        PendingRequest { token, handle }
    }

    /// Like [`Request::spawn`], invoking `callback` exactly once on success
    /// or failure. The callback never runs when the request is cancelled.
    pub fn spawn_with_callback<F>(self, callback: F) -> PendingRequest
    where
        F: FnOnce(&Result<Response, SocialError>) + Send + 'static,
    {
        let token = CancellationToken::new();
        let task_token = token.clone();
        let handle = tokio::spawn(async move {
            let outcome = match self.execute(&task_token).await {
                Ok(Completion::Cancelled) => return Ok(Completion::Cancelled),
                Ok(Completion::Completed(response)) => Ok(response),
                Err(err) => Err(err),
            };
            callback(&outcome);
            outcome.map(Completion::Completed)
        });
        PendingRequest { token, handle }
    }
}

/// Handle to a request running in the background.
#[derive(Debug)]
pub struct PendingRequest {
    token: CancellationToken,
    handle: JoinHandle<Result<Completion<Response>, SocialError>>,
}

impl PendingRequest {
    /// Cancel this request only. Other requests are unaffected.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn wait(self) -> Result<Completion<Response>, SocialError> {
        match self.handle.await {
            Ok(result) => result,
            Err(err) if err.is_cancelled() => Ok(Completion::Cancelled),
            Err(err) => Err(SocialError::transport(format!("request task failed: {err}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::REFRESH_TOKEN;

    fn oauth2_request() -> Request {
        Request::new(
            Method::GET,
            "https://api.example/me".parse().unwrap(),
            BTreeMap::new(),
            Pipeline::OAuth2 {
                placement: TokenPlacement::Header,
            },
            Arc::new(ReqwestTransport::shared()),
        )
    }

    #[test]
    fn rejected_account_keeps_previous_one() {
        let mut request = oauth2_request();
        let good = Account::new("alice", "svc", AccountKind::OAuth2).with_property(ACCESS_TOKEN, "t");
        request.set_account(Some(good.clone())).unwrap();

        let bad = Account::new("bob", "svc", AccountKind::OAuth1);
        let err = request.set_account(Some(bad)).unwrap_err();

        assert!(matches!(
            err,
            SocialError::UnsupportedAccountType {
                account: AccountKind::OAuth1,
                ..
            }
        ));
        assert_eq!(request.account(), Some(&good));
    }

    #[test]
    fn account_can_be_cleared() {
        let mut request = oauth2_request();
        let account = Account::new("a", "svc", AccountKind::OAuth2).with_property(REFRESH_TOKEN, "r");
        request.set_account(Some(account)).unwrap();
        request.set_account(None).unwrap();
        assert!(request.account().is_none());
    }

    #[tokio::test]
    async fn pre_cancelled_request_never_dispatches() {
        let request = oauth2_request();
        let token = CancellationToken::new();
        token.cancel();
        let outcome = request.execute(&token).await.unwrap();
        assert!(outcome.is_cancelled());
    }
}
