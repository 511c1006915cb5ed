//! The request handed to every tier and the response a tier hands back.

use bytes::Bytes;
use relay_diagnosis::BodyReadError;
use relay_diagnosis::BodySource;
use relay_diagnosis::SafeParseResult;
use relay_diagnosis::TierAttemptChain;
use relay_diagnosis::safe_parse_body;
use reqwest::Method;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderName;
use reqwest::header::HeaderValue;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::Result;
use crate::error::TransportError;

/// One HTTP request, identical on the wire whichever tier carries it.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl OutboundRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::try_from(name)
            .map_err(|err| TransportError::InvalidRequest(format!("header name {name:?}: {err}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|err| TransportError::InvalidRequest(format!("header {name}: {err}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// GET, HEAD and OPTIONS carry no side effects and may be raced.
    pub fn is_idempotent(&self) -> bool {
        matches!(self.method, Method::GET | Method::HEAD | Method::OPTIONS)
    }
}

/// A completed HTTP exchange, whatever its status.
///
/// The body is buffered by the tier and can be taken exactly once.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    url: Url,
    tier: String,
    body: Option<Bytes>,
    failed_attempts: TierAttemptChain,
}

impl Response {
    pub fn new(status: StatusCode, headers: HeaderMap, url: Url, body: Bytes) -> Self {
        Self {
            status,
            headers,
            url,
            tier: String::new(),
            body: Some(body),
            failed_attempts: TierAttemptChain::new(),
        }
    }

    pub fn with_tier(mut self, tier: impl Into<String>) -> Self {
        self.tier = tier.into();
        self
    }

    pub(crate) fn with_failed_attempts(mut self, chain: TierAttemptChain) -> Self {
        self.failed_attempts = chain;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Name of the tier that delivered this response.
    pub fn tier(&self) -> &str {
        &self.tier
    }

    /// Failures of earlier tiers before this response arrived.
    pub fn failed_attempts(&self) -> &TierAttemptChain {
        &self.failed_attempts
    }

    pub fn bytes(&mut self) -> std::result::Result<Bytes, BodyReadError> {
        self.body.take().ok_or(BodyReadError::AlreadyConsumed)
    }

    pub fn text(&mut self) -> std::result::Result<String, BodyReadError> {
        let bytes = self.bytes()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| BodyReadError::InvalidUtf8)
    }

    /// Decodes the body as JSON without ever failing; see [`SafeParseResult`].
    pub fn json<T: DeserializeOwned>(&mut self, context: &str) -> SafeParseResult<T> {
        safe_parse_body(self, context)
    }
}

impl BodySource for Response {
    fn read_text(&mut self) -> std::result::Result<String, BodyReadError> {
        self.text()
    }
}
