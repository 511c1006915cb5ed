//! Transport mechanisms ("tiers") and the reqwest-backed implementations.

use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use relay_diagnosis::Platform;
use relay_diagnosis::RawError;
use serde::Deserialize;
use serde::Serialize;
use tracing::trace;

use crate::config::TransportConfig;
use crate::http::OutboundRequest;
use crate::http::Response;

const USER_AGENT: &str = concat!("relay/", env!("CARGO_PKG_VERSION"));
const NATIVE_POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// The built-in mechanisms, most controllable first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierKind {
    /// Tuned client: pooled connections, HTTP/2 when offered, no Nagle.
    Native,
    /// HTTP/1.1 only, a fresh connection per attempt.
    Http1,
    /// Ignores system proxy settings.
    Direct,
    /// Library defaults; the last resort.
    Fallback,
}

impl TierKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Http1 => "http1",
            Self::Direct => "direct",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for TierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One way of carrying an [`OutboundRequest`].
///
/// A tier succeeds whenever an HTTP exchange completes, whatever the status;
/// it fails only when no response arrived.
#[async_trait]
pub trait Tier: fmt::Debug + Send + Sync {
    /// Name used in diagnostic reports and chain summaries.
    fn name(&self) -> &str;

    async fn execute(&self, request: &OutboundRequest) -> Result<Response, RawError>;
}

/// A [`Tier`] backed by its own `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTier {
    kind: TierKind,
    client: reqwest::Client,
}

impl ReqwestTier {
    pub fn new(kind: TierKind, config: &TransportConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeouts.for_tier(kind))
            .connect_timeout(config.timeouts.connect());

        builder = match kind {
            TierKind::Native => builder
                .pool_idle_timeout(NATIVE_POOL_IDLE_TIMEOUT)
                .tcp_nodelay(true),
            TierKind::Http1 => builder.http1_only().pool_max_idle_per_host(0),
            TierKind::Direct => builder.no_proxy(),
            TierKind::Fallback => builder,
        };

        if config.platform() == Platform::Web {
            builder = builder.cookie_store(true);
        }

        Ok(Self {
            kind,
            client: builder.build()?,
        })
    }

    /// Wraps a caller-built client.
    pub fn with_client(kind: TierKind, client: reqwest::Client) -> Self {
        Self { kind, client }
    }

    pub fn kind(&self) -> TierKind {
        self.kind
    }
}

#[async_trait]
impl Tier for ReqwestTier {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    async fn execute(&self, request: &OutboundRequest) -> Result<Response, RawError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(from_reqwest)?;
        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().clone();
        trace!(tier = self.name(), %status, %url, "response headers received");

        let body = response.bytes().await.map_err(from_reqwest)?;
        Ok(Response::new(status, headers, url, body).with_tier(self.name()))
    }
}

/// Converts a reqwest failure into the engine's raw error model.
///
/// An OS errno anywhere in the source chain wins; otherwise the error class
/// becomes the name and the chained messages become the message. The URL is
/// dropped first: it is reported separately and its path must never be read
/// as failure text.
pub fn from_reqwest(err: reqwest::Error) -> RawError {
    let err = err.without_url();
    let message = chain_message(&err);
    let name = Some(error_class(&err).to_string());
    match os_error_code(&err) {
        Some(code) => RawError::NumericCoded {
            code: i64::from(code),
            message,
            name,
        },
        None => RawError::MessageOnly { message, name },
    }
}

fn error_class(err: &reqwest::Error) -> &'static str {
    if err.is_timeout() {
        "TimeoutError"
    } else if err.is_connect() {
        "ConnectError"
    } else if err.is_body() {
        "BodyError"
    } else if err.is_redirect() {
        "RedirectError"
    } else if err.is_decode() {
        "DecodeError"
    } else {
        "RequestError"
    }
}

fn chain_message(err: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if parts.last().is_none_or(|last| !last.contains(&text)) {
            parts.push(text);
        }
        source = cause.source();
    }
    parts.join(": ")
}

fn os_error_code(err: &(dyn StdError + 'static)) -> Option<i32> {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(cause) = current {
        if let Some(code) = cause
            .downcast_ref::<std::io::Error>()
            .and_then(std::io::Error::raw_os_error)
        {
            return Some(code);
        }
        current = cause.source();
    }
    None
}
