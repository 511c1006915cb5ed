//! The authenticated request façade used by application code.

use std::sync::Arc;

use relay_async_utils::Deadline;
use relay_diagnosis::DiagnosisContext;
use relay_diagnosis::DiagnosisEngine;
use relay_diagnosis::DiagnosticReport;
use relay_diagnosis::Platform;
use relay_keyring_store::CredentialStore;
use relay_keyring_store::KeyringCredentialStore;
use reqwest::Method;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderName;
use reqwest::header::HeaderValue;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::warn;
use url::Url;

use crate::config::TransportConfig;
use crate::error::Result;
use crate::error::TransportError;
use crate::http::OutboundRequest;
use crate::http::Response;
use crate::sequencer::RetryObserver;
use crate::sequencer::TierSequencer;

const SESSION_EVENT_CAPACITY: usize = 16;

/// Side-channel notifications for the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A 401 arrived while a credential was stored; the credential is gone.
    Expired { url: String },
}

/// What [`AuthenticatedClient::get_query`] does with a 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnauthorizedBehavior {
    /// Resolve to `Ok(None)`.
    ReturnNull,
    /// Fail with [`TransportError::Unauthorized`].
    #[default]
    Throw,
}

pub struct ClientBuilder {
    config: TransportConfig,
    engine: Option<DiagnosisEngine>,
    credentials: Option<Arc<dyn CredentialStore>>,
    sequencer: Option<TierSequencer>,
    observer: Option<RetryObserver>,
}

impl ClientBuilder {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            engine: None,
            credentials: None,
            sequencer: None,
            observer: None,
        }
    }

    pub fn engine(mut self, engine: DiagnosisEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(store);
        self
    }

    /// Replaces the configured tier plan, typically with custom [`crate::Tier`]s.
    pub fn sequencer(mut self, sequencer: TierSequencer) -> Self {
        self.sequencer = Some(sequencer);
        self
    }

    pub fn retry_observer(mut self, observer: RetryObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> Result<AuthenticatedClient> {
        self.config.validate()?;
        let platform = self.config.platform();
        let engine = Arc::new(
            self.engine
                .unwrap_or_else(|| DiagnosisEngine::builtin(platform)),
        );
        let mut sequencer = match self.sequencer {
            Some(sequencer) => sequencer,
            None => TierSequencer::from_config(&self.config, Arc::clone(&engine))?,
        };
        if let Some(observer) = self.observer {
            sequencer = sequencer.with_retry_observer(observer);
        }
        let credentials: Arc<dyn CredentialStore> = match self.credentials {
            Some(store) => store,
            None => Arc::new(KeyringCredentialStore::new(
                self.config.credentials.service.clone(),
                self.config.credentials.account.clone(),
            )),
        };
        let auth_header =
            HeaderName::try_from(self.config.auth_header.as_str()).map_err(|err| {
                TransportError::InvalidRequest(format!(
                    "auth header {:?}: {err}",
                    self.config.auth_header
                ))
            })?;
        let (session_events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);

        Ok(AuthenticatedClient {
            platform,
            base_url: self.config.base_url()?,
            auth_header,
            deadline: self.config.request_deadline(),
            sequencer,
            engine,
            credentials,
            session_events,
        })
    }
}

/// Attaches the session credential, runs the tier plan and handles 401s.
pub struct AuthenticatedClient {
    platform: Platform,
    base_url: Option<Url>,
    auth_header: HeaderName,
    deadline: Option<std::time::Duration>,
    sequencer: TierSequencer,
    engine: Arc<DiagnosisEngine>,
    credentials: Arc<dyn CredentialStore>,
    session_events: broadcast::Sender<SessionEvent>,
}

impl std::fmt::Debug for AuthenticatedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedClient")
            .field("platform", &self.platform)
            .field("base_url", &self.base_url)
            .field("sequencer", &self.sequencer)
            .finish_non_exhaustive()
    }
}

impl AuthenticatedClient {
    pub fn builder(config: TransportConfig) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    /// A client over the OS keyring and the configured reqwest tiers.
    pub fn from_config(config: TransportConfig) -> Result<Self> {
        ClientBuilder::new(config).build()
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn subscribe_session_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.session_events.subscribe()
    }

    /// Stores the credential issued at login or registration.
    pub fn store_credential(&self, credential: &str) -> Result<()> {
        Ok(self.credentials.save(credential)?)
    }

    /// Forgets the credential at logout. Returns whether one was stored.
    pub fn clear_credential(&self) -> Result<bool> {
        Ok(self.credentials.delete()?)
    }

    /// Resolves `path` against the base URL; absolute URLs pass through.
    pub fn resolve_url(&self, path: &str) -> Result<Url> {
        match Url::parse(path) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.base_url {
                Some(base) => base
                    .join(path)
                    .map_err(|err| TransportError::InvalidRequest(format!("{path:?}: {err}"))),
                None => Err(TransportError::InvalidRequest(format!(
                    "relative path {path:?} without a base_url"
                ))),
            },
            Err(err) => Err(TransportError::InvalidRequest(format!("{path:?}: {err}"))),
        }
    }

    /// Sends `request` and returns any completed exchange, whatever its
    /// status. Fails only when no tier produced a response.
    pub async fn send(
        &self,
        request: OutboundRequest,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        let (response, _) = self.dispatch(request, cancel).await?;
        Ok(response)
    }

    /// Sends a request and fails on any non-2xx status.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response> {
        self.request_cancellable(method, path, body, &CancellationToken::new())
            .await
    }

    pub async fn request_cancellable(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        let mut request = OutboundRequest::new(method, self.resolve_url(path)?);
        if let Some(body) = body {
            request
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            request.body = Some(body.to_string());
        }

        let (mut response, status_report) = self.dispatch(request, cancel).await?;
        match status_report {
            None => Ok(response),
            Some(report) => Err(status_error(&mut response, report)),
        }
    }

    /// GET for cache-layer queries: decodes the JSON body and applies
    /// `on_unauthorized` to 401s.
    pub async fn get_query<T: DeserializeOwned>(
        &self,
        path: &str,
        on_unauthorized: UnauthorizedBehavior,
    ) -> Result<Option<T>> {
        let request = OutboundRequest::get(self.resolve_url(path)?);
        let (mut response, status_report) =
            self.dispatch(request, &CancellationToken::new()).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return match on_unauthorized {
                UnauthorizedBehavior::ReturnNull => Ok(None),
                UnauthorizedBehavior::Throw => Err(TransportError::Unauthorized),
            };
        }
        if let Some(report) = status_report {
            return Err(status_error(&mut response, report));
        }

        let context = query_context(response.url());
        let parsed = response.json::<T>(&context);
        if parsed.ok {
            return Ok(parsed.data);
        }
        let ctx = DiagnosisContext::new(response.tier(), response.url().as_str(), "GET");
        let report = self.engine.diagnose_body(&parsed, &ctx);
        warn!(code = %report.error_code, url = %response.url(), "query response did not decode");
        Err(TransportError::Parse(Box::new(report)))
    }

    async fn dispatch(
        &self,
        mut request: OutboundRequest,
        cancel: &CancellationToken,
    ) -> Result<(Response, Option<DiagnosticReport>)> {
        let credential_present = self.attach_credential(&mut request);
        let deadline = Deadline::from_budget(self.deadline);

        let response = self.sequencer.execute(&request, cancel, deadline).await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED && credential_present {
            self.expire_session(request.url.as_str());
        }
        if status.is_success() {
            return Ok((response, None));
        }

        let ctx = DiagnosisContext::new(
            response.tier(),
            request.url.as_str(),
            request.method.as_str(),
        );
        let report = self.engine.diagnose_status(status.as_u16(), &ctx);
        warn!(
            status = status.as_u16(),
            code = %report.error_code,
            url = %request.url,
            "request completed with error status"
        );
        Ok((response, Some(report)))
    }

    /// Returns whether a credential was attached.
    fn attach_credential(&self, request: &mut OutboundRequest) -> bool {
        if self.platform == Platform::Web {
            return false;
        }
        let credential = match self.credentials.load() {
            Ok(Some(credential)) => credential,
            Ok(None) => return false,
            Err(err) => {
                warn!(error = %err, "credential store unreadable; sending unauthenticated");
                return false;
            }
        };
        match HeaderValue::from_str(&credential) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers.insert(self.auth_header.clone(), value);
                true
            }
            Err(err) => {
                warn!(error = %err, "stored credential is not a valid header value");
                false
            }
        }
    }

    /// Clears the stored credential and announces the expiry once.
    ///
    /// Concurrent 401s race to delete; only the one that removed the
    /// credential (or failed trying) emits [`SessionEvent::Expired`].
    fn expire_session(&self, url: &str) {
        match self.credentials.delete() {
            Ok(true) => debug!("deleted expired credential"),
            Ok(false) => {
                debug!(url, "credential already cleared by another request");
                return;
            }
            Err(err) => warn!(error = %err, "failed to delete expired credential"),
        }
        warn!(url, "session expired");
        // Err only means nobody is subscribed.
        let _ = self.session_events.send(SessionEvent::Expired {
            url: url.to_string(),
        });
    }
}

fn status_error(response: &mut Response, report: DiagnosticReport) -> TransportError {
    let status = response.status();
    let body = response
        .text()
        .ok()
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or_default().to_string());
    TransportError::Status {
        status: status.as_u16(),
        body,
        report: Box::new(report),
    }
}

/// `https://host/api/user/profile` becomes `profile`.
fn query_context(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
        .unwrap_or("query")
        .to_string()
}
