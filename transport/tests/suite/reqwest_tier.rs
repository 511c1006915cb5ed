use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use relay_diagnosis::DiagnosisContext;
use relay_diagnosis::Platform;
use relay_diagnosis::TierAttemptChain;
use relay_keyring_store::MemoryCredentialStore;
use relay_transport::AuthenticatedClient;
use relay_transport::OutboundRequest;
use relay_transport::ReqwestTier;
use relay_transport::Tier;
use relay_transport::TierKind;
use relay_transport::TierSpec;
use relay_transport::TransportConfig;
use relay_transport::TransportError;
use relay_transport::UnauthorizedBehavior;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use url::Url;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::header;
use wiremock::matchers::method;
use wiremock::matchers::path;

use super::support::engine;
use super::support::init_tracing;

#[derive(Debug, Deserialize, PartialEq)]
struct Profile {
    id: u64,
}

fn config(base_url: String, tiers: Vec<TierSpec>) -> TransportConfig {
    TransportConfig {
        platform: Some(Platform::Android),
        base_url: Some(base_url),
        tiers: Some(tiers),
        ..TransportConfig::default()
    }
}

fn client(config: TransportConfig, store: Arc<MemoryCredentialStore>) -> AuthenticatedClient {
    init_tracing();
    AuthenticatedClient::builder(config)
        .credential_store(store)
        .build()
        .expect("client builds")
}

/// An address nothing listens on.
fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{addr}/")
}

#[tokio::test]
async fn reqwest_tier_returns_error_statuses_as_responses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/feed"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(1)
        .mount(&server)
        .await;

    let tier = ReqwestTier::new(TierKind::Http1, &TransportConfig::default()).unwrap();
    let url = Url::parse(&format!("{}/v1/feed", server.uri())).unwrap();
    let mut response = tier.execute(&OutboundRequest::get(url)).await.unwrap();

    assert_eq!(response.status().as_u16(), 503);
    assert_eq!(response.tier(), "http1");
    assert_eq!(response.text().unwrap(), "maintenance");
}

#[tokio::test]
async fn refused_connection_is_diagnosed() {
    let tier = ReqwestTier::new(TierKind::Direct, &TransportConfig::default()).unwrap();
    let url = Url::parse(&closed_port_url()).unwrap();

    let raw = tier
        .execute(&OutboundRequest::get(url.clone()))
        .await
        .expect_err("nothing listens");
    let ctx = DiagnosisContext::new(tier.name(), url.as_str(), "GET");
    let report = engine().diagnose(&raw, &ctx);

    assert_eq!(report.error_code, "SOCKET_CONNECTION_REFUSED");
    assert!(report.recoverable);
    assert_eq!(report.tier, "direct");
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let mut config = config(
        format!("{}/", server.uri()),
        vec![TierSpec::once(TierKind::Direct)],
    );
    config.timeouts.direct_ms = 200;
    let client = client(config, Arc::new(MemoryCredentialStore::new()));

    let err = client
        .request(Method::GET, "slow", None)
        .await
        .expect_err("times out");

    assert_eq!(err.code(), Some("TIMEOUT"));
    assert_eq!(err.chain().map(TierAttemptChain::len), Some(1));
}

#[tokio::test]
async fn request_url_is_not_read_as_failure_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tls/proxy/aborted/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let mut config = TransportConfig::default();
    config.timeouts.fallback_ms = 200;
    let tier = ReqwestTier::new(TierKind::Fallback, &config).unwrap();
    let url = Url::parse(&format!("{}/tls/proxy/aborted/slow?offset=-1200", server.uri())).unwrap();

    let raw = tier
        .execute(&OutboundRequest::get(url.clone()))
        .await
        .expect_err("times out");
    let ctx = DiagnosisContext::new(tier.name(), url.as_str(), "GET");
    let report = engine().diagnose(&raw, &ctx);

    assert_eq!(report.error_code, "TIMEOUT");
    assert!(report.recoverable);
    assert_eq!(report.underlying_codes, None);
    assert!(!report.raw_error_text.contains("offset"));
    assert!(!report.raw_error_text.contains("/tls/"));
    assert_eq!(report.url, url.as_str());
}

#[tokio::test]
async fn client_sends_credential_and_decodes_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user/profile"))
        .and(header("X-Auth-Token", "tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 42 })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(
        config(
            format!("{}/api/", server.uri()),
            vec![TierSpec::once(TierKind::Native), TierSpec::retrying(TierKind::Fallback)],
        ),
        Arc::new(MemoryCredentialStore::with_credential("tok-123")),
    );

    let profile: Option<Profile> = client
        .get_query("user/profile", UnauthorizedBehavior::Throw)
        .await
        .unwrap();

    assert_eq!(profile, Some(Profile { id: 42 }));
}

#[tokio::test]
async fn server_error_is_not_retried_across_tiers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/posts"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(
        config(
            format!("{}/api/", server.uri()),
            vec![TierSpec::once(TierKind::Native), TierSpec::retrying(TierKind::Fallback)],
        ),
        Arc::new(MemoryCredentialStore::new()),
    );

    let err = client
        .request(Method::POST, "posts", Some(&json!({ "title": "hi" })))
        .await
        .expect_err("500");

    match err {
        TransportError::Status { status, body, report } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
            assert_eq!(report.tier, "native");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn expired_session_against_live_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let store = Arc::new(MemoryCredentialStore::with_credential("stale"));
    let client = client(
        config(format!("{}/", server.uri()), vec![TierSpec::once(TierKind::Fallback)]),
        Arc::clone(&store),
    );

    let first: Option<Profile> = client
        .get_query("me", UnauthorizedBehavior::ReturnNull)
        .await
        .unwrap();
    let second: Option<Profile> = client
        .get_query("me", UnauthorizedBehavior::ReturnNull)
        .await
        .unwrap();

    assert_eq!((first, second), (None, None));
    assert_eq!(store.deletions(), 1);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].headers.get("X-Auth-Token").is_some());
    assert!(requests[1].headers.get("X-Auth-Token").is_none());
}
