use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use relay_diagnosis::Platform;
use relay_diagnosis::RawError;
use relay_diagnosis::TierAttemptChain;
use relay_keyring_store::CredentialStore;
use relay_keyring_store::MemoryCredentialStore;
use relay_transport::AuthenticatedClient;
use relay_transport::CancellationToken;
use relay_transport::OutboundRequest;
use relay_transport::RetryPolicy;
use relay_transport::SessionEvent;
use relay_transport::TierSequencer;
use relay_transport::TransportConfig;
use relay_transport::TransportError;
use relay_transport::UnauthorizedBehavior;
use reqwest::Method;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::broadcast::error::TryRecvError;

use super::support::MockTier;
use super::support::Step;
use super::support::engine;
use super::support::init_tracing;

const BASE_URL: &str = "https://api.example.com/api/";

#[derive(Debug, Deserialize, PartialEq)]
struct Profile {
    id: u64,
    name: String,
}

fn config(platform: Platform) -> TransportConfig {
    TransportConfig {
        platform: Some(platform),
        base_url: Some(BASE_URL.to_string()),
        ..TransportConfig::default()
    }
}

fn client_over(
    tier: Arc<MockTier>,
    store: Arc<MemoryCredentialStore>,
    platform: Platform,
) -> AuthenticatedClient {
    init_tracing();
    AuthenticatedClient::builder(config(platform))
        .sequencer(TierSequencer::new(engine()).push_retrying(tier, RetryPolicy::default()))
        .credential_store(store)
        .build()
        .expect("client builds")
}

#[tokio::test]
async fn stored_credential_is_attached() {
    let tier = MockTier::responding("native", 200, "{}");
    let store = Arc::new(MemoryCredentialStore::with_credential("tok-123"));
    let client = client_over(tier.clone(), store, Platform::Ios);

    client.request(Method::GET, "user/profile", None).await.unwrap();

    let headers = tier.last_headers().unwrap();
    assert_eq!(headers.get("X-Auth-Token").unwrap(), "tok-123");
    assert!(headers.get("X-Auth-Token").unwrap().is_sensitive());
}

#[tokio::test]
async fn web_platform_sends_no_credential_header() {
    let tier = MockTier::responding("fallback", 200, "{}");
    let store = Arc::new(MemoryCredentialStore::with_credential("tok-123"));
    let client = client_over(tier.clone(), store, Platform::Web);

    client.request(Method::GET, "user/profile", None).await.unwrap();

    assert!(tier.last_headers().unwrap().get("X-Auth-Token").is_none());
}

#[tokio::test]
async fn json_body_sets_content_type() {
    let tier = MockTier::responding("native", 201, "{}");
    let store = Arc::new(MemoryCredentialStore::new());
    let client = client_over(tier.clone(), store, Platform::Android);

    let body = serde_json::json!({ "title": "hello" });
    let response = client.request(Method::POST, "posts", Some(&body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        tier.last_headers().unwrap().get("content-type").unwrap(),
        "application/json"
    );
}

#[tokio::test]
async fn unauthorized_with_credential_expires_the_session_once() {
    let tier = MockTier::responding("native", 401, r#"{"error":"expired"}"#);
    let store = Arc::new(MemoryCredentialStore::with_credential("tok-123"));
    let client = client_over(tier, Arc::clone(&store), Platform::Ios);
    let mut events = client.subscribe_session_events();

    let request = OutboundRequest::get(client.resolve_url("user/profile").unwrap());
    let response = client.send(request, &CancellationToken::new()).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(store.deletions(), 1);
    assert_eq!(store.load().unwrap(), None);
    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::Expired {
            url: "https://api.example.com/api/user/profile".to_string()
        }
    );
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test(start_paused = true)]
async fn concurrent_unauthorized_responses_expire_the_session_once() {
    let tier = MockTier::new(
        "native",
        vec![Step::RespondAfter(Duration::from_millis(50), 401, "")],
    );
    let store = Arc::new(MemoryCredentialStore::with_credential("tok-123"));
    let client = client_over(tier.clone(), Arc::clone(&store), Platform::Ios);
    let mut events = client.subscribe_session_events();

    let first = OutboundRequest::get(client.resolve_url("feed").unwrap());
    let second = OutboundRequest::get(client.resolve_url("inbox").unwrap());
    let cancel = CancellationToken::new();
    let (first, second) = tokio::join!(client.send(first, &cancel), client.send(second, &cancel));

    assert_eq!(first.unwrap().status(), StatusCode::UNAUTHORIZED);
    assert_eq!(second.unwrap().status(), StatusCode::UNAUTHORIZED);
    assert_eq!(tier.calls(), 2);
    assert_eq!(store.deletions(), 1);
    assert!(matches!(events.try_recv(), Ok(SessionEvent::Expired { .. })));
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn unauthorized_without_credential_deletes_nothing() {
    let tier = MockTier::responding("native", 401, "");
    let store = Arc::new(MemoryCredentialStore::new());
    let client = client_over(tier, Arc::clone(&store), Platform::Ios);
    let mut events = client.subscribe_session_events();

    let request = OutboundRequest::get(client.resolve_url("user/profile").unwrap());
    client.send(request, &CancellationToken::new()).await.unwrap();

    assert_eq!(store.deletions(), 0);
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn request_fails_on_error_status_with_diagnosis() {
    let tier = MockTier::responding("native", 500, "database unavailable");
    let client = client_over(tier, Arc::new(MemoryCredentialStore::new()), Platform::Android);

    let err = client
        .request(Method::GET, "feed", None)
        .await
        .expect_err("500 is an error");

    match err {
        TransportError::Status {
            status,
            body,
            report,
        } => {
            assert_eq!(status, 500);
            assert_eq!(body, "database unavailable");
            assert_eq!(report.error_code, "HTTP_INTERNAL_SERVER_ERROR");
            assert!(report.recoverable);
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_error_body_falls_back_to_reason_phrase() {
    let tier = MockTier::responding("native", 404, "");
    let client = client_over(tier, Arc::new(MemoryCredentialStore::new()), Platform::Android);

    let err = client
        .request(Method::GET, "missing", None)
        .await
        .expect_err("404");

    assert_eq!(err.to_string(), "404: Not Found");
}

#[tokio::test]
async fn get_query_decodes_json() {
    let tier = MockTier::responding("native", 200, r#"{"id":7,"name":"ada"}"#);
    let client = client_over(tier, Arc::new(MemoryCredentialStore::new()), Platform::Ios);

    let profile: Option<Profile> = client
        .get_query("user/profile", UnauthorizedBehavior::Throw)
        .await
        .unwrap();

    assert_eq!(
        profile,
        Some(Profile {
            id: 7,
            name: "ada".to_string()
        })
    );
}

#[tokio::test]
async fn get_query_unauthorized_behaviors() {
    let store = Arc::new(MemoryCredentialStore::with_credential("tok-123"));
    let client = client_over(
        MockTier::responding("native", 401, ""),
        Arc::clone(&store),
        Platform::Ios,
    );

    let profile: Option<Profile> = client
        .get_query("user/profile", UnauthorizedBehavior::ReturnNull)
        .await
        .unwrap();
    assert_eq!(profile, None);
    assert_eq!(store.deletions(), 1);

    let err = client
        .get_query::<Profile>("user/profile", UnauthorizedBehavior::Throw)
        .await
        .expect_err("throws");
    assert!(matches!(err, TransportError::Unauthorized));
    assert_eq!(store.deletions(), 1);
}

#[tokio::test]
async fn get_query_html_body_is_diagnosed() {
    let tier = MockTier::responding("native", 200, "<html><body>captive portal</body></html>");
    let client = client_over(tier, Arc::new(MemoryCredentialStore::new()), Platform::Ios);

    let err = client
        .get_query::<Profile>("user/profile", UnauthorizedBehavior::Throw)
        .await
        .expect_err("html is not json");

    match err {
        TransportError::Parse(report) => {
            assert_eq!(report.error_code, "HTML_RESPONSE");
            assert_eq!(report.tier, "native");
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[tokio::test]
async fn get_query_malformed_json_names_the_resource() {
    let tier = MockTier::responding("native", 200, r#"{"id": 7, "name"#);
    let client = client_over(tier, Arc::new(MemoryCredentialStore::new()), Platform::Ios);

    let err = client
        .get_query::<Profile>("user/profile", UnauthorizedBehavior::Throw)
        .await
        .expect_err("truncated");

    assert_eq!(err.code(), Some("TRUNCATED_RESPONSE"));
}

#[tokio::test(start_paused = true)]
async fn exhausted_tiers_surface_network_error() {
    let tier = MockTier::failing("fallback", RawError::numeric(-1009, "offline"));
    let client = client_over(tier, Arc::new(MemoryCredentialStore::new()), Platform::Ios);

    let err = client
        .request(Method::GET, "feed", None)
        .await
        .expect_err("offline");

    assert_eq!(err.code(), Some("OFFLINE"));
    assert!(err.to_string().starts_with("Network Error: OFFLINE - "));
    assert_eq!(err.chain().map(TierAttemptChain::len), Some(3));
}

#[tokio::test(start_paused = true)]
async fn configured_deadline_applies_to_every_request() {
    let config = TransportConfig {
        request_deadline_ms: Some(5_000),
        ..config(Platform::Ios)
    };
    let client = AuthenticatedClient::builder(config)
        .sequencer(TierSequencer::new(engine()).push(MockTier::new("native", vec![Step::Hang])))
        .credential_store(Arc::new(MemoryCredentialStore::new()))
        .build()
        .unwrap();

    let err = client
        .request(Method::GET, "feed", None)
        .await
        .expect_err("deadline");

    match err {
        TransportError::DeadlineExceeded { elapsed, chain } => {
            assert!(elapsed >= Duration::from_secs(5));
            assert!(chain.is_empty());
        }
        other => panic!("expected deadline, got {other:?}"),
    }
}

#[tokio::test]
async fn caller_cancellation_is_reported() {
    let client = client_over(
        MockTier::new("native", vec![Step::Hang]),
        Arc::new(MemoryCredentialStore::new()),
        Platform::Ios,
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = client
        .request_cancellable(Method::GET, "feed", None, &cancel)
        .await
        .expect_err("cancelled");

    assert!(matches!(err, TransportError::Cancelled { .. }));
}

#[test]
fn invalid_config_is_rejected_at_build() {
    let config = TransportConfig {
        base_url: Some("not a url".to_string()),
        ..TransportConfig::default()
    };
    let err = AuthenticatedClient::builder(config)
        .credential_store(Arc::new(MemoryCredentialStore::new()))
        .build()
        .expect_err("bad base url");
    assert!(matches!(err, TransportError::Config(_)));
}
