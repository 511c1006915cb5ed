use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use pretty_assertions::assert_eq;
use relay_diagnosis::RawError;
use relay_diagnosis::TierAttemptChain;
use relay_transport::CancellationToken;
use relay_transport::Deadline;
use relay_transport::OutboundRequest;
use relay_transport::RetryPolicy;
use relay_transport::RetryStatus;
use relay_transport::Strategy;
use relay_transport::TierSequencer;
use relay_transport::TransportError;
use reqwest::Method;
use reqwest::StatusCode;
use url::Url;

use super::support::MockTier;
use super::support::Step;
use super::support::engine;
use super::support::init_tracing;

fn get() -> OutboundRequest {
    OutboundRequest::get(Url::parse("https://api.example.com/v1/feed").unwrap())
}

fn codes(chain: &TierAttemptChain) -> Vec<(String, String)> {
    chain
        .iter()
        .map(|report| (report.tier.clone(), report.error_code.clone()))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn last_tier_recovers_after_retry_and_chain_lists_earlier_tiers() {
    init_tracing();
    let native = MockTier::failing("native", RawError::numeric(-1003, "hostname not found"));
    let http1 = MockTier::failing("http1", RawError::message_only("operation timed out"));
    let direct = MockTier::failing("direct", RawError::numeric(-1004, "could not connect"));
    let fallback = MockTier::new(
        "fallback",
        vec![
            Step::Fail(RawError::message_only("connection reset by peer")),
            Step::Respond(200, r#"{"items":[]}"#),
        ],
    );
    let statuses = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&statuses);

    let sequencer = TierSequencer::new(engine())
        .push(native.clone())
        .push(http1.clone())
        .push(direct.clone())
        .push_retrying(fallback.clone(), RetryPolicy::default())
        .with_retry_observer(Arc::new(move |status: &RetryStatus| {
            seen.lock().unwrap().push((status.tier.clone(), status.attempt));
        }));

    let mut response = sequencer
        .execute(&get(), &CancellationToken::new(), Deadline::none())
        .await
        .expect("fallback delivers");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.tier(), "fallback");
    assert_eq!(response.text().unwrap(), r#"{"items":[]}"#);
    assert_eq!(
        codes(response.failed_attempts()),
        vec![
            ("native".to_string(), "DNS_FAILED".to_string()),
            ("http1".to_string(), "TIMEOUT".to_string()),
            ("direct".to_string(), "CANNOT_CONNECT".to_string()),
        ]
    );
    assert_eq!(fallback.calls(), 2);
    assert_eq!(*statuses.lock().unwrap(), vec![("fallback".to_string(), 1)]);
}

#[tokio::test(start_paused = true)]
async fn first_success_skips_remaining_tiers() {
    let native = MockTier::responding("native", 200, "{}");
    let fallback = MockTier::responding("fallback", 200, "{}");
    let sequencer = TierSequencer::new(engine())
        .push(native.clone())
        .push_retrying(fallback.clone(), RetryPolicy::default());

    let response = sequencer
        .execute(&get(), &CancellationToken::new(), Deadline::none())
        .await
        .unwrap();

    assert!(response.failed_attempts().is_empty());
    assert_eq!(native.calls(), 1);
    assert_eq!(fallback.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn error_status_is_a_completed_exchange() {
    let native = MockTier::responding("native", 503, "busy");
    let fallback = MockTier::responding("fallback", 200, "{}");
    let sequencer = TierSequencer::new(engine())
        .push(native)
        .push(fallback.clone());

    let response = sequencer
        .execute(&get(), &CancellationToken::new(), Deadline::none())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(fallback.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn exhaustion_reports_last_failure_and_full_chain() {
    let native = MockTier::failing("native", RawError::numeric(-1009, "offline"));
    let reset = RawError::message_only("connection reset by peer");
    let fallback = MockTier::failing("fallback", reset);
    let sequencer = TierSequencer::new(engine())
        .push(native)
        .push_retrying(fallback.clone(), RetryPolicy::default());

    let err = sequencer
        .execute(&get(), &CancellationToken::new(), Deadline::none())
        .await
        .expect_err("every tier fails");

    let TransportError::Exhausted(exhausted) = &err else {
        panic!("expected exhaustion, got {err:?}");
    };
    assert_eq!(exhausted.chain().len(), 4);
    assert_eq!(fallback.calls(), 3);
    assert_eq!(exhausted.code(), "SOCKET_CONNECTION_RESET");
    let last = exhausted.last_report().unwrap();
    assert_eq!(exhausted.description(), last.description);
    assert_eq!(
        exhausted.summary(),
        [
            "native:OFFLINE",
            "fallback:SOCKET_CONNECTION_RESET",
            "fallback:SOCKET_CONNECTION_RESET",
            "fallback:SOCKET_CONNECTION_RESET",
        ]
        .join(" → ")
    );
    assert_eq!(
        err.to_string(),
        format!(
            "Network Error: SOCKET_CONNECTION_RESET - {} [{}]",
            last.description,
            exhausted.summary()
        )
    );
}

#[tokio::test(start_paused = true)]
async fn fatal_failure_on_retrying_tier_is_not_retried() {
    let fallback = MockTier::failing("fallback", RawError::numeric(-1202, "untrusted certificate"));
    let sequencer =
        TierSequencer::new(engine()).push_retrying(fallback.clone(), RetryPolicy::default());

    let err = sequencer
        .execute(&get(), &CancellationToken::new(), Deadline::none())
        .await
        .expect_err("fatal");

    assert_eq!(fallback.calls(), 1);
    assert_eq!(err.chain().map(TierAttemptChain::len), Some(1));
}

#[tokio::test(start_paused = true)]
async fn race_returns_the_first_response() {
    let native = MockTier::new(
        "native",
        vec![Step::RespondAfter(Duration::from_secs(5), 200, "slow")],
    );
    let fallback = MockTier::new(
        "fallback",
        vec![Step::RespondAfter(Duration::from_millis(10), 200, "fast")],
    );
    let sequencer = TierSequencer::new(engine())
        .push(native.clone())
        .push(fallback.clone())
        .with_strategy(Strategy::RaceIdempotent);

    let mut response = sequencer
        .execute(&get(), &CancellationToken::new(), Deadline::none())
        .await
        .unwrap();

    assert_eq!(response.tier(), "fallback");
    assert_eq!(response.text().unwrap(), "fast");
    assert_eq!(native.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn race_keeps_failures_in_tier_order() {
    let native = MockTier::new(
        "native",
        vec![Step::RespondAfter(Duration::from_secs(1), 200, "ok")],
    );
    let http1 = MockTier::failing("http1", RawError::numeric(-1004, "could not connect"));
    let sequencer = TierSequencer::new(engine())
        .push(native)
        .push(http1)
        .with_strategy(Strategy::RaceIdempotent);

    let response = sequencer
        .execute(&get(), &CancellationToken::new(), Deadline::none())
        .await
        .unwrap();

    assert_eq!(response.tier(), "native");
    assert_eq!(
        codes(response.failed_attempts()),
        vec![("http1".to_string(), "CANNOT_CONNECT".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn race_strategy_keeps_writes_sequential() {
    let native = MockTier::new(
        "native",
        vec![Step::RespondAfter(Duration::from_secs(5), 201, "created")],
    );
    let fallback = MockTier::responding("fallback", 201, "duplicate");
    let sequencer = TierSequencer::new(engine())
        .push(native)
        .push(fallback.clone())
        .with_strategy(Strategy::RaceIdempotent);

    let request = OutboundRequest::new(
        Method::POST,
        Url::parse("https://api.example.com/v1/posts").unwrap(),
    )
    .body("{}");
    let response = sequencer
        .execute(&request, &CancellationToken::new(), Deadline::none())
        .await
        .unwrap();

    assert_eq!(response.tier(), "native");
    assert_eq!(fallback.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_the_sequence() {
    let native = MockTier::failing("native", RawError::numeric(-1005, "connection lost"));
    let fallback = MockTier::new("fallback", vec![Step::Hang]);
    let sequencer = TierSequencer::new(engine())
        .push(native)
        .push(fallback);
    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        canceller.cancel();
    });

    let err = sequencer
        .execute(&get(), &cancel, Deadline::none())
        .await
        .expect_err("cancelled");

    match err {
        TransportError::Cancelled { chain } => {
            assert_eq!(codes(&chain), vec![("native".to_string(), "CONNECTION_LOST".to_string())]);
        }
        other => panic!("expected cancellation, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn already_cancelled_request_attempts_nothing() {
    let native = MockTier::responding("native", 200, "{}");
    let sequencer = TierSequencer::new(engine()).push(native);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = sequencer
        .execute(&get(), &cancel, Deadline::none())
        .await
        .expect_err("cancelled");

    assert!(matches!(err, TransportError::Cancelled { ref chain } if chain.is_empty()));
}

#[tokio::test(start_paused = true)]
async fn deadline_bounds_the_whole_sequence() {
    let native = MockTier::failing("native", RawError::numeric(-1001, "timed out"));
    let fallback = MockTier::new("fallback", vec![Step::Hang]);
    let sequencer = TierSequencer::new(engine())
        .push(native)
        .push_retrying(fallback, RetryPolicy::default());

    let err = sequencer
        .execute(&get(), &CancellationToken::new(), Deadline::after(Duration::from_secs(30)))
        .await
        .expect_err("deadline");

    match err {
        TransportError::DeadlineExceeded { chain, .. } => assert_eq!(chain.len(), 1),
        other => panic!("expected deadline, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_plan_is_rejected() {
    let err = TierSequencer::new(engine())
        .execute(&get(), &CancellationToken::new(), Deadline::none())
        .await
        .expect_err("no tiers");
    assert!(matches!(err, TransportError::InvalidRequest(_)));
}
