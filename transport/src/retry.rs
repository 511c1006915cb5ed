//! Diagnosed retry loop for a single tier.
//!
//! Linear back-off without jitter: wait the diagnosis' `retry_after_ms` when
//! it gives one, otherwise `attempt * linear_step`. A non-recoverable
//! diagnosis stops the loop immediately.

use std::time::Duration;
use std::time::Instant;

use relay_async_utils::CancelErr;
use relay_async_utils::Deadline;
use relay_async_utils::OrCancelExt;
use relay_async_utils::sleep_or_cancel;
use relay_diagnosis::DiagnosisContext;
use relay_diagnosis::DiagnosisEngine;
use relay_diagnosis::DiagnosticReport;
use relay_diagnosis::TierAttemptChain;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::warn;

use crate::config::RetryConfig;
use crate::http::OutboundRequest;
use crate::http::Response;
use crate::tier::Tier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub linear_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            linear_step: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Exactly one attempt.
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            linear_step: Duration::from_millis(config.linear_step_ms),
        }
    }

    /// Wait before the attempt following `attempt` (1-indexed).
    pub fn delay_for(&self, report: &DiagnosticReport, attempt: u32) -> Duration {
        if report.retry_after_ms > 0 {
            Duration::from_millis(report.retry_after_ms)
        } else {
            self.linear_step.saturating_mul(attempt)
        }
    }
}

/// Reported before each back-off sleep.
#[derive(Debug, Clone)]
pub struct RetryStatus {
    pub tier: String,
    /// The attempt that just failed (1-indexed).
    pub attempt: u32,
    pub delay: Duration,
    pub report: DiagnosticReport,
}

/// Why a tier produced no response.
#[derive(Debug)]
pub(crate) enum TierFailure {
    /// Every allowed attempt failed; one report per attempt.
    Exhausted(TierAttemptChain),
    /// Cancellation or the deadline fired; reports gathered so far.
    Interrupted {
        reason: CancelErr,
        chain: TierAttemptChain,
    },
}

/// Shared inputs of every attempt of one logical request.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AttemptScope<'a> {
    pub engine: &'a DiagnosisEngine,
    pub cancel: &'a CancellationToken,
    pub deadline: Deadline,
}

/// Runs `tier` up to `policy.max_attempts` times.
///
/// On success the failed attempts of this tier are dropped; on failure they
/// are all returned, in order.
pub(crate) async fn run_with_retry<F>(
    tier: &dyn Tier,
    request: &OutboundRequest,
    policy: &RetryPolicy,
    scope: AttemptScope<'_>,
    mut on_status: F,
) -> Result<Response, TierFailure>
where
    F: FnMut(&RetryStatus) + Send,
{
    let url = request.url.as_str();
    let method = request.method.as_str();
    let mut failures = TierAttemptChain::new();
    let mut attempt: u32 = 0;

    while attempt < policy.max_attempts {
        attempt = attempt.saturating_add(1);
        let started = Instant::now();

        let outcome = match tier
            .execute(request)
            .or_cancel_by(scope.cancel, scope.deadline)
            .await
        {
            Ok(outcome) => outcome,
            Err(reason) => {
                debug!(tier = tier.name(), attempt, ?reason, "attempt interrupted");
                return Err(TierFailure::Interrupted {
                    reason,
                    chain: failures,
                });
            }
        };

        let raw = match outcome {
            Ok(response) => return Ok(response),
            Err(raw) => raw,
        };

        let ctx = DiagnosisContext::new(tier.name(), url, method).started_at(started);
        let report = scope.engine.diagnose(&raw, &ctx);
        warn!(
            tier = tier.name(),
            attempt,
            code = %report.error_code,
            recoverable = report.recoverable,
            "transport attempt failed"
        );

        if !report.recoverable || attempt >= policy.max_attempts {
            failures.push(report);
            break;
        }

        let delay = policy.delay_for(&report, attempt);
        on_status(&RetryStatus {
            tier: tier.name().to_string(),
            attempt,
            delay,
            report: report.clone(),
        });
        failures.push(report);

        if let Err(reason) = sleep_or_cancel(delay, scope.cancel, scope.deadline).await {
            return Err(TierFailure::Interrupted {
                reason,
                chain: failures,
            });
        }
    }

    Err(TierFailure::Exhausted(failures))
}
