//! Drives one request through the tier plan.
//!
//! Sequential by default: each tier runs to completion (including its retry
//! loop) before the next starts, and the first completed exchange ends the
//! request. With [`Strategy::RaceIdempotent`], GET/HEAD/OPTIONS requests start
//! every tier at once and the first response wins.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use relay_async_utils::CancelErr;
use relay_async_utils::Deadline;
use relay_diagnosis::DiagnosisEngine;
use relay_diagnosis::TierAttemptChain;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::config::Strategy;
use crate::config::TransportConfig;
use crate::error::Result;
use crate::error::TierExhausted;
use crate::error::TransportError;
use crate::http::OutboundRequest;
use crate::http::Response;
use crate::retry::AttemptScope;
use crate::retry::RetryPolicy;
use crate::retry::RetryStatus;
use crate::retry::TierFailure;
use crate::retry::run_with_retry;
use crate::tier::ReqwestTier;
use crate::tier::Tier;

/// Callback invoked before every back-off sleep.
pub type RetryObserver = Arc<dyn Fn(&RetryStatus) + Send + Sync>;

#[derive(Debug, Clone)]
struct PlannedTier {
    tier: Arc<dyn Tier>,
    policy: RetryPolicy,
}

#[derive(Clone)]
pub struct TierSequencer {
    tiers: Vec<PlannedTier>,
    engine: Arc<DiagnosisEngine>,
    strategy: Strategy,
    observer: Option<RetryObserver>,
}

impl std::fmt::Debug for TierSequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TierSequencer")
            .field("tiers", &self.tier_names())
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

impl TierSequencer {
    pub fn new(engine: Arc<DiagnosisEngine>) -> Self {
        Self {
            tiers: Vec::new(),
            engine,
            strategy: Strategy::Sequential,
            observer: None,
        }
    }

    /// Builds the reqwest tiers named by the config's tier plan.
    pub fn from_config(config: &TransportConfig, engine: Arc<DiagnosisEngine>) -> Result<Self> {
        let retry = RetryPolicy::from_config(&config.retry);
        let mut sequencer = Self::new(engine).with_strategy(config.strategy);
        for spec in config.tier_plan() {
            let tier: Arc<dyn Tier> =
                Arc::new(ReqwestTier::new(spec.kind, config).map_err(TransportError::ClientBuild)?);
            sequencer = if spec.retry {
                sequencer.push_retrying(tier, retry)
            } else {
                sequencer.push(tier)
            };
        }
        Ok(sequencer)
    }

    /// Appends a single-attempt tier.
    pub fn push(self, tier: Arc<dyn Tier>) -> Self {
        self.push_retrying(tier, RetryPolicy::once())
    }

    /// Appends a tier run under the retry controller.
    pub fn push_retrying(mut self, tier: Arc<dyn Tier>, policy: RetryPolicy) -> Self {
        self.tiers.push(PlannedTier { tier, policy });
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_retry_observer(mut self, observer: RetryObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn tier_names(&self) -> Vec<&str> {
        self.tiers.iter().map(|planned| planned.tier.name()).collect()
    }

    pub fn engine(&self) -> &DiagnosisEngine {
        &self.engine
    }

    /// Carries `request` over the first tier that completes an HTTP exchange.
    ///
    /// The returned response's [`Response::failed_attempts`] holds one report
    /// per earlier tier that failed. Retried failures of the delivering tier
    /// are not included.
    pub async fn execute(
        &self,
        request: &OutboundRequest,
        cancel: &CancellationToken,
        deadline: Deadline,
    ) -> Result<Response> {
        if self.tiers.is_empty() {
            return Err(TransportError::InvalidRequest(
                "no transport tiers configured".to_string(),
            ));
        }
        let scope = AttemptScope {
            engine: &self.engine,
            cancel,
            deadline,
        };
        let started = Instant::now();

        if self.strategy == Strategy::RaceIdempotent
            && request.is_idempotent()
            && self.tiers.len() > 1
        {
            return self.race(request, scope, started).await;
        }
        self.sequential(request, scope, started).await
    }

    async fn sequential(
        &self,
        request: &OutboundRequest,
        scope: AttemptScope<'_>,
        started: Instant,
    ) -> Result<Response> {
        let mut chain = TierAttemptChain::new();

        for (idx, planned) in self.tiers.iter().enumerate() {
            debug!(tier = planned.tier.name(), url = %request.url, "trying tier");
            match run_with_retry(
                planned.tier.as_ref(),
                request,
                &planned.policy,
                scope,
                |status: &RetryStatus| self.report_retry(status),
            )
            .await
            {
                Ok(response) => {
                    if idx > 0 {
                        info!(
                            tier = planned.tier.name(),
                            failed = %chain.summary(),
                            "request delivered by fallback tier"
                        );
                    }
                    return Ok(response.with_failed_attempts(chain));
                }
                Err(TierFailure::Exhausted(reports)) => {
                    chain.extend(reports);
                }
                Err(TierFailure::Interrupted {
                    reason,
                    chain: reports,
                }) => {
                    chain.extend(reports);
                    return Err(interrupted(reason, chain, started));
                }
            }
        }

        Err(self.exhausted(chain))
    }

    async fn race(
        &self,
        request: &OutboundRequest,
        scope: AttemptScope<'_>,
        started: Instant,
    ) -> Result<Response> {
        debug!(url = %request.url, tiers = self.tiers.len(), "racing tiers");
        let mut pending: FuturesUnordered<_> = self
            .tiers
            .iter()
            .enumerate()
            .map(|(idx, planned)| async move {
                let outcome = run_with_retry(
                    planned.tier.as_ref(),
                    request,
                    &planned.policy,
                    scope,
                    |status: &RetryStatus| self.report_retry(status),
                )
                .await;
                (idx, outcome)
            })
            .collect();

        let mut failed: Vec<Option<TierAttemptChain>> = vec![None; self.tiers.len()];
        while let Some((idx, outcome)) = pending.next().await {
            match outcome {
                Ok(response) => {
                    info!(tier = response.tier(), "race won");
                    return Ok(response.with_failed_attempts(in_tier_order(failed)));
                }
                Err(TierFailure::Exhausted(reports)) => {
                    failed[idx] = Some(reports);
                }
                Err(TierFailure::Interrupted { reason, chain }) => {
                    failed[idx] = Some(chain);
                    return Err(interrupted(reason, in_tier_order(failed), started));
                }
            }
        }

        Err(self.exhausted(in_tier_order(failed)))
    }

    fn report_retry(&self, status: &RetryStatus) {
        info!(
            tier = %status.tier,
            attempt = status.attempt,
            delay_ms = u64::try_from(status.delay.as_millis()).unwrap_or(u64::MAX),
            code = %status.report.error_code,
            "retrying after back-off"
        );
        if let Some(observer) = &self.observer {
            observer(status);
        }
    }

    fn exhausted(&self, chain: TierAttemptChain) -> TransportError {
        let exhausted = TierExhausted::new(chain);
        error!(
            code = exhausted.code(),
            chain = %exhausted.summary(),
            "all transport tiers failed"
        );
        TransportError::Exhausted(exhausted)
    }
}

fn in_tier_order(failed: Vec<Option<TierAttemptChain>>) -> TierAttemptChain {
    failed.into_iter().flatten().flatten().collect()
}

fn interrupted(reason: CancelErr, chain: TierAttemptChain, started: Instant) -> TransportError {
    warn!(?reason, failed = chain.len(), "request interrupted");
    match reason {
        CancelErr::Cancelled => TransportError::Cancelled { chain },
        CancelErr::DeadlineExceeded => TransportError::DeadlineExceeded {
            elapsed: started.elapsed(),
            chain,
        },
    }
}
