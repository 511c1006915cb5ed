//! Diagnostic reports and the per-request attempt chain.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use std::time::Instant;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Separator between entries of a chain summary.
pub const CHAIN_SEPARATOR: &str = " → ";

/// The runtime platform a request is issued from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Ios,
    Android,
    Web,
    Desktop,
}

impl Platform {
    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(target_os = "ios") {
            Self::Ios
        } else if cfg!(target_os = "android") {
            Self::Android
        } else if cfg!(target_family = "wasm") {
            Self::Web
        } else {
            Self::Desktop
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Android => "android",
            Self::Web => "web",
            Self::Desktop => "desktop",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ios" => Ok(Self::Ios),
            "android" => Ok(Self::Android),
            "web" => Ok(Self::Web),
            "desktop" => Ok(Self::Desktop),
            other => Err(format!("unknown platform: {other}")),
        }
    }
}

/// Where a failure happened, supplied by the caller of the engine.
#[derive(Debug, Clone, Copy)]
pub struct DiagnosisContext<'a> {
    pub tier: &'a str,
    pub url: &'a str,
    pub method: &'a str,
    /// When the attempt started; used for `elapsed_ms`.
    pub started_at: Option<Instant>,
}

impl<'a> DiagnosisContext<'a> {
    pub fn new(tier: &'a str, url: &'a str, method: &'a str) -> Self {
        Self {
            tier,
            url,
            method,
            started_at: None,
        }
    }

    pub fn started_at(mut self, started_at: Instant) -> Self {
        self.started_at = Some(started_at);
        self
    }

    pub(crate) fn elapsed_ms(&self) -> u64 {
        self.started_at
            .map(|start| u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}

/// The canonical description of one failed attempt.
///
/// Built fresh per failure and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub error_code: String,
    pub description: String,
    /// Transport mechanism that produced the failure.
    pub tier: String,
    pub platform: Platform,
    pub url: String,
    pub method: String,
    pub recoverable: bool,
    pub retry_after_ms: u64,
    pub elapsed_ms: u64,
    pub raw_error_text: String,
    /// Nested native codes, outermost first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underlying_codes: Option<Vec<i64>>,
    pub timestamp: DateTime<Utc>,
}

impl DiagnosticReport {
    /// The wait the diagnosis asks for, if it asks for one.
    pub fn suggested_backoff(&self) -> Option<Duration> {
        (self.recoverable && self.retry_after_ms > 0)
            .then(|| Duration::from_millis(self.retry_after_ms))
    }

    /// `tier:code`, as used in chain summaries.
    pub fn chain_token(&self) -> String {
        format!("{}:{}", self.tier, self.error_code)
    }

    /// Equality on everything except `timestamp` and `elapsed_ms`.
    pub fn same_diagnosis(&self, other: &Self) -> bool {
        Self {
            timestamp: other.timestamp,
            elapsed_ms: other.elapsed_ms,
            ..self.clone()
        } == *other
    }
}

/// Reports for the failed attempts of one logical request, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierAttemptChain(Vec<DiagnosticReport>);

impl TierAttemptChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, report: DiagnosticReport) {
        self.0.push(report);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&DiagnosticReport> {
        self.0.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DiagnosticReport> {
        self.0.iter()
    }

    /// `tier:code → tier:code → …`
    pub fn summary(&self) -> String {
        self.0
            .iter()
            .map(DiagnosticReport::chain_token)
            .collect::<Vec<_>>()
            .join(CHAIN_SEPARATOR)
    }

    pub fn into_vec(self) -> Vec<DiagnosticReport> {
        self.0
    }
}

impl Extend<DiagnosticReport> for TierAttemptChain {
    fn extend<I: IntoIterator<Item = DiagnosticReport>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl FromIterator<DiagnosticReport> for TierAttemptChain {
    fn from_iter<I: IntoIterator<Item = DiagnosticReport>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for TierAttemptChain {
    type Item = DiagnosticReport;
    type IntoIter = std::vec::IntoIter<DiagnosticReport>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a TierAttemptChain {
    type Item = &'a DiagnosticReport;
    type IntoIter = std::slice::Iter<'a, DiagnosticReport>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
