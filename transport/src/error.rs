use std::time::Duration;

use relay_diagnosis::DiagnosticReport;
use relay_diagnosis::TierAttemptChain;
use relay_keyring_store::CredentialStoreError;
use thiserror::Error;

use crate::config::ConfigError;

pub type Result<T> = std::result::Result<T, TransportError>;

/// Code reported when a sequence ends without a single diagnosed attempt.
const NO_ATTEMPTS_CODE: &str = "UNDIAGNOSED";

/// Every tier (and every retry of the retrying tier) failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierExhausted {
    chain: TierAttemptChain,
}

impl TierExhausted {
    pub fn new(chain: TierAttemptChain) -> Self {
        Self { chain }
    }

    /// Canonical code of the last failure.
    pub fn code(&self) -> &str {
        self.chain
            .last()
            .map_or(NO_ATTEMPTS_CODE, |report| report.error_code.as_str())
    }

    /// Description of the last failure.
    pub fn description(&self) -> &str {
        self.chain
            .last()
            .map_or("no transport tier was attempted", |report| {
                report.description.as_str()
            })
    }

    pub fn summary(&self) -> String {
        self.chain.summary()
    }

    pub fn chain(&self) -> &TierAttemptChain {
        &self.chain
    }

    pub fn last_report(&self) -> Option<&DiagnosticReport> {
        self.chain.last()
    }

    pub fn into_chain(self) -> TierAttemptChain {
        self.chain
    }
}

impl std::fmt::Display for TierExhausted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Network Error: {} - {} [{}]",
            self.code(),
            self.description(),
            self.summary()
        )
    }
}

impl std::error::Error for TierExhausted {}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Exhausted(#[from] TierExhausted),

    #[error("request cancelled after {} failed attempt(s)", .chain.len())]
    Cancelled { chain: TierAttemptChain },

    #[error("request deadline exceeded after {elapsed:?} ({} failed attempt(s))", .chain.len())]
    DeadlineExceeded {
        elapsed: Duration,
        chain: TierAttemptChain,
    },

    /// A completed exchange with a non-success status, on the throwing convention.
    #[error("{status}: {body}")]
    Status {
        status: u16,
        body: String,
        report: Box<DiagnosticReport>,
    },

    #[error("unauthorized")]
    Unauthorized,

    #[error("{}: {}", .0.error_code, .0.description)]
    Parse(Box<DiagnosticReport>),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Credential(#[from] CredentialStoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

impl TransportError {
    /// The attempt chain gathered before the failure, when there is one.
    pub fn chain(&self) -> Option<&TierAttemptChain> {
        match self {
            Self::Exhausted(exhausted) => Some(exhausted.chain()),
            Self::Cancelled { chain } | Self::DeadlineExceeded { chain, .. } => Some(chain),
            _ => None,
        }
    }

    /// Leading canonical code, for mapping onto user-facing messages.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Exhausted(exhausted) => Some(exhausted.code()),
            Self::Status { report, .. } | Self::Parse(report) => Some(&report.error_code),
            Self::Unauthorized => Some("HTTP_UNAUTHORIZED"),
            _ => None,
        }
    }
}
