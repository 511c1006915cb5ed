//! Turns raw failures into [`DiagnosticReport`]s.
//!
//! Precedence, first match wins:
//! 1. a structured native diagnostic, trusted verbatim
//! 2. a bridge-prefixed string code, enriched by its nested native code
//! 3. the error's own numeric code (transport, then TLS, then socket)
//! 4. a numeric code embedded in the message text, either marked by a
//!    `code=` prefix or sign, or a bare number one of the tables knows
//! 5. the free-text rule list, against message and name
//! 6. the generic network error class
//! 7. `UNDIAGNOSED`
//!
//! The engine never fails: every input yields a fully populated report.

use std::sync::Arc;
use std::sync::LazyLock;

use chrono::Utc;
use regex_lite::Regex;
use tracing::debug;

use crate::body::SafeParseResult;
use crate::raw::RawError;
use crate::raw::is_bridge_code;
use crate::report::DiagnosisContext;
use crate::report::DiagnosticReport;
use crate::report::Platform;
use crate::taxonomy::TaxonomyEntry;
use crate::taxonomy::TaxonomyTables;
use crate::taxonomy::codes;

/// Error class names that only say "the network failed".
pub const GENERIC_NETWORK_ERROR_NAMES: &[&str] =
    &["TypeError", "NetworkError", "ConnectError", "RequestError"];

/// Retry hint for server-side statuses missing from the status table.
const UNMAPPED_SERVER_STATUS_RETRY_MS: u64 = 2_000;

// A `code=` / `code:` prefix or a minus sign marks a number as a native code.
const EMBEDDED_CODE_PATTERN: &str =
    r"(?i)\bcode\s*[=:]\s*(-?\d{3,5})\b|(?:^|[^\w-])(-\d{3,5})\b";

// Unmarked positive numbers standing alone as a word, as in `(os error 111)`.
// Ports, durations and dotted addresses do not qualify.
const BARE_CODE_PATTERN: &str = r"(?:^|[\s(\[#])(\d{3,5})(?:$|[\s)\],;]|\.(?:$|\s))";

static EMBEDDED_CODE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(EMBEDDED_CODE_PATTERN).ok());

static BARE_CODE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(BARE_CODE_PATTERN).ok());

/// Extracts a 3–5 digit native code marked as such in an error message.
pub fn extract_embedded_code(message: &str) -> Option<i64> {
    let caps = EMBEDDED_CODE.as_ref()?.captures(message)?;
    caps.get(1).or_else(|| caps.get(2))?.as_str().parse().ok()
}

/// Unmarked positive 3–5 digit numbers in a message, in order of appearance.
///
/// These are only candidates: the engine uses the first one a table knows
/// and ignores the rest.
pub fn extract_bare_codes(message: &str) -> Vec<i64> {
    let Some(re) = BARE_CODE.as_ref() else {
        return Vec::new();
    };
    re.captures_iter(message)
        .filter_map(|caps| caps.get(1)?.as_str().parse().ok())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Verdict {
    code: String,
    description: String,
    recoverable: bool,
    retry_after_ms: u64,
    underlying_codes: Option<Vec<i64>>,
}

impl Verdict {
    fn entry(entry: &TaxonomyEntry) -> Self {
        Self {
            code: entry.code.to_string(),
            description: entry.description.to_string(),
            recoverable: entry.recoverable,
            retry_after_ms: if entry.recoverable {
                entry.retry_after_ms
            } else {
                0
            },
            underlying_codes: None,
        }
    }

    fn with_underlying(mut self, codes: Vec<i64>) -> Self {
        self.underlying_codes = Some(codes);
        self
    }
}

/// Diagnoses failures against an owned set of taxonomy tables.
#[derive(Debug, Clone)]
pub struct DiagnosisEngine {
    tables: Arc<TaxonomyTables>,
    platform: Platform,
}

impl DiagnosisEngine {
    pub fn new(tables: Arc<TaxonomyTables>, platform: Platform) -> Self {
        Self { tables, platform }
    }

    /// An engine over the built-in tables.
    pub fn builtin(platform: Platform) -> Self {
        Self::new(Arc::new(TaxonomyTables::builtin()), platform)
    }

    pub fn tables(&self) -> &TaxonomyTables {
        &self.tables
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Diagnoses a failure thrown by a transport mechanism.
    pub fn diagnose(&self, error: &RawError, ctx: &DiagnosisContext<'_>) -> DiagnosticReport {
        let verdict = self.classify(error, ctx);
        self.report(verdict, ctx, error.to_string())
    }

    /// Diagnoses a completed exchange whose status signals failure.
    pub fn diagnose_status(&self, status: u16, ctx: &DiagnosisContext<'_>) -> DiagnosticReport {
        let verdict = match self.tables.http_status(status) {
            Some(entry) => Verdict::entry(entry),
            None => {
                let class = match status {
                    400..=499 => "CLIENT",
                    500..=599 => "SERVER",
                    _ => "UNEXPECTED",
                };
                let recoverable = status >= 500;
                Verdict {
                    code: format!("{class}_{status}"),
                    description: format!("The server answered with HTTP {status}"),
                    recoverable,
                    retry_after_ms: if recoverable {
                        UNMAPPED_SERVER_STATUS_RETRY_MS
                    } else {
                        0
                    },
                    underlying_codes: None,
                }
            }
        };
        debug!(tier = ctx.tier, status, code = %verdict.code, "diagnosed HTTP status");
        self.report(verdict, ctx, format!("HTTP {status}"))
    }

    /// Diagnoses a body that failed to decode. Context-specific parse codes
    /// take the recoverability of `MALFORMED_RESPONSE`.
    pub fn diagnose_body<T>(
        &self,
        result: &SafeParseResult<T>,
        ctx: &DiagnosisContext<'_>,
    ) -> DiagnosticReport {
        let entry = self
            .tables
            .by_code(&result.error_code)
            .copied()
            .unwrap_or_else(|| self.entry_or(codes::MALFORMED_RESPONSE));
        let verdict = Verdict {
            code: result.error_code.clone(),
            description: result.error_desc.clone(),
            ..Verdict::entry(&entry)
        };
        debug!(tier = ctx.tier, code = %verdict.code, "diagnosed response body");
        self.report(verdict, ctx, result.raw_text.clone().unwrap_or_default())
    }

    fn classify(&self, error: &RawError, ctx: &DiagnosisContext<'_>) -> Verdict {
        match error {
            RawError::Structured(native) => {
                debug!(tier = ctx.tier, code = %native.code, "using structured native diagnostic");
                Verdict {
                    code: native.code.clone(),
                    description: if native.description.is_empty() {
                        native.code.clone()
                    } else {
                        native.description.clone()
                    },
                    recoverable: native.recoverable,
                    retry_after_ms: native.retry_after_ms,
                    underlying_codes: (!native.underlying_codes.is_empty())
                        .then(|| native.underlying_codes.clone()),
                }
            }
            RawError::BridgeCoded {
                code,
                nested_code,
                message,
                ..
            } if is_bridge_code(code) => self.bridge(code, *nested_code, message, ctx),
            RawError::BridgeCoded {
                code,
                nested_code,
                message,
                name,
            } => {
                let own = code.trim().parse().ok().or(*nested_code);
                self.numeric(own, message, name.as_deref(), ctx)
            }
            RawError::NumericCoded {
                code,
                message,
                name,
            } => self.numeric(Some(*code), message, name.as_deref(), ctx),
            RawError::MessageOnly { message, name } => self.textual(message, name.as_deref(), ctx),
        }
    }

    fn bridge(
        &self,
        code: &str,
        nested: Option<i64>,
        message: &str,
        ctx: &DiagnosisContext<'_>,
    ) -> Verdict {
        let base = if message.is_empty() { code } else { message };
        match nested.and_then(|n| self.tables.native(n).map(|entry| (n, entry))) {
            Some((nested, entry)) => {
                debug!(
                    tier = ctx.tier,
                    code,
                    nested,
                    resolved = entry.code,
                    "bridge code with native detail"
                );
                Verdict {
                    code: code.to_string(),
                    description: format!("{base} ({})", entry.description),
                    recoverable: entry.recoverable,
                    retry_after_ms: if entry.recoverable {
                        entry.retry_after_ms
                    } else {
                        0
                    },
                    underlying_codes: Some(vec![nested]),
                }
            }
            None => {
                debug!(tier = ctx.tier, code, "bridge code without resolvable native detail");
                Verdict {
                    code: code.to_string(),
                    description: base.to_string(),
                    recoverable: true,
                    retry_after_ms: 0,
                    underlying_codes: nested.map(|n| vec![n]),
                }
            }
        }
    }

    fn numeric(
        &self,
        code: Option<i64>,
        message: &str,
        name: Option<&str>,
        ctx: &DiagnosisContext<'_>,
    ) -> Verdict {
        if let Some(code) = code {
            if let Some(entry) = self.tables.native(code) {
                debug!(
                    tier = ctx.tier,
                    native = code,
                    resolved = entry.code,
                    "resolved native code"
                );
                return Verdict::entry(entry).with_underlying(vec![code]);
            }
            debug!(tier = ctx.tier, native = code, "native code not in any table");
        }
        let mut verdict = self.textual(message, name, ctx);
        if let (Some(code), None) = (code, &verdict.underlying_codes) {
            verdict.underlying_codes = Some(vec![code]);
        }
        verdict
    }

    fn textual(&self, message: &str, name: Option<&str>, ctx: &DiagnosisContext<'_>) -> Verdict {
        if let Some(code) = extract_embedded_code(message) {
            return match self.tables.native(code) {
                Some(entry) => {
                    debug!(
                        tier = ctx.tier,
                        embedded = code,
                        resolved = entry.code,
                        "resolved code from message"
                    );
                    Verdict::entry(entry).with_underlying(vec![code])
                }
                None => {
                    debug!(tier = ctx.tier, embedded = code, "unrecognized code in message");
                    Verdict {
                        code: format!("UNKNOWN_NATIVE_{code}"),
                        description: format!("Unrecognized native error code {code}: {message}"),
                        recoverable: true,
                        retry_after_ms: 0,
                        underlying_codes: Some(vec![code]),
                    }
                }
            };
        }

        let bare = extract_bare_codes(message)
            .into_iter()
            .find_map(|code| self.tables.native(code).map(|entry| (code, entry)));
        if let Some((code, entry)) = bare {
            debug!(tier = ctx.tier, bare = code, resolved = entry.code, "resolved bare code");
            return Verdict::entry(entry).with_underlying(vec![code]);
        }

        if let Some(entry) = self.tables.match_text(message, name) {
            debug!(tier = ctx.tier, resolved = entry.code, "matched free-text rule");
            return Verdict::entry(entry);
        }

        if name.is_some_and(|n| GENERIC_NETWORK_ERROR_NAMES.contains(&n)) {
            debug!(tier = ctx.tier, name, "generic network error class");
            return Verdict::entry(&self.entry_or(codes::NETWORK_TYPE_ERROR));
        }

        debug!(tier = ctx.tier, "failure left undiagnosed");
        let undiagnosed = self.entry_or(codes::UNDIAGNOSED);
        Verdict {
            description: if message.is_empty() {
                undiagnosed.description.to_string()
            } else {
                message.to_string()
            },
            ..Verdict::entry(&undiagnosed)
        }
    }

    fn entry_or(&self, fallback: TaxonomyEntry) -> TaxonomyEntry {
        self.tables.by_code(fallback.code).copied().unwrap_or(fallback)
    }

    fn report(
        &self,
        verdict: Verdict,
        ctx: &DiagnosisContext<'_>,
        raw: String,
    ) -> DiagnosticReport {
        DiagnosticReport {
            error_code: verdict.code,
            description: verdict.description,
            tier: ctx.tier.to_string(),
            platform: self.platform,
            url: ctx.url.to_string(),
            method: ctx.method.to_string(),
            recoverable: verdict.recoverable,
            retry_after_ms: verdict.retry_after_ms,
            elapsed_ms: ctx.elapsed_ms(),
            raw_error_text: raw,
            underlying_codes: verdict.underlying_codes,
            timestamp: Utc::now(),
        }
    }
}
