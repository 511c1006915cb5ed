//! Static error taxonomy.
//!
//! Raw failure signals arrive in several unrelated vocabularies: native
//! transport codes, TLS status codes, POSIX socket errno values, HTTP status
//! codes and free-text messages. Each vocabulary has its own table here; all
//! of them resolve to a [`TaxonomyEntry`] whose `code` is unique across every
//! table.
//!
//! The tables are plain data. Precedence between them (for example TLS vs
//! transport codes) is decided by [`crate::DiagnosisEngine`], not here.

mod http_status;
mod message;
mod socket;
mod tls;
mod transport;

use std::collections::HashMap;
use std::collections::HashSet;

use regex_lite::Regex;
use serde::Serialize;
use thiserror::Error;

pub use http_status::HTTP_STATUS_CODES;
pub use message::MESSAGE_ENTRIES;
pub use message::PATTERN_RULES;
pub use socket::SOCKET_CODES;
pub use tls::TLS_CODES;
pub use transport::TRANSPORT_CODES;

/// Codes the engine and body parser refer to by name.
pub mod codes {
    pub use super::message::BODY_ALREADY_CONSUMED;
    pub use super::message::BODY_READ_FAILED;
    pub use super::message::BODY_STREAM_LOCKED;
    pub use super::message::EMPTY_RESPONSE;
    pub use super::message::HTML_RESPONSE;
    pub use super::message::MALFORMED_RESPONSE;
    pub use super::message::NETWORK_TYPE_ERROR;
    pub use super::message::TRUNCATED_RESPONSE;
    pub use super::message::UNDIAGNOSED;
}

/// One canonical failure condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaxonomyEntry {
    /// Canonical code, unique across all tables.
    pub code: &'static str,
    pub description: &'static str,
    /// Whether a blind retry is expected to succeed.
    pub recoverable: bool,
    /// Suggested wait before retrying. Always 0 when not recoverable.
    pub retry_after_ms: u64,
}

impl TaxonomyEntry {
    /// A condition worth retrying after `retry_after_ms`.
    pub const fn retry(code: &'static str, description: &'static str, retry_after_ms: u64) -> Self {
        Self {
            code,
            description,
            recoverable: true,
            retry_after_ms,
        }
    }

    /// A condition retrying will not fix.
    pub const fn fatal(code: &'static str, description: &'static str) -> Self {
        Self {
            code,
            description,
            recoverable: false,
            retry_after_ms: 0,
        }
    }
}

/// How a free-text rule is matched against an error's message and name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternMatcher {
    /// Case-sensitive substring containment.
    Literal(&'static str),
    /// Regular expression source, compiled when the tables are assembled.
    Regex(&'static str),
}

/// A free-text rule pointing at a canonical code defined in one of the tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternSpec {
    pub matcher: PatternMatcher,
    pub code: &'static str,
}

impl PatternSpec {
    pub const fn literal(needle: &'static str, code: &'static str) -> Self {
        Self {
            matcher: PatternMatcher::Literal(needle),
            code,
        }
    }

    pub const fn regex(source: &'static str, code: &'static str) -> Self {
        Self {
            matcher: PatternMatcher::Regex(source),
            code,
        }
    }
}

#[derive(Debug, Clone)]
enum CompiledMatcher {
    Literal(&'static str),
    Regex(Regex),
}

#[derive(Debug, Clone)]
struct PatternRule {
    matcher: CompiledMatcher,
    entry: TaxonomyEntry,
}

impl PatternRule {
    fn matches(&self, haystack: &str) -> bool {
        match &self.matcher {
            CompiledMatcher::Literal(needle) => haystack.contains(needle),
            CompiledMatcher::Regex(re) => re.is_match(haystack),
        }
    }
}

/// Problems detected while assembling a custom table set.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaxonomyError {
    #[error("canonical code {0} is defined more than once")]
    DuplicateCode(String),

    #[error("{table} table lists key {key} more than once")]
    DuplicateKey { table: &'static str, key: i64 },

    #[error("pattern rule points at unknown code {0}")]
    UnknownPatternCode(String),

    #[error("pattern {source_text:?} does not compile: {reason}")]
    InvalidPattern { source_text: String, reason: String },
}

/// Immutable lookup tables owned by a diagnosis engine.
///
/// Build the stock set with [`TaxonomyTables::builtin`], or substitute
/// platform-specific tables through [`TaxonomyTables::builder`].
#[derive(Debug, Clone)]
pub struct TaxonomyTables {
    transport: HashMap<i64, TaxonomyEntry>,
    tls: HashMap<i64, TaxonomyEntry>,
    socket: HashMap<i64, TaxonomyEntry>,
    http_status: HashMap<u16, TaxonomyEntry>,
    by_code: HashMap<&'static str, TaxonomyEntry>,
    patterns: Vec<PatternRule>,
}

impl TaxonomyTables {
    /// The built-in table set.
    pub fn builtin() -> Self {
        TaxonomyBuilder::builtin().assemble()
    }

    /// Starts an empty builder.
    pub fn builder() -> TaxonomyBuilder {
        TaxonomyBuilder::default()
    }

    pub fn transport(&self, code: i64) -> Option<&TaxonomyEntry> {
        self.transport.get(&code)
    }

    pub fn tls(&self, code: i64) -> Option<&TaxonomyEntry> {
        self.tls.get(&code)
    }

    pub fn socket(&self, code: i64) -> Option<&TaxonomyEntry> {
        self.socket.get(&code)
    }

    pub fn http_status(&self, status: u16) -> Option<&TaxonomyEntry> {
        self.http_status.get(&status)
    }

    /// Resolves a native numeric code: transport, then TLS, then socket.
    pub fn native(&self, code: i64) -> Option<&TaxonomyEntry> {
        self.transport(code)
            .or_else(|| self.tls(code))
            .or_else(|| self.socket(code))
    }

    /// Looks an entry up by canonical code, across every table.
    pub fn by_code(&self, code: &str) -> Option<&TaxonomyEntry> {
        self.by_code.get(code)
    }

    /// Walks the pattern list top to bottom against `message`, then `name`.
    /// First matching rule wins.
    pub fn match_text(&self, message: &str, name: Option<&str>) -> Option<&TaxonomyEntry> {
        self.patterns
            .iter()
            .find(|rule| rule.matches(message) || name.is_some_and(|n| rule.matches(n)))
            .map(|rule| &rule.entry)
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}

impl Default for TaxonomyTables {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Assembles a [`TaxonomyTables`] from raw slices.
#[derive(Debug, Clone, Default)]
pub struct TaxonomyBuilder {
    transport: Vec<(i64, TaxonomyEntry)>,
    tls: Vec<(i64, TaxonomyEntry)>,
    socket: Vec<(i64, TaxonomyEntry)>,
    http_status: Vec<(u16, TaxonomyEntry)>,
    messages: Vec<TaxonomyEntry>,
    patterns: Vec<PatternSpec>,
}

impl TaxonomyBuilder {
    /// A builder preloaded with the built-in tables.
    pub fn builtin() -> Self {
        Self::default()
            .transport(TRANSPORT_CODES)
            .tls(TLS_CODES)
            .socket(SOCKET_CODES)
            .http_status(HTTP_STATUS_CODES)
            .messages(MESSAGE_ENTRIES)
            .patterns(PATTERN_RULES)
    }

    pub fn transport(mut self, entries: &[(i64, TaxonomyEntry)]) -> Self {
        self.transport = entries.to_vec();
        self
    }

    pub fn tls(mut self, entries: &[(i64, TaxonomyEntry)]) -> Self {
        self.tls = entries.to_vec();
        self
    }

    pub fn socket(mut self, entries: &[(i64, TaxonomyEntry)]) -> Self {
        self.socket = entries.to_vec();
        self
    }

    pub fn http_status(mut self, entries: &[(u16, TaxonomyEntry)]) -> Self {
        self.http_status = entries.to_vec();
        self
    }

    pub fn messages(mut self, entries: &[TaxonomyEntry]) -> Self {
        self.messages = entries.to_vec();
        self
    }

    pub fn patterns(mut self, rules: &[PatternSpec]) -> Self {
        self.patterns = rules.to_vec();
        self
    }

    /// Checks the invariants and builds the tables.
    ///
    /// Canonical codes must be unique across every table, keys must be unique
    /// within a table, and every pattern must compile and point at a known code.
    pub fn build(self) -> Result<TaxonomyTables, TaxonomyError> {
        self.validate()?;
        Ok(self.assemble())
    }

    fn validate(&self) -> Result<(), TaxonomyError> {
        let numeric = [
            ("transport", &self.transport),
            ("tls", &self.tls),
            ("socket", &self.socket),
        ];
        for (table, entries) in numeric {
            let mut keys = HashSet::new();
            for (key, _) in entries.iter() {
                if !keys.insert(*key) {
                    return Err(TaxonomyError::DuplicateKey { table, key: *key });
                }
            }
        }
        let mut statuses = HashSet::new();
        for (status, _) in &self.http_status {
            if !statuses.insert(*status) {
                return Err(TaxonomyError::DuplicateKey {
                    table: "http_status",
                    key: i64::from(*status),
                });
            }
        }

        let mut seen = HashSet::new();
        for entry in self.all_entries() {
            if !seen.insert(entry.code) {
                return Err(TaxonomyError::DuplicateCode(entry.code.to_string()));
            }
        }

        for rule in &self.patterns {
            if !seen.contains(rule.code) {
                return Err(TaxonomyError::UnknownPatternCode(rule.code.to_string()));
            }
            if let PatternMatcher::Regex(source) = rule.matcher {
                Regex::new(source).map_err(|err| TaxonomyError::InvalidPattern {
                    source_text: source.to_string(),
                    reason: err.to_string(),
                })?;
            }
        }
        Ok(())
    }

    fn all_entries(&self) -> impl Iterator<Item = &TaxonomyEntry> {
        self.transport
            .iter()
            .chain(&self.tls)
            .chain(&self.socket)
            .map(|(_, entry)| entry)
            .chain(self.http_status.iter().map(|(_, entry)| entry))
            .chain(&self.messages)
    }

    fn assemble(self) -> TaxonomyTables {
        let by_code: HashMap<&'static str, TaxonomyEntry> = self
            .all_entries()
            .map(|entry| (entry.code, *entry))
            .collect();

        let patterns = self
            .patterns
            .iter()
            .filter_map(|spec| {
                let Some(entry) = by_code.get(spec.code) else {
                    tracing::error!(
                        code = spec.code,
                        "pattern rule points at unknown code, skipping"
                    );
                    return None;
                };
                let matcher = match spec.matcher {
                    PatternMatcher::Literal(needle) => CompiledMatcher::Literal(needle),
                    PatternMatcher::Regex(source) => match Regex::new(source) {
                        Ok(re) => CompiledMatcher::Regex(re),
                        Err(err) => {
                            tracing::error!(pattern = source, "invalid pattern, skipping: {err}");
                            return None;
                        }
                    },
                };
                Some(PatternRule {
                    matcher,
                    entry: *entry,
                })
            })
            .collect();

        TaxonomyTables {
            transport: self.transport.into_iter().collect(),
            tls: self.tls.into_iter().collect(),
            socket: self.socket.into_iter().collect(),
            http_status: self.http_status.into_iter().collect(),
            by_code,
            patterns,
        }
    }
}
