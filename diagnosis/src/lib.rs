//! Canonical diagnosis of network failures.
//!
//! Raw failures from any transport mechanism are mapped through the
//! [`taxonomy`] tables into a [`DiagnosticReport`] by the
//! [`DiagnosisEngine`]. Response bodies are decoded defensively by [`body`].

pub mod body;
mod engine;
mod raw;
mod report;
pub mod taxonomy;

pub use body::BodyReadError;
pub use body::BodySource;
pub use body::SafeParseResult;
pub use body::safe_parse_body;
pub use body::safe_parse_text;
pub use engine::DiagnosisEngine;
pub use engine::GENERIC_NETWORK_ERROR_NAMES;
pub use engine::extract_bare_codes;
pub use engine::extract_embedded_code;
pub use raw::BRIDGE_CODE_PREFIXES;
pub use raw::NativeDiagnostic;
pub use raw::RawError;
pub use raw::is_bridge_code;
pub use report::CHAIN_SEPARATOR;
pub use report::DiagnosisContext;
pub use report::DiagnosticReport;
pub use report::Platform;
pub use report::TierAttemptChain;
pub use taxonomy::TaxonomyEntry;
pub use taxonomy::TaxonomyError;
pub use taxonomy::TaxonomyTables;
