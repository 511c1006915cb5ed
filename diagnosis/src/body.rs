//! Defensive decoding of response bodies.
//!
//! Nothing here returns an error or panics: every outcome is a
//! [`SafeParseResult`] and callers branch on `ok`.

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::taxonomy::TaxonomyEntry;
use crate::taxonomy::codes;

/// Characters of the offending body kept in `raw_text`.
pub const RAW_PREVIEW_CHARS: usize = 200;
/// Characters of the offending body quoted in the description.
pub const DESCRIPTION_PREVIEW_CHARS: usize = 100;

const DEFAULT_CONTEXT: &str = "RESPONSE";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BodyReadError {
    #[error("response body already consumed")]
    AlreadyConsumed,

    #[error("response body stream is locked")]
    Locked,

    #[error("response body is not valid UTF-8")]
    InvalidUtf8,

    #[error("failed to read response body: {0}")]
    Io(String),
}

impl BodyReadError {
    fn entry(&self) -> TaxonomyEntry {
        match self {
            Self::AlreadyConsumed => codes::BODY_ALREADY_CONSUMED,
            Self::Locked => codes::BODY_STREAM_LOCKED,
            Self::InvalidUtf8 | Self::Io(_) => codes::BODY_READ_FAILED,
        }
    }
}

/// Something that can hand over its body as text, once.
pub trait BodySource {
    fn read_text(&mut self) -> Result<String, BodyReadError>;
}

/// Outcome of [`safe_parse_body`]. `error_code` and `error_desc` are empty
/// when `ok` is true.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafeParseResult<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error_code: String,
    pub error_desc: String,
    /// Leading slice of the body, kept on failure for diagnosis.
    pub raw_text: Option<String>,
}

impl<T> SafeParseResult<T> {
    fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error_code: String::new(),
            error_desc: String::new(),
            raw_text: None,
        }
    }

    fn failure(
        error_code: impl Into<String>,
        error_desc: impl Into<String>,
        raw_text: Option<String>,
    ) -> Self {
        Self {
            ok: false,
            data: None,
            error_code: error_code.into(),
            error_desc: error_desc.into(),
            raw_text,
        }
    }

    /// Converts into a `Result`, keeping the failure as `(code, description)`.
    pub fn into_result(self) -> Result<T, (String, String)> {
        match self.data {
            Some(data) if self.ok => Ok(data),
            _ => Err((self.error_code, self.error_desc)),
        }
    }
}

/// Reads `source` and decodes it as JSON. `context` names the caller
/// (`"login"`, `"profile"`, …) and is folded into the parse-failure code.
pub fn safe_parse_body<T, S>(source: &mut S, context: &str) -> SafeParseResult<T>
where
    T: DeserializeOwned,
    S: BodySource + ?Sized,
{
    match source.read_text() {
        Ok(text) => safe_parse_text(&text, context),
        Err(err) => {
            let entry = err.entry();
            debug!(context, code = entry.code, error = %err, "response body could not be read");
            SafeParseResult::failure(entry.code, format!("{}: {err}", entry.description), None)
        }
    }
}

/// Decodes already-read body text as JSON.
pub fn safe_parse_text<T: DeserializeOwned>(text: &str, context: &str) -> SafeParseResult<T> {
    if text.trim().is_empty() {
        return SafeParseResult::failure(
            codes::EMPTY_RESPONSE.code,
            codes::EMPTY_RESPONSE.description,
            Some(text.to_string()),
        );
    }

    let err = match serde_json::from_str::<T>(text) {
        Ok(data) => return SafeParseResult::success(data),
        Err(err) => err,
    };

    let raw = Some(preview(text, RAW_PREVIEW_CHARS).to_string());
    if text.trim_start().starts_with('<') {
        debug!(context, "markup where structured data was expected");
        return SafeParseResult::failure(
            codes::HTML_RESPONSE.code,
            codes::HTML_RESPONSE.description,
            raw,
        );
    }
    if err.is_eof() {
        debug!(context, error = %err, "response body ended early");
        return SafeParseResult::failure(
            codes::TRUNCATED_RESPONSE.code,
            codes::TRUNCATED_RESPONSE.description,
            raw,
        );
    }

    let code = parse_error_code(context);
    debug!(context, code, error = %err, "response body did not decode");
    SafeParseResult::failure(
        code,
        format!(
            "Could not parse {} response: {err}. Body starts with: {}",
            context_label(context),
            preview(text, DESCRIPTION_PREVIEW_CHARS)
        ),
        raw,
    )
}

/// `login` becomes `LOGIN_PARSE_ERROR`; an empty context yields
/// `RESPONSE_PARSE_ERROR`.
pub fn parse_error_code(context: &str) -> String {
    let normalized: String = context
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    let normalized = normalized.trim_matches('_');
    if normalized.is_empty() {
        format!("{DEFAULT_CONTEXT}_PARSE_ERROR")
    } else {
        format!("{normalized}_PARSE_ERROR")
    }
}

fn context_label(context: &str) -> &str {
    match context.trim() {
        "" => "the",
        trimmed => trimmed,
    }
}

fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

impl BodySource for String {
    fn read_text(&mut self) -> Result<String, BodyReadError> {
        Ok(std::mem::take(self))
    }
}
