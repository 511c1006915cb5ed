//! The raw failure values handed to the diagnosis engine.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// String-code prefixes used by native bridges for their own error codes.
pub const BRIDGE_CODE_PREFIXES: &[&str] = &["E_", "ERR_"];

/// A diagnosis already produced by native code. Trusted verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeDiagnostic {
    #[serde(alias = "errorCode")]
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub recoverable: bool,
    #[serde(default, alias = "retryAfterMs")]
    pub retry_after_ms: u64,
    #[serde(default, alias = "underlyingCodes")]
    pub underlying_codes: Vec<i64>,
}

/// A failure as thrown by a transport mechanism, before diagnosis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawError {
    /// Native code already diagnosed the failure.
    Structured(NativeDiagnostic),
    /// A bridge-specific string code, possibly wrapping a native numeric code.
    BridgeCoded {
        code: String,
        nested_code: Option<i64>,
        message: String,
        name: Option<String>,
    },
    /// An error whose own code is a plain integer.
    NumericCoded {
        code: i64,
        message: String,
        name: Option<String>,
    },
    /// Only a message (and maybe a class name) is available.
    MessageOnly {
        message: String,
        name: Option<String>,
    },
}

impl RawError {
    pub fn message_only(message: impl Into<String>) -> Self {
        Self::MessageOnly {
            message: message.into(),
            name: None,
        }
    }

    pub fn named(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MessageOnly {
            message: message.into(),
            name: Some(name.into()),
        }
    }

    pub fn numeric(code: i64, message: impl Into<String>) -> Self {
        Self::NumericCoded {
            code,
            message: message.into(),
            name: None,
        }
    }

    pub fn bridge(
        code: impl Into<String>,
        nested_code: Option<i64>,
        message: impl Into<String>,
    ) -> Self {
        Self::BridgeCoded {
            code: code.into(),
            nested_code,
            message: message.into(),
            name: None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Structured(diagnostic) => &diagnostic.description,
            Self::BridgeCoded { message, .. }
            | Self::NumericCoded { message, .. }
            | Self::MessageOnly { message, .. } => message,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Structured(_) => None,
            Self::BridgeCoded { name, .. }
            | Self::NumericCoded { name, .. }
            | Self::MessageOnly { name, .. } => name.as_deref(),
        }
    }

    /// Decodes an untyped error payload as delivered by a native bridge.
    ///
    /// Recognized shapes: `{"diagnostic": {...}}` for a pre-diagnosed error,
    /// `{"code": <int | numeric string>}`, `{"code": "E_...", "nativeCode": n}`
    /// and anything carrying `message` / `name`. A bare string becomes the
    /// message. Never fails; unknown shapes keep their JSON text as message.
    pub fn from_json(value: &Value) -> Self {
        let obj = match value {
            Value::Object(obj) => obj,
            Value::String(message) => return Self::message_only(message.clone()),
            other => return Self::message_only(other.to_string()),
        };

        if let Some(diagnostic) = obj
            .get("diagnostic")
            .and_then(|d| NativeDiagnostic::deserialize(d).ok())
        {
            return Self::Structured(diagnostic);
        }

        let message = obj
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let name = obj.get("name").and_then(Value::as_str).map(str::to_string);

        let code = obj.get("code");
        if let Some(code) = code.and_then(numeric_value) {
            return Self::NumericCoded {
                code,
                message,
                name,
            };
        }

        match code {
            Some(Value::String(code)) if is_bridge_code(code) => Self::BridgeCoded {
                code: code.clone(),
                nested_code: ["nativeCode", "underlyingCode"]
                    .iter()
                    .find_map(|key| obj.get(*key).and_then(numeric_value)),
                message,
                name,
            },
            Some(Value::String(code)) => {
                // Runtime codes such as ECONNREFUSED are kept in the message
                // so the free-text rules can see them.
                let message = if message.is_empty() {
                    code.clone()
                } else {
                    format!("{message} ({code})")
                };
                Self::MessageOnly { message, name }
            }
            _ if message.is_empty() && name.is_none() => Self::message_only(value.to_string()),
            _ => Self::MessageOnly { message, name },
        }
    }
}

impl fmt::Display for RawError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structured(d) => write!(f, "{}: {}", d.code, d.description),
            Self::BridgeCoded {
                code,
                nested_code: Some(nested),
                message,
                ..
            } => write!(f, "{code} (native {nested}): {message}"),
            Self::BridgeCoded { code, message, .. } => write!(f, "{code}: {message}"),
            Self::NumericCoded {
                code,
                message,
                name,
            } => match name {
                Some(name) => write!(f, "{name} {code}: {message}"),
                None => write!(f, "{code}: {message}"),
            },
            Self::MessageOnly {
                message,
                name: Some(name),
            } => write!(f, "{name}: {message}"),
            Self::MessageOnly { message, .. } => f.write_str(message),
        }
    }
}

/// Whether `code` uses one of the native bridge prefixes.
pub fn is_bridge_code(code: &str) -> bool {
    BRIDGE_CODE_PREFIXES
        .iter()
        .any(|prefix| code.len() > prefix.len() && code.starts_with(prefix))
}

fn numeric_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
