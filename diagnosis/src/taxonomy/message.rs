//! Message-only conditions and the ordered free-text rule list.
//!
//! Rules are evaluated top to bottom; the first match wins. Where a message
//! describes a condition that also has a numeric code (DNS, timeouts, resets)
//! the rule points at that table's entry, so the same condition reports the
//! same canonical code whichever signal was seen.

use super::PatternSpec;
use super::TaxonomyEntry;

pub const NETWORK_REQUEST_FAILED: TaxonomyEntry =
    TaxonomyEntry::retry("NETWORK_REQUEST_FAILED", "The network request failed", 1_000);
pub const FETCH_FAILED: TaxonomyEntry =
    TaxonomyEntry::retry("FETCH_FAILED", "The request could not reach the server", 1_000);
pub const LOAD_FAILED: TaxonomyEntry =
    TaxonomyEntry::retry("LOAD_FAILED", "The resource failed to load", 1_000);
pub const CORS_BLOCKED: TaxonomyEntry =
    TaxonomyEntry::fatal("CORS_BLOCKED", "The request was blocked by cross-origin policy");
pub const CSP_BLOCKED: TaxonomyEntry =
    TaxonomyEntry::fatal("CSP_BLOCKED", "The request was blocked by content security policy");
pub const MIXED_CONTENT_BLOCKED: TaxonomyEntry = TaxonomyEntry::fatal(
    "MIXED_CONTENT_BLOCKED",
    "An insecure request from a secure context was blocked",
);
pub const PROXY_FAILED: TaxonomyEntry =
    TaxonomyEntry::retry("PROXY_FAILED", "The proxy could not complete the request", 2_000);
pub const MALFORMED_RESPONSE: TaxonomyEntry = TaxonomyEntry::fatal(
    "MALFORMED_RESPONSE",
    "The server response is not valid structured data",
);
pub const NETWORK_TYPE_ERROR: TaxonomyEntry = TaxonomyEntry::retry(
    "NETWORK_TYPE_ERROR",
    "A generic network error occurred before a response arrived",
    1_000,
);
pub const UNDIAGNOSED: TaxonomyEntry =
    TaxonomyEntry::retry("UNDIAGNOSED", "The failure matched no known condition", 0);

pub const EMPTY_RESPONSE: TaxonomyEntry =
    TaxonomyEntry::retry("EMPTY_RESPONSE", "The server returned an empty response", 1_000);
pub const HTML_RESPONSE: TaxonomyEntry = TaxonomyEntry::retry(
    "HTML_RESPONSE",
    "The server returned a markup page instead of structured data",
    3_000,
);
pub const TRUNCATED_RESPONSE: TaxonomyEntry = TaxonomyEntry::retry(
    "TRUNCATED_RESPONSE",
    "The response was cut off mid-transfer",
    1_000,
);
pub const BODY_ALREADY_CONSUMED: TaxonomyEntry = TaxonomyEntry::fatal(
    "BODY_ALREADY_CONSUMED",
    "The response body was already read",
);
pub const BODY_STREAM_LOCKED: TaxonomyEntry = TaxonomyEntry::fatal(
    "BODY_STREAM_LOCKED",
    "The response body stream is locked by another reader",
);
pub const BODY_READ_FAILED: TaxonomyEntry =
    TaxonomyEntry::retry("BODY_READ_FAILED", "The response body could not be read", 1_000);

pub const MESSAGE_ENTRIES: &[TaxonomyEntry] = &[
    NETWORK_REQUEST_FAILED,
    FETCH_FAILED,
    LOAD_FAILED,
    CORS_BLOCKED,
    CSP_BLOCKED,
    MIXED_CONTENT_BLOCKED,
    PROXY_FAILED,
    MALFORMED_RESPONSE,
    NETWORK_TYPE_ERROR,
    UNDIAGNOSED,
    EMPTY_RESPONSE,
    HTML_RESPONSE,
    TRUNCATED_RESPONSE,
    BODY_ALREADY_CONSUMED,
    BODY_STREAM_LOCKED,
    BODY_READ_FAILED,
];

pub const PATTERN_RULES: &[PatternSpec] = &[
    // Policy rejections first: they often arrive wrapped in a generic message.
    PatternSpec::regex(r"(?i)\bCORS\b|Access-Control-Allow-Origin|cross-origin", "CORS_BLOCKED"),
    PatternSpec::regex(r"(?i)content security policy|\bCSP\b", "CSP_BLOCKED"),
    PatternSpec::regex(r"(?i)mixed content", "MIXED_CONTENT_BLOCKED"),
    PatternSpec::regex(
        r"(?i)app transport security|transport security policy",
        "TRANSPORT_SECURITY_BLOCKED",
    ),
    // TLS / certificates.
    PatternSpec::regex(
        r"(?i)hostname mismatch|NotValidForName|not valid for name",
        "TLS_HOST_NAME_MISMATCH",
    ),
    PatternSpec::regex(
        r"(?i:certificate has expired|certificate expired)|invalid peer certificate: Expired\b",
        "TLS_CERT_EXPIRED",
    ),
    PatternSpec::regex(
        r"(?i)UnknownIssuer|unable to get local issuer|self[- ]signed certificate",
        "TLS_UNKNOWN_ROOT_CERT",
    ),
    PatternSpec::regex(
        r"(?i)invalid peer certificate|certificate verify failed|certificate is not trusted",
        "CERT_UNTRUSTED",
    ),
    PatternSpec::regex(r"(?i)handshake fail", "TLS_PEER_HANDSHAKE_FAILED"),
    PatternSpec::regex(
        r"(?i)\b(?:ssl|tls)[ _](?:error|handshake|alert|connection|routines)|secure connection",
        "SECURE_CONNECTION_FAILED",
    ),
    // Connectivity.
    PatternSpec::regex(
        concat!(
            r"(?i)internet connection appears to be offline|network is offline",
            r"|not connected to the internet",
        ),
        "OFFLINE",
    ),
    PatternSpec::literal("ENOTFOUND", "DNS_FAILED"),
    PatternSpec::literal("EAI_AGAIN", "DNS_FAILED"),
    PatternSpec::regex(
        concat!(
            r"(?i)dns error|failed to lookup address|name or service not known",
            r"|nodename nor servname|could not resolve host|getaddrinfo",
        ),
        "DNS_FAILED",
    ),
    PatternSpec::literal("ECONNREFUSED", "SOCKET_CONNECTION_REFUSED"),
    PatternSpec::regex(r"(?i)connection refused", "SOCKET_CONNECTION_REFUSED"),
    PatternSpec::literal("ECONNRESET", "SOCKET_CONNECTION_RESET"),
    PatternSpec::regex(
        r"(?i)connection reset|connection closed before message completed",
        "SOCKET_CONNECTION_RESET",
    ),
    PatternSpec::regex(r"(?i)connection abort", "SOCKET_CONNECTION_ABORTED"),
    PatternSpec::literal("EPIPE", "SOCKET_BROKEN_PIPE"),
    PatternSpec::regex(r"(?i)broken pipe", "SOCKET_BROKEN_PIPE"),
    PatternSpec::regex(r"(?i)network is unreachable", "SOCKET_NETWORK_UNREACHABLE"),
    PatternSpec::regex(r"(?i)no route to host", "SOCKET_HOST_UNREACHABLE"),
    PatternSpec::literal("ETIMEDOUT", "TIMEOUT"),
    PatternSpec::literal("TimeoutError", "TIMEOUT"),
    PatternSpec::regex(r"(?i)\btimed out\b|\btimeout\b|deadline has elapsed", "TIMEOUT"),
    PatternSpec::literal("AbortError", "REQUEST_CANCELLED"),
    PatternSpec::regex(
        concat!(
            r"(?i)\b(?:request|operation|fetch|user)\b.{0,20}\b(?:aborted|cancell?ed)\b",
            r"|^(?:aborted|cancell?ed)\.?$",
        ),
        "REQUEST_CANCELLED",
    ),
    PatternSpec::regex(r"(?i)too many redirects|redirect loop", "TOO_MANY_REDIRECTS"),
    PatternSpec::regex(
        r"(?i)\bproxy (?:error|connect|authentication|tunnel|refused)|unsuccessful tunnel",
        "PROXY_FAILED",
    ),
    // Generic runtime messages carry no detail; match them after everything specific.
    PatternSpec::literal("Network request failed", "NETWORK_REQUEST_FAILED"),
    PatternSpec::literal("Failed to fetch", "FETCH_FAILED"),
    PatternSpec::literal("NetworkError when attempting to fetch resource", "FETCH_FAILED"),
    PatternSpec::literal("Load failed", "LOAD_FAILED"),
    // Body decoding.
    PatternSpec::regex(
        r"(?i)unexpected end of (input|json|data|file)|EOF while parsing",
        "TRUNCATED_RESPONSE",
    ),
    PatternSpec::regex(
        r"(?i)JSON Parse error|Unexpected token|is not valid JSON|error decoding response body",
        "MALFORMED_RESPONSE",
    ),
];
