//! HTTP status codes for completed exchanges that still signal failure.
//!
//! Statuses missing here fall back to `CLIENT_<status>`, `SERVER_<status>`
//! or `UNEXPECTED_<status>` in the engine.

use super::TaxonomyEntry;

pub const HTTP_STATUS_CODES: &[(u16, TaxonomyEntry)] = &[
    (400, TaxonomyEntry::fatal("HTTP_BAD_REQUEST", "The server rejected the request as malformed")),
    (401, TaxonomyEntry::fatal("HTTP_UNAUTHORIZED", "The session is missing or has expired")),
    (403, TaxonomyEntry::fatal("HTTP_FORBIDDEN", "Access to this resource is forbidden")),
    (404, TaxonomyEntry::fatal("HTTP_NOT_FOUND", "The requested resource was not found")),
    (405, TaxonomyEntry::fatal("HTTP_METHOD_NOT_ALLOWED", "The request method is not allowed")),
    (406, TaxonomyEntry::fatal("HTTP_NOT_ACCEPTABLE", "No acceptable response representation")),
    (
        408,
        TaxonomyEntry::retry(
            "HTTP_REQUEST_TIMEOUT",
            "The server timed out waiting for the request",
            2_000,
        ),
    ),
    (409, TaxonomyEntry::fatal("HTTP_CONFLICT", "The request conflicts with the current state")),
    (410, TaxonomyEntry::fatal("HTTP_GONE", "The resource is no longer available")),
    (413, TaxonomyEntry::fatal("HTTP_PAYLOAD_TOO_LARGE", "The request body is too large")),
    (
        415,
        TaxonomyEntry::fatal(
            "HTTP_UNSUPPORTED_MEDIA_TYPE",
            "The request content type is not supported",
        ),
    ),
    (422, TaxonomyEntry::fatal("HTTP_UNPROCESSABLE_ENTITY", "The request failed validation")),
    (
        425,
        TaxonomyEntry::retry(
            "HTTP_TOO_EARLY",
            "The server is unwilling to process a replayed request",
            1_000,
        ),
    ),
    (429, TaxonomyEntry::retry("HTTP_RATE_LIMITED", "Too many requests, slow down", 5_000)),
    (
        500,
        TaxonomyEntry::retry(
            "HTTP_INTERNAL_SERVER_ERROR",
            "The server encountered an internal error",
            2_000,
        ),
    ),
    (
        501,
        TaxonomyEntry::fatal("HTTP_NOT_IMPLEMENTED", "The server does not support this operation"),
    ),
    (
        502,
        TaxonomyEntry::retry(
            "HTTP_BAD_GATEWAY",
            "An upstream server returned an invalid response",
            3_000,
        ),
    ),
    (
        503,
        TaxonomyEntry::retry(
            "HTTP_SERVICE_UNAVAILABLE",
            "The service is temporarily unavailable",
            5_000,
        ),
    ),
    (504, TaxonomyEntry::retry("HTTP_GATEWAY_TIMEOUT", "An upstream server timed out", 5_000)),
    (507, TaxonomyEntry::fatal("HTTP_INSUFFICIENT_STORAGE", "The server is out of storage")),
    (
        520,
        TaxonomyEntry::retry(
            "HTTP_ORIGIN_UNKNOWN_ERROR",
            "The origin returned an unknown error",
            3_000,
        ),
    ),
    (521, TaxonomyEntry::retry("HTTP_ORIGIN_DOWN", "The origin server is down", 5_000)),
    (
        522,
        TaxonomyEntry::retry(
            "HTTP_ORIGIN_CONNECT_TIMEOUT",
            "Connecting to the origin timed out",
            5_000,
        ),
    ),
    (523, TaxonomyEntry::retry("HTTP_ORIGIN_UNREACHABLE", "The origin is unreachable", 5_000)),
    (524, TaxonomyEntry::retry("HTTP_ORIGIN_TIMEOUT", "The origin did not respond in time", 5_000)),
    (
        525,
        TaxonomyEntry::fatal(
            "HTTP_ORIGIN_TLS_HANDSHAKE_FAILED",
            "The TLS handshake with the origin failed",
        ),
    ),
    (
        526,
        TaxonomyEntry::fatal(
            "HTTP_ORIGIN_INVALID_CERT",
            "The origin presented an invalid certificate",
        ),
    ),
];
