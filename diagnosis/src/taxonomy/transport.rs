//! Native transport-layer codes (URL-loading system error domain).
//!
//! Negative integers reported by the platform's URL loading stack when a
//! request never produced an HTTP response.

use super::TaxonomyEntry;

pub const TRANSPORT_CODES: &[(i64, TaxonomyEntry)] = &[
    (
        -1,
        TaxonomyEntry::retry("TRANSPORT_UNKNOWN", "Unknown transport failure", 1_000),
    ),
    (
        -997,
        TaxonomyEntry::retry(
            "BACKGROUND_SESSION_LOST",
            "The background transfer session was disconnected",
            2_000,
        ),
    ),
    (
        -999,
        TaxonomyEntry::fatal("REQUEST_CANCELLED", "The request was cancelled before it completed"),
    ),
    (
        -1000,
        TaxonomyEntry::fatal("BAD_URL", "The request URL is malformed"),
    ),
    (
        -1001,
        TaxonomyEntry::retry("TIMEOUT", "The request timed out", 2_000),
    ),
    (
        -1002,
        TaxonomyEntry::fatal("UNSUPPORTED_URL", "The URL scheme is not supported"),
    ),
    (
        -1003,
        TaxonomyEntry::retry("DNS_FAILED", "The server hostname could not be resolved", 3_000),
    ),
    (
        -1004,
        TaxonomyEntry::retry("CANNOT_CONNECT", "Could not connect to the server", 2_000),
    ),
    (
        -1005,
        TaxonomyEntry::retry(
            "CONNECTION_LOST",
            "The network connection was lost mid-request",
            1_000,
        ),
    ),
    (
        -1006,
        TaxonomyEntry::retry("DNS_LOOKUP_FAILED", "The DNS lookup for the server failed", 3_000),
    ),
    (
        -1007,
        TaxonomyEntry::fatal("TOO_MANY_REDIRECTS", "The server redirected too many times"),
    ),
    (
        -1008,
        TaxonomyEntry::retry(
            "RESOURCE_UNAVAILABLE",
            "The requested resource is unavailable",
            2_000,
        ),
    ),
    (
        -1009,
        TaxonomyEntry::retry("OFFLINE", "The device is not connected to the internet", 5_000),
    ),
    (
        -1010,
        TaxonomyEntry::fatal(
            "REDIRECT_TO_NON_EXISTENT_LOCATION",
            "The server redirected to a location that does not exist",
        ),
    ),
    (
        -1011,
        TaxonomyEntry::retry("BAD_SERVER_RESPONSE", "The server sent an invalid response", 1_000),
    ),
    (
        -1012,
        TaxonomyEntry::fatal("USER_CANCELLED_AUTH", "Authentication was cancelled"),
    ),
    (
        -1013,
        TaxonomyEntry::fatal("USER_AUTH_REQUIRED", "The server requires authentication"),
    ),
    (
        -1014,
        TaxonomyEntry::retry("ZERO_BYTE_RESOURCE", "The server returned an empty resource", 1_000),
    ),
    (
        -1015,
        TaxonomyEntry::fatal("CANNOT_DECODE_RAW_DATA", "The response data could not be decoded"),
    ),
    (
        -1016,
        TaxonomyEntry::fatal(
            "CANNOT_DECODE_CONTENT",
            "The response content encoding could not be decoded",
        ),
    ),
    (
        -1017,
        TaxonomyEntry::fatal("CANNOT_PARSE_RESPONSE", "The response could not be parsed"),
    ),
    (
        -1018,
        TaxonomyEntry::fatal("ROAMING_DISABLED", "Data roaming is disabled"),
    ),
    (
        -1019,
        TaxonomyEntry::retry(
            "CALL_IS_ACTIVE",
            "A phone call is active and the network does not support simultaneous data",
            5_000,
        ),
    ),
    (
        -1020,
        TaxonomyEntry::fatal("DATA_NOT_ALLOWED", "Cellular data is not allowed for this app"),
    ),
    (
        -1021,
        TaxonomyEntry::retry(
            "REQUEST_BODY_STREAM_EXHAUSTED",
            "The request body stream was exhausted",
            1_000,
        ),
    ),
    (
        -1022,
        TaxonomyEntry::fatal(
            "TRANSPORT_SECURITY_BLOCKED",
            "Transport security policy blocked a cleartext connection",
        ),
    ),
    (
        -1100,
        TaxonomyEntry::fatal("FILE_DOES_NOT_EXIST", "The requested file does not exist"),
    ),
    (
        -1103,
        TaxonomyEntry::fatal(
            "DATA_LENGTH_EXCEEDS_MAXIMUM",
            "The resource exceeds the maximum allowed size",
        ),
    ),
    (
        -1200,
        TaxonomyEntry::fatal(
            "SECURE_CONNECTION_FAILED",
            "A secure connection could not be established",
        ),
    ),
    (
        -1201,
        TaxonomyEntry::fatal("CERT_BAD_DATE", "The server certificate has an invalid date"),
    ),
    (
        -1202,
        TaxonomyEntry::fatal("CERT_UNTRUSTED", "The server certificate is not trusted"),
    ),
    (
        -1203,
        TaxonomyEntry::fatal("CERT_UNKNOWN_ROOT", "The server certificate has an unknown root"),
    ),
    (
        -1204,
        TaxonomyEntry::fatal("CERT_NOT_YET_VALID", "The server certificate is not yet valid"),
    ),
    (
        -1205,
        TaxonomyEntry::fatal("CLIENT_CERT_REJECTED", "The server rejected the client certificate"),
    ),
    (
        -1206,
        TaxonomyEntry::fatal("CLIENT_CERT_REQUIRED", "The server requires a client certificate"),
    ),
    (
        -2000,
        TaxonomyEntry::retry(
            "CANNOT_LOAD_FROM_NETWORK",
            "The resource could not be loaded from the network",
            2_000,
        ),
    ),
];
