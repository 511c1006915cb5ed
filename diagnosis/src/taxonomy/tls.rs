//! TLS status codes (secure-transport result domain, -98xx).
//!
//! Handshake, trust-chain and hostname failures. None of these are fixed by
//! retrying the same request.

use super::TaxonomyEntry;

pub const TLS_CODES: &[(i64, TaxonomyEntry)] = &[
    (-9800, TaxonomyEntry::fatal("TLS_PROTOCOL_ERROR", "TLS protocol error")),
    (
        -9801,
        TaxonomyEntry::fatal("TLS_NEGOTIATION_FAILED", "TLS cipher suite negotiation failed"),
    ),
    (
        -9802,
        TaxonomyEntry::fatal("TLS_FATAL_ALERT", "A fatal TLS alert was received"),
    ),
    (
        -9803,
        TaxonomyEntry::fatal("TLS_WOULD_BLOCK", "The TLS session would block"),
    ),
    (
        -9804,
        TaxonomyEntry::fatal("TLS_SESSION_NOT_FOUND", "The TLS session was not found"),
    ),
    (
        -9805,
        TaxonomyEntry::fatal("TLS_CLOSED_GRACEFUL", "The TLS connection was closed by the peer"),
    ),
    (
        -9806,
        TaxonomyEntry::fatal("TLS_CLOSED_ABORT", "The TLS connection was aborted"),
    ),
    (
        -9807,
        TaxonomyEntry::fatal("TLS_CERT_CHAIN_INVALID", "The certificate chain is invalid"),
    ),
    (
        -9808,
        TaxonomyEntry::fatal("TLS_BAD_CERT", "The server certificate is malformed"),
    ),
    (
        -9809,
        TaxonomyEntry::fatal("TLS_CRYPTO_ERROR", "A TLS cryptographic error occurred"),
    ),
    (
        -9810,
        TaxonomyEntry::fatal("TLS_INTERNAL_ERROR", "An internal TLS error occurred"),
    ),
    (
        -9812,
        TaxonomyEntry::fatal(
            "TLS_UNKNOWN_ROOT_CERT",
            "The certificate chain ends in an unknown root",
        ),
    ),
    (
        -9813,
        TaxonomyEntry::fatal("TLS_NO_ROOT_CERT", "The certificate chain has no root certificate"),
    ),
    (
        -9814,
        TaxonomyEntry::fatal("TLS_CERT_EXPIRED", "The server certificate has expired"),
    ),
    (
        -9815,
        TaxonomyEntry::fatal("TLS_CERT_NOT_YET_VALID", "The server certificate is not valid yet"),
    ),
    (
        -9816,
        TaxonomyEntry::fatal(
            "TLS_CLOSED_NO_NOTIFY",
            "The peer closed the TLS connection without a close notification",
        ),
    ),
    (
        -9817,
        TaxonomyEntry::fatal("TLS_BUFFER_OVERFLOW", "The TLS record buffer overflowed"),
    ),
    (
        -9818,
        TaxonomyEntry::fatal("TLS_BAD_CIPHER_SUITE", "The negotiated cipher suite is unsupported"),
    ),
    (
        -9819,
        TaxonomyEntry::fatal(
            "TLS_PEER_UNEXPECTED_MESSAGE",
            "The peer sent an unexpected TLS message",
        ),
    ),
    (
        -9820,
        TaxonomyEntry::fatal("TLS_PEER_BAD_RECORD_MAC", "The peer reported a bad record MAC"),
    ),
    (
        -9824,
        TaxonomyEntry::fatal("TLS_PEER_HANDSHAKE_FAILED", "The TLS handshake failed"),
    ),
    (
        -9825,
        TaxonomyEntry::fatal("TLS_PEER_BAD_CERT", "The peer rejected the certificate"),
    ),
    (
        -9827,
        TaxonomyEntry::fatal("TLS_PEER_CERT_REVOKED", "The certificate has been revoked"),
    ),
    (
        -9828,
        TaxonomyEntry::fatal("TLS_PEER_CERT_EXPIRED", "The peer reported an expired certificate"),
    ),
    (
        -9829,
        TaxonomyEntry::fatal("TLS_PEER_CERT_UNKNOWN", "The peer reported an unknown certificate"),
    ),
    (
        -9836,
        TaxonomyEntry::fatal(
            "TLS_PEER_PROTOCOL_VERSION",
            "The peer does not support the requested TLS version",
        ),
    ),
    (
        -9843,
        TaxonomyEntry::fatal(
            "TLS_HOST_NAME_MISMATCH",
            "The server certificate does not match the requested host name",
        ),
    ),
    (
        -9844,
        TaxonomyEntry::fatal("TLS_CONNECTION_REFUSED", "The peer refused the TLS connection"),
    ),
    (
        -9845,
        TaxonomyEntry::fatal("TLS_DECRYPTION_FAILED", "TLS record decryption failed"),
    ),
    (
        -9848,
        TaxonomyEntry::fatal("TLS_BAD_CONFIGURATION", "The TLS configuration is invalid"),
    ),
];
