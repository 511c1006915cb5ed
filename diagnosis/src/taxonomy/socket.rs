//! Socket-level OS error codes.
//!
//! Keys are what `std::io::Error::raw_os_error` reports on the target: `libc`
//! errno values on unix, Winsock codes on Windows. Other targets have no
//! socket layer of their own and get an empty table.

#![cfg_attr(not(any(unix, windows)), allow(dead_code))]

use super::TaxonomyEntry;

const CONNECTION_REFUSED: TaxonomyEntry = TaxonomyEntry::retry(
    "SOCKET_CONNECTION_REFUSED",
    "The server refused the connection",
    2_000,
);
const CONNECTION_RESET: TaxonomyEntry = TaxonomyEntry::retry(
    "SOCKET_CONNECTION_RESET",
    "The connection was reset by the peer",
    1_000,
);
const CONNECTION_ABORTED: TaxonomyEntry =
    TaxonomyEntry::retry("SOCKET_CONNECTION_ABORTED", "The connection was aborted", 1_000);
const TIMED_OUT: TaxonomyEntry =
    TaxonomyEntry::retry("SOCKET_TIMED_OUT", "The socket operation timed out", 2_000);
const HOST_UNREACHABLE: TaxonomyEntry =
    TaxonomyEntry::retry("SOCKET_HOST_UNREACHABLE", "No route to the server host", 3_000);
const HOST_DOWN: TaxonomyEntry =
    TaxonomyEntry::retry("SOCKET_HOST_DOWN", "The server host is down", 3_000);
const NETWORK_UNREACHABLE: TaxonomyEntry =
    TaxonomyEntry::retry("SOCKET_NETWORK_UNREACHABLE", "The network is unreachable", 3_000);
const NETWORK_DOWN: TaxonomyEntry =
    TaxonomyEntry::retry("SOCKET_NETWORK_DOWN", "The network is down", 5_000);
const NETWORK_RESET: TaxonomyEntry = TaxonomyEntry::retry(
    "SOCKET_NETWORK_RESET",
    "The network dropped the connection",
    1_000,
);
const BROKEN_PIPE: TaxonomyEntry = TaxonomyEntry::retry(
    "SOCKET_BROKEN_PIPE",
    "The connection closed while writing",
    1_000,
);
const NOT_CONNECTED: TaxonomyEntry =
    TaxonomyEntry::retry("SOCKET_NOT_CONNECTED", "The socket is not connected", 1_000);
const ADDRESS_IN_USE: TaxonomyEntry = TaxonomyEntry::retry(
    "SOCKET_ADDRESS_IN_USE",
    "The local address is already in use",
    1_000,
);
const ADDRESS_UNAVAILABLE: TaxonomyEntry = TaxonomyEntry::fatal(
    "SOCKET_ADDRESS_UNAVAILABLE",
    "The requested address is not available",
);
const PERMISSION_DENIED: TaxonomyEntry = TaxonomyEntry::fatal(
    "SOCKET_PERMISSION_DENIED",
    "Permission to open the socket was denied",
);
#[cfg(unix)]
const OPERATION_NOT_PERMITTED: TaxonomyEntry = TaxonomyEntry::fatal(
    "SOCKET_OPERATION_NOT_PERMITTED",
    "The socket operation is not permitted",
);
const TRY_AGAIN: TaxonomyEntry = TaxonomyEntry::retry(
    "SOCKET_TRY_AGAIN",
    "The socket resource is temporarily unavailable",
    500,
);
const INTERRUPTED: TaxonomyEntry =
    TaxonomyEntry::retry("SOCKET_INTERRUPTED", "The socket call was interrupted", 500);
const TOO_MANY_OPEN_FILES: TaxonomyEntry = TaxonomyEntry::retry(
    "SOCKET_TOO_MANY_OPEN_FILES",
    "Too many open file descriptors",
    2_000,
);
const NO_BUFFER_SPACE: TaxonomyEntry = TaxonomyEntry::retry(
    "SOCKET_NO_BUFFER_SPACE",
    "No socket buffer space available",
    2_000,
);

#[cfg(unix)]
pub const SOCKET_CODES: &[(i64, TaxonomyEntry)] = &[
    (libc::ECONNREFUSED as i64, CONNECTION_REFUSED),
    (libc::ECONNRESET as i64, CONNECTION_RESET),
    (libc::ECONNABORTED as i64, CONNECTION_ABORTED),
    (libc::ETIMEDOUT as i64, TIMED_OUT),
    (libc::EHOSTUNREACH as i64, HOST_UNREACHABLE),
    (libc::EHOSTDOWN as i64, HOST_DOWN),
    (libc::ENETUNREACH as i64, NETWORK_UNREACHABLE),
    (libc::ENETDOWN as i64, NETWORK_DOWN),
    (libc::ENETRESET as i64, NETWORK_RESET),
    (libc::EPIPE as i64, BROKEN_PIPE),
    (libc::ENOTCONN as i64, NOT_CONNECTED),
    (libc::EADDRINUSE as i64, ADDRESS_IN_USE),
    (libc::EADDRNOTAVAIL as i64, ADDRESS_UNAVAILABLE),
    (libc::EACCES as i64, PERMISSION_DENIED),
    (libc::EPERM as i64, OPERATION_NOT_PERMITTED),
    (libc::EAGAIN as i64, TRY_AGAIN),
    (libc::EINTR as i64, INTERRUPTED),
    (libc::EMFILE as i64, TOO_MANY_OPEN_FILES),
    (libc::ENOBUFS as i64, NO_BUFFER_SPACE),
];

// Winsock has no EPERM counterpart; ERROR_BROKEN_PIPE stands in for EPIPE.
#[cfg(windows)]
pub const SOCKET_CODES: &[(i64, TaxonomyEntry)] = &[
    (10061, CONNECTION_REFUSED),
    (10054, CONNECTION_RESET),
    (10053, CONNECTION_ABORTED),
    (10060, TIMED_OUT),
    (10065, HOST_UNREACHABLE),
    (10064, HOST_DOWN),
    (10051, NETWORK_UNREACHABLE),
    (10050, NETWORK_DOWN),
    (10052, NETWORK_RESET),
    (109, BROKEN_PIPE),
    (10057, NOT_CONNECTED),
    (10048, ADDRESS_IN_USE),
    (10049, ADDRESS_UNAVAILABLE),
    (10013, PERMISSION_DENIED),
    (10035, TRY_AGAIN),
    (10004, INTERRUPTED),
    (10024, TOO_MANY_OPEN_FILES),
    (10055, NO_BUFFER_SPACE),
];

#[cfg(not(any(unix, windows)))]
pub const SOCKET_CODES: &[(i64, TaxonomyEntry)] = &[];
