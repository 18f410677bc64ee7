//! Routing client error types

use thiserror::Error;

/// Why a single route request failed
///
/// Every variant is row-level: the dispatcher records it against the row and
/// keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RouteFailure {
    /// The daemon rejected the coordinates or query
    #[error("routing daemon rejected the request")]
    InvalidRequest,

    /// The daemon answered but found no route
    #[error("no route between the given points")]
    NoRoute,

    /// Connection refused, reset, or DNS failure
    #[error("routing daemon unreachable")]
    Unreachable,

    /// The per-request timeout elapsed
    #[error("routing request timed out")]
    Timeout,

    /// The job's cancellation signal fired mid-request
    #[error("routing request cancelled")]
    Cancelled,

    /// The daemon's response could not be interpreted
    #[error("malformed routing daemon response")]
    MalformedResponse,
}

impl RouteFailure {
    /// Stable machine-readable reason code
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::NoRoute => "no_route",
            Self::Unreachable => "unreachable",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::MalformedResponse => "malformed_response",
        }
    }
}

/// Errors constructing the client itself
#[derive(Debug, Error)]
pub enum OsrmError {
    /// HTTP client construction failed (TLS or proxy misconfiguration)
    #[error("failed to build routing HTTP client: {0}")]
    Init(String),
}
