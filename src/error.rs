use thiserror::Error;

use crate::transport::TransportError;

/// Everything the library surfaces to callers, on the failure callback and
/// from the blocking entry points alike.
///
/// The four upstream failure classes (network failure, timeout, failing
/// application code, unparseable body) all arrive here; [`Error::status`]
/// exposes whatever numeric status accompanied the failure. The library
/// never retries and never recovers locally.
#[derive(Debug, Error)]
pub enum Error {
    /// The transport could not complete the round-trip.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Either a non-success HTTP status, or an HTTP success whose body
    /// carried a failing application-level code (the code is the one
    /// reported here when the body provides it).
    #[error("request failed with status {0}")]
    Status(u16),

    /// HTTP succeeded but the body was not parseable JSON.
    #[error("malformed response body (HTTP {status}): {message}")]
    Malformed { status: u16, message: String },

    /// The body parsed as JSON but matched neither known payload shape.
    #[error("unrecognized response shape: {0}")]
    Shape(String),

    /// The endpoint path and parameters did not form a valid URL.
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),

    /// Asynchronous dispatch was requested outside a tokio runtime.
    #[error("asynchronous dispatch requires a running tokio runtime")]
    NoRuntime,

    /// A blocking call returned without the transport delivering any
    /// completion. Indicates a transport that cannot guarantee synchronous
    /// completion; the blocking entry points refuse to return stale or
    /// empty data in that case.
    #[error("transport did not complete synchronously")]
    NoSynchronousCompletion,
}

impl Error {
    /// Numeric status attached to this failure, when one exists.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Status(status) | Error::Malformed { status, .. } => Some(*status),
            _ => None,
        }
    }
}
