//! The sole I/O boundary of the library.
//!
//! [`Transport`] describes what the request engine needs from an HTTP
//! stack: a GET returning status and body text, an optional deadline in
//! asynchronous mode, and distinct connection-failure and timeout
//! notifications. [`HttpTransport`] is the reqwest-backed implementation;
//! tests substitute their own.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Completed round-trip: HTTP status plus raw body text, uninterpreted.
#[derive(Debug, Clone)]
pub struct TransportReply {
    pub status: u16,
    pub body: String,
}

/// Failures reported by the transport itself, before any status or body
/// interpretation happens.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection could not be established or was dropped mid-flight.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request exceeded its deadline (asynchronous mode only; blocking
    /// requests carry no deadline).
    #[error("request timed out")]
    TimedOut,

    /// This transport cannot complete a request synchronously in the
    /// current context.
    #[error("blocking dispatch unsupported: {0}")]
    BlockingUnsupported(String),
}

/// HTTP GET collaborator used by [`crate::WeatherClient`].
///
/// Implementations must deliver exactly one outcome per call: a
/// [`TransportReply`] for any completed round-trip regardless of status, or
/// a [`TransportError`] when no reply was obtained. `get_blocking` must
/// either complete the round-trip before returning or report
/// [`TransportError::BlockingUnsupported`]; it must not hand back control
/// with the request still in flight.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    async fn get(
        &self,
        url: &str,
        timeout: Option<Duration>,
    ) -> Result<TransportReply, TransportError>;

    fn get_blocking(&self, url: &str) -> Result<TransportReply, TransportError>;
}

/// Default transport over reqwest.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(
        &self,
        url: &str,
        timeout: Option<Duration>,
    ) -> Result<TransportReply, TransportError> {
        let mut request = self.client.get(url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_reqwest_error)?;

        Ok(TransportReply { status, body })
    }

    fn get_blocking(&self, url: &str) -> Result<TransportReply, TransportError> {
        // reqwest's blocking client cannot run on an async runtime thread;
        // refuse explicitly instead of letting it panic.
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(TransportError::BlockingUnsupported(
                "called from within an async runtime".to_string(),
            ));
        }

        // Blocking mode is the rare path, so the client is built per call.
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(map_reqwest_error)?;

        let response = client.get(url).send().map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.text().map_err(map_reqwest_error)?;

        Ok(TransportReply { status, body })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::TimedOut
    } else {
        TransportError::Connect(e.to_string())
    }
}
