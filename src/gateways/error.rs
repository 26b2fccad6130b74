//! Gateway error types.
//!
//! Distinguishes transient from permanent gateway failures:
//!
//! - **Transient**: timeouts, connection errors, 5xx, 429. A timeout is
//!   transient but also ambiguous: the caller cannot know whether the remote
//!   side effect committed.
//! - **Permanent**: most 4xx (auth failures, malformed requests) and
//!   malformed responses.
//!
//! The orchestrator does not retry either kind (delivery is fire-and-forget
//! per request); the categorization feeds the partial-failure log so manual
//! remediation knows what it is looking at.

use std::fmt;

use thiserror::Error;

/// The kind of gateway error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    /// Timeout, connection failure, 5xx, or rate limiting. The remote side
    /// effect may or may not have committed.
    Transient,

    /// The request was rejected outright; the side effect did not happen.
    Permanent,
}

/// An error from a forum or spreadsheet gateway call.
#[derive(Debug, Error)]
pub struct GatewayError {
    /// Transient or permanent.
    pub kind: GatewayErrorKind,

    /// The HTTP status code, if the request got far enough to have one.
    pub status_code: Option<u16>,

    /// A human-readable description.
    pub message: String,

    /// The underlying client error, if any.
    #[source]
    pub source: Option<reqwest::Error>,
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "gateway error (HTTP {}): {}", code, self.message),
            None => write!(f, "gateway error: {}", self.message),
        }
    }
}

impl GatewayError {
    /// Categorizes a reqwest error (request never produced a response, or
    /// body handling failed).
    pub fn from_reqwest(message: impl Into<String>, err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() || err.is_connect() {
            GatewayErrorKind::Transient
        } else {
            match err.status() {
                Some(status) => kind_for_status(status.as_u16()),
                None => GatewayErrorKind::Permanent,
            }
        };
        GatewayError {
            kind,
            status_code: err.status().map(|s| s.as_u16()),
            message: message.into(),
            source: Some(err),
        }
    }

    /// Builds an error for a non-success HTTP response.
    pub fn from_status(message: impl Into<String>, status: u16) -> Self {
        GatewayError {
            kind: kind_for_status(status),
            status_code: Some(status),
            message: message.into(),
            source: None,
        }
    }

    /// A permanent error with no HTTP status (e.g., a malformed response body).
    pub fn malformed(message: impl Into<String>) -> Self {
        GatewayError {
            kind: GatewayErrorKind::Permanent,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    /// A transient error with no HTTP status (used by test doubles).
    pub fn transient(message: impl Into<String>) -> Self {
        GatewayError {
            kind: GatewayErrorKind::Transient,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }
}

fn kind_for_status(status: u16) -> GatewayErrorKind {
    match status {
        429 => GatewayErrorKind::Transient,
        s if (500..600).contains(&s) => GatewayErrorKind::Transient,
        _ => GatewayErrorKind::Permanent,
    }
}
