//! Error types for the download module.
//!
//! [`TransportError`] describes a single failed exchange with a server.
//! [`FetchError`] is what the retrying fetcher gives up with.

use thiserror::Error;

/// Category of a transport-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The request or body read exceeded the client timeout.
    Timeout,
    /// DNS resolution, connection refused/reset, TLS handshake.
    Connect,
    /// The response body could not be read to completion.
    Body,
    /// The request could not be built, e.g. a relative or unparsable URL.
    /// Never retried.
    InvalidRequest,
    /// Anything else reported by the HTTP stack.
    Other,
}

impl TransportErrorKind {
    /// Returns the stable lowercase label for this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::Body => "body",
            Self::InvalidRequest => "invalid_request",
            Self::Other => "other",
        }
    }
}

/// A request that never produced an HTTP status (or whose body was lost).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} error requesting {url}: {message}", kind.as_str())]
pub struct TransportError {
    /// The URL being requested.
    pub url: String,
    /// What went wrong at the transport level.
    pub kind: TransportErrorKind,
    /// Human-readable detail from the HTTP stack.
    pub message: String,
}

impl TransportError {
    /// Creates a transport error.
    pub fn new(url: impl Into<String>, kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind,
            message: message.into(),
        }
    }

    /// Creates a transport error from a reqwest error, classifying its kind.
    pub fn from_reqwest(url: impl Into<String>, source: &reqwest::Error) -> Self {
        let kind = if source.is_builder() {
            TransportErrorKind::InvalidRequest
        } else if source.is_timeout() {
            TransportErrorKind::Timeout
        } else if source.is_connect() {
            TransportErrorKind::Connect
        } else if source.is_body() || source.is_decode() {
            TransportErrorKind::Body
        } else {
            TransportErrorKind::Other
        };
        Self::new(url, kind, source.to_string())
    }
}

/// Errors returned by [`fetch_with_retry`](super::fetch_with_retry).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The server answered with a non-2xx, non-429 status. Never retried.
    #[error("HTTP {status} requesting {url}")]
    Http {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The request could not be sent at all. Never retried.
    #[error("cannot request {url}")]
    InvalidRequest {
        /// The URL that could not be requested.
        url: String,
        /// Why the request could not be built.
        #[source]
        source: TransportError,
    },

    /// Every attempt was rate limited or failed at the transport level.
    ///
    /// When the last attempt failed at the transport level, that error is
    /// kept as the source.
    #[error("giving up on {url} after {attempts} attempt(s)")]
    MaxRetriesExceeded {
        /// The URL being requested.
        url: String,
        /// Number of attempts made.
        attempts: u32,
        /// The error from the final attempt, if it was a transport failure.
        #[source]
        last_error: Option<TransportError>,
    },
}

impl FetchError {
    /// Creates an HTTP status error.
    pub fn http(url: impl Into<String>, status: u16) -> Self {
        Self::Http {
            url: url.into(),
            status,
        }
    }

    /// Creates a retries-exhausted error.
    pub fn max_retries(
        url: impl Into<String>,
        attempts: u32,
        last_error: Option<TransportError>,
    ) -> Self {
        Self::MaxRetriesExceeded {
            url: url.into(),
            attempts,
            last_error,
        }
    }

    /// Creates an error for a request that could not be built.
    pub fn invalid_request(source: TransportError) -> Self {
        Self::InvalidRequest {
            url: source.url.clone(),
            source,
        }
    }

    /// Returns the HTTP status for [`FetchError::Http`].
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::InvalidRequest { .. } | Self::MaxRetriesExceeded { .. } => None,
        }
    }
}
