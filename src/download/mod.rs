//! Network fetching, file naming and persistence for video downloads.
//!
//! # Features
//!
//! - A single [`Transport`] seam so retry behavior can be tested without sockets
//! - Bounded retry: exponential backoff on HTTP 429, linear backoff on
//!   transport errors, immediate failure on any other error status
//! - File name sanitization for cross-platform filesystems
//! - A [`PersistenceSink`] seam with a never-overwrite filesystem implementation
//!
//! # Example
//!
//! ```no_run
//! use vidfetch_core::download::{FetchRequest, HttpTransport, RetryPolicy, fetch_with_retry};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = HttpTransport::new();
//! let request = FetchRequest::get("https://example.com/video.mp4")
//!     .header("Accept", "video/mp4,video/*");
//! let response = fetch_with_retry(&transport, &request, &RetryPolicy::default()).await?;
//! println!("received {} bytes", response.body.len());
//! # Ok(())
//! # }
//! ```

pub mod constants;
mod error;
pub mod filename;
mod persistence;
mod retry;
mod transport;

pub use error::{FetchError, TransportError, TransportErrorKind};
pub use persistence::{FileSystemSink, PersistedFile, PersistenceError, PersistenceSink};
pub use retry::{
    DEFAULT_MAX_ATTEMPTS, FailureType, RetryDecision, RetryPolicy, classify_status,
    fetch_with_retry,
};
pub use transport::{FetchRequest, FetchResponse, HttpTransport, Transport};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, FetchError>` explicitly in function signatures.
