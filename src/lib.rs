//! vidfetch Core Library
//!
//! Resolves YouTube and Instagram page URLs to video identifiers, looks up
//! downloadable formats through an external metadata service, and fetches
//! and persists the chosen video with bounded retry.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`resolver`] - Page URL to video identifier
//! - [`download`] - Retrying fetcher, transport seam, file naming, persistence
//! - [`lookup`] - Metadata lookup client
//! - [`format`] - Quality preference and format selection
//! - [`progress`] - Push-based progress events
//! - [`orchestrator`] - The end-to-end `download_video` operation
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vidfetch_core::{Downloader, FileSystemSink, HttpTransport};
//!
//! # async fn example() {
//! let downloader = Downloader::new(
//!     Arc::new(HttpTransport::new()),
//!     Arc::new(FileSystemSink::new("downloads")),
//! );
//! let outcome = downloader
//!     .download_video("https://youtu.be/dQw4w9WgXcQ", "720")
//!     .await;
//! println!("{}", outcome.message);
//! # }
//! ```

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
pub mod format;
pub mod lookup;
pub mod orchestrator;
pub mod progress;
pub mod resolver;
mod user_agent;

// Re-export commonly used types
pub use download::{
    DEFAULT_MAX_ATTEMPTS, FetchError, FetchRequest, FetchResponse, FileSystemSink, HttpTransport,
    PersistedFile, PersistenceError, PersistenceSink, RetryPolicy, Transport, TransportError,
    fetch_with_retry,
};
pub use format::{FormatCandidate, InvalidQuality, QualityPreference, select_format};
pub use lookup::{LookupClient, LookupError, VideoMetadata};
pub use orchestrator::{DownloadError, DownloadOutcome, Downloader, VideoInfo};
pub use progress::{CallbackProgress, ChannelProgress, NoopProgress, ProgressEvent, ProgressSink};
pub use resolver::{ResolveError, VideoHost, VideoReference, resolve};
