//! Video URL resolution.
//!
//! Maps a raw video page URL to a [`VideoReference`]: the host it belongs to
//! and the opaque identifier the metadata lookup service understands.
//!
//! # Recognized shapes
//!
//! - YouTube: `watch?v=<id>`, `youtu.be/<id>`, `/shorts/<id>`, `/embed/<id>`, `/v/<id>`
//! - Instagram: `/p/<id>`, `/reel/<id>`, `/tv/<id>`
//!
//! Matching is ordered and the first match wins. On YouTube hosts the `v`
//! query parameter is checked before any path form, including on `youtu.be`.
//!
//! # Example
//!
//! ```
//! use vidfetch_core::resolver::{VideoHost, resolve};
//!
//! let reference = resolve("https://youtu.be/abc123").unwrap();
//! assert_eq!(reference.host(), VideoHost::YouTube);
//! assert_eq!(reference.id(), "abc123");
//! ```

mod error;
mod instagram;
mod youtube;

pub use error::ResolveError;

use std::fmt;

use tracing::{debug, instrument};
use url::Url;

/// Hosting platform a video reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoHost {
    /// youtube.com and youtu.be
    YouTube,
    /// instagram.com
    Instagram,
}

impl VideoHost {
    /// Returns the stable lowercase label for this host.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::YouTube => "youtube",
            Self::Instagram => "instagram",
        }
    }
}

impl fmt::Display for VideoHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved video: where it came from and how the lookup service names it.
///
/// Only constructed by [`resolve`], so `id` is always non-empty and matches
/// the host's identifier shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoReference {
    source_url: String,
    host: VideoHost,
    id: String,
}

impl VideoReference {
    /// The URL exactly as the caller supplied it.
    #[must_use]
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// The platform the URL belongs to.
    #[must_use]
    pub fn host(&self) -> VideoHost {
        self.host
    }

    /// The video identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Resolves a raw page URL to a [`VideoReference`].
///
/// # Errors
///
/// - [`ResolveError::MalformedUrl`] when `raw_url` does not parse as a URL
/// - [`ResolveError::UnsupportedUrlKind`] when the host is unknown or no
///   path/query shape for that host matches
#[instrument(level = "debug")]
pub fn resolve(raw_url: &str) -> Result<VideoReference, ResolveError> {
    let parsed =
        Url::parse(raw_url).map_err(|e| ResolveError::malformed(raw_url, &e.to_string()))?;

    let Some(host) = parsed.host_str() else {
        return Err(ResolveError::unsupported(raw_url, "URL has no host"));
    };

    let (video_host, id) = if youtube::matches_host(host) {
        (VideoHost::YouTube, youtube::extract_id(&parsed, host))
    } else if instagram::matches_host(host) {
        (VideoHost::Instagram, instagram::extract_id(&parsed))
    } else {
        return Err(ResolveError::unsupported(
            raw_url,
            &format!("unrecognized host '{host}'"),
        ));
    };

    let Some(id) = id else {
        return Err(ResolveError::unsupported(
            raw_url,
            &format!("no known {video_host} link pattern matched"),
        ));
    };

    if !is_identifier_shape(&id) {
        return Err(ResolveError::unsupported(
            raw_url,
            &format!("'{id}' is not a valid {video_host} video id"),
        ));
    }

    debug!(host = %video_host, id = %id, "resolved video reference");

    Ok(VideoReference {
        source_url: raw_url.to_string(),
        host: video_host,
        id,
    })
}

/// Both platforms use URL-safe base64-style tokens.
fn is_identifier_shape(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Returns the segment immediately following `marker` in `path`, up to the next `/`.
fn segment_after<'a>(path: &'a str, marker: &str) -> Option<&'a str> {
    let (_, rest) = path.split_once(marker)?;
    rest.split('/').next()
}
