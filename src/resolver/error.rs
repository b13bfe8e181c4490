//! Error types for video URL resolution.
//!
//! Messages follow the What/Why/Fix layout used across the project so they
//! can be surfaced to users unchanged.

use thiserror::Error;

/// Errors that can occur while mapping a page URL to a video identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The input could not be parsed as a URL, or uses a non-HTTP scheme.
    #[error("malformed URL '{url}': {reason}\n  Suggestion: {suggestion}")]
    MalformedUrl {
        /// The raw input.
        url: String,
        /// Why parsing failed.
        reason: String,
        /// How to fix the issue.
        suggestion: String,
    },

    /// The URL parsed but no known host/path shape matched.
    #[error("unsupported URL '{url}': {reason}\n  Suggestion: {suggestion}")]
    UnsupportedUrlKind {
        /// The raw input.
        url: String,
        /// Which part of the URL was not recognized.
        reason: String,
        /// How to fix the issue.
        suggestion: String,
    },
}

impl ResolveError {
    /// Creates a `MalformedUrl` error.
    #[must_use]
    pub fn malformed(url: &str, reason: &str) -> Self {
        Self::MalformedUrl {
            url: url.to_string(),
            reason: reason.to_string(),
            suggestion: "Pass a full link starting with http:// or https://".to_string(),
        }
    }

    /// Creates an `UnsupportedUrlKind` error.
    #[must_use]
    pub fn unsupported(url: &str, reason: &str) -> Self {
        Self::UnsupportedUrlKind {
            url: url.to_string(),
            reason: reason.to_string(),
            suggestion:
                "Use a YouTube watch/shorts/embed/youtu.be link or an Instagram post/reel/tv link"
                    .to_string(),
        }
    }

    /// Returns the raw input that failed to resolve.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::MalformedUrl { url, .. } | Self::UnsupportedUrlKind { url, .. } => url,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_display_includes_reason_and_suggestion() {
        let error = ResolveError::malformed("not a url", "relative URL without a base");
        let msg = error.to_string();
        assert!(msg.contains("not a url"), "Expected input in: {msg}");
        assert!(msg.contains("relative URL"), "Expected reason in: {msg}");
        assert!(msg.contains("Suggestion:"), "Expected suggestion in: {msg}");
    }

    #[test]
    fn test_unsupported_display_mentions_supported_hosts() {
        let error = ResolveError::unsupported("https://vimeo.com/123", "unrecognized host");
        let msg = error.to_string();
        assert!(msg.contains("vimeo.com"));
        assert!(msg.contains("YouTube"));
        assert!(msg.contains("Instagram"));
    }

    #[test]
    fn test_url_accessor_returns_input() {
        let error = ResolveError::unsupported("https://example.com", "unrecognized host");
        assert_eq!(error.url(), "https://example.com");
    }
}
