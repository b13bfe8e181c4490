//! Integration tests for the resolver module.
//!
//! Exercises `resolve` through the public API with every supported link shape.

use vidfetch_core::resolver::{ResolveError, VideoHost, resolve};

fn resolved_id(url: &str) -> String {
    resolve(url)
        .unwrap_or_else(|e| panic!("{url} should resolve: {e}"))
        .id()
        .to_string()
}

#[test]
fn test_resolve_youtube_shapes() {
    let cases = [
        ("https://youtu.be/abc123", "abc123"),
        ("https://www.youtube.com/watch?v=xyz789", "xyz789"),
        ("https://www.youtube.com/shorts/sh0rt1", "sh0rt1"),
        ("https://www.youtube.com/embed/emb3d_-", "emb3d_-"),
        ("https://www.youtube.com/v/legacy42", "legacy42"),
        ("https://m.youtube.com/watch?feature=share&v=mob1le", "mob1le"),
        ("https://youtube.com/shorts/sh0rt2?si=tracking", "sh0rt2"),
        ("http://youtu.be/plain1?t=30", "plain1"),
    ];

    for (url, expected) in cases {
        let reference = resolve(url).unwrap_or_else(|e| panic!("{url}: {e}"));
        assert_eq!(reference.host(), VideoHost::YouTube, "{url}");
        assert_eq!(reference.id(), expected, "{url}");
        assert_eq!(reference.source_url(), url);
    }
}

#[test]
fn test_resolve_instagram_shapes() {
    let cases = [
        ("https://instagram.com/reel/XYZ/", "XYZ"),
        ("https://www.instagram.com/p/C0ffee123/", "C0ffee123"),
        ("https://www.instagram.com/tv/Tv_Clip-1", "Tv_Clip-1"),
        ("https://www.instagram.com/reel/R3el/?igsh=abc", "R3el"),
    ];

    for (url, expected) in cases {
        let reference = resolve(url).unwrap_or_else(|e| panic!("{url}: {e}"));
        assert_eq!(reference.host(), VideoHost::Instagram, "{url}");
        assert_eq!(reference.id(), expected, "{url}");
    }
}

/// On youtu.be links the `v` query parameter wins over the path segment.
#[test]
fn test_resolve_youtu_be_query_parameter_takes_precedence() {
    assert_eq!(resolved_id("https://youtu.be/pathid?v=queryid"), "queryid");
}

#[test]
fn test_resolve_unknown_host_is_unsupported() {
    let err = resolve("https://vimeo.com/123").unwrap_err();
    assert!(matches!(err, ResolveError::UnsupportedUrlKind { .. }));
    assert_eq!(err.url(), "https://vimeo.com/123");
}

#[test]
fn test_resolve_known_host_without_video_shape_is_unsupported() {
    for url in [
        "https://www.youtube.com/",
        "https://www.youtube.com/channel/UC123",
        "https://youtu.be/",
        "https://www.instagram.com/someuser/",
        "https://www.youtube.com/watch?v=",
    ] {
        let err = resolve(url).unwrap_err();
        assert!(
            matches!(err, ResolveError::UnsupportedUrlKind { .. }),
            "{url} should be unsupported, got {err:?}"
        );
    }
}

#[test]
fn test_resolve_garbage_is_malformed() {
    for input in ["", "not a url", "youtube.com/watch?v=abc"] {
        let err = resolve(input).unwrap_err();
        assert!(
            matches!(err, ResolveError::MalformedUrl { .. }),
            "{input:?} should be malformed, got {err:?}"
        );
    }
}

#[test]
fn test_resolve_error_message_has_suggestion() {
    let err = resolve("https://vimeo.com/123").unwrap_err();
    assert!(err.to_string().contains("Suggestion:"));
}
