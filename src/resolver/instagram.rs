//! Instagram post, reel and IGTV links.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

#[allow(clippy::expect_used)]
static POST_PATH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/(p|reel|tv)/([^/]+)").expect("Instagram path regex is valid") // Static pattern, safe to panic
});

pub(super) fn matches_host(host: &str) -> bool {
    host.contains("instagram.com")
}

pub(super) fn extract_id(url: &Url) -> Option<String> {
    POST_PATH_PATTERN
        .captures(url.path())
        .and_then(|captures| captures.get(2))
        .map(|m| m.as_str().to_string())
}
