//! YouTube link shapes.

use url::Url;

use super::segment_after;

const SHORT_LINK_HOST: &str = "youtu.be";

/// Path markers tried in order after the query parameter and short-link forms.
const PATH_MARKERS: [&str; 3] = ["/shorts/", "/embed/", "/v/"];

pub(super) fn matches_host(host: &str) -> bool {
    host.contains("youtube.com") || host == SHORT_LINK_HOST
}

/// Extracts the video id from a URL already known to be on a YouTube host.
///
/// Order: `v` query parameter, `youtu.be/<id>`, then each of [`PATH_MARKERS`].
pub(super) fn extract_id(url: &Url, host: &str) -> Option<String> {
    if let Some((_, value)) = url.query_pairs().find(|(key, _)| key == "v") {
        return Some(value.into_owned());
    }

    if host == SHORT_LINK_HOST {
        return url
            .path_segments()
            .and_then(|mut segments| segments.next())
            .map(str::to_string);
    }

    let path = url.path();
    PATH_MARKERS
        .iter()
        .find_map(|marker| segment_after(path, marker))
        .map(str::to_string)
}
