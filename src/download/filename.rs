//! File name construction, sanitization, and unique path resolution.

use std::path::{Path, PathBuf};

/// Characters rejected by at least one common filesystem.
const ILLEGAL_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Extension used for every saved video.
pub const VIDEO_EXTENSION: &str = ".mp4";

/// Titles are cut to this many characters. At four bytes per char the name
/// stays under the common 255-byte limit even with a `_N` suffix.
pub const MAX_TITLE_CHARS: usize = 60;

/// Builds the file name for a downloaded video.
///
/// Uses the metadata title (cut to [`MAX_TITLE_CHARS`] characters) when
/// present and non-blank, else `video_<id>`, then appends `.mp4` and
/// sanitizes the result.
///
/// ```
/// use vidfetch_core::download::filename::video_file_name;
///
/// assert_eq!(video_file_name(Some("a/b:c*d"), "abc123"), "a_b_c_d.mp4");
/// assert_eq!(video_file_name(None, "abc123"), "video_abc123.mp4");
/// ```
#[must_use]
pub fn video_file_name(title: Option<&str>, video_id: &str) -> String {
    let stem = match title.map(str::trim) {
        Some(title) if !title.is_empty() => {
            let truncated: String = title.chars().take(MAX_TITLE_CHARS).collect();
            truncated.trim_end().to_string()
        }
        _ => format!("video_{video_id}"),
    };
    sanitize_filename(&format!("{stem}{VIDEO_EXTENSION}"))
}

/// Replaces each of `< > : " / \ | ? *` with `_`.
///
/// No other normalization is performed.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if ILLEGAL_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Resolves a path in `dir` that does not exist yet.
///
/// `file.mp4` is tried first, then `file_1.mp4`, `file_2.mp4`, ...
pub(crate) fn resolve_unique_path(dir: &Path, filename: &str) -> PathBuf {
    // `.` and `..` survive sanitization but must never become a path component.
    let filename = if filename.trim_matches('.').is_empty() {
        format!("video{VIDEO_EXTENSION}")
    } else {
        filename.to_string()
    };
    let base_path = dir.join(&filename);

    if !base_path.exists() {
        return base_path;
    }

    let (stem, ext) = match filename.rfind('.') {
        Some(pos) if pos > 0 => (&filename[..pos], &filename[pos..]),
        _ => (filename.as_str(), ""),
    };

    for i in 1..1000 {
        let candidate = dir.join(format!("{stem}_{i}{ext}"));
        if !candidate.exists() {
            return candidate;
        }
    }

    // Fallback (extremely unlikely)
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    dir.join(format!("{stem}_{timestamp}{ext}"))
}
