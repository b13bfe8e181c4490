//! Format candidates and quality selection.
//!
//! The metadata lookup returns a list of downloadable variants. Only `mp4`
//! variants are eligible. A [`QualityPreference`] then picks one:
//!
//! - `highest`: the eligible candidate with the largest rank
//! - `N`: the largest rank that is `<= N`, or the first eligible candidate
//!   when every rank is above `N`

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// Container every selected format must use.
pub const PREFERRED_CONTAINER: &str = "mp4";

/// One downloadable variant returned by the metadata lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatCandidate {
    /// Direct media URL.
    pub url: String,
    /// Container label as reported by the lookup (`mp4`, `webm`, ...).
    pub container: String,
    /// Vertical resolution; 0 when the lookup did not report one.
    pub quality_rank: u32,
}

impl FormatCandidate {
    /// Creates a candidate.
    pub fn new(url: impl Into<String>, container: impl Into<String>, quality_rank: u32) -> Self {
        Self {
            url: url.into(),
            container: container.into(),
            quality_rank,
        }
    }

    /// Human-readable quality label such as `720p`.
    #[must_use]
    pub fn quality_label(&self) -> String {
        format!("{}p", self.quality_rank)
    }

    fn is_eligible(&self) -> bool {
        self.container == PREFERRED_CONTAINER
    }
}

/// Requested quality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QualityPreference {
    /// Best available.
    #[default]
    Highest,
    /// Best available at or below this rank.
    AtMost(u32),
}

impl fmt::Display for QualityPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Highest => f.write_str("highest"),
            Self::AtMost(rank) => write!(f, "{rank}"),
        }
    }
}

/// A quality string that is neither `highest` nor a rank.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid quality '{input}'\n  Suggestion: Use 'highest' or a resolution such as 720 or 720p")]
pub struct InvalidQuality {
    /// The rejected input.
    pub input: String,
}

impl FromStr for QualityPreference {
    type Err = InvalidQuality;

    /// Parses `highest`, `720` or `720p` (case-insensitive, surrounding whitespace ignored).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("highest") {
            return Ok(Self::Highest);
        }
        let digits = trimmed
            .strip_suffix('p')
            .or_else(|| trimmed.strip_suffix('P'))
            .unwrap_or(trimmed);
        digits.parse::<u32>().map(Self::AtMost).map_err(|_| InvalidQuality {
            input: s.to_string(),
        })
    }
}

/// Picks a format according to `preference`.
///
/// Returns `None` only when no candidate uses the `mp4` container. Ties on
/// rank resolve to the earliest candidate.
#[must_use]
pub fn select_format(
    candidates: &[FormatCandidate],
    preference: QualityPreference,
) -> Option<&FormatCandidate> {
    let eligible = candidates.iter().filter(|c| c.is_eligible());
    let first = eligible.clone().next()?;

    let best = match preference {
        QualityPreference::Highest => highest_ranked(eligible),
        QualityPreference::AtMost(limit) => {
            highest_ranked(eligible.filter(|c| c.quality_rank <= limit))
        }
    };

    Some(best.unwrap_or(first))
}

fn highest_ranked<'a>(
    candidates: impl Iterator<Item = &'a FormatCandidate>,
) -> Option<&'a FormatCandidate> {
    candidates.fold(None, |best: Option<&FormatCandidate>, c| match best {
        Some(b) if b.quality_rank >= c.quality_rank => Some(b),
        _ => Some(c),
    })
}
