//! Client for the external video-info lookup service.
//!
//! The service is queried as `GET <endpoint>?id=<video id>` with vendor
//! authentication headers and answers with
//! `{ "title"?: string, "link": [{ "type": string, "quality"?: number, "url": string }] }`.
//! An absent or empty `link` list means there is nothing to download.

use std::fmt;

use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::download::{FetchError, FetchRequest, RetryPolicy, Transport, fetch_with_retry};
use crate::format::FormatCandidate;
use crate::resolver::VideoReference;

/// Default lookup endpoint.
pub const DEFAULT_LOOKUP_ENDPOINT: &str = "https://youtube-video-download-info.p.rapidapi.com/dl";

/// Default value for the vendor host header.
pub const DEFAULT_API_HOST: &str = "youtube-video-download-info.p.rapidapi.com";

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "X-RapidAPI-Key";

/// Header carrying the vendor host.
pub const API_HOST_HEADER: &str = "X-RapidAPI-Host";

/// Errors from a metadata lookup.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The configured endpoint is not a usable URL.
    #[error("invalid lookup endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        /// The configured endpoint.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The request failed (fatal status or retries exhausted).
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The response body was not the expected JSON document.
    #[error("invalid lookup response for video '{video_id}': {reason}")]
    InvalidResponse {
        /// The video being looked up.
        video_id: String,
        /// The decode failure.
        reason: String,
    },

    /// The lookup succeeded but listed no downloadable formats.
    #[error("no download links available for video '{video_id}'")]
    NoFormatsAvailable {
        /// The video being looked up.
        video_id: String,
    },
}

/// Metadata for one video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMetadata {
    /// Video title, when the service reports one.
    pub title: Option<String>,
    /// Downloadable variants, never empty.
    pub formats: Vec<FormatCandidate>,
}

#[derive(Debug, Deserialize)]
struct RawMetadata {
    title: Option<String>,
    #[serde(default)]
    link: Option<Vec<RawLink>>,
}

#[derive(Debug, Deserialize)]
struct RawLink {
    #[serde(rename = "type")]
    container: String,
    #[serde(default, deserialize_with = "deserialize_quality")]
    quality: Option<u32>,
    url: String,
}

/// Accepts `720`, `720.0` or `"720"`; anything else counts as unranked.
fn deserialize_quality<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .and_then(|v| u32::try_from(v).ok()),
        Some(serde_json::Value::String(s)) => s.trim().trim_end_matches('p').parse().ok(),
        _ => None,
    })
}

/// Parses a lookup response body.
///
/// # Errors
///
/// [`LookupError::InvalidResponse`] for undecodable JSON and
/// [`LookupError::NoFormatsAvailable`] for an absent or empty `link` list.
pub fn parse_metadata(video_id: &str, body: &[u8]) -> Result<VideoMetadata, LookupError> {
    let raw: RawMetadata =
        serde_json::from_slice(body).map_err(|e| LookupError::InvalidResponse {
            video_id: video_id.to_string(),
            reason: e.to_string(),
        })?;

    let formats: Vec<FormatCandidate> = raw
        .link
        .unwrap_or_default()
        .into_iter()
        .map(|link| FormatCandidate::new(link.url, link.container, link.quality.unwrap_or(0)))
        .collect();

    if formats.is_empty() {
        return Err(LookupError::NoFormatsAvailable {
            video_id: video_id.to_string(),
        });
    }

    Ok(VideoMetadata {
        title: raw.title.filter(|t| !t.trim().is_empty()),
        formats,
    })
}

/// Builds and sends lookup requests.
#[derive(Clone)]
pub struct LookupClient {
    endpoint: String,
    api_host: String,
    api_key: Option<String>,
}

impl fmt::Debug for LookupClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupClient")
            .field("endpoint", &self.endpoint)
            .field("api_host", &self.api_host)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Default for LookupClient {
    fn default() -> Self {
        Self::new(DEFAULT_LOOKUP_ENDPOINT)
    }
}

impl LookupClient {
    /// Creates a client for `endpoint` with the default host header and no key.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_host: DEFAULT_API_HOST.to_string(),
            api_key: None,
        }
    }

    /// Sets the vendor host header value.
    #[must_use]
    pub fn with_api_host(mut self, api_host: impl Into<String>) -> Self {
        self.api_host = api_host.into();
        self
    }

    /// Sets the API key header value.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// The configured endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Builds the lookup request for `video_id`.
    ///
    /// # Errors
    ///
    /// [`LookupError::InvalidEndpoint`] when the endpoint does not parse.
    pub fn request_for(&self, video_id: &str) -> Result<FetchRequest, LookupError> {
        let mut url = Url::parse(&self.endpoint).map_err(|e| LookupError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason: e.to_string(),
        })?;
        url.query_pairs_mut().append_pair("id", video_id);

        let mut request = FetchRequest::get(url.as_str()).header(API_HOST_HEADER, &self.api_host);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        Ok(request)
    }

    /// Looks up metadata for `reference`, retrying per `policy`.
    ///
    /// # Errors
    ///
    /// See [`LookupError`].
    #[instrument(skip(self, transport, policy), fields(host = %reference.host(), id = %reference.id()))]
    pub async fn fetch_metadata(
        &self,
        transport: &dyn Transport,
        policy: &RetryPolicy,
        reference: &VideoReference,
    ) -> Result<VideoMetadata, LookupError> {
        let request = self.request_for(reference.id())?;
        let response = fetch_with_retry(transport, &request, policy).await?;
        let metadata = parse_metadata(reference.id(), &response.body)?;
        debug!(
            title = metadata.title.as_deref().unwrap_or("<untitled>"),
            formats = metadata.formats.len(),
            "metadata received"
        );
        Ok(metadata)
    }
}
