//! Download orchestration: URL in, persisted video (or a structured failure) out.
//!
//! [`Downloader::download_video`] runs one complete cycle:
//!
//! 1. validate the URL scheme and resolve it to a [`VideoReference`]
//! 2. look up metadata and pick a format for the requested quality
//! 3. fetch the media bytes and reject payloads below the size floor
//! 4. hand the bytes to the [`PersistenceSink`] under a sanitized file name
//!
//! Every failure is converted into a [`DownloadOutcome`] at this boundary.
//! Batches run strictly one after another.
//!
//! [`Downloader::fetch_info`] stops after step 2 and reports the title and
//! formats without downloading anything.

use std::error::Error as _;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::download::constants::MIN_MEDIA_BYTES;
use crate::download::filename::video_file_name;
use crate::download::{
    FetchError, FetchRequest, PersistenceError, PersistenceSink, RetryPolicy, Transport,
    fetch_with_retry,
};
use crate::format::{FormatCandidate, InvalidQuality, QualityPreference, select_format};
use crate::lookup::{LookupClient, LookupError, VideoMetadata};
use crate::progress::{NoopProgress, ProgressEvent, ProgressSink};
use crate::resolver::{ResolveError, VideoReference, resolve};

/// `Accept` header sent with media requests.
pub const MEDIA_ACCEPT: &str = "video/mp4,video/*";

/// Message carried by every successful outcome.
pub const SUCCESS_MESSAGE: &str = "Download completed successfully";

/// Why a download failed.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The quality preference is neither `highest` nor a rank.
    #[error(transparent)]
    InvalidQuality(#[from] InvalidQuality),

    /// The URL does not parse or is not `http`/`https`.
    #[error(transparent)]
    MalformedUrl(ResolveError),

    /// The URL is well-formed but not a recognized video link.
    #[error(transparent)]
    UnsupportedUrlKind(ResolveError),

    /// A request failed with a non-retryable HTTP status.
    #[error("HTTP error {status} from {url}")]
    HttpError {
        /// The URL that failed.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// A request could not be built, e.g. the lookup listed a relative media URL.
    #[error(transparent)]
    InvalidRequest(FetchError),

    /// Every attempt of a request was rate limited or failed in transport.
    #[error(transparent)]
    MaxRetriesExceeded(FetchError),

    /// The lookup listed no format usable as an `mp4` download.
    #[error("no downloadable mp4 format for video '{video_id}'")]
    NoFormatsAvailable {
        /// The video being downloaded.
        video_id: String,
    },

    /// The lookup response could not be understood.
    #[error(transparent)]
    InvalidMetadata(LookupError),

    /// The media payload is too small to be a real video.
    #[error("received only {bytes} bytes (minimum {minimum}); the server likely returned an error page")]
    PayloadTooSmall {
        /// Bytes received.
        bytes: usize,
        /// The size floor.
        minimum: usize,
    },

    /// The sink could not store the payload.
    #[error(transparent)]
    PersistenceFailure(#[from] PersistenceError),
}

impl DownloadError {
    /// Stable snake_case label for this failure.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidQuality(_) => "invalid_quality",
            Self::MalformedUrl(_) => "malformed_url",
            Self::UnsupportedUrlKind(_) => "unsupported_url_kind",
            Self::HttpError { .. } => "http_error",
            Self::InvalidRequest(_) => "invalid_request",
            Self::MaxRetriesExceeded(_) => "max_retries_exceeded",
            Self::NoFormatsAvailable { .. } => "no_formats_available",
            Self::InvalidMetadata(_) => "invalid_metadata",
            Self::PayloadTooSmall { .. } => "payload_too_small",
            Self::PersistenceFailure(_) => "persistence_failure",
        }
    }

    /// Full description: kind, message and every underlying cause.
    #[must_use]
    pub fn detail(&self) -> String {
        let mut detail = format!("{}: {self}", self.kind());
        let mut source = self.source();
        while let Some(cause) = source {
            detail.push_str(": ");
            detail.push_str(&cause.to_string());
            source = cause.source();
        }
        detail
    }
}

impl From<ResolveError> for DownloadError {
    fn from(error: ResolveError) -> Self {
        match error {
            ResolveError::MalformedUrl { .. } => Self::MalformedUrl(error),
            ResolveError::UnsupportedUrlKind { .. } => Self::UnsupportedUrlKind(error),
        }
    }
}

impl From<FetchError> for DownloadError {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::Http { url, status } => Self::HttpError { url, status },
            FetchError::InvalidRequest { .. } => Self::InvalidRequest(error),
            FetchError::MaxRetriesExceeded { .. } => Self::MaxRetriesExceeded(error),
        }
    }
}

impl From<LookupError> for DownloadError {
    fn from(error: LookupError) -> Self {
        match error {
            LookupError::Fetch(fetch) => fetch.into(),
            LookupError::NoFormatsAvailable { video_id } => Self::NoFormatsAvailable { video_id },
            LookupError::InvalidEndpoint { .. } | LookupError::InvalidResponse { .. } => {
                Self::InvalidMetadata(error)
            }
        }
    }
}

/// Terminal result of one download. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadOutcome {
    /// Whether the video was persisted.
    pub success: bool,
    /// User-facing summary.
    pub message: String,
    /// The URL as supplied.
    pub url: String,
    /// Resolved video identifier, when resolution got that far.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    /// Persisted file name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Payload size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byte_size: Option<u64>,
    /// Quality label of the chosen format, e.g. `720p`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Sink handle for the persisted payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    /// Failure kind and cause chain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl DownloadOutcome {
    fn failed(url: &str, video_id: Option<String>, error: &DownloadError) -> Self {
        Self {
            success: false,
            message: first_line(error),
            url: url.to_string(),
            video_id,
            file_name: None,
            byte_size: None,
            format: None,
            handle: None,
            error_detail: Some(error.detail()),
        }
    }
}

/// Metadata-only result for one URL. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoInfo {
    /// Whether metadata was retrieved.
    pub success: bool,
    /// The URL as supplied.
    pub url: String,
    /// Resolved video identifier, when resolution got that far.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    /// Video title, when the lookup reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Every variant the lookup listed, in lookup order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub formats: Vec<FormatCandidate>,
    /// User-facing failure summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Failure kind and cause chain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

struct Completed {
    video_id: String,
    file_name: String,
    byte_size: u64,
    format: String,
    handle: String,
}

/// Runs downloads against injected collaborators.
#[derive(Clone)]
pub struct Downloader {
    transport: Arc<dyn Transport>,
    sink: Arc<dyn PersistenceSink>,
    lookup: LookupClient,
    retry_policy: RetryPolicy,
    progress: Arc<dyn ProgressSink>,
}

impl std::fmt::Debug for Downloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloader")
            .field("lookup", &self.lookup)
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

impl Downloader {
    /// Creates a downloader with the default lookup client, retry policy and
    /// no progress reporting.
    pub fn new(transport: Arc<dyn Transport>, sink: Arc<dyn PersistenceSink>) -> Self {
        Self {
            transport,
            sink,
            lookup: LookupClient::default(),
            retry_policy: RetryPolicy::default(),
            progress: Arc::new(NoopProgress),
        }
    }

    /// Replaces the lookup client.
    #[must_use]
    pub fn with_lookup(mut self, lookup: LookupClient) -> Self {
        self.lookup = lookup;
        self
    }

    /// Replaces the retry policy used for both lookup and media requests.
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Sets where progress events go.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// The retry policy in use.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Downloads one video. Never fails: errors come back as an unsuccessful
    /// [`DownloadOutcome`].
    ///
    /// `quality` is `highest` or a rank such as `720` / `720p`.
    #[instrument(skip(self, raw_url), fields(url = %raw_url))]
    pub async fn download_video(&self, raw_url: &str, quality: &str) -> DownloadOutcome {
        self.progress.emit(ProgressEvent::Started {
            url: raw_url.to_string(),
        });

        let mut video_id = None;
        match self.run(raw_url, quality, &mut video_id).await {
            Ok(done) => {
                info!(
                    video_id = %done.video_id,
                    file = %done.file_name,
                    bytes = done.byte_size,
                    format = %done.format,
                    "download completed"
                );
                self.progress.emit(ProgressEvent::Completed {
                    video_id: done.video_id.clone(),
                    file_name: done.file_name.clone(),
                    bytes: done.byte_size,
                });
                DownloadOutcome {
                    success: true,
                    message: SUCCESS_MESSAGE.to_string(),
                    url: raw_url.to_string(),
                    video_id: Some(done.video_id),
                    file_name: Some(done.file_name),
                    byte_size: Some(done.byte_size),
                    format: Some(done.format),
                    handle: Some(done.handle),
                    error_detail: None,
                }
            }
            Err(error) => {
                warn!(kind = error.kind(), error = %error, "download failed");
                let outcome = DownloadOutcome::failed(raw_url, video_id, &error);
                self.progress.emit(ProgressEvent::Failed {
                    url: raw_url.to_string(),
                    message: outcome.message.clone(),
                });
                outcome
            }
        }
    }

    /// Downloads each URL in order, finishing one before starting the next.
    pub async fn download_all<I, S>(&self, urls: I, quality: &str) -> Vec<DownloadOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.download_each(urls, quality, |_| {}).await
    }

    /// Like [`download_all`](Self::download_all), but hands each outcome to
    /// `on_outcome` as soon as that download finishes.
    pub async fn download_each<I, S, F>(
        &self,
        urls: I,
        quality: &str,
        mut on_outcome: F,
    ) -> Vec<DownloadOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: FnMut(&DownloadOutcome),
    {
        let mut outcomes = Vec::new();
        for url in urls {
            let outcome = self.download_video(url.as_ref(), quality).await;
            on_outcome(&outcome);
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Resolves `raw_url` and looks up its metadata without downloading.
    /// Never fails: errors come back as an unsuccessful [`VideoInfo`].
    #[instrument(skip(self, raw_url), fields(url = %raw_url))]
    pub async fn fetch_info(&self, raw_url: &str) -> VideoInfo {
        let mut video_id = None;
        match self.resolve_and_lookup(raw_url, &mut video_id).await {
            Ok((_, metadata)) => {
                info!(formats = metadata.formats.len(), "metadata retrieved");
                VideoInfo {
                    success: true,
                    url: raw_url.to_string(),
                    video_id,
                    title: metadata.title,
                    formats: metadata.formats,
                    message: None,
                    error_detail: None,
                }
            }
            Err(error) => {
                warn!(kind = error.kind(), error = %error, "metadata lookup failed");
                VideoInfo {
                    success: false,
                    url: raw_url.to_string(),
                    video_id,
                    title: None,
                    formats: Vec::new(),
                    message: Some(first_line(&error)),
                    error_detail: Some(error.detail()),
                }
            }
        }
    }

    /// Validates and resolves `raw_url`, then fetches its metadata.
    async fn resolve_and_lookup(
        &self,
        raw_url: &str,
        video_id: &mut Option<String>,
    ) -> Result<(VideoReference, VideoMetadata), DownloadError> {
        check_scheme(raw_url)?;
        let reference = resolve(raw_url)?;
        *video_id = Some(reference.id().to_string());

        let metadata = self
            .lookup
            .fetch_metadata(self.transport.as_ref(), &self.retry_policy, &reference)
            .await?;
        Ok((reference, metadata))
    }

    async fn run(
        &self,
        raw_url: &str,
        quality: &str,
        video_id: &mut Option<String>,
    ) -> Result<Completed, DownloadError> {
        let preference: QualityPreference = quality.parse()?;
        check_scheme(raw_url)?;

        let reference = resolve(raw_url)?;
        *video_id = Some(reference.id().to_string());
        self.progress.emit(ProgressEvent::Resolved {
            url: raw_url.to_string(),
            host: reference.host(),
            video_id: reference.id().to_string(),
        });

        let metadata = self
            .lookup
            .fetch_metadata(self.transport.as_ref(), &self.retry_policy, &reference)
            .await?;
        self.progress.emit(ProgressEvent::MetadataFetched {
            video_id: reference.id().to_string(),
            title: metadata.title.clone(),
            formats: metadata.formats.len(),
        });

        let format = select_format(&metadata.formats, preference).ok_or_else(|| {
            DownloadError::NoFormatsAvailable {
                video_id: reference.id().to_string(),
            }
        })?;
        let label = format.quality_label();
        debug!(quality = %label, preference = %preference, "format selected");
        self.progress.emit(ProgressEvent::FormatSelected {
            video_id: reference.id().to_string(),
            quality: label.clone(),
        });

        let bytes = self.fetch_media(&reference, &format.url).await?;

        let file_name = video_file_name(metadata.title.as_deref(), reference.id());
        let persisted = self.sink.persist(&bytes, &file_name).await?;

        Ok(Completed {
            video_id: reference.id().to_string(),
            file_name: persisted.file_name,
            byte_size: bytes.len() as u64,
            format: label,
            handle: persisted.handle,
        })
    }

    async fn fetch_media(
        &self,
        reference: &VideoReference,
        media_url: &str,
    ) -> Result<Vec<u8>, DownloadError> {
        let request = FetchRequest::get(media_url).header("Accept", MEDIA_ACCEPT);
        let response =
            fetch_with_retry(self.transport.as_ref(), &request, &self.retry_policy).await?;

        let bytes = response.body;
        self.progress.emit(ProgressEvent::BytesReceived {
            video_id: reference.id().to_string(),
            bytes: bytes.len() as u64,
        });

        if bytes.len() < MIN_MEDIA_BYTES {
            return Err(DownloadError::PayloadTooSmall {
                bytes: bytes.len(),
                minimum: MIN_MEDIA_BYTES,
            });
        }
        Ok(bytes)
    }
}

/// The first line of an error message; suggestions follow on later lines.
fn first_line(error: &DownloadError) -> String {
    error.to_string().lines().next().unwrap_or_default().to_string()
}

/// Only `http` and `https` URLs are accepted.
fn check_scheme(raw_url: &str) -> Result<(), ResolveError> {
    let parsed =
        Url::parse(raw_url).map_err(|e| ResolveError::malformed(raw_url, &e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ResolveError::malformed(
            raw_url,
            &format!("scheme '{other}' is not http or https"),
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::download::{FetchResponse, PersistedFile, TransportError, TransportErrorKind};
    use crate::progress::CallbackProgress;

    const LOOKUP: &str = "https://lookup.test/dl";

    /// Serves canned responses keyed by exact URL.
    #[derive(Default)]
    struct CannedTransport {
        routes: HashMap<String, FetchResponse>,
        requests: Mutex<Vec<FetchRequest>>,
    }

    impl CannedTransport {
        fn route(mut self, url: &str, response: FetchResponse) -> Self {
            self.routes.insert(url.to_string(), response);
            self
        }
    }

    #[async_trait]
    impl Transport for CannedTransport {
        async fn send(&self, request: &FetchRequest) -> Result<FetchResponse, TransportError> {
            self.requests.lock().unwrap().push(request.clone());
            self.routes.get(request.url()).cloned().ok_or_else(|| {
                TransportError::new(request.url(), TransportErrorKind::Connect, "no route")
            })
        }
    }

    #[derive(Default)]
    struct MemorySink {
        files: Mutex<Vec<(String, Vec<u8>)>>,
    }

    #[async_trait]
    impl PersistenceSink for MemorySink {
        async fn persist(
            &self,
            bytes: &[u8],
            file_name: &str,
        ) -> Result<PersistedFile, PersistenceError> {
            self.files
                .lock()
                .unwrap()
                .push((file_name.to_string(), bytes.to_vec()));
            Ok(PersistedFile {
                handle: format!("memory://{file_name}"),
                file_name: file_name.to_string(),
            })
        }
    }

    struct RejectingSink;

    #[async_trait]
    impl PersistenceSink for RejectingSink {
        async fn persist(
            &self,
            _bytes: &[u8],
            file_name: &str,
        ) -> Result<PersistedFile, PersistenceError> {
            Err(PersistenceError::rejected(file_name, "disk full"))
        }
    }

    fn metadata_json(title: &str) -> Vec<u8> {
        serde_json::json!({
            "title": title,
            "link": [
                {"type": "mp4", "quality": 360, "url": "https://cdn.test/360.mp4"},
                {"type": "mp4", "quality": 720, "url": "https://cdn.test/720.mp4"},
                {"type": "mp4", "quality": 1080, "url": "https://cdn.test/1080.mp4"}
            ]
        })
        .to_string()
        .into_bytes()
    }

    fn ladder_transport(title: &str, media_size: usize) -> CannedTransport {
        CannedTransport::default()
            .route(
                &format!("{LOOKUP}?id=abc123"),
                FetchResponse::new(200, metadata_json(title)),
            )
            .route("https://cdn.test/360.mp4", FetchResponse::new(200, vec![3u8; media_size]))
            .route("https://cdn.test/720.mp4", FetchResponse::new(200, vec![7u8; media_size]))
            .route("https://cdn.test/1080.mp4", FetchResponse::new(200, vec![1u8; media_size]))
    }

    fn downloader(transport: CannedTransport, sink: Arc<dyn PersistenceSink>) -> Downloader {
        Downloader::new(Arc::new(transport), sink).with_lookup(LookupClient::new(LOOKUP))
    }

    #[tokio::test]
    async fn test_download_selects_requested_quality() {
        let sink = Arc::new(MemorySink::default());
        let dl = downloader(ladder_transport("Clip", 5000), sink.clone());

        let outcome = dl.download_video("https://youtu.be/abc123", "720").await;

        assert!(outcome.success, "{outcome:?}");
        assert_eq!(outcome.message, SUCCESS_MESSAGE);
        assert_eq!(outcome.format.as_deref(), Some("720p"));
        assert_eq!(outcome.byte_size, Some(5000));
        assert_eq!(outcome.video_id.as_deref(), Some("abc123"));
        assert_eq!(sink.files.lock().unwrap()[0].1[0], 7);
    }

    #[tokio::test]
    async fn test_download_highest_selects_1080() {
        let sink = Arc::new(MemorySink::default());
        let dl = downloader(ladder_transport("Clip", 5000), sink);

        let outcome = dl.download_video("https://youtu.be/abc123", "highest").await;

        assert_eq!(outcome.format.as_deref(), Some("1080p"));
    }

    #[tokio::test]
    async fn test_download_limit_below_all_ranks_falls_back_to_first() {
        let sink = Arc::new(MemorySink::default());
        let dl = downloader(ladder_transport("Clip", 5000), sink);

        let outcome = dl.download_video("https://youtu.be/abc123", "240").await;

        assert_eq!(outcome.format.as_deref(), Some("360p"));
    }

    #[tokio::test]
    async fn test_download_small_payload_fails() {
        let sink = Arc::new(MemorySink::default());
        let dl = downloader(ladder_transport("Clip", 500), sink.clone());

        let outcome = dl.download_video("https://youtu.be/abc123", "highest").await;

        assert!(!outcome.success);
        assert!(outcome.error_detail.unwrap().starts_with("payload_too_small"));
        assert!(sink.files.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_download_payload_at_floor_succeeds() {
        let sink = Arc::new(MemorySink::default());
        let dl = downloader(ladder_transport("Clip", MIN_MEDIA_BYTES), sink);

        let outcome = dl.download_video("https://youtu.be/abc123", "highest").await;

        assert!(outcome.success);
    }

    #[tokio::test]
    async fn test_download_sanitizes_title() {
        let sink = Arc::new(MemorySink::default());
        let dl = downloader(ladder_transport("a/b:c*d", 5000), sink.clone());

        let outcome = dl.download_video("https://youtu.be/abc123", "highest").await;

        assert_eq!(outcome.file_name.as_deref(), Some("a_b_c_d.mp4"));
        assert_eq!(outcome.handle.as_deref(), Some("memory://a_b_c_d.mp4"));
        assert_eq!(sink.files.lock().unwrap()[0].0, "a_b_c_d.mp4");
    }

    #[tokio::test]
    async fn test_download_sends_media_accept_header() {
        let transport = Arc::new(ladder_transport("Clip", 5000));
        let dl = Downloader::new(transport.clone(), Arc::new(MemorySink::default()))
            .with_lookup(LookupClient::new(LOOKUP));

        dl.download_video("https://youtu.be/abc123", "highest").await;

        let requests = transport.requests.lock().unwrap();
        let media = requests.iter().find(|r| r.url().starts_with("https://cdn.test")).unwrap();
        assert!(
            media
                .headers()
                .contains(&("Accept".to_string(), MEDIA_ACCEPT.to_string()))
        );
    }

    #[tokio::test]
    async fn test_download_rejects_non_http_scheme() {
        let dl = downloader(CannedTransport::default(), Arc::new(MemorySink::default()));

        let outcome = dl.download_video("ftp://youtube.com/watch?v=abc123", "highest").await;

        assert!(!outcome.success);
        assert!(outcome.error_detail.unwrap().starts_with("malformed_url"));
    }

    #[tokio::test]
    async fn test_download_unsupported_host() {
        let dl = downloader(CannedTransport::default(), Arc::new(MemorySink::default()));

        let outcome = dl.download_video("https://vimeo.com/123", "highest").await;

        assert!(!outcome.success);
        assert_eq!(outcome.video_id, None);
        assert!(outcome.error_detail.unwrap().starts_with("unsupported_url_kind"));
    }

    #[tokio::test]
    async fn test_download_invalid_quality() {
        let dl = downloader(CannedTransport::default(), Arc::new(MemorySink::default()));

        let outcome = dl.download_video("https://youtu.be/abc123", "best").await;

        assert!(outcome.error_detail.unwrap().starts_with("invalid_quality"));
        assert!(!outcome.message.contains('\n'));
    }

    #[tokio::test]
    async fn test_download_lookup_http_error_is_not_retried() {
        let transport = Arc::new(
            CannedTransport::default()
                .route(&format!("{LOOKUP}?id=abc123"), FetchResponse::new(403, Vec::new())),
        );
        let dl = Downloader::new(transport.clone(), Arc::new(MemorySink::default()))
            .with_lookup(LookupClient::new(LOOKUP));

        let outcome = dl.download_video("https://youtu.be/abc123", "highest").await;

        assert!(outcome.error_detail.unwrap().starts_with("http_error"));
        assert_eq!(outcome.video_id.as_deref(), Some("abc123"));
        assert_eq!(transport.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_download_without_mp4_is_no_formats() {
        let body = br#"{"link": [{"type": "webm", "quality": 720, "url": "https://cdn.test/a.webm"}]}"#;
        let transport = CannedTransport::default()
            .route(&format!("{LOOKUP}?id=abc123"), FetchResponse::new(200, body.to_vec()));
        let dl = downloader(transport, Arc::new(MemorySink::default()));

        let outcome = dl.download_video("https://youtu.be/abc123", "highest").await;

        assert!(outcome.error_detail.unwrap().starts_with("no_formats_available"));
    }

    #[tokio::test]
    async fn test_download_persistence_failure() {
        let dl = downloader(ladder_transport("Clip", 5000), Arc::new(RejectingSink));

        let outcome = dl.download_video("https://youtu.be/abc123", "highest").await;

        assert!(!outcome.success);
        assert_eq!(outcome.file_name, None);
        assert!(outcome.error_detail.unwrap().starts_with("persistence_failure"));
    }

    #[tokio::test]
    async fn test_download_emits_progress_milestones() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let recorded = events.clone();
        let dl = downloader(ladder_transport("Clip", 5000), Arc::new(MemorySink::default()))
            .with_progress(Arc::new(CallbackProgress::new(move |event| {
                recorded.lock().unwrap().push(event);
            })));

        dl.download_video("https://youtu.be/abc123", "highest").await;

        let events = events.lock().unwrap();
        let names: Vec<&str> = events
            .iter()
            .map(|e| match e {
                ProgressEvent::Started { .. } => "started",
                ProgressEvent::Resolved { .. } => "resolved",
                ProgressEvent::MetadataFetched { .. } => "metadata",
                ProgressEvent::FormatSelected { .. } => "format",
                ProgressEvent::BytesReceived { .. } => "bytes",
                ProgressEvent::Completed { .. } => "completed",
                ProgressEvent::Failed { .. } => "failed",
            })
            .collect();
        assert_eq!(
            names,
            vec!["started", "resolved", "metadata", "format", "bytes", "completed"]
        );
    }

    #[tokio::test]
    async fn test_download_all_runs_in_order() {
        let sink = Arc::new(MemorySink::default());
        let dl = downloader(ladder_transport("Clip", 5000), sink.clone());

        let outcomes = dl
            .download_all(["https://vimeo.com/1", "https://youtu.be/abc123"], "highest")
            .await;

        assert_eq!(outcomes.len(), 2);
        assert!(!outcomes[0].success);
        assert!(outcomes[1].success);
        assert_eq!(outcomes[1].url, "https://youtu.be/abc123");
    }

    #[tokio::test]
    async fn test_download_each_reports_outcomes_as_they_finish() {
        let dl = downloader(ladder_transport("Clip", 5000), Arc::new(MemorySink::default()));
        let mut seen = Vec::new();

        let outcomes = dl
            .download_each(
                ["https://youtu.be/abc123", "https://vimeo.com/1"],
                "highest",
                |outcome| seen.push((outcome.url.clone(), outcome.success)),
            )
            .await;

        assert_eq!(outcomes.len(), 2);
        assert_eq!(
            seen,
            vec![
                ("https://youtu.be/abc123".to_string(), true),
                ("https://vimeo.com/1".to_string(), false)
            ]
        );
    }

    #[tokio::test]
    async fn test_fetch_info_lists_formats_without_downloading() {
        let transport = Arc::new(ladder_transport("Clip", 5000));
        let sink = Arc::new(MemorySink::default());
        let dl = Downloader::new(transport.clone(), sink.clone())
            .with_lookup(LookupClient::new(LOOKUP));

        let info = dl.fetch_info("https://youtu.be/abc123").await;

        assert!(info.success, "{info:?}");
        assert_eq!(info.video_id.as_deref(), Some("abc123"));
        assert_eq!(info.title.as_deref(), Some("Clip"));
        let ranks: Vec<u32> = info.formats.iter().map(|f| f.quality_rank).collect();
        assert_eq!(ranks, vec![360, 720, 1080]);
        assert_eq!(transport.requests.lock().unwrap().len(), 1);
        assert!(sink.files.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_info_unsupported_url_fails() {
        let dl = downloader(CannedTransport::default(), Arc::new(MemorySink::default()));

        let info = dl.fetch_info("https://vimeo.com/123").await;

        assert!(!info.success);
        assert!(info.formats.is_empty());
        assert!(info.error_detail.unwrap().starts_with("unsupported_url_kind"));
        assert!(!info.message.unwrap().contains('\n'));
    }

    #[test]
    fn test_outcome_serializes_without_empty_fields() {
        let error = DownloadError::PayloadTooSmall {
            bytes: 10,
            minimum: MIN_MEDIA_BYTES,
        };
        let outcome = DownloadOutcome::failed("https://youtu.be/x", None, &error);
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["success"], false);
        assert!(json.get("file_name").is_none());
        assert!(json["error_detail"].as_str().unwrap().starts_with("payload_too_small"));
    }

    #[test]
    fn test_fetch_error_maps_to_taxonomy() {
        let http: DownloadError = FetchError::http("https://a.test", 404).into();
        assert_eq!(http.kind(), "http_error");

        let retries: DownloadError = FetchError::max_retries(
            "https://a.test",
            3,
            Some(TransportError::new("https://a.test", TransportErrorKind::Timeout, "slow")),
        )
        .into();
        assert_eq!(retries.kind(), "max_retries_exceeded");
        assert!(retries.detail().contains("slow"));

        let invalid: DownloadError = FetchError::invalid_request(TransportError::new(
            "/a.mp4",
            TransportErrorKind::InvalidRequest,
            "relative URL without a base",
        ))
        .into();
        assert_eq!(invalid.kind(), "invalid_request");
        assert!(invalid.detail().contains("relative URL"));
    }
}
