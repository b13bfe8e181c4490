//! Push-based progress notifications.
//!
//! The orchestration emits a [`ProgressEvent`] at each milestone of a
//! download. Callers choose how to receive them: ignore them
//! ([`NoopProgress`]), handle them inline ([`CallbackProgress`]), or consume
//! them as a stream from another task ([`ChannelProgress`]).

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::resolver::VideoHost;

/// A milestone in one download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Work on `url` has begun.
    Started {
        /// The URL as supplied.
        url: String,
    },
    /// The URL was mapped to a video identifier.
    Resolved {
        /// The URL as supplied.
        url: String,
        /// Hosting platform.
        host: VideoHost,
        /// Video identifier.
        video_id: String,
    },
    /// The lookup service returned metadata.
    MetadataFetched {
        /// Video identifier.
        video_id: String,
        /// Title, when known.
        title: Option<String>,
        /// Number of format candidates offered.
        formats: usize,
    },
    /// A format was chosen.
    FormatSelected {
        /// Video identifier.
        video_id: String,
        /// Quality label, e.g. `720p`.
        quality: String,
    },
    /// The media payload arrived.
    BytesReceived {
        /// Video identifier.
        video_id: String,
        /// Payload size.
        bytes: u64,
    },
    /// The payload was persisted.
    Completed {
        /// Video identifier.
        video_id: String,
        /// Persisted file name.
        file_name: String,
        /// Payload size.
        bytes: u64,
    },
    /// The download failed.
    Failed {
        /// The URL as supplied.
        url: String,
        /// User-facing failure message.
        message: String,
    },
}

/// Receives progress events. Emission must not block.
pub trait ProgressSink: Send + Sync {
    /// Handles one event.
    fn emit(&self, event: ProgressEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Forwards events to a closure.
pub struct CallbackProgress<F>(F);

impl<F> CallbackProgress<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    /// Wraps `callback`.
    pub fn new(callback: F) -> Self {
        Self(callback)
    }
}

impl<F> ProgressSink for CallbackProgress<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: ProgressEvent) {
        (self.0)(event);
    }
}

/// Publishes events on an unbounded tokio channel.
///
/// Events emitted after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    sender: UnboundedSender<ProgressEvent>,
}

impl ChannelProgress {
    /// Creates a sink and the receiving end of its stream.
    #[must_use]
    pub fn new() -> (Self, UnboundedReceiver<ProgressEvent>) {
        let (sender, receiver) = unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ProgressSink for ChannelProgress {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.sender.send(event);
    }
}
