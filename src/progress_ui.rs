//! Progress UI (spinner) driven by download progress events.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc::UnboundedReceiver;
use vidfetch_core::ProgressEvent;

/// Spawns the spinner task. It renders events until every sender is
/// dropped, then clears itself.
pub(crate) fn spawn_progress_ui(
    mut events: UnboundedReceiver<ProgressEvent>,
    total: usize,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));

        let mut current = 0usize;
        while let Some(event) = events.recv().await {
            if matches!(event, ProgressEvent::Started { .. }) {
                current = current.saturating_add(1);
            }
            spinner.set_message(describe(&event, current.min(total), total));
        }

        spinner.finish_and_clear();
    })
}

fn describe(event: &ProgressEvent, current: usize, total: usize) -> String {
    let status = match event {
        ProgressEvent::Started { url } => format!("Starting {url}"),
        ProgressEvent::Resolved { host, video_id, .. } => {
            format!("Resolved {host} video {video_id}")
        }
        ProgressEvent::MetadataFetched {
            video_id,
            title,
            formats,
        } => format!(
            "Found {formats} format(s) for {}",
            title.as_deref().unwrap_or(video_id)
        ),
        ProgressEvent::FormatSelected { quality, .. } => format!("Downloading {quality}..."),
        ProgressEvent::BytesReceived { bytes, .. } => format!("Received {bytes} bytes, saving..."),
        ProgressEvent::Completed { file_name, .. } => format!("Saved {file_name}"),
        ProgressEvent::Failed { message, .. } => format!("Failed: {message}"),
    };
    format!("[{current}/{total}] {status}")
}
