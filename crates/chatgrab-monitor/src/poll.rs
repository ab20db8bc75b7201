//! The poll loop.
//!
//! A cancellable scheduled task: at every tick the current DOM snapshot is
//! re-scanned, every matching candidate re-saved. No state survives between
//! cycles — deduplication is explicitly out of scope, so an image still on
//! screen is saved again on the next cycle.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::MonitorError;
use crate::persist::ImagePersister;
use crate::source::ImageSource;
use crate::upload::UploadSink;

/// Drives repeated image capture from a source into the persister.
pub struct Monitor {
    source: Arc<dyn ImageSource>,
    persister: ImagePersister,
    upload: Arc<dyn UploadSink>,
    sender_filter: Option<String>,
    poll_interval: Duration,
}

impl Monitor {
    /// Assemble a monitor.
    ///
    /// `sender_filter` restricts captures to one sender display name; with no
    /// filter, every decodable inline image is captured.
    pub fn new(
        source: Arc<dyn ImageSource>,
        persister: ImagePersister,
        upload: Arc<dyn UploadSink>,
        sender_filter: Option<String>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            source,
            persister,
            upload,
            sender_filter,
            poll_interval,
        }
    }

    /// Run until cancelled. Returns the total number of images saved.
    ///
    /// Error handling per level:
    /// - a failed cycle (DOM query error) is logged and the loop sleeps
    ///   until the next tick;
    /// - per-image failures are handled inside [`Self::poll_once`];
    /// - nothing is retried with backoff — every recoverable error is
    ///   "log and proceed to the next cycle".
    pub async fn run(&self, cancel: CancellationToken) -> u64 {
        // time::interval panics on a zero period; settings validation
        // rejects zero upstream, but a directly constructed Monitor must
        // not be able to hit it.
        let period = self.poll_interval.max(Duration::from_millis(1));
        let mut ticker = time::interval(period);
        let mut saved_total: u64 = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.poll_once().await {
                        Ok(saved) => saved_total += saved,
                        Err(e) => warn!(error = %e, "poll cycle failed"),
                    }
                }
                () = cancel.cancelled() => {
                    info!(saved_total, "monitor stopped");
                    return saved_total;
                }
            }
        }
    }

    /// One poll cycle: scan, filter, persist, upload. Returns images saved.
    ///
    /// A decode failure skips that single image; an upload failure is logged
    /// and does not undo the save.
    pub async fn poll_once(&self) -> Result<u64, MonitorError> {
        let candidates = self.source.pending_images().await?;
        let mut saved: u64 = 0;

        for candidate in candidates {
            if !self.sender_allowed(candidate.sender.as_deref()) {
                continue;
            }
            match self.persister.save(&candidate.data_uri).await {
                Ok(path) => {
                    saved += 1;
                    if let Err(e) = self.upload.upload(&path).await {
                        warn!(error = %e, path = %path.display(), "upload failed");
                    }
                }
                Err(e) => warn!(error = %e, "skipping image"),
            }
        }

        Ok(saved)
    }

    /// Whether a candidate with this sender passes the configured filter.
    ///
    /// An unknown sender never passes a configured filter — traversal
    /// failure means we cannot attribute the image, so it is skipped.
    fn sender_allowed(&self, sender: Option<&str>) -> bool {
        match (&self.sender_filter, sender) {
            (None, _) => true,
            (Some(_), None) => {
                debug!("sender unknown, skipping");
                false
            }
            (Some(filter), Some(sender)) => filter == sender,
        }
    }
}
