//! Upload hook.
//!
//! Saved files can optionally be forwarded to external storage. Whatever the
//! implementation does, its failures must stay its own: the poll loop logs
//! upload errors and keeps running.

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::errors::UploadError;

/// Forwards a saved file to external storage.
#[async_trait]
pub trait UploadSink: Send + Sync {
    /// Upload the file at `path`. Errors are reported, never fatal.
    async fn upload(&self, path: &Path) -> Result<(), UploadError>;
}

/// Default sink: does nothing.
pub struct NoopUploadSink;

#[async_trait]
impl UploadSink for NoopUploadSink {
    async fn upload(&self, path: &Path) -> Result<(), UploadError> {
        debug!(path = %path.display(), "upload disabled, skipping");
        Ok(())
    }
}

/// PUTs file bytes to `<endpoint>/<filename>`.
pub struct HttpUploadSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpUploadSink {
    /// Create a sink targeting the given base endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    fn target_url(&self, path: &Path) -> String {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        format!("{}/{}", self.endpoint.trim_end_matches('/'), filename)
    }
}

#[async_trait]
impl UploadSink for HttpUploadSink {
    async fn upload(&self, path: &Path) -> Result<(), UploadError> {
        let bytes = tokio::fs::read(path).await?;
        let url = self.target_url(path);

        let response = self.client.put(&url).body(bytes).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Rejected {
                status: status.as_u16(),
            });
        }

        info!(url, "upload complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_sink_always_succeeds() {
        let sink = NoopUploadSink;
        let result = sink.upload(Path::new("/nonexistent/file.png")).await;
        assert!(result.is_ok());
    }

    #[test]
    fn http_sink_builds_target_url() {
        let sink = HttpUploadSink::new("https://store.example.com/images/");
        let url = sink.target_url(Path::new("/tmp/whatsapp_image_20250101_120000.png"));
        assert_eq!(
            url,
            "https://store.example.com/images/whatsapp_image_20250101_120000.png"
        );
    }

    #[tokio::test]
    async fn http_sink_missing_file_is_io_error() {
        let sink = HttpUploadSink::new("https://store.example.com");
        let err = sink
            .upload(Path::new("/nonexistent/file.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Io(_)));
    }
}
