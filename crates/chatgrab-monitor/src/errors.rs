//! Monitor error types.

use thiserror::Error;

/// Errors from image discovery and persistence.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The image source attribute was not a usable data URI.
    #[error("malformed data URI: {reason}")]
    MalformedDataUri {
        /// What made the URI unusable.
        reason: String,
    },

    /// The base64 payload did not decode.
    #[error("base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The decoded bytes were not a recognizable image.
    #[error("image decode failed: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// Filesystem failure while persisting.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The underlying browser session failed.
    #[error(transparent)]
    Browser(#[from] chatgrab_browser::BrowserError),

    /// The conversation target was not usable.
    #[error("invalid conversation target: {0}")]
    InvalidTarget(String),
}

/// Errors from the upload hook.
///
/// These never terminate the poll loop — the loop logs them and keeps going.
#[derive(Debug, Error)]
pub enum UploadError {
    /// HTTP transport failure.
    #[error("upload request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote rejected the upload.
    #[error("upload rejected with status {status}")]
    Rejected {
        /// HTTP status code returned by the endpoint.
        status: u16,
    },

    /// Reading the local file failed.
    #[error("failed to read file for upload: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_data_uri_display() {
        let err = MonitorError::MalformedDataUri {
            reason: "no comma separator".into(),
        };
        assert_eq!(err.to_string(), "malformed data URI: no comma separator");
    }

    #[test]
    fn base64_error_from_conversion() {
        use base64::Engine as _;
        let decode_err = base64::engine::general_purpose::STANDARD
            .decode("!!!not base64!!!")
            .unwrap_err();
        let err: MonitorError = decode_err.into();
        assert!(err.to_string().contains("base64 decode failed"));
    }

    #[test]
    fn io_error_from_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: MonitorError = io_err.into();
        assert!(matches!(err, MonitorError::Io(_)));
    }

    #[test]
    fn browser_error_is_transparent() {
        let browser_err = chatgrab_browser::BrowserError::Cdp("socket closed".into());
        let err: MonitorError = browser_err.into();
        assert_eq!(err.to_string(), "CDP error: socket closed");
    }

    #[test]
    fn invalid_target_display() {
        let err = MonitorError::InvalidTarget("name is empty".into());
        assert!(err.to_string().contains("name is empty"));
    }

    #[test]
    fn upload_rejected_display() {
        let err = UploadError::Rejected { status: 503 };
        assert_eq!(err.to_string(), "upload rejected with status 503");
    }
}
