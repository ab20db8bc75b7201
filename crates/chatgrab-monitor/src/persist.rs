//! Image persistence.
//!
//! Decodes a base64 data URI, validates the bytes decode as an image, and
//! writes them to the storage directory with a timestamp-derived filename.
//! The write only happens after a successful decode, so no partial or
//! invalid file is ever left behind by a bad payload.

use std::path::{Path, PathBuf};

use base64::Engine as _;
use chrono::{DateTime, Local};
use tracing::{info, warn};

use crate::errors::MonitorError;

/// Filename prefix for saved captures.
const FILE_PREFIX: &str = "whatsapp_image_";

/// Decode the payload of an inline image data URI.
///
/// The payload is everything after the first comma. The decoded bytes must
/// parse as a real image; the returned bytes are the decoded payload
/// unchanged, so writing them preserves the source content byte for byte.
pub fn decode_data_uri(data_uri: &str) -> Result<Vec<u8>, MonitorError> {
    if !data_uri.starts_with("data:image") {
        return Err(MonitorError::MalformedDataUri {
            reason: "missing data:image prefix".into(),
        });
    }
    let payload = data_uri
        .split_once(',')
        .ok_or_else(|| MonitorError::MalformedDataUri {
            reason: "no comma separator".into(),
        })?
        .1;

    let bytes = base64::engine::general_purpose::STANDARD.decode(payload)?;

    // Validation only — the original bytes are what gets written.
    let _ = image::load_from_memory(&bytes)?;

    Ok(bytes)
}

/// Writes decoded images into a storage directory.
pub struct ImagePersister {
    storage_dir: PathBuf,
}

impl ImagePersister {
    /// Create a persister, creating the storage directory if absent.
    pub fn new(storage_dir: impl Into<PathBuf>) -> Result<Self, MonitorError> {
        let storage_dir = storage_dir.into();
        std::fs::create_dir_all(&storage_dir)?;
        Ok(Self { storage_dir })
    }

    /// The directory saved images land in.
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Decode a data URI and write it as `whatsapp_image_<YYYYMMDD_HHMMSS>.png`.
    ///
    /// Returns the path written. Two saves within the same wall-clock second
    /// would collide on the timestamp name; the second save logs a warning
    /// and takes a `_<n>` suffix instead of overwriting.
    pub async fn save(&self, data_uri: &str) -> Result<PathBuf, MonitorError> {
        let bytes = decode_data_uri(data_uri)?;
        let path = self.unique_path(Local::now());
        tokio::fs::write(&path, &bytes).await?;
        info!(path = %path.display(), size = bytes.len(), "saved image");
        Ok(path)
    }

    /// Resolve a collision-free path for the given capture time.
    fn unique_path(&self, at: DateTime<Local>) -> PathBuf {
        let stamp = at.format("%Y%m%d_%H%M%S");
        let base = self.storage_dir.join(format!("{FILE_PREFIX}{stamp}.png"));
        if !base.exists() {
            return base;
        }

        // Same-second capture: never overwrite silently.
        warn!(path = %base.display(), "timestamp collision, disambiguating filename");
        for n in 1.. {
            let candidate = self
                .storage_dir
                .join(format!("{FILE_PREFIX}{stamp}_{n}.png"));
            if !candidate.exists() {
                return candidate;
            }
        }
        unreachable!("suffix space exhausted")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A valid 1x1 RGBA PNG.
    const PNG_1X1_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR4nGP4z8DwHwAFAAH/iZk9HQAAAABJRU5ErkJggg==";

    fn png_data_uri() -> String {
        format!("data:image/png;base64,{PNG_1X1_B64}")
    }

    #[test]
    fn decode_round_trips_byte_identical() {
        let bytes = decode_data_uri(&png_data_uri()).unwrap();
        let expected = base64::engine::general_purpose::STANDARD
            .decode(PNG_1X1_B64)
            .unwrap();
        assert_eq!(bytes, expected);
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn decode_rejects_missing_comma() {
        let err = decode_data_uri("data:image/png;base64").unwrap_err();
        assert!(matches!(err, MonitorError::MalformedDataUri { .. }));
        assert!(err.to_string().contains("no comma separator"));
    }

    #[test]
    fn decode_rejects_non_image_scheme() {
        let err = decode_data_uri("https://example.com/a.png").unwrap_err();
        assert!(matches!(err, MonitorError::MalformedDataUri { .. }));
    }

    #[test]
    fn decode_rejects_bad_base64() {
        let err = decode_data_uri("data:image/png;base64,!!!not-base64!!!").unwrap_err();
        assert!(matches!(err, MonitorError::Base64(_)));
    }

    #[test]
    fn decode_rejects_non_image_payload() {
        let payload = base64::engine::general_purpose::STANDARD.encode(b"just some text");
        let err = decode_data_uri(&format!("data:image/png;base64,{payload}")).unwrap_err();
        assert!(matches!(err, MonitorError::ImageDecode(_)));
    }

    #[test]
    fn new_creates_storage_dir() {
        let dir = tempfile::tempdir().unwrap();
        let storage = dir.path().join("downloaded_images");
        assert!(!storage.exists());
        let persister = ImagePersister::new(&storage).unwrap();
        assert!(storage.is_dir());
        assert_eq!(persister.storage_dir(), storage);
    }

    #[tokio::test]
    async fn save_writes_decodable_png() {
        let dir = tempfile::tempdir().unwrap();
        let persister = ImagePersister::new(dir.path().join("imgs")).unwrap();

        let path = persister.save(&png_data_uri()).await.unwrap();
        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with(FILE_PREFIX));
        assert!(name.ends_with(".png"));

        let bytes = std::fs::read(&path).unwrap();
        let img = image::load_from_memory(&bytes).unwrap();
        assert_eq!((img.width(), img.height()), (1, 1));
    }

    #[tokio::test]
    async fn save_rejects_malformed_uri_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = dir.path().join("imgs");
        let persister = ImagePersister::new(&storage).unwrap();

        assert!(persister.save("data:image/png;base64").await.is_err());
        let count = std::fs::read_dir(&storage).unwrap().count();
        assert_eq!(count, 0, "no partial file on decode failure");
    }

    #[tokio::test]
    async fn same_second_saves_never_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let persister = ImagePersister::new(dir.path().join("imgs")).unwrap();

        let first = persister.save(&png_data_uri()).await.unwrap();
        let second = persister.save(&png_data_uri()).await.unwrap();
        assert_ne!(first, second);
        assert!(first.exists());
        assert!(second.exists());
    }

    #[test]
    fn unique_path_suffixes_on_collision() {
        let dir = tempfile::tempdir().unwrap();
        let persister = ImagePersister::new(dir.path()).unwrap();
        let at = Local::now();

        let base = persister.unique_path(at);
        std::fs::write(&base, b"x").unwrap();
        let next = persister.unique_path(at);
        assert!(next.to_string_lossy().ends_with("_1.png"));

        std::fs::write(&next, b"x").unwrap();
        let third = persister.unique_path(at);
        assert!(third.to_string_lossy().ends_with("_2.png"));
    }

    #[test]
    fn filename_pattern_is_second_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let persister = ImagePersister::new(dir.path()).unwrap();
        let at = Local::now();
        let name = persister
            .unique_path(at)
            .file_name()
            .unwrap()
            .to_string_lossy()
            .to_string();
        // whatsapp_image_YYYYMMDD_HHMMSS.png
        assert_eq!(name.len(), FILE_PREFIX.len() + 8 + 1 + 6 + 4);
    }
}
