//! Detection service port.
//!
//! The service receives one encoded image and answers with an untyped JSON
//! object. Nothing here interprets the response; that is the job of
//! `detect::normalize_response`.

use anyhow::{anyhow, Context, Result};
use base64::Engine;
use serde_json::Value;
use std::path::Path;

#[cfg(feature = "service-http")]
mod http;

#[cfg(feature = "service-http")]
pub use http::HttpDetectionService;

/// Image as sent to the service and stored in history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImagePayload {
    /// `data:<mime>;base64,<bytes>` encoding of the image.
    pub data_url: String,
    pub filename: String,
}

impl ImagePayload {
    pub fn from_bytes(bytes: &[u8], mime: &str, filename: &str) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Self {
            data_url: format!("data:{};base64,{}", mime, encoded),
            filename: filename.to_string(),
        }
    }

    /// Read an image file, inferring the MIME type from its extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read image {}", path.display()))?;
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| anyhow!("image path {} has no file name", path.display()))?;
        Ok(Self::from_bytes(&bytes, mime_for_path(path), filename))
    }
}

fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("tif") | Some("tiff") => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// Remote detection call.
pub trait DetectionService {
    fn name(&self) -> &'static str;

    /// Submit one image and return the raw response.
    fn detect(&mut self, image: &ImagePayload) -> Result<Value>;
}

/// Replays a fixed response. Used for offline analysis of saved service
/// output and in tests.
#[derive(Clone, Debug)]
pub struct CannedDetectionService {
    response: Value,
}

impl CannedDetectionService {
    pub fn new(response: Value) -> Self {
        Self { response }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read response file {}", path.display()))?;
        let response = serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid response file {}: {}", path.display(), e))?;
        Ok(Self::new(response))
    }
}

impl DetectionService for CannedDetectionService {
    fn name(&self) -> &'static str {
        "canned"
    }

    fn detect(&mut self, _image: &ImagePayload) -> Result<Value> {
        Ok(self.response.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_carries_mime_and_base64() {
        let payload = ImagePayload::from_bytes(b"abc", "image/png", "a.png");
        assert_eq!(payload.data_url, "data:image/png;base64,YWJj");
        assert_eq!(payload.filename, "a.png");
    }

    #[test]
    fn mime_follows_extension() {
        assert_eq!(mime_for_path(Path::new("x/IMG_01.JPG")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("scan.png")), "image/png");
        assert_eq!(mime_for_path(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn from_path_reads_file() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join("sample.jpeg");
        std::fs::write(&path, b"\xff\xd8\xff")?;
        let payload = ImagePayload::from_path(&path)?;
        assert!(payload.data_url.starts_with("data:image/jpeg;base64,"));
        assert_eq!(payload.filename, "sample.jpeg");
        Ok(())
    }
}
