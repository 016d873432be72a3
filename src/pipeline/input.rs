//! Input resolution: normalise a user-supplied path or URL to image bytes.
//!
//! The claimed file extension or MIME label is never trusted on its own:
//! the bytes are sniffed with [`image::guess_format`] and anything that is
//! not a JPEG or PNG is rejected before a single network byte is spent on
//! the model call. URL inputs are downloaded into memory (images are a few
//! MB at most, unlike documents there is no renderer needing a file path).

use crate::error::Scan2CsvError;
use std::path::PathBuf;
use tracing::{debug, info};

/// The two image types the extraction service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMime {
    Jpeg,
    Png,
}

impl ImageMime {
    /// Canonical MIME string sent to the provider.
    pub fn as_str(self) -> &'static str {
        match self {
            ImageMime::Jpeg => "image/jpeg",
            ImageMime::Png => "image/png",
        }
    }

    /// Parse a browser-style MIME label. `image/jpg` is a common non-standard
    /// spelling and is accepted as JPEG.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(ImageMime::Jpeg),
            "image/png" => Some(ImageMime::Png),
            _ => None,
        }
    }
}

/// An image accepted into the pipeline: validated bytes plus their type.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub bytes: Vec<u8>,
    pub mime: ImageMime,
}

impl SourceImage {
    /// Validate raw bytes by sniffing their actual format.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, Scan2CsvError> {
        let mime = sniff_mime(&bytes)?;
        Ok(Self { bytes, mime })
    }
}

/// Determine the image type from magic bytes.
///
/// Fails with a validation error for any format other than JPEG/PNG, and for
/// byte streams that are not an image at all.
pub fn sniff_mime(bytes: &[u8]) -> Result<ImageMime, Scan2CsvError> {
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Jpeg) => Ok(ImageMime::Jpeg),
        Ok(image::ImageFormat::Png) => Ok(ImageMime::Png),
        Ok(other) => Err(Scan2CsvError::UnsupportedImageType {
            detail: format!("{other:?}"),
        }),
        Err(_) => Err(Scan2CsvError::UnsupportedImageType {
            detail: "not a recognisable image".into(),
        }),
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to validated image bytes.
///
/// If the input is a URL, download it. If it is a local file, read it and
/// validate the magic bytes.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<SourceImage, Scan2CsvError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

/// Read a local file, mapping I/O failures onto the input-error variants.
fn resolve_local(path_str: &str) -> Result<SourceImage, Scan2CsvError> {
    let path = PathBuf::from(path_str);

    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Scan2CsvError::FileNotFound { path });
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Scan2CsvError::PermissionDenied { path });
        }
        Err(e) => {
            return Err(Scan2CsvError::ReadFailed { path, source: e });
        }
    };

    debug!("Read local image: {} ({} bytes)", path.display(), bytes.len());
    SourceImage::from_bytes(bytes)
}

/// Download a URL into memory and validate the bytes.
async fn download_url(url: &str, timeout_secs: u64) -> Result<SourceImage, Scan2CsvError> {
    info!("Downloading image from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Scan2CsvError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            Scan2CsvError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            Scan2CsvError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(Scan2CsvError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Scan2CsvError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes", bytes.len());
    SourceImage::from_bytes(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Smallest valid signatures: enough for guess_format, which only reads
    // the magic bytes.
    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/scan.jpg"));
        assert!(is_url("http://example.com/scan.jpg"));
        assert!(!is_url("/tmp/scan.jpg"));
        assert!(!is_url("scan.jpg"));
        assert!(!is_url(""));
    }

    #[test]
    fn sniff_accepts_png_and_jpeg() {
        assert_eq!(sniff_mime(PNG_MAGIC).unwrap(), ImageMime::Png);
        assert_eq!(sniff_mime(JPEG_MAGIC).unwrap(), ImageMime::Jpeg);
    }

    #[test]
    fn sniff_rejects_text() {
        let err = sniff_mime(b"just some notes,nothing tabular").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn sniff_rejects_other_image_formats() {
        // GIF89a header: a real image, but not an accepted type.
        let err = sniff_mime(b"GIF89a\x01\x00\x01\x00").unwrap_err();
        assert!(matches!(err, Scan2CsvError::UnsupportedImageType { .. }));
    }

    #[test]
    fn label_parsing_accepts_the_three_spellings() {
        assert_eq!(ImageMime::from_label("image/jpeg"), Some(ImageMime::Jpeg));
        assert_eq!(ImageMime::from_label("image/jpg"), Some(ImageMime::Jpeg));
        assert_eq!(ImageMime::from_label("IMAGE/PNG"), Some(ImageMime::Png));
        assert_eq!(ImageMime::from_label("text/plain"), None);
        assert_eq!(ImageMime::from_label("image/gif"), None);
    }

    #[test]
    fn missing_file_maps_to_file_not_found() {
        let err = resolve_local("/definitely/not/here.png").unwrap_err();
        assert!(matches!(err, Scan2CsvError::FileNotFound { .. }));
    }

    #[test]
    fn local_png_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.png");
        std::fs::write(&path, PNG_MAGIC).unwrap();

        let src = resolve_local(path.to_str().unwrap()).unwrap();
        assert_eq!(src.mime, ImageMime::Png);
        assert_eq!(src.bytes, PNG_MAGIC);
    }
}
