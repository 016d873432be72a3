//! Error types for the scan2csv library.
//!
//! Every failure a user can hit maps onto one of four families:
//!
//! * **Validation** — the selected file is not a JPEG/PNG, or nothing was
//!   selected at all. Caught before any encoding or network work happens.
//! * **Configuration** — no usable provider credential. Detected when the
//!   client is constructed, never mid-call, so an unconfigured session can
//!   refuse extraction without ever touching the network.
//! * **Service** — the one outbound call failed, either because the model
//!   answered with something that is not the expected JSON
//!   ([`Scan2CsvError::MalformedResponse`]) or for any other transport/API
//!   reason ([`Scan2CsvError::Service`]).
//! * **I/O** — reading the input image or writing the CSV artifact.
//!
//! A single extraction is terminal: nothing here is retried automatically.
//! All variants reduce to their `Display` string at the session boundary;
//! no structured codes are surfaced to the user.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the scan2csv library.
#[derive(Debug, Error)]
pub enum Scan2CsvError {
    // ── Validation errors ─────────────────────────────────────────────────
    /// The selected file is not one of the accepted image types.
    #[error("Unsupported file type ({detail}). Please select a JPEG or PNG image.")]
    UnsupportedImageType { detail: String },

    /// Extraction was requested before any image was selected.
    #[error("No image selected. Choose a JPEG or PNG photo of the table first.")]
    NoImageSelected,

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but could not be read.
    #[error("Failed to read image '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Configuration errors ──────────────────────────────────────────────
    /// No provider credential is available (missing API key etc.).
    ///
    /// Raised at client-construction time, before any network call. Once a
    /// session sees this, extraction stays disabled for its lifetime.
    #[error("Extraction service is not configured.\n{hint}")]
    NotConfigured { hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Service errors ────────────────────────────────────────────────────
    /// The model answered, but not with parseable table JSON.
    ///
    /// The `Display` text is deliberately fixed and user-facing; the raw
    /// parser detail is kept on the variant for logging only.
    #[error(
        "The service returned data in an unexpected format. \
         Please try again, possibly with a clearer image."
    )]
    MalformedResponse { detail: String },

    /// Any other failure of the extraction call (transport, auth, quota…).
    #[error("Extraction failed: {message}")]
    Service { message: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the output CSV file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Scan2CsvError {
    /// True for the two validation variants a UI clears on the next valid
    /// file selection.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Scan2CsvError::UnsupportedImageType { .. } | Scan2CsvError::NoImageSelected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_response_display_is_fixed() {
        let e = Scan2CsvError::MalformedResponse {
            detail: "expected value at line 1 column 1".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("unexpected format"), "got: {msg}");
        // The raw parser detail must never leak into the user-facing text.
        assert!(!msg.contains("line 1 column 1"), "got: {msg}");
    }

    #[test]
    fn not_configured_display_carries_hint() {
        let e = Scan2CsvError::NotConfigured {
            hint: "Set OPENAI_API_KEY".into(),
        };
        assert!(e.to_string().contains("not configured"));
        assert!(e.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn unsupported_type_is_validation() {
        let e = Scan2CsvError::UnsupportedImageType {
            detail: "text/plain".into(),
        };
        assert!(e.is_validation());
        assert!(!Scan2CsvError::Internal("x".into()).is_validation());
    }

    #[test]
    fn service_display_wraps_message() {
        let e = Scan2CsvError::Service {
            message: "HTTP 503 from provider".into(),
        };
        assert!(e.to_string().contains("HTTP 503"));
    }
}
