//! Session state machine: the command layer a UI front-end drives.
//!
//! One session tracks one in-flight extraction at a time:
//!
//! ```text
//! Idle ──select──▶ Ready ──begin──▶ Loading ──complete(Ok)──▶ Reviewed
//!                    ▲                  │
//!                    │                  └──complete(Err)────▶ Errored
//!                    └───── select (new image, from any terminal state)
//! ```
//!
//! The model call is the only suspension point, modeled as a plain
//! begin/complete command pair so an embedder can dispatch the future on
//! whatever executor it owns; [`Session::run_extraction`] composes the pair
//! with an [`ExtractionClient`] for the common case. While `Loading`, every
//! other command is a no-op — a UI disables its affordances, and a second
//! extraction can simply never start, so no locking is involved.
//!
//! Configuration is decided once, at construction. An unconfigured session
//! refuses to begin an extraction for its whole lifetime and shows the
//! fixed configuration message instead; there is no re-check path short of
//! rebuilding the session.
//!
//! Every pipeline error is reduced here to a single human-readable string
//! ([`Session::status_message`]); no structured codes reach the renderer.

use crate::config::ExtractionConfig;
use crate::csv_out;
use crate::error::Scan2CsvError;
use crate::extract::ExtractionClient;
use crate::output::ExtractionStats;
use crate::pipeline::encode;
use crate::pipeline::input::{ImageMime, SourceImage};
use crate::table::TableData;
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::path::Path;
use tracing::debug;

/// Where the session is in its one-extraction lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing selected yet.
    Idle,
    /// A valid image is selected; extraction may be invoked.
    Ready,
    /// The one outbound call is in flight; all commands are no-ops.
    Loading,
    /// Extraction succeeded; rows are available for review and download.
    Reviewed,
    /// Extraction failed; the message explains why. Re-enterable by
    /// selecting a new image.
    Errored,
}

/// The currently selected image plus its decoded preview.
///
/// The preview is owned here and dropped wholesale when a new selection
/// supersedes it, so stale pixel buffers never accumulate.
struct Selected {
    source: SourceImage,
    preview: DynamicImage,
}

/// State for a single-user extraction flow.
pub struct Session {
    configured: bool,
    phase: Phase,
    selected: Option<Selected>,
    data: Option<TableData>,
    stats: Option<ExtractionStats>,
    message: Option<String>,
}

impl Session {
    /// Create a session. `configured` is decided once at startup — e.g.
    /// `ExtractionClient::from_config(..).is_ok()` — and never re-checked.
    pub fn new(configured: bool) -> Self {
        Self {
            configured,
            phase: Phase::Idle,
            selected: None,
            data: None,
            stats: None,
            message: if configured {
                None
            } else {
                Some(not_configured_error().to_string())
            },
        }
    }

    // ── Commands ──────────────────────────────────────────────────────────

    /// Select a new image from a file picker.
    ///
    /// `claimed_mime` is the picker's label (`image/jpeg`, `image/jpg`,
    /// `image/png`); the bytes are additionally sniffed and decoded. A valid
    /// selection clears prior rows and errors and moves to `Ready`. An
    /// invalid one clears the selection and preview, records a validation
    /// message, and leaves prior rows untouched.
    pub fn select_image(
        &mut self,
        claimed_mime: &str,
        bytes: Vec<u8>,
    ) -> Result<(), Scan2CsvError> {
        if self.phase == Phase::Loading {
            return Ok(());
        }

        if ImageMime::from_label(claimed_mime).is_none() {
            return Err(self.reject_selection(Scan2CsvError::UnsupportedImageType {
                detail: claimed_mime.to_string(),
            }));
        }

        let source = match SourceImage::from_bytes(bytes) {
            Ok(source) => source,
            Err(e) => return Err(self.reject_selection(e)),
        };

        let preview = match image::load_from_memory(&source.bytes) {
            Ok(img) => img,
            Err(e) => {
                return Err(self.reject_selection(Scan2CsvError::UnsupportedImageType {
                    detail: format!("image could not be decoded: {e}"),
                }));
            }
        };

        debug!(
            "Selected {} image, preview {}×{}",
            source.mime.as_str(),
            preview.width(),
            preview.height()
        );

        // Replacing `selected` drops the previous preview buffer.
        self.selected = Some(Selected { source, preview });
        self.data = None;
        self.stats = None;
        self.message = None;
        self.phase = Phase::Ready;
        Ok(())
    }

    /// Begin an extraction: encode the selected image and move to `Loading`.
    ///
    /// Returns the payload the caller dispatches to the service. Refused —
    /// with the configuration message taking precedence — unless the session
    /// is configured and `Ready`.
    pub fn begin_extraction(&mut self) -> Result<ImageData, Scan2CsvError> {
        if self.phase == Phase::Loading {
            return Err(Scan2CsvError::Internal(
                "an extraction is already in flight".into(),
            ));
        }
        if !self.configured {
            let err = not_configured_error();
            self.message = Some(err.to_string());
            return Err(err);
        }
        let Some(ref selected) = self.selected else {
            let err = Scan2CsvError::NoImageSelected;
            self.message = Some(err.to_string());
            return Err(err);
        };

        let image = encode::encode_image(&selected.source);
        self.phase = Phase::Loading;
        Ok(image)
    }

    /// Complete the in-flight extraction with the call's outcome.
    ///
    /// Ignored unless the session is `Loading`.
    pub fn complete_extraction(
        &mut self,
        result: Result<(TableData, ExtractionStats), Scan2CsvError>,
    ) {
        if self.phase != Phase::Loading {
            return;
        }
        match result {
            Ok((data, stats)) => {
                self.data = Some(data);
                self.stats = Some(stats);
                self.message = None;
                self.phase = Phase::Reviewed;
            }
            Err(e) => {
                self.message = Some(e.to_string());
                self.phase = Phase::Errored;
            }
        }
    }

    /// Run the full begin → call → complete cycle against a client.
    pub async fn run_extraction(&mut self, client: &ExtractionClient) {
        let image = match self.begin_extraction() {
            Ok(image) => image,
            // Guard already recorded the message; nothing was dispatched.
            Err(_) => return,
        };
        let result = client
            .extract(image)
            .await
            .map(|output| (output.data, output.stats));
        self.complete_extraction(result);
    }

    /// Serialize the reviewed rows as CSV text.
    ///
    /// `None` until a non-empty extraction has completed.
    pub fn csv(&self) -> Result<Option<String>, Scan2CsvError> {
        match self.data {
            Some(ref data) if !data.is_empty() => csv_out::to_csv(data).map(Some),
            _ => Ok(None),
        }
    }

    /// Write the reviewed rows to a CSV file. A no-op (`Ok(false)`) when
    /// there is nothing to download.
    pub async fn write_csv(&self, path: impl AsRef<Path>) -> Result<bool, Scan2CsvError> {
        match self.data {
            Some(ref data) => csv_out::write_csv_file(path, data).await,
            None => Ok(false),
        }
    }

    // ── Accessors for a renderer ──────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Whether the "Extract" affordance should be enabled.
    ///
    /// True from `Ready` and from the terminal states (the user may
    /// manually re-trigger with the same image), never while `Loading`
    /// or unconfigured.
    pub fn can_extract(&self) -> bool {
        self.configured && self.selected.is_some() && self.phase != Phase::Loading
    }

    /// Whether the "Download CSV" affordance should be enabled.
    pub fn can_download(&self) -> bool {
        self.data.as_ref().is_some_and(|d| !d.is_empty())
    }

    /// Extracted rows, if an extraction has completed.
    pub fn data(&self) -> Option<&TableData> {
        self.data.as_ref()
    }

    pub fn stats(&self) -> Option<&ExtractionStats> {
        self.stats.as_ref()
    }

    /// Decoded preview of the current selection.
    pub fn preview(&self) -> Option<&DynamicImage> {
        self.selected.as_ref().map(|s| &s.preview)
    }

    /// The single human-readable string shown in the results panel, if any.
    pub fn status_message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    // ── Internal ──────────────────────────────────────────────────────────

    /// Record a failed selection: clear image + preview, keep prior rows.
    fn reject_selection(&mut self, err: Scan2CsvError) -> Scan2CsvError {
        self.selected = None;
        self.message = Some(err.to_string());
        self.phase = if self.data.is_some() {
            Phase::Reviewed
        } else {
            Phase::Idle
        };
        err
    }
}

/// The fixed configuration error surfaced by unconfigured sessions.
fn not_configured_error() -> Scan2CsvError {
    Scan2CsvError::NotConfigured {
        hint: "Set OPENAI_API_KEY (or another provider key) and restart.".into(),
    }
}

/// Shared helper: build a session whose configuration flag reflects the
/// environment, the way a composition root would.
pub fn session_from_config(config: &ExtractionConfig) -> (Session, Option<ExtractionClient>) {
    match ExtractionClient::from_config(config.clone()) {
        Ok(client) => (Session::new(true), Some(client)),
        Err(_) => (Session::new(false), None),
    }
}
