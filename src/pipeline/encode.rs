//! Image encoding: validated bytes → base64 `ImageData`.
//!
//! VLM APIs (OpenAI, Anthropic, Gemini) accept images as base64 payloads
//! embedded in the JSON request body. The user's photo is sent as-is — no
//! re-compression, since JPEG artefacts on pencil strokes are exactly what
//! degrades handwriting legibility. `detail: "high"` instructs GPT-4-class
//! models to use the full image tile budget; without it small handwriting
//! in table cells is lost.

use crate::pipeline::input::SourceImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use tracing::debug;

/// Encode a validated image as a base64 payload ready for the VLM API.
pub fn encode_image(source: &SourceImage) -> ImageData {
    let b64 = STANDARD.encode(&source.bytes);
    debug!("Encoded image → {} bytes base64", b64.len());
    ImageData::new(b64, source.mime.as_str()).with_detail("high")
}

/// Strip a `data:<mime>;base64,` prefix, if present, returning the raw
/// base64 payload.
///
/// Browser file readers hand over data-URLs; the wire format wants only the
/// payload. Strings without the prefix pass through unchanged.
pub fn strip_data_url_prefix(s: &str) -> &str {
    if s.starts_with("data:") {
        match s.split_once(',') {
            Some((_, payload)) => payload,
            None => s,
        }
    } else {
        s
    }
}
