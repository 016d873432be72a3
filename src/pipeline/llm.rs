//! VLM interaction: build the vision message and call the provider.
//!
//! This module converts an encoded image into exactly one VLM API call and
//! returns the raw model text. It is intentionally thin — all prompt
//! engineering lives in [`crate::prompts`] so it can be changed without
//! touching the call or error-mapping logic here.
//!
//! There is no retry loop: a failed attempt is terminal for that user
//! action, and re-triggering is an explicit user decision. Identical images
//! produce independent calls; nothing is cached.

use crate::config::ExtractionConfig;
use crate::error::Scan2CsvError;
use crate::prompts::{schema_instruction, DEFAULT_SYSTEM_PROMPT};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// The raw outcome of one transcription call.
#[derive(Debug, Clone)]
pub struct TranscriptionResponse {
    /// Unparsed model output, expected to be a JSON array.
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
}

/// Send the image to the model and return its raw textual answer.
///
/// ## Message Layout
///
/// 1. **System message** — the transcription prompt (or user-supplied
///    override) with the schema instruction for the active policy appended
/// 2. **User message** — the photo as a base64 image attachment (empty text)
///
/// The empty user text is intentional: VLM APIs require at least one user
/// turn to respond to, but the image carries all the actual content.
pub async fn transcribe_image(
    provider: &Arc<dyn LLMProvider>,
    image: ImageData,
    config: &ExtractionConfig,
) -> Result<TranscriptionResponse, Scan2CsvError> {
    let start = Instant::now();

    let base_prompt = config
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);
    let system_prompt = format!("{}{}", base_prompt, schema_instruction(&config.schema));

    let messages = vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user_with_images("", vec![image]),
    ];

    let options = build_options(config);

    match provider.chat(&messages, Some(&options)).await {
        Ok(response) => {
            let duration = start.elapsed();
            debug!(
                "Transcription: {} input tokens, {} output tokens, {:?}",
                response.prompt_tokens, response.completion_tokens, duration
            );
            Ok(TranscriptionResponse {
                content: response.content,
                input_tokens: response.prompt_tokens,
                output_tokens: response.completion_tokens,
                duration_ms: duration.as_millis() as u64,
            })
        }
        Err(e) => {
            let message = format!("{e}");
            warn!("Transcription call failed — {}", message);
            Err(Scan2CsvError::Service { message })
        }
    }
}

/// Build `CompletionOptions` from the extraction config.
fn build_options(config: &ExtractionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_defaults() {
        let config = ExtractionConfig::default();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.1));
        assert_eq!(opts.max_tokens, Some(4096));
    }
}
