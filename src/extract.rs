//! Extraction entry points and the provider-bound client.
//!
//! [`ExtractionClient`] is the composition seam: it owns an explicitly
//! constructed provider plus the config, so "is the service configured?" is
//! answered once, when the client is built — not by module-level state
//! checked on every call. An unconfigured environment fails client
//! construction with [`Scan2CsvError::NotConfigured`] and never reaches the
//! network.
//!
//! The free functions (`extract`, `extract_from_bytes`, `extract_sync`,
//! `extract_to_csv_file`) are conveniences that build a client per call for
//! one-shot use, e.g. from the CLI.

use crate::config::ExtractionConfig;
use crate::csv_out;
use crate::error::Scan2CsvError;
use crate::output::{ExtractionOutput, ExtractionStats};
use crate::pipeline::{encode, input, llm, parse};
use edgequake_llm::{ImageData, LLMProvider, ProviderFactory};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// A credential-bound handle to the extraction service.
pub struct ExtractionClient {
    provider: Arc<dyn LLMProvider>,
    config: ExtractionConfig,
}

impl ExtractionClient {
    /// Build a client around a caller-constructed provider.
    ///
    /// Use this in tests or when the embedder needs custom middleware around
    /// the provider; no environment lookup happens.
    pub fn new(provider: Arc<dyn LLMProvider>, config: ExtractionConfig) -> Self {
        Self { provider, config }
    }

    /// Build a client by resolving a provider from the config/environment.
    ///
    /// This is where the configuration check lives: a missing credential
    /// surfaces here as [`Scan2CsvError::NotConfigured`], before any image
    /// is read or any request is issued.
    pub fn from_config(config: ExtractionConfig) -> Result<Self, Scan2CsvError> {
        let provider = resolve_provider(&config)?;
        Ok(Self { provider, config })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Run one extraction call on an already-encoded image.
    ///
    /// Exactly one request per invocation — no retry, no cache.
    pub async fn extract(&self, image: ImageData) -> Result<ExtractionOutput, Scan2CsvError> {
        let start = Instant::now();

        let response = llm::transcribe_image(&self.provider, image, &self.config).await?;
        let data = parse::parse_rows(&response.content, &self.config.schema)?;

        info!(
            "Extracted {} rows ({} columns) in {}ms",
            data.len(),
            data.headers().len(),
            response.duration_ms
        );

        Ok(ExtractionOutput {
            data,
            stats: ExtractionStats {
                input_tokens: response.input_tokens as u64,
                output_tokens: response.output_tokens as u64,
                llm_duration_ms: response.duration_ms,
                total_duration_ms: start.elapsed().as_millis() as u64,
            },
        })
    }

    /// Resolve, encode, and extract in one step from a path or URL.
    pub async fn extract_input(
        &self,
        input_str: impl AsRef<str>,
    ) -> Result<ExtractionOutput, Scan2CsvError> {
        let total_start = Instant::now();
        let source =
            input::resolve_input(input_str.as_ref(), self.config.download_timeout_secs).await?;
        let image = encode::encode_image(&source);
        let mut output = self.extract(image).await?;
        output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
        Ok(output)
    }
}

/// Extract a handwritten table from an image file or URL.
///
/// This is the primary one-shot entry point for the library.
///
/// # Errors
/// - Validation: the file is not a JPEG/PNG
/// - `NotConfigured`: no provider credential available
/// - `MalformedResponse`: the model's answer was not the expected JSON
/// - `Service`: any other failure of the call
pub async fn extract(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Scan2CsvError> {
    let client = ExtractionClient::from_config(config.clone())?;
    client.extract_input(input_str).await
}

/// Extract from image bytes already in memory (e.g. a form upload).
pub async fn extract_from_bytes(
    bytes: &[u8],
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Scan2CsvError> {
    let client = ExtractionClient::from_config(config.clone())?;
    let source = input::SourceImage::from_bytes(bytes.to_vec())?;
    let image = encode::encode_image(&source);
    client.extract(image).await
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Scan2CsvError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Scan2CsvError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(extract(input_str, config))
}

/// Extract and write the CSV artifact directly to a file.
///
/// Uses an atomic write (temp file + rename) to prevent partial files.
/// When the model finds no rows, no file is created and the stats still
/// report the call.
pub async fn extract_to_csv_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Scan2CsvError> {
    let output = extract(input_str, config).await?;
    csv_out::write_csv_file(output_path, &output.data).await?;
    Ok(output)
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Instantiate a named provider with the given model.
fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, Scan2CsvError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        Scan2CsvError::NotConfigured {
            hint: format!("Provider '{provider_name}' is unavailable: {e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// The fallback chain lets library users and CLI users each set exactly as
/// much as they need:
///
/// 1. **Pre-built provider** (`config.provider`) — used as-is.
/// 2. **Named provider + model** (`config.provider_name`) — the factory
///    reads the corresponding API key from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`) —
///    honoured before full auto-detection so an explicit model choice wins
///    even when multiple API keys are present.
/// 4. **`OPENAI_API_KEY`**, then **full auto-detection** — convenient for
///    `scan2csv photo.jpg` with no other configuration.
fn resolve_provider(config: &ExtractionConfig) -> Result<Arc<dyn LLMProvider>, Scan2CsvError> {
    // 1) User-provided provider takes priority
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    // 2) Provider name + model
    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or("gpt-4.1-nano");
        return create_vision_provider(name, model);
    }

    // 3) Explicit env pair
    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    // Prefer OpenAI explicitly when an OpenAI key is present, so users with
    // multiple provider keys get a deterministic default.
    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or("gpt-4.1-nano");
            return create_vision_provider("openai", model);
        }
    }

    // 4) Full auto-detection
    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| Scan2CsvError::NotConfigured {
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                 Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                 Error: {e}"
            ),
        })?;

    Ok(llm_provider)
}
