//! Configuration types for table extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs, log them, and diff two runs to understand why
//! their outputs differ.

use crate::error::Scan2CsvError;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The canonical fixed column set observed on the target worksheets.
pub const DEFAULT_FIXED_COLUMNS: [&str; 4] = ["row", "J", "K", "L"];

/// How the model's output shape is constrained.
///
/// The two policies are functionally equivalent contracts; which one fits
/// depends on whether the caller knows the worksheet layout up front.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SchemaPolicy {
    /// Headers are whatever keys appear on the first returned row, in the
    /// order the model emitted them. (default)
    #[default]
    Dynamic,
    /// Every returned object must carry exactly these keys; extraction fails
    /// with a malformed-response error if the model cannot satisfy them.
    Fixed(Vec<String>),
}

impl SchemaPolicy {
    /// Fixed policy with the canonical `row, J, K, L` column set.
    pub fn fixed_default() -> Self {
        SchemaPolicy::Fixed(DEFAULT_FIXED_COLUMNS.iter().map(|s| s.to_string()).collect())
    }
}

/// Configuration for one extraction pipeline.
///
/// Built via [`ExtractionConfig::builder()`] or [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use scan2csv::{ExtractionConfig, SchemaPolicy};
///
/// let config = ExtractionConfig::builder()
///     .model("gpt-4.1-nano")
///     .schema(SchemaPolicy::fixed_default())
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// LLM model identifier, e.g. "gpt-4.1-nano", "claude-sonnet-4-20250514".
    /// If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, auto-detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    ///
    /// This is the dependency-injection seam: tests and embedders pass a
    /// provider they built themselves and no environment lookup happens.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for the completion. Default: 0.1.
    ///
    /// Near-zero keeps the model faithful to what is written on the page,
    /// which is exactly what transcription wants.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 4096.
    ///
    /// Dense worksheets can exceed 1 000 output tokens; too small a cap
    /// silently truncates the JSON array mid-row and fails parsing.
    pub max_tokens: usize,

    /// Custom system prompt. If None, uses the built-in transcription prompt.
    pub system_prompt: Option<String>,

    /// Output-shape policy: fixed column set or dynamic headers.
    pub schema: SchemaPolicy,

    /// Download timeout for URL inputs in seconds. Default: 120.
    ///
    /// This bounds only the image download. The model call itself has no
    /// imposed timeout: a single extraction is in flight at a time and the
    /// caller waits for completion or failure.
    pub download_timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 4096,
            system_prompt: None,
            schema: SchemaPolicy::default(),
            download_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("schema", &self.schema)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn schema(mut self, policy: SchemaPolicy) -> Self {
        self.config.schema = policy;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, Scan2CsvError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(Scan2CsvError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if let SchemaPolicy::Fixed(ref columns) = c.schema {
            if columns.is_empty() {
                return Err(Scan2CsvError::InvalidConfig(
                    "Fixed schema needs at least one column name".into(),
                ));
            }
            if columns.iter().any(|c| c.trim().is_empty()) {
                return Err(Scan2CsvError::InvalidConfig(
                    "Fixed schema column names must be non-empty".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schema_is_dynamic() {
        let config = ExtractionConfig::default();
        assert_eq!(config.schema, SchemaPolicy::Dynamic);
        assert_eq!(config.max_tokens, 4096);
    }

    #[test]
    fn fixed_default_columns() {
        let SchemaPolicy::Fixed(cols) = SchemaPolicy::fixed_default() else {
            panic!("expected fixed policy");
        };
        assert_eq!(cols, vec!["row", "J", "K", "L"]);
    }

    #[test]
    fn builder_rejects_empty_fixed_schema() {
        let err = ExtractionConfig::builder()
            .schema(SchemaPolicy::Fixed(vec![]))
            .build()
            .unwrap_err();
        assert!(matches!(err, Scan2CsvError::InvalidConfig(_)));
    }

    #[test]
    fn builder_clamps_temperature() {
        let config = ExtractionConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(config.temperature, 2.0);
    }
}
