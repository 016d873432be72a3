//! Output types returned by the extraction entry points.

use crate::table::TableData;
use serde::{Deserialize, Serialize};

/// The result of one extraction call: the rows plus call accounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// Transcribed rows, in source order. May be empty when the model found
    /// no tabular content.
    pub data: TableData,
    pub stats: ExtractionStats,
}

/// Token and timing accounting for one extraction.
///
/// Useful for cost estimation: a typical worksheet photo costs roughly
/// 1 500 input tokens and a few hundred output tokens.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Wall-clock time of the model call alone.
    pub llm_duration_ms: u64,
    /// End-to-end time including input resolution and parsing.
    pub total_duration_ms: u64,
}
