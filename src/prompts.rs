//! System prompts for VLM-based handwriting transcription.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing how tables are transcribed (e.g.
//!    tightening the JSON rules) requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect prompts directly without
//!    spinning up a real VLM, making prompt regressions easy to catch.
//!
//! Callers can override the default via
//! [`crate::config::ExtractionConfig::system_prompt`]; the constants here are
//! used only when no override is provided. The schema instruction is always
//! appended, because the parser depends on the output shape it demands.

use crate::config::SchemaPolicy;

/// Default system prompt for transcribing a handwritten table image to JSON.
///
/// This prompt is used when `ExtractionConfig::system_prompt` is `None`.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an expert at reading handwritten documents. Your task is to transcribe the handwritten table in the image into JSON.

Follow these rules precisely:

1. TRANSCRIPTION
   - Transcribe every row of the table, top to bottom, exactly as written
   - Keep cell values as strings, preserving units, fractions, and punctuation
   - Use an empty string "" for cells that are blank or illegible

2. STRUCTURE
   - Output a JSON array of objects, one object per table row
   - Every object maps a column name to that row's cell value
   - Do not invent rows or columns that are not in the image

3. OUTPUT FORMAT
   - Output ONLY the JSON array
   - Do NOT wrap it in ```json fences
   - Do NOT add commentary or explanations"#;

/// Schema instruction appended after the system prompt.
///
/// For a fixed policy the exact key set is spelled out; for the dynamic
/// policy the model is told to derive keys from the table's own header row.
pub fn schema_instruction(policy: &SchemaPolicy) -> String {
    match policy {
        SchemaPolicy::Dynamic => "\n4. COLUMNS\n   \
            Use the table's own header row as the object keys. If the table \
            has no header row, use short descriptive keys and apply the same \
            keys to every object."
            .to_string(),
        SchemaPolicy::Fixed(columns) => {
            let keys = columns
                .iter()
                .map(|c| format!("\"{c}\""))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "\n4. COLUMNS\n   \
                 Every object must contain exactly the keys {keys}, in that \
                 order, and no others. Use \"\" for any value you cannot read."
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_instruction_names_every_column() {
        let policy = SchemaPolicy::fixed_default();
        let text = schema_instruction(&policy);
        for key in ["\"row\"", "\"J\"", "\"K\"", "\"L\""] {
            assert!(text.contains(key), "missing {key} in: {text}");
        }
    }

    #[test]
    fn dynamic_instruction_defers_to_header_row() {
        let text = schema_instruction(&SchemaPolicy::Dynamic);
        assert!(text.contains("header row"));
    }

    #[test]
    fn default_prompt_demands_bare_json() {
        assert!(DEFAULT_SYSTEM_PROMPT.contains("JSON array"));
        assert!(DEFAULT_SYSTEM_PROMPT.contains("Do NOT wrap"));
    }
}
