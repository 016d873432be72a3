//! # scan2csv
//!
//! Extract handwritten tables from photos into CSV using Vision Language
//! Models (VLMs).
//!
//! ## Why this crate?
//!
//! Classic OCR engines fall apart on handwriting — slanted rows, crossed-out
//! cells, and fraction-heavy measurements come out as noise. Instead this
//! crate sends the photo to a VLM that reads the table as a human would and
//! answers with structured JSON rows, which are then validated and
//! serialized as RFC-4180-style CSV.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Photo (JPEG/PNG)
//!  │
//!  ├─ 1. Input    resolve local file or download from URL, sniff format
//!  ├─ 2. Encode   bytes → base64 image payload
//!  ├─ 3. VLM      one call to gpt-4.1-nano / claude / gemini / …
//!  ├─ 4. Parse    JSON → ordered rows (fixed schema or dynamic headers)
//!  └─ 5. Output   CSV text / extracted_data.csv
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scan2csv::{extract, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = ExtractionConfig::default();
//!     let output = extract("worksheet.jpg", &config).await?;
//!     println!("{}", scan2csv::to_csv(&output.data)?);
//!     eprintln!("tokens: {} in / {} out",
//!         output.stats.input_tokens,
//!         output.stats.output_tokens);
//!     Ok(())
//! }
//! ```
//!
//! ## Schema Policies
//!
//! Two output-shape policies are supported, chosen per
//! [`config::SchemaPolicy`]:
//!
//! * **Dynamic headers** (default) — columns are whatever the model reads
//!   off the sheet's own header row; downstream code treats them as data.
//! * **Fixed schema** — every row must carry exactly a predeclared key set
//!   (canonically `row, J, K, L`); a response that cannot satisfy it fails
//!   as a malformed response.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `scan2csv` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! scan2csv = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod csv_out;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod session;
pub mod table;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, SchemaPolicy, DEFAULT_FIXED_COLUMNS};
pub use csv_out::{to_csv, write_csv_file, CSV_MIME, DEFAULT_CSV_FILENAME};
pub use error::Scan2CsvError;
pub use extract::{
    extract, extract_from_bytes, extract_sync, extract_to_csv_file, ExtractionClient,
};
pub use output::{ExtractionOutput, ExtractionStats};
pub use session::{session_from_config, Phase, Session};
pub use table::{TableData, TableRow};
