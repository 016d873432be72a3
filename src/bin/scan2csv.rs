//! CLI binary for scan2csv.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use scan2csv::{
    extract, to_csv, write_csv_file, ExtractionConfig, SchemaPolicy, DEFAULT_CSV_FILENAME,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Transcribe a photo, CSV to stdout
  scan2csv worksheet.jpg

  # Write the standard artifact (extracted_data.csv)
  scan2csv worksheet.jpg --save

  # Write to a chosen file
  scan2csv worksheet.jpg -o site_log.csv

  # Enforce the fixed four-column worksheet layout
  scan2csv --schema fixed worksheet.jpg

  # Custom fixed columns
  scan2csv --columns "item,qty,price" receipt.png

  # Use a specific model
  scan2csv --model gpt-4.1 --provider openai worksheet.jpg

  # Transcribe from a URL, rows as JSON
  scan2csv --json https://example.com/scan.png

SUPPORTED PROVIDERS & MODELS:
  Provider     Model                        Vision
  ─────────    ───────────────────────────  ──────
  openai       gpt-4.1-nano (default)       ✓
  openai       gpt-4.1-mini, gpt-4.1        ✓
  anthropic    claude-sonnet-4-20250514     ✓
  gemini       gemini-2.0-flash             ✓
  ollama       llava, llama3.2-vision       ✓

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID

SETUP:
  1. Set API key:     export OPENAI_API_KEY=sk-...
  2. Transcribe:      scan2csv worksheet.jpg -o table.csv
"#;

/// Transcribe a photo of a handwritten table to CSV using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "scan2csv",
    version,
    about = "Transcribe photos of handwritten tables to CSV using Vision LLMs",
    long_about = "Transcribe a photo (local file or URL) of a handwritten table into CSV \
using Vision Language Models. Supports OpenAI, Anthropic, Google Gemini, and \
any OpenAI-compatible endpoint (Ollama, vLLM, LiteLLM, etc.).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local JPEG/PNG path or HTTP/HTTPS URL.
    input: String,

    /// Write CSV to this file instead of stdout.
    #[arg(short, long, env = "SCAN2CSV_OUTPUT")]
    output: Option<PathBuf>,

    /// Write CSV to the standard artifact name (extracted_data.csv).
    #[arg(long, conflicts_with = "output")]
    save: bool,

    /// LLM model ID (e.g. gpt-4.1-nano, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Output-shape policy: dynamic (headers read off the sheet) or fixed
    /// (the canonical row,J,K,L worksheet layout).
    #[arg(long, env = "SCAN2CSV_SCHEMA", value_enum, default_value = "dynamic")]
    schema: SchemaArg,

    /// Comma-separated fixed column names; implies --schema fixed.
    #[arg(long, env = "SCAN2CSV_COLUMNS")]
    columns: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "SCAN2CSV_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max LLM output tokens.
    #[arg(long, env = "SCAN2CSV_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "SCAN2CSV_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Output rows as JSON instead of CSV.
    #[arg(long, env = "SCAN2CSV_JSON")]
    json: bool,

    /// Disable the spinner.
    #[arg(long, env = "SCAN2CSV_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SCAN2CSV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the CSV itself.
    #[arg(short, long, env = "SCAN2CSV_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds (URL inputs).
    #[arg(long, env = "SCAN2CSV_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum SchemaArg {
    Dynamic,
    Fixed,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli).await?;

    // ── Spinner for the one in-flight call ───────────────────────────────
    let spinner = if !cli.quiet && !cli.no_progress {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Extracting");
        bar.set_message(cli.input.clone());
        bar.enable_steady_tick(Duration::from_millis(80));
        Some(bar)
    } else {
        None
    };

    // ── Run extraction ───────────────────────────────────────────────────
    let result = extract(&cli.input, &config).await;

    if let Some(ref bar) = spinner {
        bar.finish_and_clear();
    }

    let output = result.context("Extraction failed")?;

    // ── Emit results ─────────────────────────────────────────────────────
    let target: Option<PathBuf> = if cli.save {
        Some(PathBuf::from(DEFAULT_CSV_FILENAME))
    } else {
        cli.output.clone()
    };

    if let Some(path) = target {
        let written = write_csv_file(&path, &output.data)
            .await
            .context("Failed to write CSV")?;
        if !cli.quiet {
            if written {
                eprintln!(
                    "{}  {} rows  →  {}",
                    green("✔"),
                    bold(&output.data.len().to_string()),
                    bold(&path.display().to_string()),
                );
            } else {
                eprintln!("No tabular content found; nothing written.");
            }
        }
    } else if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        let csv = to_csv(&output.data).context("Failed to serialise CSV")?;
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(csv.as_bytes())
            .context("Failed to write to stdout")?;
    }

    if !cli.quiet && !cli.json {
        eprintln!(
            "   {} tokens in  /  {} tokens out  —  {}ms total",
            dim(&output.stats.input_tokens.to_string()),
            dim(&output.stats.output_tokens.to_string()),
            output.stats.total_duration_ms,
        );
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli) -> Result<ExtractionConfig> {
    let system_prompt = if let Some(ref path) = cli.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {path:?}"))?,
        )
    } else {
        None
    };

    let schema = parse_schema(cli)?;

    let mut builder = ExtractionConfig::builder()
        .schema(schema)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.as_str());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.as_str());
    }
    if let Some(prompt) = system_prompt {
        builder = builder.system_prompt(prompt);
    }

    builder.build().context("Invalid configuration")
}

/// Resolve `--schema` and `--columns` into a `SchemaPolicy`.
fn parse_schema(cli: &Cli) -> Result<SchemaPolicy> {
    if let Some(ref columns) = cli.columns {
        let names: Vec<String> = columns
            .split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if names.is_empty() {
            anyhow::bail!("--columns needs at least one non-empty column name");
        }
        return Ok(SchemaPolicy::Fixed(names));
    }
    Ok(match cli.schema {
        SchemaArg::Dynamic => SchemaPolicy::Dynamic,
        SchemaArg::Fixed => SchemaPolicy::fixed_default(),
    })
}
