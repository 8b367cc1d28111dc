//! CLI binary for edgequake-pdf2qa.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `DatasetConfig` and prints a run summary.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2qa::{
    generate_dataset, DatasetConfig, DatasetProgressCallback, ProgressCallback, QuestionCategory,
    RunOutput,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

/// Split a document error into the result-line headline (`Kind: first line`,
/// cut to 80 chars) and the remaining non-empty lines, such as the text
/// around a parse failure.
fn error_lines(kind: &str, error: &str) -> (String, Vec<String>) {
    let mut lines = error.lines();
    let first = lines.next().unwrap_or_default();
    let headline = format!("{kind}: {first}");
    let headline = if headline.chars().count() > 80 {
        let cut: String = headline.chars().take(79).collect();
        format!("{cut}\u{2026}")
    } else {
        headline
    };
    let details = lines
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    (headline, details)
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar tick and one log line per document.
/// Documents may finish out of order when `--concurrency` is above 1.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-document wall-clock start times, keyed by index.
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Scanning data folder…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} PDFs  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Generating");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut times| times.remove(&index))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl DatasetProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_documents: usize) {
        self.activate_bar(total_documents);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Found {total_documents} PDF files"))
        ));
    }

    fn on_document_start(&self, name: &str, index: usize, _total: usize) {
        if let Ok(mut times) = self.start_times.lock() {
            times.insert(index, Instant::now());
        }
        self.bar.set_message(name.to_string());
    }

    fn on_document_complete(&self, name: &str, index: usize, total: usize, records: usize) {
        let elapsed = self.elapsed_secs(index);
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}  {}",
            green("✓"),
            index + 1,
            total,
            name,
            dim(&format!("{records} pairs")),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, name: &str, index: usize, total: usize, kind: &str, error: &str) {
        let elapsed = self.elapsed_secs(index);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let (headline, details) = error_lines(kind, error);
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}  {}",
            red("✗"),
            index + 1,
            total,
            name,
            red(&headline),
            dim(&format!("{elapsed:.1}s")),
        ));
        for line in details {
            self.bar.println(format!("            {}", dim(&line)));
        }
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total_documents: usize, succeeded: usize) {
        let failed = self.errors.load(Ordering::SeqCst);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} documents processed successfully",
                green("✔"),
                bold(&succeeded.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} documents processed  ({} failed)",
                if succeeded == 0 { red("✘") } else { cyan("⚠") },
                bold(&succeeded.to_string()),
                total_documents,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Every PDF in ./data, appended to ./dataset.jsonl
  pdf2qa

  # Another folder and output file
  pdf2qa --data-dir docs -o train/rust.jsonl

  # Fewer pairs per document, custom category split
  pdf2qa --pairs 10 --categories "code examples:70,concepts:30"

  # A different provider and model
  pdf2qa --provider openai --model gpt-4.1-mini

  # Machine-readable run report
  pdf2qa --json > report.json

OUTPUT FORMAT:
  One line per question/answer pair, appended to the output file:
  {"conversations":[{"from":"human","value":"…"},{"from":"gpt","value":"…"}]}

ENVIRONMENT VARIABLES:
  ANTHROPIC_API_KEY       Anthropic API key (default provider)
  OPENAI_API_KEY          OpenAI API key
  GEMINI_API_KEY          Google Gemini API key
  PDFIUM_LIB_PATH         Path to the pdfium shared library
  RUST_LOG                Log filter, overrides -v / -q

  Variables may also be placed in a .env file in the working directory.
"#;

/// Generate a question/answer dataset from a folder of PDF documents.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2qa",
    version,
    about = "Generate question/answer training data from PDF documentation using LLMs",
    long_about = "Read every PDF in a folder, ask an LLM for question/answer pairs grounded \
in each document's text, repair and validate the model's JSON, and append the pairs to a \
line-delimited conversation dataset.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Folder containing the PDF files.
    #[arg(long, env = "PDF2QA_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Dataset file (created if missing, always appended to).
    #[arg(short, long, env = "PDF2QA_OUTPUT", default_value = "dataset.jsonl")]
    output: PathBuf,

    /// LLM provider: anthropic, openai, gemini, ollama, …
    #[arg(long, env = "EDGEQUAKE_PROVIDER", default_value = edgequake_pdf2qa::config::DEFAULT_PROVIDER)]
    provider: String,

    /// LLM model ID.
    #[arg(long, env = "EDGEQUAKE_MODEL", default_value = edgequake_pdf2qa::config::DEFAULT_MODEL)]
    model: String,

    /// Max LLM output tokens per document.
    #[arg(long, env = "PDF2QA_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// LLM temperature (0.0–1.0).
    #[arg(long, env = "PDF2QA_TEMPERATURE", default_value_t = 0.3)]
    temperature: f32,

    /// Question/answer pairs to request per document.
    #[arg(long, env = "PDF2QA_PAIRS", default_value_t = 20)]
    pairs: usize,

    /// Category split as "label:percent,…"; percentages must sum to 100.
    #[arg(long, env = "PDF2QA_CATEGORIES")]
    categories: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "PDF2QA_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Documents processed at once.
    #[arg(short, long, env = "PDF2QA_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Retries per document on a failed LLM call.
    #[arg(long, env = "PDF2QA_MAX_RETRIES", default_value_t = 0)]
    max_retries: u32,

    /// Per-document LLM call timeout in seconds.
    #[arg(long, env = "PDF2QA_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2QA_PASSWORD")]
    password: Option<String>,

    /// Print the run report as JSON on stdout.
    #[arg(long, env = "PDF2QA_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2QA_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2QA_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2QA_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new();
        Some(cb as Arc<dyn DatasetProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Run ──────────────────────────────────────────────────────────────
    let output = generate_dataset(&config)
        .await
        .context("Dataset generation failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&output);
    }

    Ok(())
}

/// Map CLI args to `DatasetConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<DatasetConfig> {
    let system_prompt = if let Some(ref path) = cli.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let mut builder = DatasetConfig::builder()
        .data_dir(&cli.data_dir)
        .output_path(&cli.output)
        .provider_name(&cli.provider)
        .model(&cli.model)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .pair_count(cli.pairs)
        .concurrency(cli.concurrency)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref raw) = cli.categories {
        builder = builder.categories(parse_categories(raw)?);
    }
    if let Some(prompt) = system_prompt {
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--categories "code examples:60,concepts:20,use cases:20"`.
fn parse_categories(s: &str) -> Result<Vec<QuestionCategory>> {
    s.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            let (label, percent) = part
                .rsplit_once(':')
                .with_context(|| format!("Expected 'label:percent', got '{}'", part.trim()))?;
            let label = label.trim();
            if label.is_empty() {
                anyhow::bail!("Empty category label in '{}'", part.trim());
            }
            let percent: u8 = percent
                .trim()
                .parse()
                .with_context(|| format!("Invalid percentage in '{}'", part.trim()))?;
            Ok(QuestionCategory::new(label, percent))
        })
        .collect()
}

fn print_summary(output: &RunOutput) {
    let stats = &output.stats;
    let summary = &output.summary;

    eprintln!();
    eprintln!("{}", bold("Dataset summary"));
    eprintln!("  PDFs found:           {}", stats.total_documents);
    eprintln!(
        "  Processed:            {}",
        if stats.failed_documents == 0 {
            green(&stats.succeeded_documents.to_string())
        } else {
            format!(
                "{}  ({} failed)",
                stats.succeeded_documents,
                red(&stats.failed_documents.to_string())
            )
        }
    );
    eprintln!("  Pairs this run:       {}", stats.records_written);
    eprintln!("  Pairs in file:        {}", summary.total_records);
    eprintln!("  File size:            {:.2} MB", summary.file_size_mb());
    eprintln!(
        "  Output:               {}",
        bold(&output.output_path.display().to_string())
    );
    eprintln!(
        "  {}",
        dim(&format!(
            "{} tokens in  /  {} tokens out  —  {}ms total",
            stats.total_input_tokens, stats.total_output_tokens, stats.total_duration_ms
        ))
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_category_list() {
        let cats = parse_categories("code examples:60, concepts:20,use cases:20").unwrap();
        assert_eq!(cats.len(), 3);
        assert_eq!(cats[0], QuestionCategory::new("code examples", 60));
        assert_eq!(cats[2].label, "use cases");
    }

    #[test]
    fn rejects_bad_category_entries() {
        assert!(parse_categories("concepts").is_err());
        assert!(parse_categories("concepts:lots").is_err());
        assert!(parse_categories(":50").is_err());
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["pdf2qa"]);
        assert_eq!(cli.data_dir, PathBuf::from("data"));
        assert_eq!(cli.output, PathBuf::from("dataset.jsonl"));
        assert_eq!(cli.pairs, 20);
        assert_eq!(cli.concurrency, 1);
    }

    #[test]
    fn error_lines_keep_kind_and_context() {
        let error = "malformed response at byte 27 (line 1, column 28): expected value at line 1 column 28\n  near: \"...oops}]\"";
        let (headline, details) = error_lines("MalformedResponse", error);
        assert!(headline.starts_with("MalformedResponse: malformed response at byte 27"));
        assert!(headline.chars().count() <= 80);
        assert_eq!(details, vec!["near: \"...oops}]\"".to_string()]);
    }

    #[test]
    fn error_lines_single_line_has_no_details() {
        let (headline, details) = error_lines("GenerationError", "generation failed: 401");
        assert_eq!(headline, "GenerationError: generation failed: 401");
        assert!(details.is_empty());
    }
}
