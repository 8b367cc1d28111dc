//! Run entry points: turn a folder of PDFs into dataset lines.
//!
//! [`generate_dataset`] is the primary entry point. It validates the
//! configuration against the environment, builds the real pdfium extractor
//! and LLM client, and hands off to [`generate_with`], which takes both as
//! trait objects so the whole run can be driven without pdfium or a network.
//!
//! Every document resolves to a [`DocumentReport`]; a failure at any stage is
//! recorded there and the run moves on. Only configuration and data-folder
//! problems end a run early.

use crate::config::DatasetConfig;
use crate::dataset::DatasetSink;
use crate::error::{DatasetError, DocumentError};
use crate::output::{DocumentReport, RunOutput, RunStats};
use crate::pipeline::extract::{self, PdfiumExtractor, TextExtractor};
use crate::pipeline::llm::{GenerationClient, GenerationRequest, GenerationResponse, LlmClient};
use crate::pipeline::{records_from_response, sanitize};
use crate::prompts;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Generate question/answer records for every PDF in `config.data_dir` and
/// append them to `config.output_path`.
///
/// # Errors
/// Returns `Err(DatasetError)` only for fatal errors:
/// - Missing API key / unknown provider / invalid settings
/// - Data folder missing or unreadable
/// - Dataset file unreadable when computing the final summary
///
/// Per-document failures are reported in [`RunOutput::documents`].
pub async fn generate_dataset(config: &DatasetConfig) -> Result<RunOutput, DatasetError> {
    config.validate()?;

    let client: Arc<dyn GenerationClient> = Arc::new(LlmClient::from_config(config)?);
    let extractor: Arc<dyn TextExtractor> =
        Arc::new(PdfiumExtractor::new(config.password.clone()));

    generate_with(config, extractor, client).await
}

/// Synchronous wrapper around [`generate_dataset`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_dataset_sync(config: &DatasetConfig) -> Result<RunOutput, DatasetError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DatasetError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate_dataset(config))
}

/// Run the pipeline with caller-supplied extraction and generation.
///
/// Skips the credential check (the caller owns the client) but still
/// requires the data folder to exist.
pub async fn generate_with(
    config: &DatasetConfig,
    extractor: Arc<dyn TextExtractor>,
    client: Arc<dyn GenerationClient>,
) -> Result<RunOutput, DatasetError> {
    let run_start = Instant::now();

    // ── Step 1: List documents ───────────────────────────────────────────
    let documents = list_documents(&config.data_dir)?;
    let total = documents.len();
    info!(
        "Found {} PDF files in {}",
        total,
        config.data_dir.display()
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(total);
    }

    // ── Step 2: Process documents ────────────────────────────────────────
    let sink = Arc::new(DatasetSink::new(&config.output_path));
    let system = config
        .system_prompt
        .clone()
        .unwrap_or_else(|| prompts::DEFAULT_SYSTEM_PROMPT.to_string());
    let system = Arc::new(system);

    let mut reports: Vec<DocumentReport> = stream::iter(documents.into_iter().enumerate().map(
        |(index, path)| {
            let extractor = Arc::clone(&extractor);
            let client = Arc::clone(&client);
            let sink = Arc::clone(&sink);
            let system = Arc::clone(&system);
            async move {
                process_document(
                    config, &extractor, &client, &sink, &system, &path, index, total,
                )
                .await
            }
        },
    ))
    .buffer_unordered(config.concurrency.max(1))
    .collect()
    .await;

    reports.sort_by_key(|r| r.index);

    // ── Step 3: Stats and summary ────────────────────────────────────────
    let succeeded = reports.iter().filter(|r| r.succeeded()).count();
    let stats = RunStats {
        total_documents: total,
        succeeded_documents: succeeded,
        failed_documents: total - succeeded,
        records_written: reports.iter().map(|r| r.records).sum(),
        total_input_tokens: reports.iter().map(|r| r.input_tokens).sum(),
        total_output_tokens: reports.iter().map(|r| r.output_tokens).sum(),
        total_duration_ms: run_start.elapsed().as_millis() as u64,
    };

    let summary = sink
        .summary()
        .await
        .map_err(|e| DatasetError::SummaryFailed {
            path: config.output_path.clone(),
            source: e,
        })?;

    info!(
        "Run complete: {}/{} documents, {} records written, {} in file",
        succeeded, total, stats.records_written, summary.total_records
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(total, succeeded);
    }

    Ok(RunOutput {
        output_path: config.output_path.clone(),
        documents: reports,
        stats,
        summary,
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// PDF files directly inside `dir`, sorted by path. The extension check is
/// case-insensitive; subfolders are not searched.
fn list_documents(dir: &Path) -> Result<Vec<PathBuf>, DatasetError> {
    if !dir.is_dir() {
        return Err(DatasetError::DataDirNotFound {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| DatasetError::DataDirUnreadable {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| DatasetError::DataDirUnreadable {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

#[allow(clippy::too_many_arguments)]
async fn process_document(
    config: &DatasetConfig,
    extractor: &Arc<dyn TextExtractor>,
    client: &Arc<dyn GenerationClient>,
    sink: &DatasetSink,
    system: &str,
    path: &Path,
    index: usize,
    total: usize,
) -> DocumentReport {
    let start = Instant::now();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    info!("Processing {} ({}/{})", name, index + 1, total);
    if let Some(ref cb) = config.progress_callback {
        cb.on_document_start(&name, index, total);
    }

    let mut usage = GenerationResponse::default();
    let result = run_stages(config, extractor, client, sink, system, path, &mut usage).await;

    let (records, error) = match result {
        Ok(n) => {
            info!("{}: {} records written", name, n);
            if let Some(ref cb) = config.progress_callback {
                cb.on_document_complete(&name, index, total, n);
            }
            (n, None)
        }
        Err(e) => {
            warn!("{}: {}: {}", name, e.kind(), e);
            if let Some(ref cb) = config.progress_callback {
                cb.on_document_error(&name, index, total, e.kind(), &e.to_string());
            }
            (0, Some(e))
        }
    };

    DocumentReport {
        document: name,
        index,
        records,
        duration_ms: start.elapsed().as_millis() as u64,
        input_tokens: usage.input_tokens,
        output_tokens: usage.output_tokens,
        error,
    }
}

/// Extract → prompt → generate → sanitise → validate → append.
///
/// Token usage is copied into `usage` as soon as the model answers, so it is
/// reported even when the answer turns out to be unusable.
async fn run_stages(
    config: &DatasetConfig,
    extractor: &Arc<dyn TextExtractor>,
    client: &Arc<dyn GenerationClient>,
    sink: &DatasetSink,
    system: &str,
    path: &Path,
    usage: &mut GenerationResponse,
) -> Result<usize, DocumentError> {
    let text = extract::extract_text(extractor, path).await?;
    if text.trim().is_empty() {
        return Err(DocumentError::Extraction {
            detail: "document has no extractable text".to_string(),
        });
    }

    let request = GenerationRequest {
        model: config.model.clone(),
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        system: system.to_string(),
        content: prompts::build_user_prompt(&text, &config.prompt),
    };

    let response = client.generate(&request).await?;
    usage.input_tokens = response.input_tokens;
    usage.output_tokens = response.output_tokens;
    debug!(
        "Raw response from {}: {}",
        path.display(),
        sanitize::truncate_chars(&response.text, 500)
    );

    let records = records_from_response(&response.text)?;

    sink.append(&records)
        .await
        .map_err(|e| DocumentError::Write {
            detail: format!("{}: {e}", sink.path().display()),
        })
}
