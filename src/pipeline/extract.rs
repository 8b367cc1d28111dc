//! PDF text extraction via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which is blocking and keeps
//! thread-local state. [`extract_text`] moves the work onto Tokio's blocking
//! pool so the async driver is never stalled by a large document.
//!
//! Extraction sits behind the [`TextExtractor`] trait so the rest of the
//! pipeline can be exercised without a pdfium library on the machine.

use crate::error::DocumentError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Produces the full text of one document.
pub trait TextExtractor: Send + Sync {
    /// Extract every page's text, concatenated in page order.
    fn extract_text(&self, path: &Path) -> Result<String, DocumentError>;
}

/// Run `extractor` on the blocking pool.
pub async fn extract_text(
    extractor: &Arc<dyn TextExtractor>,
    path: &Path,
) -> Result<String, DocumentError> {
    let extractor = Arc::clone(extractor);
    let path = path.to_path_buf();

    tokio::task::spawn_blocking(move || extractor.extract_text(&path))
        .await
        .map_err(|e| DocumentError::Extraction {
            detail: format!("extraction task panicked: {e}"),
        })?
}

/// [`TextExtractor`] backed by pdfium.
///
/// Library discovery order:
/// 1. `PDFIUM_LIB_PATH` env var (explicit path to the library file)
/// 2. Alongside the running executable
/// 3. System library search paths
#[derive(Debug, Clone, Default)]
pub struct PdfiumExtractor {
    password: Option<String>,
    library_path: Option<PathBuf>,
}

impl PdfiumExtractor {
    pub fn new(password: Option<String>) -> Self {
        Self {
            password,
            library_path: std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from),
        }
    }

    /// Bind to pdfium. A fresh binding per document keeps the extractor
    /// `Send + Sync`; the OS caches the loaded library.
    fn bind(&self) -> Result<Pdfium, DocumentError> {
        if let Some(ref path) = self.library_path {
            let path = path.to_string_lossy().to_string();
            let bindings = Pdfium::bind_to_library(&path).map_err(|e| DocumentError::Extraction {
                detail: format!("failed to load pdfium from {path}: {e}"),
            })?;
            return Ok(Pdfium::new(bindings));
        }

        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            let lib_path =
                Pdfium::pdfium_platform_library_name_at_path(exe_dir.to_string_lossy().as_ref());
            if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
                debug!("Loaded pdfium from {}", exe_dir.display());
                return Ok(Pdfium::new(bindings));
            }
        }

        let bindings = Pdfium::bind_to_system_library().map_err(|e| DocumentError::Extraction {
            detail: format!("pdfium library not found; set PDFIUM_LIB_PATH: {e}"),
        })?;
        Ok(Pdfium::new(bindings))
    }
}

impl TextExtractor for PdfiumExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, DocumentError> {
        let pdfium = self.bind()?;

        let document = pdfium
            .load_pdf_from_file(path, self.password.as_deref())
            .map_err(|e| {
                let msg = format!("{e}");
                let lower = msg.to_lowercase();
                let detail = if lower.contains("password") || lower.contains("encrypt") {
                    format!("'{}' is encrypted; provide --password", path.display())
                } else {
                    format!("failed to open '{}': {msg}", path.display())
                };
                DocumentError::Extraction { detail }
            })?;

        let mut text = String::new();
        for (idx, page) in document.pages().iter().enumerate() {
            let page_text = page.text().map_err(|e| DocumentError::Extraction {
                detail: format!("page {}: {e}", idx + 1),
            })?;
            if idx > 0 {
                text.push('\n');
            }
            text.push_str(&page_text.all());
        }

        debug!("Extracted {} chars from {}", text.len(), path.display());
        Ok(text)
    }
}
