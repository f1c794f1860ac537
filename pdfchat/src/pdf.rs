use anyhow::{anyhow, Context, Result};
use std::{fs, path::Path};
use tracing::{debug, warn};

/// A PDF upload, either read from disk or received over HTTP.
#[derive(Debug, Clone)]
pub struct PdfFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl PdfFile {
    #[must_use]
    pub const fn new(name: String, bytes: Vec<u8>) -> Self {
        Self { name, bytes }
    }

    /// Reads a PDF from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

        let name = path
            .file_name()
            .ok_or_else(|| anyhow!("Failed to get file name of {}", path.display()))?
            .to_string_lossy()
            .to_string();

        Ok(Self { name, bytes })
    }
}

/// Extracts the text of a single PDF, page by page.
///
/// # Errors
///
/// Returns an error if the bytes are not a readable PDF.
pub fn extract_text(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| anyhow!("{e}"))
}

/// Concatenates the text of every file, in order.
///
/// # Errors
///
/// Returns an error naming the first file that fails to parse.
pub fn extract_pdfs(files: &[PdfFile]) -> Result<String> {
    let mut text = String::new();

    for file in files {
        let content = extract_text(&file.bytes)
            .with_context(|| format!("Failed to extract text from {}", file.name))?;

        if content.trim().is_empty() {
            warn!("{} contains no extractable text", file.name);
            continue;
        }

        debug!("Extracted {} characters from {}", content.len(), file.name);
        text.push_str(&content);
    }

    Ok(text)
}

/// Runs [`extract_pdfs`] on the blocking pool, parsing is CPU bound.
///
/// # Errors
///
/// Returns an error if a file fails to parse or the extraction task panics.
pub async fn extract_pdfs_in_background(files: Vec<PdfFile>) -> Result<String> {
    tokio::task::spawn_blocking(move || extract_pdfs(&files))
        .await
        .context("PDF extraction task failed")?
}
