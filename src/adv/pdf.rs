use anyhow::{anyhow, Context, Result};
use std::path::Path;

/// Converts a PDF document into one linear string in document order.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, pdf: &[u8]) -> Result<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_text(&self, pdf: &[u8]) -> Result<String> {
        if !pdf.starts_with(b"%PDF") {
            return Err(anyhow!("Not a PDF document ({} bytes)", pdf.len()));
        }

        // pdf-extract panics on some malformed streams instead of returning an error.
        let extracted = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(pdf))
            .map_err(|_| anyhow!("PDF text extraction panicked"))?;

        extracted.map_err(|e| anyhow!("Failed to extract PDF text: {}", e))
    }
}

pub fn extract_file(extractor: &dyn TextExtractor, path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read PDF file: {}", path.display()))?;
    extractor
        .extract_text(&bytes)
        .with_context(|| format!("Failed to extract text from PDF: {}", path.display()))
}
