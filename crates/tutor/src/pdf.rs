use lopdf::Document;
use tracing::debug;

use crate::TutorError;

const FALLBACK_FILENAME: &str = "document.pdf";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPdf {
    pub text: String,
    pub page_count: u32,
}

pub fn extract_pdf(bytes: &[u8]) -> Result<ExtractedPdf, TutorError> {
    let document =
        Document::load_mem(bytes).map_err(|err| TutorError::PdfUnreadable(err.to_string()))?;
    let pages = document.get_pages();

    let mut text = String::new();
    for page_number in pages.keys() {
        match document.extract_text(&[*page_number]) {
            Ok(page_text) if !page_text.is_empty() => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Ok(_) => {}
            Err(err) => debug!(page = page_number, error = %err, "page has no extractable text"),
        }
    }

    Ok(ExtractedPdf {
        text,
        page_count: u32::try_from(pages.len()).unwrap_or(u32::MAX),
    })
}

pub fn is_pdf_filename(filename: &str) -> bool {
    filename.to_lowercase().ends_with(".pdf")
}

pub fn sanitize_filename(raw: &str) -> String {
    let joined = raw
        .replace(['/', '\\'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");

    let kept = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect::<String>();
    let trimmed = kept.trim_matches(|c| c == '.' || c == '_');

    if trimmed.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        trimmed.to_string()
    }
}
