use reviser_core::ResponseError;
use reviser_llm::GenerationError;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Client,
    NotFound,
    Server,
}

#[derive(Debug, Error)]
pub enum TutorError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Invalid PDF ID format.")]
    InvalidPdfId,

    #[error("PDF not found.")]
    PdfNotFound,

    #[error("PDF has no extractable text content.")]
    NoTextContent,

    #[error("Could not extract text from PDF. The file may be empty or contain only images.")]
    NoExtractableText,

    #[error("Failed to process PDF: {0}")]
    PdfUnreadable(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Response(#[from] ResponseError),

    #[error("storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl TutorError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn status_hint(&self) -> ErrorClass {
        match self {
            Self::InvalidInput(_)
            | Self::InvalidPdfId
            | Self::NoTextContent
            | Self::NoExtractableText
            | Self::PdfUnreadable(_) => ErrorClass::Client,
            Self::PdfNotFound => ErrorClass::NotFound,
            Self::Generation(_) | Self::Response(_) | Self::Storage(_) => ErrorClass::Server,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_errors() {
        assert_eq!(TutorError::InvalidPdfId.status_hint(), ErrorClass::Client);
        assert_eq!(TutorError::PdfNotFound.status_hint(), ErrorClass::NotFound);
        assert_eq!(
            TutorError::from(GenerationError::EmptyResponse).status_hint(),
            ErrorClass::Server
        );
        assert_eq!(
            TutorError::from(anyhow::anyhow!("disk full")).to_string(),
            "storage failure: disk full"
        );
    }
}
