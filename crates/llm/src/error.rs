use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation service is not configured; set GEMINI_API_KEY")]
    NotConfigured,

    #[error("generation request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("generation service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("empty response from generation service")]
    EmptyResponse,

    #[error("scripted generator failure: {0}")]
    Scripted(String),

    #[error("generation failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<GenerationError>,
    },
}

impl GenerationError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::NotConfigured | Self::Exhausted { .. })
    }
}
