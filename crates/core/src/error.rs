use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("AI response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("AI response is not a JSON object")]
    NotAnObject,

    #[error("AI response is missing required section `{0}`")]
    MissingSection(&'static str),

    #[error("AI response has a malformed recommendation at position {0}")]
    InvalidRecommendation(usize),
}
