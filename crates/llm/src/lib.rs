mod error;
mod gemini;
mod retry;
mod scripted;

use std::sync::Arc;

use tracing::warn;

pub use error::GenerationError;
pub use gemini::{extract_gemini_text, GeminiConfig, GeminiModel, DEFAULT_GEMINI_MODEL};
pub use retry::{generate_with_retry, GenerationOutcome, RetryPolicy};
pub use scripted::ScriptedModel;

#[allow(async_fn_in_trait)]
pub trait TextGenerator: Send + Sync {
    fn model_name(&self) -> &str;
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[derive(Debug, Clone)]
pub enum Generator {
    Gemini(GeminiModel),
    Scripted(Arc<ScriptedModel>),
    Unconfigured,
}

impl Generator {
    pub fn from_env() -> Result<Self, GenerationError> {
        match GeminiConfig::from_env() {
            Some(config) => Ok(Self::Gemini(GeminiModel::new(config)?)),
            None => {
                warn!("GEMINI_API_KEY is not set; generation endpoints will fail");
                Ok(Self::Unconfigured)
            }
        }
    }

    pub fn scripted(model: Arc<ScriptedModel>) -> Self {
        Self::Scripted(model)
    }

    pub fn is_configured(&self) -> bool {
        !matches!(self, Self::Unconfigured)
    }
}

impl TextGenerator for Generator {
    fn model_name(&self) -> &str {
        match self {
            Generator::Gemini(model) => model.model_name(),
            Generator::Scripted(model) => model.model_name(),
            Generator::Unconfigured => "unconfigured",
        }
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        match self {
            Generator::Gemini(model) => model.generate(prompt).await,
            Generator::Scripted(model) => model.generate(prompt).await,
            Generator::Unconfigured => Err(GenerationError::NotConfigured),
        }
    }
}
