use std::env;

use reviser_core::prompts::{QUIZ_WORD_LIMIT, VIDEO_WORD_LIMIT};
use reviser_llm::RetryPolicy;
use reviser_retrieval::SelectorConfig;

pub const DEFAULT_PROGRESS_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TutorSettings {
    pub selector: SelectorConfig,
    pub retry: RetryPolicy,
    pub quiz_word_limit: usize,
    pub video_word_limit: usize,
    pub progress_limit: usize,
}

impl Default for TutorSettings {
    fn default() -> Self {
        Self {
            selector: SelectorConfig::default(),
            retry: RetryPolicy::default(),
            quiz_word_limit: QUIZ_WORD_LIMIT,
            video_word_limit: VIDEO_WORD_LIMIT,
            progress_limit: DEFAULT_PROGRESS_LIMIT,
        }
    }
}

impl TutorSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let chunk_size = env_usize("REVISER_CHUNK_SIZE")
            .filter(|value| *value > 0)
            .unwrap_or(defaults.selector.chunk_size);
        let top_k = env_usize("REVISER_TOP_K")
            .filter(|value| *value > 0)
            .unwrap_or(defaults.selector.top_k);

        Self {
            selector: SelectorConfig { chunk_size, top_k },
            retry: RetryPolicy::from_env(),
            ..defaults
        }
    }
}

fn env_usize(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|value| value.trim().parse().ok())
}
