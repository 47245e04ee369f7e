use std::env;
use std::time::Duration;

use tracing::{error, warn};

use crate::{GenerationError, TextGenerator};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let max_attempts = env::var("REVISER_GENERATION_RETRIES")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(defaults.max_attempts);
        let initial_delay = env::var("REVISER_GENERATION_DELAY_MS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.initial_delay);

        Self {
            max_attempts,
            initial_delay,
        }
    }

    /// Wait before the attempt following failed attempt `failed_attempt`
    /// (zero-based): `initial_delay * 2^failed_attempt`.
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        if self.initial_delay.is_zero() {
            return Duration::ZERO;
        }

        2_u32
            .checked_pow(failed_attempt)
            .and_then(|factor| self.initial_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub text: String,
    pub attempts: u32,
}

impl GenerationOutcome {
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

pub async fn generate_with_retry<G>(
    generator: &G,
    prompt: &str,
    policy: &RetryPolicy,
) -> Result<GenerationOutcome, GenerationError>
where
    G: TextGenerator,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0_u32;

    loop {
        attempt += 1;

        let failure = match generator.generate(prompt).await {
            Ok(text) if !text.trim().is_empty() => {
                return Ok(GenerationOutcome {
                    text,
                    attempts: attempt,
                })
            }
            Ok(_) => GenerationError::EmptyResponse,
            Err(err) => err,
        };

        if !failure.is_retryable() {
            return Err(failure);
        }

        if attempt >= max_attempts {
            error!(
                model = generator.model_name(),
                attempts = attempt,
                error = %failure,
                "generation failed, retries exhausted"
            );
            return Err(GenerationError::Exhausted {
                attempts: attempt,
                last: Box::new(failure),
            });
        }

        let wait = policy.delay_after(attempt - 1);
        warn!(
            model = generator.model_name(),
            attempt,
            max_attempts,
            wait_ms = wait.as_millis() as u64,
            error = %failure,
            "generation attempt failed, retrying"
        );
        tokio::time::sleep(wait).await;
    }
}
