use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct AppMetrics {
    requests_total: AtomicU64,
    uploads_total: AtomicU64,
    generation_calls_total: AtomicU64,
    generation_retries_total: AtomicU64,
    generation_failures_total: AtomicU64,
    context_fallback_total: AtomicU64,
    context_chars_total: AtomicU64,
    total_latency_millis: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub uploads_total: u64,
    pub generation_calls_total: u64,
    pub generation_retries_total: u64,
    pub generation_failures_total: u64,
    pub context_fallback_total: u64,
    pub context_chars_total: u64,
    pub avg_latency_millis: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("reviser_requests_total").increment(1);
    }

    pub fn inc_upload(&self) {
        self.uploads_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("reviser_uploads_total").increment(1);
    }

    pub fn record_generation(&self, retries: u32, failed: bool) {
        self.generation_calls_total.fetch_add(1, Ordering::Relaxed);
        self.generation_retries_total
            .fetch_add(u64::from(retries), Ordering::Relaxed);
        metrics::counter!("reviser_generation_calls_total").increment(1);
        metrics::counter!("reviser_generation_retries_total").increment(u64::from(retries));

        if failed {
            self.generation_failures_total
                .fetch_add(1, Ordering::Relaxed);
            metrics::counter!("reviser_generation_failures_total").increment(1);
        }
    }

    pub fn record_context(&self, chars: usize, fallback: bool) {
        self.context_chars_total
            .fetch_add(chars as u64, Ordering::Relaxed);
        if fallback {
            self.context_fallback_total.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("reviser_context_fallback_total").increment(1);
        }
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.requests_total.load(Ordering::Relaxed);
        let latency = self.total_latency_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            requests_total: requests,
            uploads_total: self.uploads_total.load(Ordering::Relaxed),
            generation_calls_total: self.generation_calls_total.load(Ordering::Relaxed),
            generation_retries_total: self.generation_retries_total.load(Ordering::Relaxed),
            generation_failures_total: self.generation_failures_total.load(Ordering::Relaxed),
            context_fallback_total: self.context_fallback_total.load(Ordering::Relaxed),
            context_chars_total: self.context_chars_total.load(Ordering::Relaxed),
            avg_latency_millis: if requests == 0 {
                0.0
            } else {
                latency as f64 / requests as f64
            },
        }
    }
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,reviser_api=info,reviser_tutor=info,reviser_llm=info,tower_http=info",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(std::io::stderr)
            .init();
    });
}
