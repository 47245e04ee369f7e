mod error;
mod rate_limit;

use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Json, Multipart, State};
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use reviser_core::QuizSubmission;
use reviser_llm::{Generator, TextGenerator};
use reviser_observability::AppMetrics;
use reviser_storage::Store;
use reviser_tutor::{TutorService, TutorSettings};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use crate::error::{payload_too_large_message, ApiError};
pub use crate::rate_limit::IpRateLimiter;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

// Outer limit stays above the extractor limit so axum reports the overflow itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub max_upload_bytes: usize,
    pub rate_limit_window: Duration,
    pub rate_limit_max: usize,
    pub allowed_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            rate_limit_window: Duration::from_secs(60),
            rate_limit_max: 30,
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let max_upload_bytes = env::var("REVISER_MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(defaults.max_upload_bytes);
        let rate_limit_window = Duration::from_secs(
            env::var("REVISER_RATE_LIMIT_WINDOW_SECONDS")
                .ok()
                .and_then(|value| value.parse::<u64>().ok())
                .unwrap_or(60),
        );
        let rate_limit_max = env::var("REVISER_RATE_LIMIT_MAX")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(defaults.rate_limit_max);

        Self {
            max_upload_bytes,
            rate_limit_window,
            rate_limit_max,
            allowed_origins: parse_allowed_origins(),
        }
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub tutor: Arc<TutorService<Store>>,
    pub metrics: Arc<AppMetrics>,
    pub limiter: IpRateLimiter,
    pub allowed_origins: Arc<Vec<String>>,
    pub max_upload_bytes: usize,
    pub storage_backend: &'static str,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    metrics: reviser_observability::MetricsSnapshot,
    capabilities: HealthCapabilities,
}

#[derive(Debug, Serialize)]
struct HealthCapabilities {
    generation: bool,
    model: String,
    storage: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PdfRequest {
    #[serde(default)]
    pdf_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    #[serde(default)]
    pdf_id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

pub async fn build_app() -> Result<Router> {
    let store = Store::from_env()
        .await
        .context("failed to initialize storage")?;
    let generator = Generator::from_env().context("failed to initialize generation client")?;

    let config = ApiConfig::from_env();
    let limiter = IpRateLimiter::new(config.rate_limit_window, config.rate_limit_max);
    spawn_limiter_pruning(limiter.clone(), config.rate_limit_window);

    Ok(build_router(build_state(
        store,
        generator,
        TutorSettings::from_env(),
        config,
        limiter,
    )))
}

pub fn build_app_with(
    store: Store,
    generator: Generator,
    settings: TutorSettings,
    config: ApiConfig,
) -> Router {
    let limiter = IpRateLimiter::new(config.rate_limit_window, config.rate_limit_max);
    build_router(build_state(store, generator, settings, config, limiter))
}

fn build_state(
    store: Store,
    generator: Generator,
    settings: TutorSettings,
    config: ApiConfig,
    limiter: IpRateLimiter,
) -> ApiState {
    let metrics = AppMetrics::shared();
    let storage_backend = store.backend_name();
    let tutor = Arc::new(TutorService::new(
        Arc::new(store),
        Arc::new(generator),
        settings,
        metrics.clone(),
    ));

    info!(
        storage = storage_backend,
        generation = tutor.generator().is_configured(),
        chunk_size = settings.selector.chunk_size,
        top_k = settings.selector.top_k,
        "tutor service ready"
    );

    ApiState {
        tutor,
        metrics,
        limiter,
        allowed_origins: Arc::new(config.allowed_origins),
        max_upload_bytes: config.max_upload_bytes,
        storage_backend,
    }
}

fn spawn_limiter_pruning(limiter: IpRateLimiter, window: Duration) {
    let period = window.max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            limiter.prune(Instant::now());
        }
    });
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/upload", post(upload_pdf))
        .route("/api/pdfs", get(list_pdfs))
        .route("/api/generate-quiz", post(generate_quiz))
        .route("/api/chat", post(chat))
        .route("/api/recommend-videos", post(recommend_videos))
        .route("/api/score-quiz", post(score_quiz))
        .route("/api/progress", get(progress))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(build_cors_layer(&state.allowed_origins))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(RequestBodyLimitLayer::new(
            state.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD),
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            payload_too_large_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let generator = state.tutor.generator();
    let payload = HealthResponse {
        status: "healthy",
        timestamp: chrono::Utc::now().to_rfc3339(),
        metrics: state.metrics.snapshot(),
        capabilities: HealthCapabilities {
            generation: generator.is_configured(),
            model: generator.model_name().to_string(),
            storage: state.storage_backend,
        },
    };
    (StatusCode::OK, Json(payload))
}

async fn upload_pdf(
    State(state): State<ApiState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let mut multipart = multipart?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(ApiError::from_multipart)?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(ApiError::from_multipart)?;
        upload = Some((filename, bytes.to_vec()));
        break;
    }

    let Some((filename, bytes)) = upload else {
        return Err(ApiError::bad_request("No file part in request"));
    };

    let uploaded = state
        .tutor
        .upload_pdf(&filename, bytes)
        .await
        .map_err(|err| ApiError::from_tutor(err, "Upload failed"))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "PDF uploaded and processed successfully.",
            "pdf_id": uploaded.pdf_id,
            "filename": uploaded.filename,
            "page_count": uploaded.page_count,
        })),
    ))
}

async fn list_pdfs(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let pdfs = state
        .tutor
        .list_pdfs()
        .await
        .map_err(|err| ApiError::from_tutor(err, "Failed to retrieve PDFs"))?;

    Ok(Json(json!({ "success": true, "pdfs": pdfs })))
}

async fn generate_quiz(
    State(state): State<ApiState>,
    payload: Result<Json<PdfRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let quiz = state
        .tutor
        .generate_quiz(request.pdf_id.as_deref().unwrap_or_default())
        .await
        .map_err(|err| ApiError::from_tutor(err, "Failed to generate quiz"))?;

    Ok(Json(quiz))
}

async fn chat(
    State(state): State<ApiState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let answer = state
        .tutor
        .chat(
            request.pdf_id.as_deref().unwrap_or_default(),
            request.message.as_deref().unwrap_or_default(),
        )
        .await
        .map_err(|err| {
            ApiError::from_tutor(err, "An error occurred while processing your request")
        })?;

    Ok(Json(answer))
}

async fn recommend_videos(
    State(state): State<ApiState>,
    payload: Result<Json<PdfRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let recommendations = state
        .tutor
        .recommend_videos(request.pdf_id.as_deref().unwrap_or_default())
        .await
        .map_err(|err| ApiError::from_tutor(err, "Failed to generate video recommendations"))?;

    Ok(Json(recommendations))
}

async fn score_quiz(
    State(state): State<ApiState>,
    payload: Result<Json<QuizSubmission>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(submission) = payload?;
    let score = state
        .tutor
        .score_quiz(submission)
        .await
        .map_err(|err| ApiError::from_tutor(err, "Failed to score quiz"))?;

    Ok(Json(score))
}

async fn progress(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let attempts = state
        .tutor
        .progress()
        .await
        .map_err(|err| ApiError::from_tutor(err, "Failed to retrieve progress"))?;

    Ok(Json(json!({ "success": true, "attempts": attempts })))
}

async fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "Resource not found")
}

fn default_allowed_origins() -> Vec<String> {
    [
        "http://localhost:5000",
        "http://127.0.0.1:5000",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
    ]
    .iter()
    .map(|value| value.to_string())
    .collect()
}

fn parse_allowed_origins() -> Vec<String> {
    env::var("REVISER_ALLOWED_ORIGINS")
        .ok()
        .map(|value| {
            value
                .split(',')
                .map(|origin| origin.trim().trim_end_matches('/').to_string())
                .filter(|origin| !origin.is_empty())
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty())
        .unwrap_or_else(default_allowed_origins)
}

fn build_cors_layer(allowed_origins: &Arc<Vec<String>>) -> CorsLayer {
    let origins = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

fn is_generation_endpoint(path: &str) -> bool {
    matches!(
        path,
        "/api/generate-quiz" | "/api/chat" | "/api/recommend-videos" | "/api/score-quiz"
    )
}

async fn rate_limit_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || !is_generation_endpoint(request.uri().path()) {
        return next.run(request).await;
    }

    let ip = request_ip(&request);
    if !state.limiter.allow(&ip) {
        return ApiError::new(
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests. Please wait a moment and try again.",
        )
        .into_response();
    }

    next.run(request).await
}

async fn payload_too_large_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if response.status() != StatusCode::PAYLOAD_TOO_LARGE {
        return response;
    }

    ApiError::payload_too_large(state.max_upload_bytes).into_response()
}

fn request_ip(request: &Request<Body>) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            value
                .split(',')
                .next()
                .unwrap_or("unknown")
                .trim()
                .to_string()
        })
        .unwrap_or_else(|| "local".to_string())
}

async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;

    response.headers_mut().insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    response.headers_mut().insert(
        header::HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("DENY"),
    );
    response.headers_mut().insert(
        header::HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    response.headers_mut().insert(
        header::HeaderName::from_static("content-security-policy"),
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'; base-uri 'none'"),
    );

    response
}
