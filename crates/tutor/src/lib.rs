mod error;
pub mod pdf;
mod settings;

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use reviser_core::{
    chat_prompt, is_blank_value, parse_chat_answer, parse_quiz, parse_quiz_score,
    parse_video_recommendations, quiz_prompt, scoring_prompt, truncate_words, video_prompt,
    ChatAnswer, PdfDocument, PdfSummary, PdfUploaded, Quiz, QuizAttempt, QuizScore,
    QuizSubmission, ResponseError, VideoRecommendations, UNKNOWN_PDF_FILENAME,
};
use reviser_llm::{generate_with_retry, GenerationError, Generator};
use reviser_observability::AppMetrics;
use reviser_retrieval::{ContextSelector, SelectedContext};
use reviser_storage::{PdfRepository, QuizAttemptRepository};
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub use error::{ErrorClass, TutorError};
pub use pdf::{extract_pdf, is_pdf_filename, sanitize_filename, ExtractedPdf};
pub use settings::{TutorSettings, DEFAULT_PROGRESS_LIMIT};

#[derive(Clone)]
pub struct TutorService<S>
where
    S: PdfRepository + QuizAttemptRepository,
{
    store: Arc<S>,
    generator: Arc<Generator>,
    selector: ContextSelector,
    settings: TutorSettings,
    metrics: Arc<AppMetrics>,
}

impl<S> TutorService<S>
where
    S: PdfRepository + QuizAttemptRepository,
{
    pub fn new(
        store: Arc<S>,
        generator: Arc<Generator>,
        settings: TutorSettings,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            store,
            generator,
            selector: ContextSelector::new(settings.selector),
            settings,
            metrics,
        }
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    pub fn metrics(&self) -> &AppMetrics {
        &self.metrics
    }

    #[instrument(skip(self, bytes), fields(bytes = bytes.len()))]
    pub async fn upload_pdf(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<PdfUploaded, TutorError> {
        self.metrics.inc_request();

        if filename.trim().is_empty() {
            return Err(TutorError::invalid_input("No file selected"));
        }
        if !is_pdf_filename(filename) {
            return Err(TutorError::invalid_input(
                "Invalid file type. Only PDF files are allowed.",
            ));
        }

        let filename = sanitize_filename(filename);
        let extracted = tokio::task::spawn_blocking(move || extract_pdf(&bytes))
            .await
            .map_err(|err| TutorError::PdfUnreadable(err.to_string()))??;

        if extracted.text.trim().is_empty() {
            return Err(TutorError::NoExtractableText);
        }

        let document = PdfDocument {
            id: Uuid::new_v4().to_string(),
            filename,
            extracted_text: extracted.text,
            page_count: extracted.page_count,
            uploaded_at: Utc::now(),
        };
        self.store.insert_pdf(&document).await?;
        self.metrics.inc_upload();

        info!(
            pdf_id = %document.id,
            filename = %document.filename,
            page_count = document.page_count,
            chars = document.extracted_text.len(),
            "pdf stored"
        );

        Ok(PdfUploaded {
            pdf_id: document.id,
            filename: document.filename,
            page_count: document.page_count,
        })
    }

    pub async fn list_pdfs(&self) -> Result<Vec<PdfSummary>, TutorError> {
        self.metrics.inc_request();
        Ok(self.store.list_pdfs().await?)
    }

    #[instrument(skip(self))]
    pub async fn generate_quiz(&self, pdf_id: &str) -> Result<Quiz, TutorError> {
        let started = Instant::now();
        self.metrics.inc_request();

        let document = self.load_document(pdf_id).await?;
        let excerpt = truncate_words(&document.extracted_text, self.settings.quiz_word_limit);
        let raw = self.generate(&quiz_prompt(&excerpt)).await?;
        let quiz = parse_quiz(&raw).map_err(|err| log_unparsed("quiz", &raw, err))?;

        info!(
            pdf_id,
            mcqs = quiz.mcqs.len(),
            saqs = quiz.saqs.len(),
            laqs = quiz.laqs.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "quiz generated"
        );
        self.metrics.observe_latency(started.elapsed());
        Ok(quiz)
    }

    #[instrument(skip(self, message))]
    pub async fn chat(&self, pdf_id: &str, message: &str) -> Result<ChatAnswer, TutorError> {
        let started = Instant::now();
        self.metrics.inc_request();

        if message.trim().is_empty() {
            return Err(TutorError::invalid_input("Message is required."));
        }

        let document = self.load_document(pdf_id).await?;
        let context = self.select_context(&document.extracted_text, message);
        let raw = self.generate(&chat_prompt(&context.text, message)).await?;
        let answer = parse_chat_answer(&raw, &context.text);

        self.metrics.observe_latency(started.elapsed());
        Ok(answer)
    }

    pub fn select_context(&self, document_text: &str, query: &str) -> SelectedContext {
        let context = self.selector.select(document_text, query);
        self.metrics
            .record_context(context.text.chars().count(), context.path.is_fallback());
        info!(
            path = ?context.path,
            chunks = ?context.chunk_indices,
            total_chunks = context.total_chunks,
            chars = context.text.len(),
            "context selected"
        );
        context
    }

    #[instrument(skip(self))]
    pub async fn recommend_videos(
        &self,
        pdf_id: &str,
    ) -> Result<VideoRecommendations, TutorError> {
        let started = Instant::now();
        self.metrics.inc_request();

        let document = self.load_document(pdf_id).await?;
        let excerpt = truncate_words(&document.extracted_text, self.settings.video_word_limit);
        let raw = self.generate(&video_prompt(&excerpt)).await?;
        let recommendations = parse_video_recommendations(&raw)
            .map_err(|err| log_unparsed("video recommendations", &raw, err))?;

        self.metrics.observe_latency(started.elapsed());
        Ok(recommendations)
    }

    /// Scores a submission and records the attempt. An unknown or malformed
    /// `pdf_id` does not fail the request; the attempt is filed under
    /// "Unknown PDF".
    #[instrument(skip(self, submission))]
    pub async fn score_quiz(&self, submission: QuizSubmission) -> Result<QuizScore, TutorError> {
        let started = Instant::now();
        self.metrics.inc_request();

        if is_blank_value(&submission.quiz_questions) || is_blank_value(&submission.user_answers)
        {
            return Err(TutorError::invalid_input(
                "Quiz questions and user answers are required.",
            ));
        }

        let prompt = scoring_prompt(&submission.quiz_questions, &submission.user_answers);
        let raw = self.generate(&prompt).await?;
        let score = parse_quiz_score(&raw).map_err(|err| log_unparsed("quiz score", &raw, err))?;

        let (pdf_id, pdf_filename) = self.resolve_attempt_pdf(submission.pdf_id.as_str()).await?;
        let attempt = QuizAttempt {
            id: Uuid::new_v4().to_string(),
            pdf_id,
            pdf_filename,
            answers: submission.user_answers,
            score: score.score.clone(),
            feedback: score.overall_feedback.clone(),
            timestamp: Utc::now(),
        };
        self.store.insert_attempt(&attempt).await?;

        info!(
            attempt_id = %attempt.id,
            pdf_filename = %attempt.pdf_filename,
            score = %attempt.score,
            latency_ms = started.elapsed().as_millis() as u64,
            "quiz attempt recorded"
        );
        self.metrics.observe_latency(started.elapsed());
        Ok(score)
    }

    pub async fn progress(&self) -> Result<Vec<QuizAttempt>, TutorError> {
        self.metrics.inc_request();
        Ok(self
            .store
            .recent_attempts(self.settings.progress_limit)
            .await?)
    }

    async fn load_document(&self, pdf_id: &str) -> Result<PdfDocument, TutorError> {
        let pdf_id = parse_pdf_id(pdf_id)?;
        let document = self
            .store
            .get_pdf(&pdf_id)
            .await?
            .ok_or(TutorError::PdfNotFound)?;

        if document.extracted_text.trim().is_empty() {
            return Err(TutorError::NoTextContent);
        }
        Ok(document)
    }

    async fn resolve_attempt_pdf(
        &self,
        pdf_id: Option<&str>,
    ) -> Result<(Option<String>, String), TutorError> {
        let Some(pdf_id) = pdf_id.and_then(|raw| parse_pdf_id(raw).ok()) else {
            return Ok((None, UNKNOWN_PDF_FILENAME.to_string()));
        };

        let filename = self
            .store
            .get_pdf(&pdf_id)
            .await?
            .map(|document| document.filename)
            .unwrap_or_else(|| UNKNOWN_PDF_FILENAME.to_string());
        Ok((Some(pdf_id), filename))
    }

    async fn generate(&self, prompt: &str) -> Result<String, TutorError> {
        match generate_with_retry(self.generator.as_ref(), prompt, &self.settings.retry).await {
            Ok(outcome) => {
                self.metrics.record_generation(outcome.retries(), false);
                Ok(outcome.text)
            }
            Err(err) => {
                let retries = match &err {
                    GenerationError::Exhausted { attempts, .. } => attempts.saturating_sub(1),
                    _ => 0,
                };
                self.metrics.record_generation(retries, true);
                Err(err.into())
            }
        }
    }
}

pub fn parse_pdf_id(raw: &str) -> Result<String, TutorError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(TutorError::invalid_input("PDF ID is required."));
    }
    Uuid::parse_str(raw)
        .map(|id| id.to_string())
        .map_err(|_| TutorError::InvalidPdfId)
}

fn log_unparsed(kind: &str, raw: &str, err: ResponseError) -> TutorError {
    warn!(kind, error = %err, response = raw, "model reply could not be parsed");
    TutorError::Response(err)
}
