use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::RwLock;
use reviser_core::{PdfDocument, PdfSummary, QuizAttempt};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

#[allow(async_fn_in_trait)]
pub trait PdfRepository: Send + Sync {
    async fn insert_pdf(&self, pdf: &PdfDocument) -> Result<()>;
    async fn get_pdf(&self, pdf_id: &str) -> Result<Option<PdfDocument>>;
    async fn list_pdfs(&self) -> Result<Vec<PdfSummary>>;
}

#[allow(async_fn_in_trait)]
pub trait QuizAttemptRepository: Send + Sync {
    async fn insert_attempt(&self, attempt: &QuizAttempt) -> Result<()>;
    async fn recent_attempts(&self, limit: usize) -> Result<Vec<QuizAttempt>>;
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    pdfs: Arc<RwLock<HashMap<String, PdfDocument>>>,
    attempts: Arc<RwLock<Vec<QuizAttempt>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PdfRepository for MemoryStore {
    async fn insert_pdf(&self, pdf: &PdfDocument) -> Result<()> {
        self.pdfs.write().insert(pdf.id.clone(), pdf.clone());
        Ok(())
    }

    async fn get_pdf(&self, pdf_id: &str) -> Result<Option<PdfDocument>> {
        Ok(self.pdfs.read().get(pdf_id).cloned())
    }

    async fn list_pdfs(&self) -> Result<Vec<PdfSummary>> {
        let mut summaries = self
            .pdfs
            .read()
            .values()
            .map(PdfDocument::summary)
            .collect::<Vec<_>>();
        summaries.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(summaries)
    }
}

impl QuizAttemptRepository for MemoryStore {
    async fn insert_attempt(&self, attempt: &QuizAttempt) -> Result<()> {
        self.attempts.write().push(attempt.clone());
        Ok(())
    }

    async fn recent_attempts(&self, limit: usize) -> Result<Vec<QuizAttempt>> {
        let mut attempts = self.attempts.read().clone();
        attempts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        attempts.truncate(limit);
        Ok(attempts)
    }
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = database_url
            .parse::<SqliteConnectOptions>()
            .with_context(|| format!("invalid sqlite url {}", database_url))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .with_context(|| format!("failed connecting to sqlite at {}", database_url))?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pdfs (
              id TEXT PRIMARY KEY,
              filename TEXT NOT NULL,
              extracted_text TEXT NOT NULL,
              page_count INTEGER NOT NULL,
              uploaded_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed creating pdfs table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS quiz_attempts (
              id TEXT PRIMARY KEY,
              pdf_id TEXT,
              pdf_filename TEXT NOT NULL,
              answers_json TEXT NOT NULL,
              score TEXT NOT NULL,
              feedback TEXT NOT NULL,
              timestamp TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed creating quiz_attempts table")?;

        Ok(())
    }
}

impl PdfRepository for SqliteStore {
    async fn insert_pdf(&self, pdf: &PdfDocument) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pdfs (id, filename, extracted_text, page_count, uploaded_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&pdf.id)
        .bind(&pdf.filename)
        .bind(&pdf.extracted_text)
        .bind(i64::from(pdf.page_count))
        .bind(sortable_timestamp(pdf.uploaded_at))
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed inserting pdf {}", pdf.id))?;

        Ok(())
    }

    async fn get_pdf(&self, pdf_id: &str) -> Result<Option<PdfDocument>> {
        let row = sqlx::query(
            r#"
            SELECT id, filename, extracted_text, page_count, uploaded_at
            FROM pdfs
            WHERE id = ?1
            "#,
        )
        .bind(pdf_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(PdfDocument {
            id: row.get("id"),
            filename: row.get("filename"),
            extracted_text: row.get("extracted_text"),
            page_count: page_count_from_row(row.get("page_count")),
            uploaded_at: parse_timestamp(&row.get::<String, _>("uploaded_at")),
        }))
    }

    async fn list_pdfs(&self) -> Result<Vec<PdfSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT id, filename, page_count, uploaded_at
            FROM pdfs
            ORDER BY uploaded_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let summaries = rows
            .into_iter()
            .map(|row| PdfSummary {
                id: row.get("id"),
                filename: row.get("filename"),
                page_count: page_count_from_row(row.get("page_count")),
                uploaded_at: parse_timestamp(&row.get::<String, _>("uploaded_at")),
            })
            .collect();

        Ok(summaries)
    }
}

impl QuizAttemptRepository for SqliteStore {
    async fn insert_attempt(&self, attempt: &QuizAttempt) -> Result<()> {
        let answers_json = serde_json::to_string(&attempt.answers)?;

        sqlx::query(
            r#"
            INSERT INTO quiz_attempts (id, pdf_id, pdf_filename, answers_json, score, feedback, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&attempt.id)
        .bind(&attempt.pdf_id)
        .bind(&attempt.pdf_filename)
        .bind(answers_json)
        .bind(&attempt.score)
        .bind(&attempt.feedback)
        .bind(sortable_timestamp(attempt.timestamp))
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed inserting quiz attempt {}", attempt.id))?;

        Ok(())
    }

    async fn recent_attempts(&self, limit: usize) -> Result<Vec<QuizAttempt>> {
        let rows = sqlx::query(
            r#"
            SELECT id, pdf_id, pdf_filename, answers_json, score, feedback, timestamp
            FROM quiz_attempts
            ORDER BY timestamp DESC
            LIMIT ?1
            "#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let attempts = rows
            .into_iter()
            .map(|row| {
                let answers_json: String = row.get("answers_json");
                QuizAttempt {
                    id: row.get("id"),
                    pdf_id: row.get("pdf_id"),
                    pdf_filename: row.get("pdf_filename"),
                    answers: serde_json::from_str(&answers_json).unwrap_or_default(),
                    score: row.get("score"),
                    feedback: row.get("feedback"),
                    timestamp: parse_timestamp(&row.get::<String, _>("timestamp")),
                }
            })
            .collect();

        Ok(attempts)
    }
}

#[derive(Clone)]
pub enum Store {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
}

impl Store {
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    pub async fn sqlite(database_url: &str) -> Result<Self> {
        let sqlite = SqliteStore::connect(database_url).await?;
        Ok(Self::Sqlite(sqlite))
    }

    pub async fn from_env() -> Result<Self> {
        match std::env::var("REVISER_DATABASE_URL") {
            Ok(database_url) if !database_url.trim().is_empty() => {
                Self::sqlite(database_url.trim()).await
            }
            _ => Ok(Self::memory()),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Store::Memory(_) => "memory",
            Store::Sqlite(_) => "sqlite",
        }
    }
}

impl PdfRepository for Store {
    async fn insert_pdf(&self, pdf: &PdfDocument) -> Result<()> {
        match self {
            Store::Memory(store) => store.insert_pdf(pdf).await,
            Store::Sqlite(store) => store.insert_pdf(pdf).await,
        }
    }

    async fn get_pdf(&self, pdf_id: &str) -> Result<Option<PdfDocument>> {
        match self {
            Store::Memory(store) => store.get_pdf(pdf_id).await,
            Store::Sqlite(store) => store.get_pdf(pdf_id).await,
        }
    }

    async fn list_pdfs(&self) -> Result<Vec<PdfSummary>> {
        match self {
            Store::Memory(store) => store.list_pdfs().await,
            Store::Sqlite(store) => store.list_pdfs().await,
        }
    }
}

impl QuizAttemptRepository for Store {
    async fn insert_attempt(&self, attempt: &QuizAttempt) -> Result<()> {
        match self {
            Store::Memory(store) => store.insert_attempt(attempt).await,
            Store::Sqlite(store) => store.insert_attempt(attempt).await,
        }
    }

    async fn recent_attempts(&self, limit: usize) -> Result<Vec<QuizAttempt>> {
        match self {
            Store::Memory(store) => store.recent_attempts(limit).await,
            Store::Sqlite(store) => store.recent_attempts(limit).await,
        }
    }
}

// fixed-width so lexical ORDER BY matches chronological order
fn sortable_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn page_count_from_row(value: i64) -> u32 {
    u32::try_from(value).unwrap_or_default()
}
