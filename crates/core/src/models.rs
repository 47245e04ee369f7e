use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const UNKNOWN_PDF_FILENAME: &str = "Unknown PDF";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub filename: String,
    pub extracted_text: String,
    pub page_count: u32,
    pub uploaded_at: DateTime<Utc>,
}

impl PdfDocument {
    pub fn summary(&self) -> PdfSummary {
        PdfSummary {
            id: self.id.clone(),
            filename: self.filename.clone(),
            page_count: self.page_count,
            uploaded_at: self.uploaded_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub filename: String,
    pub page_count: u32,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfUploaded {
    pub pdf_id: String,
    pub filename: String,
    pub page_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MultipleChoiceQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OpenQuestion {
    pub question: String,
    pub ideal_answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub mcqs: Vec<MultipleChoiceQuestion>,
    pub saqs: Vec<OpenQuestion>,
    pub laqs: Vec<OpenQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatAnswer {
    pub answer: String,
    pub citation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecommendation {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecommendations {
    pub recommendations: Vec<VideoRecommendation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionFeedback {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub user_answer: Value,
    #[serde(default)]
    pub is_correct: bool,
    #[serde(default)]
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizScore {
    pub score: String,
    pub overall_feedback: String,
    #[serde(default)]
    pub question_feedback: Vec<QuestionFeedback>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSubmission {
    #[serde(default)]
    pub pdf_id: Value,
    #[serde(default)]
    pub quiz_questions: Value,
    #[serde(default)]
    pub user_answers: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAttempt {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "pdfId")]
    pub pdf_id: Option<String>,
    pub pdf_filename: String,
    pub answers: Value,
    pub score: String,
    pub feedback: String,
    pub timestamp: DateTime<Utc>,
}

/// Mirrors JSON truthiness: null, false, empty strings, arrays and objects
/// count as missing.
pub fn is_blank_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Number(number) => number.as_f64() == Some(0.0),
    }
}
