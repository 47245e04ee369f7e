use serde_json::{Map, Value};
use url::Url;

use crate::error::ResponseError;
use crate::models::{
    ChatAnswer, MultipleChoiceQuestion, OpenQuestion, QuestionFeedback, Quiz, QuizScore,
    VideoRecommendation, VideoRecommendations,
};

pub const CITATION_FALLBACK_CHARS: usize = 200;
pub const DEFAULT_SCORE: &str = "0%";
pub const DEFAULT_OVERALL_FEEDBACK: &str = "Quiz completed.";

const YOUTUBE_SEARCH_URL: &str = "https://www.youtube.com/results";

pub fn clean_model_json(raw: &str) -> String {
    raw.trim()
        .replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string()
}

pub fn parse_quiz(raw: &str) -> Result<Quiz, ResponseError> {
    let object = parse_object(raw)?;

    Ok(Quiz {
        mcqs: section::<MultipleChoiceQuestion>(&object, "mcqs")?,
        saqs: section::<OpenQuestion>(&object, "saqs")?,
        laqs: section::<OpenQuestion>(&object, "laqs")?,
    })
}

/// Never fails: a reply that is not a JSON object becomes the answer and
/// the citation falls back to the start of the context.
pub fn parse_chat_answer(raw: &str, context: &str) -> ChatAnswer {
    let cleaned = clean_model_json(raw);

    let Ok(object) = parse_object(&cleaned) else {
        return ChatAnswer {
            answer: cleaned,
            citation: citation_fallback(context),
        };
    };

    ChatAnswer {
        answer: object
            .get("answer")
            .map(value_to_text)
            .unwrap_or_else(|| cleaned.clone()),
        citation: object
            .get("citation")
            .map(value_to_text)
            .unwrap_or_else(|| citation_fallback(context)),
    }
}

pub fn parse_video_recommendations(raw: &str) -> Result<VideoRecommendations, ResponseError> {
    let object = parse_object(raw)?;
    let items = object
        .get("recommendations")
        .and_then(Value::as_array)
        .ok_or(ResponseError::MissingSection("recommendations"))?;

    let recommendations = items
        .iter()
        .enumerate()
        .map(|(position, item)| {
            let title = item.get("title").and_then(Value::as_str);
            let url = item.get("url").and_then(Value::as_str);
            match (title, url) {
                (Some(title), Some(url)) => Ok(VideoRecommendation {
                    title: title.to_string(),
                    url: normalize_video_url(title, url),
                }),
                _ => Err(ResponseError::InvalidRecommendation(position)),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(VideoRecommendations { recommendations })
}

pub fn parse_quiz_score(raw: &str) -> Result<QuizScore, ResponseError> {
    let object = parse_object(raw)?;

    let question_feedback = object
        .get("questionFeedback")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value::<QuestionFeedback>(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default();

    Ok(QuizScore {
        score: object
            .get("score")
            .map(value_to_text)
            .unwrap_or_else(|| DEFAULT_SCORE.to_string()),
        overall_feedback: object
            .get("overallFeedback")
            .map(value_to_text)
            .unwrap_or_else(|| DEFAULT_OVERALL_FEEDBACK.to_string()),
        question_feedback,
    })
}

pub fn youtube_search_url(terms: &str) -> String {
    match Url::parse(YOUTUBE_SEARCH_URL) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("search_query", terms.trim());
            url.to_string()
        }
        Err(_) => YOUTUBE_SEARCH_URL.to_string(),
    }
}

fn normalize_video_url(title: &str, url: &str) -> String {
    match Url::parse(url.trim()) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => parsed.to_string(),
        _ => youtube_search_url(title),
    }
}

fn parse_object(raw: &str) -> Result<Map<String, Value>, ResponseError> {
    match serde_json::from_str::<Value>(&clean_model_json(raw))? {
        Value::Object(map) => Ok(map),
        _ => Err(ResponseError::NotAnObject),
    }
}

fn section<T>(object: &Map<String, Value>, name: &'static str) -> Result<Vec<T>, ResponseError>
where
    T: serde::de::DeserializeOwned,
{
    let value = object
        .get(name)
        .ok_or(ResponseError::MissingSection(name))?;
    Ok(serde_json::from_value(value.clone())?)
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn citation_fallback(context: &str) -> String {
    let prefix = context.chars().take(CITATION_FALLBACK_CHARS).collect::<String>();
    format!("{prefix}...")
}
