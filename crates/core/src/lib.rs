pub mod error;
pub mod models;
pub mod prompts;
pub mod response;

pub use error::ResponseError;
pub use models::*;
pub use prompts::{chat_prompt, quiz_prompt, scoring_prompt, truncate_words, video_prompt};
pub use response::{
    clean_model_json, parse_chat_answer, parse_quiz, parse_quiz_score,
    parse_video_recommendations, youtube_search_url,
};
