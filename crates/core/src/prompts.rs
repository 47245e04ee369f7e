use serde_json::Value;

pub const QUIZ_WORD_LIMIT: usize = 4000;
pub const VIDEO_WORD_LIMIT: usize = 3000;

pub fn truncate_words(text: &str, max_words: usize) -> String {
    text.split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn quiz_prompt(text_content: &str) -> String {
    format!(
        r#"
You are an expert educational quiz generator. Using the coursebook text below, write a quiz.

Produce exactly:
- 2 Multiple Choice Questions (MCQs)
- 2 Short Answer Questions (SAQs)
- 1 Long Answer Question (LAQ)

Reply with ONLY a valid JSON object shaped like this:
{{
    "mcqs": [
        {{
            "question": "question text",
            "options": ["option1", "option2", "option3", "option4"],
            "correctAnswer": "correct option text"
        }}
    ],
    "saqs": [
        {{
            "question": "question text",
            "idealAnswer": "detailed ideal answer"
        }}
    ],
    "laqs": [
        {{
            "question": "question text",
            "idealAnswer": "comprehensive ideal answer"
        }}
    ]
}}

Rules:
- Questions must be grounded in the text
- MCQ distractors must be plausible
- Ideal answers must be complete
- Test understanding rather than recall

Text Content:
---
{text_content}
---

JSON Response:
"#
    )
}

pub fn chat_prompt(context: &str, question: &str) -> String {
    format!(
        r#"
You are a patient, knowledgeable AI teacher. A student is asking about their study material.

Instructions:
1. Answer clearly and accurately using ONLY the context below
2. Include a verbatim quote from the context that supports the answer
3. If the context does not cover the question, say so plainly

Reply with ONLY a valid JSON object shaped like this:
{{
    "answer": "A clear, helpful answer for the student",
    "citation": "A direct, verbatim quote from the context supporting the answer"
}}

Context from Document:
---
{context}
---

Student's Question: "{question}"

JSON Response:
"#
    )
}

pub fn video_prompt(text_content: &str) -> String {
    format!(
        r#"
You are an expert curator of educational content. Read the text below and recommend exactly 5 YouTube videos that would help a student learn it.

For each video give:
- A descriptive title naming the topic or concept to search for
- A YouTube search URL of the form https://www.youtube.com/results?search_query=SEARCH+TERMS

Reply with ONLY a valid JSON object shaped like this:
{{
    "recommendations": [
        {{
            "title": "Video topic/title",
            "url": "https://www.youtube.com/results?search_query=..."
        }}
    ]
}}

Guidelines:
- Prefer educational channels and tutorials
- Keep search terms specific to the material
- Use + instead of spaces in URLs
- Cover different aspects of the topic

Educational Text Content:
---
{text_content}
---

JSON Response:
"#
    )
}

pub fn scoring_prompt(quiz_questions: &Value, user_answers: &Value) -> String {
    let questions = pretty_json(quiz_questions);
    let answers = pretty_json(user_answers);

    format!(
        r#"
You are an expert educator grading a student's quiz.

Quiz Questions with Ideal Answers:
---
{questions}
---

Student's Answers:
---
{answers}
---

Grade the submission and reply with ONLY a valid JSON object shaped like this:
{{
    "score": "X%",
    "overallFeedback": "Feedback on the overall performance",
    "questionFeedback": [
        {{
            "question": "Question text",
            "userAnswer": "Student's answer",
            "isCorrect": true/false,
            "feedback": "Feedback for this question"
        }}
    ]
}}

Grading Guidelines:
- MCQs: full credit for an exact match, none otherwise
- SAQs/LAQs: partial credit for accuracy, completeness and understanding
- Keep feedback constructive and encouraging
- Say precisely what was right and what to improve
- Give actionable next steps

JSON Response:
"#
    )
}

fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
