use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use reviser_api::{build_app_with, ApiConfig};
use reviser_llm::{Generator, RetryPolicy, ScriptedModel};
use reviser_storage::Store;
use reviser_tutor::TutorSettings;
use serde_json::{json, Value};
use tower::ServiceExt;

const BOUNDARY: &str = "reviser-test-boundary";

fn app_with(store: Store, model: Arc<ScriptedModel>) -> Router {
    app_with_config(store, model, ApiConfig::default())
}

fn app_with_config(store: Store, model: Arc<ScriptedModel>, config: ApiConfig) -> Router {
    let settings = TutorSettings {
        retry: RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::ZERO,
        },
        ..TutorSettings::default()
    };
    build_app_with(store, Generator::scripted(model), settings, config)
}

fn pdf_bytes(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn upload_request(filename: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn post_json(uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn upload_biology(app: &Router) -> String {
    let pdf = pdf_bytes(&[
        "Photosynthesis converts light energy into chemical energy in chloroplasts",
        "Mitochondria release energy from glucose through cellular respiration",
    ]);
    let (status, body) = send(app, upload_request("Biology Unit 3.pdf", &pdf)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["filename"], "Biology_Unit_3.pdf");
    assert_eq!(body["page_count"], 2);
    body["pdf_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let app = app_with(Store::memory(), Arc::new(ScriptedModel::new()));
    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn study_session_round_trip() {
    let model = Arc::new(ScriptedModel::new());
    let app = app_with(Store::memory(), model.clone());

    let pdf_id = upload_biology(&app).await;

    let (status, body) = send(&app, get("/api/pdfs")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pdfs"].as_array().unwrap().len(), 1);
    assert_eq!(body["pdfs"][0]["_id"], pdf_id.as_str());
    assert!(body["pdfs"][0].get("extracted_text").is_none());

    model.push_reply(
        "```json\n{\"answer\": \"They release energy.\", \"citation\": \"Mitochondria release energy from glucose\"}\n```",
    );
    let (status, body) = send(
        &app,
        post_json(
            "/api/chat",
            json!({"pdfId": pdf_id, "message": "What do mitochondria do?"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "They release energy.");
    assert_eq!(body["citation"], "Mitochondria release energy from glucose");
    assert!(model.prompts()[0].contains("What do mitochondria do?"));

    model.push_reply(
        r#"{"score": "1/1", "overallFeedback": "Well done.", "questionFeedback": [{"question": "Q1", "userAnswer": "b", "isCorrect": true, "feedback": "Correct."}]}"#,
    );
    let (status, body) = send(
        &app,
        post_json(
            "/api/score-quiz",
            json!({
                "pdfId": pdf_id,
                "quizQuestions": {"mcqs": [{"question": "Q1", "options": ["a", "b"], "correctAnswer": "b"}]},
                "userAnswers": {"mcq_0": "b"}
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], "1/1");
    assert_eq!(body["questionFeedback"][0]["isCorrect"], true);

    let (status, body) = send(&app, get("/api/progress")).await;
    assert_eq!(status, StatusCode::OK);
    let attempts = body["attempts"].as_array().unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0]["pdf_filename"], "Biology_Unit_3.pdf");
    assert_eq!(attempts[0]["pdfId"], pdf_id.as_str());
    assert_eq!(attempts[0]["feedback"], "Well done.");
}

#[tokio::test]
async fn quiz_and_videos_come_back_structured() {
    let model = Arc::new(ScriptedModel::new());
    let app = app_with(Store::memory(), model.clone());
    let pdf_id = upload_biology(&app).await;

    model.push_reply(
        r#"{"mcqs": [{"question": "Where does photosynthesis happen?", "options": ["Chloroplast", "Nucleus", "Ribosome", "Vacuole"], "correctAnswer": "Chloroplast"}],
            "saqs": [{"question": "Define respiration.", "idealAnswer": "Releasing energy from glucose."}],
            "laqs": [{"question": "Compare the two processes.", "idealAnswer": "..."}]}"#,
    );
    let (status, body) = send(&app, post_json("/api/generate-quiz", json!({"pdfId": pdf_id}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mcqs"][0]["correctAnswer"], "Chloroplast");
    assert_eq!(body["saqs"][0]["idealAnswer"], "Releasing energy from glucose.");

    model.push_reply(
        r#"{"recommendations": [{"title": "Cellular respiration overview", "url": "not a url"}]}"#,
    );
    let (status, body) = send(
        &app,
        post_json("/api/recommend-videos", json!({"pdfId": pdf_id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let url = body["recommendations"][0]["url"].as_str().unwrap();
    assert!(url.starts_with("https://www.youtube.com/results?search_query="));
}

#[tokio::test]
async fn exhausted_generation_is_a_server_error() {
    let model = Arc::new(ScriptedModel::new());
    let app = app_with(Store::memory(), model.clone());
    let pdf_id = upload_biology(&app).await;

    for _ in 0..3 {
        model.push_failure("model overloaded");
    }
    let (status, body) = send(&app, post_json("/api/generate-quiz", json!({"pdfId": pdf_id}))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to generate quiz: "));
    assert_eq!(model.prompts().len(), 3);
}

#[tokio::test]
async fn invalid_and_unknown_ids() {
    let app = app_with(Store::memory(), Arc::new(ScriptedModel::new()));

    let (status, body) = send(
        &app,
        post_json("/api/chat", json!({"pdfId": "507f1f77bcf86cd799439011", "message": "hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid PDF ID format.");

    let (status, body) = send(
        &app,
        post_json(
            "/api/recommend-videos",
            json!({"pdfId": uuid::Uuid::new_v4().to_string()}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "PDF not found.");
}

#[tokio::test]
async fn rejects_non_pdf_uploads() {
    let app = app_with(Store::memory(), Arc::new(ScriptedModel::new()));

    let (status, body) = send(&app, upload_request("notes.docx", b"PK\x03\x04")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid file type. Only PDF files are allowed.");

    let (status, _) = send(&app, post_json("/api/upload", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_uploads_are_json_413() {
    let config = ApiConfig {
        max_upload_bytes: 256,
        ..ApiConfig::default()
    };
    let app = app_with_config(Store::memory(), Arc::new(ScriptedModel::new()), config);

    let (status, body) = send(&app, upload_request("big.pdf", &vec![b'%'; 4096])).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"], "File size exceeds 256 bytes limit");

    let mut request = upload_request("huge.pdf", &vec![b'%'; 128 * 1024]);
    let length = (128 * 1024 + 512).to_string();
    request
        .headers_mut()
        .insert("content-length", length.parse().unwrap());
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"], "File size exceeds 256 bytes limit");
}

#[tokio::test]
async fn score_quiz_files_non_string_pdf_id_as_unknown() {
    let model = Arc::new(ScriptedModel::new());
    model.push_reply(r#"{"score": "1/1", "overallFeedback": "Well done."}"#);
    let app = app_with(Store::memory(), model);

    let (status, body) = send(
        &app,
        post_json(
            "/api/score-quiz",
            json!({
                "pdfId": 12345,
                "quizQuestions": [{"question": "Q1"}],
                "userAnswers": ["a"]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["score"], "1/1");

    let (status, body) = send(&app, get("/api/progress")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["attempts"][0]["pdf_filename"], "Unknown PDF");
    assert!(body["attempts"][0]["pdfId"].is_null());
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let app = app_with(Store::memory(), Arc::new(ScriptedModel::new()));
    let (status, body) = send(&app, get("/api/does-not-exist")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Resource not found");
}

#[tokio::test]
async fn sqlite_backend_persists_across_apps() {
    let dir = tempfile::tempdir().unwrap();
    let database_url = format!("sqlite://{}", dir.path().join("reviser.db").display());

    let first = app_with(
        Store::sqlite(&database_url).await.unwrap(),
        Arc::new(ScriptedModel::new()),
    );
    let pdf_id = upload_biology(&first).await;

    let second = app_with(
        Store::sqlite(&database_url).await.unwrap(),
        Arc::new(ScriptedModel::new()),
    );
    let (status, body) = send(&second, get("/api/pdfs")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pdfs"][0]["_id"], pdf_id.as_str());
    assert_eq!(body["pdfs"][0]["page_count"], 2);
}
