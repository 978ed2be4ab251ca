mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use common::*;
use ephemeral_convert::models::ConversionKind;
use ephemeral_convert::{AppState, create_app};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "----ephemeral-test-boundary";

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, filename, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(parts: &[Part]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn json_request(uri: &str, value: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(value.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn app_for(env: &TestEnv) -> Router {
    create_app(AppState::new(env.manager.clone()))
}

#[tokio::test]
async fn test_upload_convert_download_flow() {
    let env = setup().await;
    let app = app_for(&env);

    // 1. Upload
    let (status, json) = send(
        &app,
        upload_request(&[
            Part::Text("conversion_type", "pdf_to_pptx"),
            Part::File("file", "Team Update.pdf", FAKE_PDF),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", json);
    assert_eq!(json["original_name"], "Team Update.pdf");
    let file_id = json["file_id"].as_str().unwrap().to_string();
    assert!(file_id.ends_with(".pdf"));

    // 2. Convert
    let (status, json) = send(
        &app,
        json_request(
            "/convert_all",
            json!({"conversion_type": "pdf_to_pptx", "file_ids": [file_id]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", json);
    let url = json["download_url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/download/Team_Update_"));
    assert!(url.ends_with(".pptx"));

    // 3. Download, twice: access renews rather than consumes
    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(&url).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"Team_Update_"));
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/vnd.openxmlformats-officedocument.presentationml.presentation"
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..2], b"PK");
    }

    // 4. The upload was consumed
    let (status, json) = send(
        &app,
        json_request(
            "/convert_all",
            json!({"conversion_type": "pdf_to_pptx", "file_ids": [file_id]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No files converted");
}

#[tokio::test]
async fn test_upload_with_type_after_file() {
    let env = setup().await;
    let app = app_for(&env);

    let (status, json) = send(
        &app,
        upload_request(&[
            Part::File("file", "deck.pptx", b"PK deck"),
            Part::Text("conversion_type", "pptx_to_pdf"),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", json);
    assert!(json["file_id"].as_str().unwrap().ends_with(".pptx"));
    assert_eq!(env.manager.pools().pending.len(), 1);
}

#[tokio::test]
async fn test_upload_validation_errors() {
    let env = setup().await;
    let app = app_for(&env);

    let cases: Vec<(Vec<Part>, &str)> = vec![
        (
            vec![Part::Text("conversion_type", "pdf_to_pptx")],
            "No file uploaded",
        ),
        (
            vec![
                Part::Text("conversion_type", "pdf_to_pptx"),
                Part::File("file", "", b"data"),
            ],
            "No file uploaded",
        ),
        (
            vec![
                Part::Text("conversion_type", "pdf_to_pptx"),
                Part::File("file", "deck.pptx", b"data"),
            ],
            "Only PDF files allowed",
        ),
        (
            vec![
                Part::Text("conversion_type", "pptx_to_pdf"),
                Part::File("file", "doc.pdf", b"data"),
            ],
            "Only PPTX files allowed",
        ),
        (
            vec![
                Part::Text("conversion_type", "docx_to_pdf"),
                Part::File("file", "doc.docx", b"data"),
            ],
            "Invalid conversion type",
        ),
        (
            vec![Part::File("file", "doc.pdf", b"data")],
            "Invalid conversion type",
        ),
    ];

    for (parts, expected) in cases {
        let (status, json) = send(&app, upload_request(&parts)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", expected);
        assert_eq!(json["error"], expected);
    }

    assert!(env.manager.pools().pending.is_empty());
    assert!(files_in(&env.config.upload_dir).is_empty());
}

#[tokio::test]
async fn test_upload_too_large() {
    let env = setup_with(
        |c| c.max_upload_size = 1024,
        Arc::new(FakeConverter { delay: None }),
    )
    .await;
    let app = app_for(&env);
    let big = vec![7u8; 2048];

    let (status, json) = send(
        &app,
        upload_request(&[
            Part::Text("conversion_type", "pdf_to_pptx"),
            Part::File("file", "big.pdf", &big),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(json["error"].as_str().unwrap().starts_with("File size exceeds"));
    assert!(files_in(&env.config.upload_dir).is_empty());
}

#[tokio::test]
async fn test_convert_all_request_errors() {
    let env = setup().await;
    let app = app_for(&env);

    let (status, json) = send(
        &app,
        json_request("/convert_all", json!({"conversion_type": "pdf_to_pptx"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No files provided");

    let (status, json) = send(
        &app,
        json_request(
            "/convert_all",
            json!({"conversion_type": "pdf_to_pptx", "file_ids": []}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No files provided");

    let (status, json) = send(
        &app,
        json_request(
            "/convert_all",
            json!({"conversion_type": "bogus", "file_ids": ["a.pdf"]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid conversion type");

    let (status, json) = send(
        &app,
        json_request(
            "/convert_all",
            json!({"conversion_type": "pdf_to_pptx", "file_ids": "abc"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No files provided");

    let (status, json) = send(
        &app,
        json_request("/convert_all", json!({"conversion_type": 5, "file_ids": ["a.pdf"]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid conversion type");
}

#[tokio::test]
async fn test_unbounded_upload_limit() {
    let env = setup_with(
        |c| c.max_upload_size = usize::MAX,
        Arc::new(FakeConverter { delay: None }),
    )
    .await;
    let app = app_for(&env);

    let (status, json) = send(
        &app,
        upload_request(&[
            Part::File("file", "deck.pptx", b"PK deck"),
            Part::Text("conversion_type", "pptx_to_pdf"),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", json);
    assert_eq!(env.manager.pools().pending.len(), 1);
}

#[tokio::test]
async fn test_conversion_failure_is_500_with_detail() {
    let env = setup_with(|_| {}, Arc::new(FailingConverter)).await;
    let app = app_for(&env);

    let (_, json) = send(
        &app,
        upload_request(&[
            Part::Text("conversion_type", "pptx_to_pdf"),
            Part::File("file", "broken.pptx", b"PK"),
        ]),
    )
    .await;
    let file_id = json["file_id"].as_str().unwrap().to_string();

    let (status, json) = send(
        &app,
        json_request(
            "/convert_all",
            json!({"conversion_type": "pptx_to_pdf", "file_ids": [file_id]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        json["error"]
            .as_str()
            .unwrap()
            .contains("source file could not be loaded")
    );
    // Still pending, waiting to expire
    assert!(env.manager.pools().pending.contains(&file_id));
}

#[tokio::test]
async fn test_download_unknown_is_404() {
    let env = setup().await;
    let app = app_for(&env);

    for uri in ["/download/nothing.pptx", "/download/..%2Fuploads%2Fx.pdf"] {
        let (status, json) = send(
            &app,
            Request::builder().uri(uri).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(json["error"], "File not found");
    }
}

#[tokio::test]
async fn test_health_and_request_id() {
    let env = setup().await;
    let app = app_for(&env);
    env.manager
        .admit(&FAKE_PDF[..], "a.pdf", ConversionKind::PdfToPptx)
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["pending_files"], 1);
    assert_eq!(json["converted_files"], 0);
}
