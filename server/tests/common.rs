//! Shared helpers: a mock of the upstream AI services and a relay app wired to it.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{
    body::{to_bytes, Body},
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tower::ServiceExt;

use server::config::{ServerConfig, UpstreamConfig};
use server::{build_router, AppState};

pub const GATEWAY_KEY: &str = "test-gateway-key";
pub const XI_KEY: &str = "test-xi-key";

/// One request the mock upstream received.
#[derive(Debug, Clone)]
pub struct UpstreamCall {
    pub uri: String,
    pub authorization: Option<String>,
    pub xi_api_key: Option<String>,
    pub body: Value,
}

#[derive(Clone, Default)]
pub struct MockUpstream {
    calls: Arc<Mutex<Vec<UpstreamCall>>>,
}

impl MockUpstream {
    pub fn calls(&self) -> Vec<UpstreamCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_call(&self) -> UpstreamCall {
        self.calls().last().cloned().expect("upstream was not called")
    }

    fn record(&self, uri: &Uri, headers: &HeaderMap, body: Value) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        self.calls.lock().unwrap().push(UpstreamCall {
            uri: uri.to_string(),
            authorization: header("authorization"),
            xi_api_key: header("xi-api-key"),
            body,
        });
    }
}

pub fn sse_chunk(content: &str) -> String {
    format!(
        "data: {}\n\n",
        json!({ "choices": [{ "delta": { "content": content } }] })
    )
}

async fn completions(
    State(mock): State<MockUpstream>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    mock.record(&uri, &headers, body.clone());

    let last = body["messages"]
        .as_array()
        .and_then(|m| m.last())
        .and_then(|m| m["content"].as_str())
        .unwrap_or_default()
        .to_string();

    match last.as_str() {
        "limit" => (StatusCode::TOO_MANY_REQUESTS, "slow down").into_response(),
        "credits" => (StatusCode::PAYMENT_REQUIRED, "no credits").into_response(),
        "down" => (StatusCode::SERVICE_UNAVAILABLE, "maintenance").into_response(),
        _ => {
            let stream = format!(
                ": keep-alive\n\n{}{}data: [DONE]\n\n",
                sse_chunk("Hello"),
                sse_chunk(" there"),
            );
            ([(header::CONTENT_TYPE, "text/event-stream")], stream).into_response()
        }
    }
}

async fn text_to_speech(
    State(mock): State<MockUpstream>,
    Path(voice_id): Path<String>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    mock.record(&uri, &headers, body);
    (
        [(header::CONTENT_TYPE, "audio/mpeg")],
        format!("ID3:{voice_id}"),
    )
        .into_response()
}

async fn speech_to_text(
    State(mock): State<MockUpstream>,
    uri: Uri,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let mut fields = Map::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.unwrap();
        let value = match file_name {
            Some(file_name) => json!({ "fileName": file_name, "size": bytes.len() }),
            None => Value::String(String::from_utf8_lossy(&bytes).into_owned()),
        };
        fields.insert(name, value);
    }
    let size = fields
        .get("file")
        .and_then(|f| f["size"].as_u64())
        .unwrap_or(0);
    mock.record(&uri, &headers, Value::Object(fields));
    Json(json!({ "text": format!("heard {size} bytes"), "language_code": "en" })).into_response()
}

pub async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Start the mock upstream and return it with its base url.
pub async fn spawn_upstream() -> (MockUpstream, String) {
    let mock = MockUpstream::default();
    let router = Router::new()
        .route("/v1/chat/completions", post(completions))
        .route("/v1/text-to-speech/{voice_id}", post(text_to_speech))
        .route("/v1/speech-to-text", post(speech_to_text))
        .with_state(mock.clone());
    let base = serve(router).await;
    (mock, base)
}

pub fn upstream_config(base: &str) -> UpstreamConfig {
    UpstreamConfig {
        chat_api_key: Some(GATEWAY_KEY.to_string()),
        chat_api_url: format!("{base}/v1/chat/completions"),
        elevenlabs_api_key: Some(XI_KEY.to_string()),
        elevenlabs_base_url: base.to_string(),
        ..UpstreamConfig::default()
    }
}

/// Relay app backed by a fresh mock upstream.
pub async fn create_test_app() -> (Router, MockUpstream) {
    let (mock, base) = spawn_upstream().await;
    let app = build_router(AppState::new(ServerConfig::default(), upstream_config(&base)))
        .expect("router should build");
    (app, mock)
}

pub async fn create_app_with(upstream: UpstreamConfig) -> Router {
    build_router(AppState::new(ServerConfig::default(), upstream)).expect("router should build")
}

pub async fn get(app: &Router, uri: &str) -> Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub const BOUNDARY: &str = "relay-test-boundary";

/// Hand-built multipart body with one file part.
pub fn multipart_body(field: &str, file_name: &str, mime: &str, data: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {mime}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn post_multipart(app: &Router, uri: &str, body: Vec<u8>) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn body_bytes(response: Response) -> bytes::Bytes {
    to_bytes(response.into_body(), usize::MAX).await.unwrap()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
