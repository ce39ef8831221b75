//! In-process stand-in for the image generation backend

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use imgedit_core::api::ApiClient;
use serde_json::{Value, json};

pub const GENERATED_PATH: &str = "/static/generated_images/generated_1.jpg";
pub const GENERATED_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3, 4];

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl RecordedPart {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Json { path: String, body: Value },
    Multipart { path: String, parts: Vec<RecordedPart> },
}

impl Recorded {
    pub fn path(&self) -> &str {
        match self {
            Recorded::Json { path, .. } | Recorded::Multipart { path, .. } => path,
        }
    }

    pub fn part(&self, name: &str) -> Option<&RecordedPart> {
        match self {
            Recorded::Multipart { parts, .. } => parts.iter().find(|p| p.name == name),
            Recorded::Json { .. } => None,
        }
    }
}

type Log = Arc<Mutex<Vec<Recorded>>>;

pub struct MockBackend {
    pub base_url: String,
    pub image_base_url: String,
    requests: Log,
}

impl MockBackend {
    /// Backend that answers every endpoint successfully
    pub async fn spawn() -> Self {
        let requests: Log = Arc::default();

        let app = Router::new()
            .route("/api/upload", post(upload))
            .route("/api/generate", post(generate))
            .route("/api/generate_from_text", post(generate_from_text))
            .route(
                GENERATED_PATH,
                get(|| async { ([(header::CONTENT_TYPE, "image/jpeg")], GENERATED_BYTES) }),
            )
            .with_state(requests.clone());

        Self::serve(app, requests).await
    }

    /// Backend that answers everything with `status` and `body`
    pub async fn spawn_failing(status: StatusCode, body: &'static str) -> Self {
        let app = Router::new().fallback(move || async move {
            (status, [(header::CONTENT_TYPE, "application/json")], body)
        });
        Self::serve(app, Arc::default()).await
    }

    /// Backend that waits `delay` before answering successfully
    pub async fn spawn_slow(delay: Duration) -> Self {
        let app = Router::new().fallback(move || async move {
            tokio::time::sleep(delay).await;
            Json(json!({"success": true, "result": "slow", "image_url": GENERATED_PATH}))
        });
        Self::serve(app, Arc::default()).await
    }

    async fn serve(app: Router, requests: Log) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://127.0.0.1:{}/api", port),
            image_base_url: format!("http://127.0.0.1:{}/", port),
            requests,
        }
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::builder()
            .base_url(&self.base_url)
            .image_base_url(&self.image_base_url)
            .build()
            .unwrap()
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Recorded {
        self.requests().pop().expect("no request recorded")
    }
}

/// Address nothing listens on
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/api", port)
}

async fn read_parts(mut multipart: Multipart) -> Vec<RecordedPart> {
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.unwrap().to_vec();
        parts.push(RecordedPart {
            name,
            file_name,
            content_type,
            data,
        });
    }
    parts
}

async fn upload(State(log): State<Log>, multipart: Multipart) -> Response {
    let parts = read_parts(multipart).await;
    let file_name = parts
        .iter()
        .find(|p| p.name == "file")
        .and_then(|p| p.file_name.clone());

    log.lock().unwrap().push(Recorded::Multipart {
        path: "/api/upload".to_string(),
        parts,
    });

    match file_name {
        Some(name) => Json(json!({
            "success": true,
            "imageUrl": format!("static/uploads/{}", name),
            "imageId": 17
        }))
        .into_response(),
        None => (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "file is required"})),
        )
            .into_response(),
    }
}

async fn generate(State(log): State<Log>, request: Request) -> Response {
    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));

    if is_json {
        let Json(body) = Json::<Value>::from_request(request, &()).await.unwrap();
        let text = body["text"].as_str().unwrap_or_default().to_string();
        log.lock().unwrap().push(Recorded::Json {
            path: "/api/generate".to_string(),
            body,
        });
        Json(json!({
            "success": true,
            "result": format!("edited: {}", text),
            "image_url": GENERATED_PATH
        }))
        .into_response()
    } else {
        let multipart = Multipart::from_request(request, &()).await.unwrap();
        let parts = read_parts(multipart).await;
        log.lock().unwrap().push(Recorded::Multipart {
            path: "/api/generate".to_string(),
            parts,
        });
        Json(json!({
            "success": true,
            "result": "generated from image",
            "image_url": GENERATED_PATH
        }))
        .into_response()
    }
}

async fn generate_from_text(State(log): State<Log>, Json(body): Json<Value>) -> Response {
    let has_prompt = body["prompt"].as_str().is_some_and(|p| !p.is_empty());
    log.lock().unwrap().push(Recorded::Json {
        path: "/api/generate_from_text".to_string(),
        body,
    });

    if has_prompt {
        Json(json!({
            "success": true,
            "result": "from text",
            "image_url": GENERATED_PATH
        }))
        .into_response()
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "Prompt is required"})),
        )
            .into_response()
    }
}
