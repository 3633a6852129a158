//! In-process stand-in for the prediction backend, built on axum.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::{Multipart, Path as UrlPath, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use rasterpredict::api::ApiClient;
use rasterpredict::view::PageState;
use rasterpredict::Controller;

pub const TIFF_TYPES: [&str; 9] = [
    "NDVI", "aspect", "elevation", "lulc", "org_carbon", "precip", "slope", "soil_pH", "temp",
];

/// Bytes served for every prediction download
pub const PREDICTION_BYTES: &[u8] = b"II*\0fake-prediction-raster";

#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub endpoint: &'static str,
    pub file_field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub fields: Vec<(String, String)>,
}

pub struct BackendState {
    pub models: Vec<String>,
    pub tiffs: Vec<(String, String)>,
    pub predict_response: Value,
    pub list_models_response: Option<Value>,
    pub list_tiffs_status: StatusCode,
    pub list_models_calls: usize,
    pub list_tiffs_calls: usize,
    pub uploads: Vec<RecordedUpload>,
    pub predict_forms: Vec<Vec<(String, String)>>,
    /// Popped by each upload or predict request before it answers
    pub delays: VecDeque<Duration>,
}

impl Default for BackendState {
    fn default() -> Self {
        Self {
            models: Vec::new(),
            tiffs: Vec::new(),
            predict_response: json!({
                "status": "success",
                "prediction_tiff": "/download_prediction/prediction_1.tif",
                "map_html": "/view_map/map_1.html",
            }),
            list_models_response: None,
            list_tiffs_status: StatusCode::OK,
            list_models_calls: 0,
            list_tiffs_calls: 0,
            uploads: Vec::new(),
            predict_forms: Vec::new(),
            delays: VecDeque::new(),
        }
    }
}

type Shared = Arc<Mutex<BackendState>>;

pub struct MockBackend {
    pub base_url: String,
    pub state: Shared,
}

impl MockBackend {
    pub async fn start() -> Self {
        Self::start_with(BackendState::default()).await
    }

    pub async fn start_with(state: BackendState) -> Self {
        let state: Shared = Arc::new(Mutex::new(state));
        let app = Router::new()
            .route("/upload_model", post(upload_model))
            .route("/upload_tiff", post(upload_tiff))
            .route("/list_models", get(list_models))
            .route("/list_tiffs", get(list_tiffs))
            .route("/predict", post(predict))
            .route("/delete_file", post(delete_file))
            .route("/download_prediction/{name}", get(download_prediction))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url: format!("http://{}", addr), state }
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut BackendState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn controller(&self) -> Controller {
        controller_for(&self.base_url)
    }

    /// Polls until `check` holds, panicking after two seconds.
    pub async fn wait_until(&self, check: impl Fn(&BackendState) -> bool) {
        for _ in 0..200 {
            if check(&self.state.lock().unwrap()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("backend never reached the expected state");
    }
}

pub fn controller_for(base_url: &str) -> Controller {
    let api = ApiClient::with_http(reqwest::Client::new(), base_url).unwrap();
    let page = PageState::new(TIFF_TYPES.iter().map(|t| t.to_string()).collect(), Vec::new());
    Controller::new(api, page)
}

/// Base URL of a port nothing listens on
pub async fn dead_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

async fn take_delay(state: &Shared) {
    let delay = state.lock().unwrap().delays.pop_front();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

async fn read_multipart(endpoint: &'static str, mut multipart: Multipart) -> RecordedUpload {
    let mut upload = RecordedUpload {
        endpoint,
        file_field: String::new(),
        file_name: String::new(),
        bytes: Vec::new(),
        fields: Vec::new(),
    };
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                upload.file_field = name;
                upload.file_name = file_name;
                upload.bytes = field.bytes().await.unwrap().to_vec();
            }
            None => {
                let value = field.text().await.unwrap();
                upload.fields.push((name, value));
            }
        }
    }
    upload
}

async fn upload_model(State(state): State<Shared>, multipart: Multipart) -> Json<Value> {
    let upload = read_multipart("/upload_model", multipart).await;
    state.lock().unwrap().uploads.push(upload.clone());
    take_delay(&state).await;

    if upload.file_field == "model_file" && upload.file_name.ends_with(".pkl") {
        state.lock().unwrap().models.push(upload.file_name.clone());
        Json(json!({
            "status": "success",
            "message": "Model uploaded successfully",
            "filename": upload.file_name,
        }))
    } else {
        Json(json!({"status": "error", "message": "Please upload a valid .pkl file"}))
    }
}

async fn upload_tiff(State(state): State<Shared>, multipart: Multipart) -> Json<Value> {
    let upload = read_multipart("/upload_tiff", multipart).await;
    state.lock().unwrap().uploads.push(upload.clone());
    take_delay(&state).await;

    let tiff_type = upload
        .fields
        .iter()
        .find(|(k, _)| k == "tiff_type")
        .map(|(_, v)| v.clone())
        .unwrap_or_default();
    if upload.file_field != "tiff_file" || !TIFF_TYPES.contains(&tiff_type.as_str()) {
        return Json(json!({"status": "error", "message": "Invalid TIFF file or type"}));
    }

    let stored = format!("{}_{}", tiff_type, upload.file_name);
    let mut guard = state.lock().unwrap();
    match guard.tiffs.iter().position(|(k, _)| *k == tiff_type) {
        Some(i) => guard.tiffs[i].1 = stored.clone(),
        None => guard.tiffs.push((tiff_type, stored.clone())),
    }
    Json(json!({"status": "success", "message": "TIFF uploaded successfully", "filename": stored}))
}

async fn list_models(State(state): State<Shared>) -> Json<Value> {
    let mut guard = state.lock().unwrap();
    guard.list_models_calls += 1;
    match &guard.list_models_response {
        Some(body) => Json(body.clone()),
        None => Json(json!({"status": "success", "models": guard.models})),
    }
}

/// Written by hand so the object keeps insertion order on the wire.
async fn list_tiffs(State(state): State<Shared>) -> Response {
    let mut guard = state.lock().unwrap();
    guard.list_tiffs_calls += 1;
    if guard.list_tiffs_status != StatusCode::OK {
        return (guard.list_tiffs_status, "backend exploded").into_response();
    }
    let entries: Vec<String> = guard
        .tiffs
        .iter()
        .map(|(k, v)| format!("{}:{}", Value::from(k.as_str()), Value::from(v.as_str())))
        .collect();
    let body = format!(r#"{{"status":"success","tiffs":{{{}}}}}"#, entries.join(","));
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

async fn predict(State(state): State<Shared>, Form(fields): Form<Vec<(String, String)>>) -> Json<Value> {
    state.lock().unwrap().predict_forms.push(fields);
    take_delay(&state).await;
    let body = state.lock().unwrap().predict_response.clone();
    Json(body)
}

async fn delete_file(State(state): State<Shared>, Form(fields): Form<HashMap<String, String>>) -> Json<Value> {
    let file_type = fields.get("file_type").cloned().unwrap_or_default();
    let filename = fields.get("filename").cloned().unwrap_or_default();
    let mut guard = state.lock().unwrap();
    let removed = if file_type == "model" {
        let before = guard.models.len();
        guard.models.retain(|m| *m != filename);
        before != guard.models.len()
    } else {
        let before = guard.tiffs.len();
        guard.tiffs.retain(|(_, v)| *v != filename);
        before != guard.tiffs.len()
    };
    if removed {
        Json(json!({"status": "success", "message": format!("{} deleted", filename)}))
    } else {
        Json(json!({"status": "error", "message": "File not found"}))
    }
}

/// `truncated_*.tif` sends one chunk and then aborts the body.
async fn download_prediction(UrlPath(name): UrlPath<String>) -> Response {
    if name.starts_with("truncated") {
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(PREDICTION_BYTES)),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "backend went away")),
        ];
        Body::from_stream(futures::stream::iter(chunks)).into_response()
    } else if name.ends_with(".tif") {
        PREDICTION_BYTES.into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}
