//! reqwest-backed calls to the prediction backend

use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;

use super::error::{ClientError, Result};
use super::types::{
    ApiOutcome, Envelope, MessageResponse, ModelListResponse, PredictResponse, PredictionArtifacts,
    PredictionRequest, TiffListResponse, TiffRegistry, UploadKind, UploadReceipt, UploadRequest,
};

const LIST_MODELS: &str = "/list_models";
const LIST_TIFFS: &str = "/list_tiffs";
const PREDICT: &str = "/predict";
const DELETE_FILE: &str = "/delete_file";

/// File name used when a download href has no usable last segment
const FALLBACK_DOWNLOAD_NAME: &str = "prediction.tif";

/// Client for the upload, listing and prediction endpoints
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: Url,
}

impl ApiClient {
    /// Builds a client with the configured base URL and timeouts.
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .build()?;
        Self::with_http(http, &config.base_url)
    }

    /// Builds a client around an existing reqwest client.
    pub fn with_http(http: Client, base_url: &str) -> Result<Self> {
        let mut base = Url::parse(base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }
        // Keep any path prefix when endpoints are joined on
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", path, e)))
    }

    /// Resolves an href returned by the server the way a browser would
    /// resolve it against the page URL.
    pub fn resolve(&self, href: &str) -> Result<Url> {
        self.base
            .join(href)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", href, e)))
    }

    /// Sends a model or raster file as multipart form data.
    pub async fn upload(&self, request: UploadRequest) -> Result<ApiOutcome<UploadReceipt>> {
        let kind = request.kind;
        let url = self.endpoint(kind.endpoint())?;
        info!(
            "Uploading {} file '{}' ({} bytes)",
            kind, request.file.file_name, request.file.bytes.len()
        );

        let part = Part::bytes(request.file.bytes).file_name(request.file.file_name);
        let mut form = Form::new().part(kind.file_field(), part);
        if let Some(tiff_type) = request.tiff_type {
            form = form.text("tiff_type", tiff_type);
        }

        let response = self.http.post(url).multipart(form).send().await.map_err(|e| {
            error!("Error sending {} upload: {}", kind, e);
            ClientError::from(e)
        })?;
        self.decode::<MessageResponse>(kind.endpoint(), response).await
    }

    /// Fetches the model identifiers in server order.
    pub async fn list_models(&self) -> Result<ApiOutcome<Vec<String>>> {
        let response = self.get(LIST_MODELS).await?;
        self.decode::<ModelListResponse>(LIST_MODELS, response).await
    }

    /// Fetches the uploaded raster registry in server order.
    pub async fn list_tiffs(&self) -> Result<ApiOutcome<TiffRegistry>> {
        let response = self.get(LIST_TIFFS).await?;
        self.decode::<TiffListResponse>(LIST_TIFFS, response).await
    }

    /// Submits the prediction form URL-encoded.
    pub async fn predict(&self, request: &PredictionRequest) -> Result<ApiOutcome<PredictionArtifacts>> {
        let url = self.endpoint(PREDICT)?;
        info!("Requesting prediction with model '{}'", request.model_filename);
        let response = self
            .http
            .post(url)
            .form(&request.form_pairs())
            .send()
            .await
            .map_err(|e| {
                error!("Error sending prediction request: {}", e);
                ClientError::from(e)
            })?;
        self.decode::<PredictResponse>(PREDICT, response).await
    }

    /// Removes an uploaded model or raster on the server.
    pub async fn delete_file(&self, kind: UploadKind, filename: &str) -> Result<ApiOutcome<String>> {
        let url = self.endpoint(DELETE_FILE)?;
        info!("Deleting {} file '{}'", kind, filename);
        let response = self
            .http
            .post(url)
            .form(&[("file_type", kind.file_type()), ("filename", filename)])
            .send()
            .await?;
        let outcome = self.decode::<MessageResponse>(DELETE_FILE, response).await?;
        Ok(outcome.map(|receipt| receipt.message))
    }

    /// Streams the resource at `href` into `dest_dir`, returning the file path.
    pub async fn download(&self, href: &str, dest_dir: &Path) -> Result<PathBuf> {
        let url = self.resolve(href)?;
        let file_name = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
            .unwrap_or(FALLBACK_DOWNLOAD_NAME)
            .to_string();
        let target = dest_dir.join(file_name);

        info!("Downloading {} to {}", url, target.display());
        let response = self.http.get(url).send().await?;
        let response = Self::check_status(response).await?;

        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|e| ClientError::io(dest_dir, e))?;
        let file = tokio::fs::File::create(&target)
            .await
            .map_err(|e| ClientError::io(&target, e))?;

        match Self::write_body(response, file, &target).await {
            Ok(written) => {
                debug!("Wrote {} bytes to {}", written, target.display());
                Ok(target)
            }
            Err(e) => {
                error!("Download of {} failed: {}", target.display(), e);
                if let Err(remove_err) = tokio::fs::remove_file(&target).await {
                    warn!("Could not remove partial file {}: {}", target.display(), remove_err);
                }
                Err(e)
            }
        }
    }

    async fn write_body(response: Response, mut file: tokio::fs::File, target: &Path) -> Result<usize> {
        let mut written = 0usize;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            written += chunk.len();
            file.write_all(&chunk).await.map_err(|e| ClientError::io(target, e))?;
        }
        file.flush().await.map_err(|e| ClientError::io(target, e))?;
        Ok(written)
    }

    async fn get(&self, path: &'static str) -> Result<Response> {
        let url = self.endpoint(path)?;
        debug!("GET {}", url);
        self.http.get(url).send().await.map_err(|e| {
            error!("Error requesting {}: {}", path, e);
            ClientError::from(e)
        })
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        error!("Server returned status {}: {}", status, body);
        Err(ClientError::HttpStatus { status, body })
    }

    async fn decode<E: Envelope>(&self, endpoint: &'static str, response: Response) -> Result<ApiOutcome<E::Payload>> {
        let response = Self::check_status(response).await?;
        let text = response.text().await?;
        debug!("{} responded: {}", endpoint, text);

        let envelope: E = serde_json::from_str(&text).map_err(|e| ClientError::Malformed {
            endpoint,
            reason: e.to_string(),
        })?;
        envelope.into_outcome(endpoint)
    }
}
