use std::fmt;
use std::path::Path;

use serde::de::{DeserializeOwned, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use super::error::{ClientError, Result};

/// Discriminant value that selects success handling
pub const SUCCESS: &str = "success";

/// The `status` discriminant carried by every JSON response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Status(String);

impl Status {
    pub fn is_success(&self) -> bool {
        self.0 == SUCCESS
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of an exchange that completed at the HTTP level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiOutcome<T> {
    /// `status == "success"` with the decoded payload
    Success(T),
    /// Any other status; `message` is shown to the user verbatim
    Failure { message: String },
}

impl<T> ApiOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ApiOutcome::Success(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiOutcome<U> {
        match self {
            ApiOutcome::Success(value) => ApiOutcome::Success(f(value)),
            ApiOutcome::Failure { message } => ApiOutcome::Failure { message },
        }
    }
}

/// A decoded response body that can be split on its discriminant.
pub trait Envelope: DeserializeOwned {
    type Payload;

    fn into_outcome(self, endpoint: &'static str) -> Result<ApiOutcome<Self::Payload>>;
}

fn failure_message(endpoint: &str, status: &Status, message: Option<String>) -> String {
    message.unwrap_or_else(|| format!("{} reported status '{}'", endpoint, status))
}

fn missing(endpoint: &'static str, field: &str) -> ClientError {
    ClientError::Malformed {
        endpoint,
        reason: format!("success response is missing '{}'", field),
    }
}

/// `{status, message}` as returned by the upload and delete endpoints
#[derive(Debug, Deserialize)]
pub struct MessageResponse {
    pub status: Status,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

/// What a successful upload or delete reports back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub message: String,
    /// Name the server stored the file under, when it says
    pub filename: Option<String>,
}

impl Envelope for MessageResponse {
    type Payload = UploadReceipt;

    fn into_outcome(self, endpoint: &'static str) -> Result<ApiOutcome<UploadReceipt>> {
        if !self.status.is_success() {
            return Ok(ApiOutcome::Failure {
                message: failure_message(endpoint, &self.status, self.message),
            });
        }
        let message = self.message.ok_or_else(|| missing(endpoint, "message"))?;
        Ok(ApiOutcome::Success(UploadReceipt { message, filename: self.filename }))
    }
}

/// `/list_models` body
#[derive(Debug, Deserialize)]
pub struct ModelListResponse {
    pub status: Status,
    #[serde(default)]
    pub models: Option<Vec<String>>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Envelope for ModelListResponse {
    type Payload = Vec<String>;

    fn into_outcome(self, endpoint: &'static str) -> Result<ApiOutcome<Vec<String>>> {
        if !self.status.is_success() {
            return Ok(ApiOutcome::Failure {
                message: failure_message(endpoint, &self.status, self.message),
            });
        }
        self.models
            .map(ApiOutcome::Success)
            .ok_or_else(|| missing(endpoint, "models"))
    }
}

/// Uploaded rasters as identifier → description pairs, in wire order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TiffRegistry(Vec<(String, String)>);

impl TiffRegistry {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.iter().find(|(k, _)| *k == id).map(|(_, v)| v)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TiffRegistry {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        TiffRegistry(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl IntoIterator for TiffRegistry {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

struct TiffRegistryVisitor;

impl<'de> Visitor<'de> for TiffRegistryVisitor {
    type Value = TiffRegistry;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object mapping raster identifiers to descriptions")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<TiffRegistry, A::Error> {
        let mut pairs = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((id, desc)) = access.next_entry::<String, String>()? {
            // Later duplicates replace earlier ones in place, like a JS object.
            match pairs.iter().position(|(k, _): &(String, String)| *k == id) {
                Some(i) => pairs[i].1 = desc,
                None => pairs.push((id, desc)),
            }
        }
        Ok(TiffRegistry(pairs))
    }
}

impl<'de> Deserialize<'de> for TiffRegistry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(TiffRegistryVisitor)
    }
}

/// `/list_tiffs` body
#[derive(Debug, Deserialize)]
pub struct TiffListResponse {
    pub status: Status,
    #[serde(default)]
    pub tiffs: Option<TiffRegistry>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Envelope for TiffListResponse {
    type Payload = TiffRegistry;

    fn into_outcome(self, endpoint: &'static str) -> Result<ApiOutcome<TiffRegistry>> {
        if !self.status.is_success() {
            return Ok(ApiOutcome::Failure {
                message: failure_message(endpoint, &self.status, self.message),
            });
        }
        self.tiffs
            .map(ApiOutcome::Success)
            .ok_or_else(|| missing(endpoint, "tiffs"))
    }
}

/// `/predict` body
#[derive(Debug, Deserialize)]
pub struct PredictResponse {
    pub status: Status,
    #[serde(default)]
    pub prediction_tiff: Option<String>,
    #[serde(default)]
    pub map_html: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// References returned by a successful prediction. Always set together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionArtifacts {
    /// Downloadable raster href
    pub prediction_tiff: String,
    /// Embeddable map document href
    pub map_html: String,
}

impl Envelope for PredictResponse {
    type Payload = PredictionArtifacts;

    fn into_outcome(self, endpoint: &'static str) -> Result<ApiOutcome<PredictionArtifacts>> {
        if !self.status.is_success() {
            return Ok(ApiOutcome::Failure {
                message: failure_message(endpoint, &self.status, self.message),
            });
        }
        let prediction_tiff = self.prediction_tiff.ok_or_else(|| missing(endpoint, "prediction_tiff"))?;
        let map_html = self.map_html.ok_or_else(|| missing(endpoint, "map_html"))?;
        Ok(ApiOutcome::Success(PredictionArtifacts { prediction_tiff, map_html }))
    }
}

/// Which of the two upload forms a request belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadKind {
    Model,
    Tiff,
}

impl UploadKind {
    pub fn endpoint(self) -> &'static str {
        match self {
            UploadKind::Model => "/upload_model",
            UploadKind::Tiff => "/upload_tiff",
        }
    }

    /// Multipart field name of the file part
    pub fn file_field(self) -> &'static str {
        match self {
            UploadKind::Model => "model_file",
            UploadKind::Tiff => "tiff_file",
        }
    }

    /// `file_type` value understood by `/delete_file`
    pub fn file_type(self) -> &'static str {
        match self {
            UploadKind::Model => "model",
            UploadKind::Tiff => "tiff",
        }
    }
}

impl fmt::Display for UploadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_type())
    }
}

/// Contents of a chosen file, ready to go into a multipart part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePayload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl FilePayload {
    pub async fn read(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|e| ClientError::io(path, e))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(FilePayload { file_name, bytes })
    }
}

/// One multipart upload
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub kind: UploadKind,
    pub file: FilePayload,
    /// Sent as `tiff_type` for raster uploads
    pub tiff_type: Option<String>,
}

/// URL-encoded prediction form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionRequest {
    pub model_filename: String,
    pub extra_fields: Vec<(String, String)>,
}

impl PredictionRequest {
    /// Fields in submission order
    pub fn form_pairs(&self) -> Vec<(&str, &str)> {
        std::iter::once(("model_filename", self.model_filename.as_str()))
            .chain(self.extra_fields.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiff_registry_keeps_wire_order() {
        let body = r#"{"status":"success","tiffs":{"temp":"temp_1.tif","NDVI":"NDVI_1.tif","aspect":"aspect_2.tif"}}"#;
        let response: TiffListResponse = serde_json::from_str(body).unwrap();
        let registry = match response.into_outcome("/list_tiffs").unwrap() {
            ApiOutcome::Success(r) => r,
            other => panic!("unexpected outcome: {:?}", other),
        };
        let ids: Vec<&str> = registry.iter().map(|(k, _)| k).collect();
        assert_eq!(ids, vec!["temp", "NDVI", "aspect"]);
        assert_eq!(registry.get("NDVI"), Some("NDVI_1.tif"));
    }

    #[test]
    fn test_tiff_registry_duplicate_key_keeps_first_position() {
        let registry: TiffRegistry = serde_json::from_str(r#"{"a":"1","b":"2","a":"3"}"#).unwrap();
        let pairs: Vec<(String, String)> = registry.into_iter().collect();
        assert_eq!(
            pairs,
            vec![("a".to_string(), "3".to_string()), ("b".to_string(), "2".to_string())]
        );
    }

    #[test]
    fn test_model_list_failure_without_message() {
        let response: ModelListResponse = serde_json::from_str(r#"{"status":"error"}"#).unwrap();
        match response.into_outcome("/list_models").unwrap() {
            ApiOutcome::Failure { message } => assert!(message.contains("error")),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_model_list_success_missing_models_is_malformed() {
        let response: ModelListResponse = serde_json::from_str(r#"{"status":"success"}"#).unwrap();
        let err = response.into_outcome("/list_models").unwrap_err();
        assert!(matches!(err, ClientError::Malformed { endpoint: "/list_models", .. }));
    }

    #[test]
    fn test_predict_success_requires_both_references() {
        let response: PredictResponse =
            serde_json::from_str(r#"{"status":"success","prediction_tiff":"/files/out.tif"}"#).unwrap();
        let err = response.into_outcome("/predict").unwrap_err();
        assert!(err.to_string().contains("map_html"));
    }

    #[test]
    fn test_predict_failure_keeps_message() {
        let response: PredictResponse =
            serde_json::from_str(r#"{"status":"error","message":"no model selected"}"#).unwrap();
        assert_eq!(
            response.into_outcome("/predict").unwrap(),
            ApiOutcome::Failure { message: "no model selected".to_string() }
        );
    }

    #[test]
    fn test_upload_success_carries_filename() {
        let response: MessageResponse = serde_json::from_str(
            r#"{"status":"success","message":"Model uploaded successfully","filename":"model_1.pkl"}"#,
        )
        .unwrap();
        assert_eq!(
            response.into_outcome("/upload_model").unwrap(),
            ApiOutcome::Success(UploadReceipt {
                message: "Model uploaded successfully".to_string(),
                filename: Some("model_1.pkl".to_string()),
            })
        );
    }

    #[test]
    fn test_prediction_form_pairs_order() {
        let request = PredictionRequest {
            model_filename: "model_1.pkl".to_string(),
            extra_fields: vec![("threshold".to_string(), "0.5".to_string())],
        };
        assert_eq!(
            request.form_pairs(),
            vec![("model_filename", "model_1.pkl"), ("threshold", "0.5")]
        );
    }
}
