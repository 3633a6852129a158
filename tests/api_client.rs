mod common;

use serde_json::json;

use common::{BackendState, MockBackend};
use rasterpredict::api::{
    ApiClient, ApiOutcome, ClientError, FilePayload, PredictionRequest, UploadKind, UploadRequest,
};

fn client(backend: &MockBackend) -> ApiClient {
    ApiClient::with_http(reqwest::Client::new(), &backend.base_url).unwrap()
}

#[tokio::test]
async fn test_list_tiffs_keeps_server_order() {
    let backend = MockBackend::start_with(BackendState {
        tiffs: vec![
            ("temp".to_string(), "temp_b.tif".to_string()),
            ("NDVI".to_string(), "NDVI_a.tif".to_string()),
            ("aspect".to_string(), "aspect_c.tif".to_string()),
        ],
        ..BackendState::default()
    })
    .await;

    let registry = match client(&backend).list_tiffs().await.unwrap() {
        ApiOutcome::Success(registry) => registry,
        other => panic!("unexpected outcome: {:?}", other),
    };
    let keys: Vec<&str> = registry.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["temp", "NDVI", "aspect"]);
}

#[tokio::test]
async fn test_upload_receipt_carries_stored_name() {
    let backend = MockBackend::start().await;
    let request = UploadRequest {
        kind: UploadKind::Tiff,
        file: FilePayload { file_name: "dem.tif".to_string(), bytes: b"II*\0".to_vec() },
        tiff_type: Some("elevation".to_string()),
    };

    let receipt = match client(&backend).upload(request).await.unwrap() {
        ApiOutcome::Success(receipt) => receipt,
        other => panic!("unexpected outcome: {:?}", other),
    };
    assert_eq!(receipt.message, "TIFF uploaded successfully");
    assert_eq!(receipt.filename.as_deref(), Some("elevation_dem.tif"));
    backend.with_state(|s| assert_eq!(s.uploads[0].endpoint, "/upload_tiff"));
}

#[tokio::test]
async fn test_predict_sends_extra_fields_after_model() {
    let backend = MockBackend::start().await;
    let request = PredictionRequest {
        model_filename: "rf.pkl".to_string(),
        extra_fields: vec![("resolution".to_string(), "30".to_string())],
    };

    let outcome = client(&backend).predict(&request).await.unwrap();
    assert!(outcome.is_success());
    backend.with_state(|s| {
        assert_eq!(
            s.predict_forms[0],
            vec![
                ("model_filename".to_string(), "rf.pkl".to_string()),
                ("resolution".to_string(), "30".to_string()),
            ]
        );
    });
}

#[tokio::test]
async fn test_predict_success_missing_map_is_malformed() {
    let backend = MockBackend::start_with(BackendState {
        predict_response: json!({"status": "success", "prediction_tiff": "/x.tif"}),
        ..BackendState::default()
    })
    .await;
    let request = PredictionRequest { model_filename: "rf.pkl".to_string(), extra_fields: Vec::new() };

    let err = client(&backend).predict(&request).await.unwrap_err();
    assert!(matches!(err, ClientError::Malformed { endpoint: "/predict", .. }), "{:?}", err);
}

#[tokio::test]
async fn test_failure_without_message_gets_generic_text() {
    let backend = MockBackend::start_with(BackendState {
        predict_response: json!({"status": "error"}),
        ..BackendState::default()
    })
    .await;
    let request = PredictionRequest { model_filename: String::new(), extra_fields: Vec::new() };

    match client(&backend).predict(&request).await.unwrap() {
        ApiOutcome::Failure { message } => assert!(message.contains("error"), "{}", message),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_download_of_missing_file_is_http_error() {
    let backend = MockBackend::start().await;
    let dir = tempfile::tempdir().unwrap();

    let err = client(&backend).download("/download_prediction/map.html", dir.path()).await.unwrap_err();
    assert!(matches!(err, ClientError::HttpStatus { .. }), "{:?}", err);
}

#[tokio::test]
async fn test_interrupted_download_leaves_no_file() {
    let backend = MockBackend::start().await;
    let dir = tempfile::tempdir().unwrap();

    let err = client(&backend)
        .download("/download_prediction/truncated_1.tif", dir.path())
        .await
        .unwrap_err();
    assert!(err.is_transport(), "{:?}", err);
    assert!(!dir.path().join("truncated_1.tif").exists());
}
