//! HTTP side of the client: wire types, errors and the endpoint calls.

pub mod client;
pub mod error;
pub mod types;

pub use client::ApiClient;
pub use error::{ClientError, Result};
pub use types::{
    ApiOutcome, FilePayload, PredictionArtifacts, PredictionRequest, Status, TiffRegistry,
    UploadKind, UploadReceipt, UploadRequest,
};
