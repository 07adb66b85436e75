//! REST API request and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{PipelineError, ServerError, SourceFailure};
use crate::models::AssetRecord;
use crate::transform::LoadSummary;

/// Body of `POST /api/load`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoadRequest {
    /// Paths, folders or URLs
    pub sources: Vec<String>,
    /// Load the generated demonstration dataset instead
    pub demo: bool,
}

/// Sent after a dataset replaced the session dataset.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadResponse {
    /// "ready", or "warning" when some sources were skipped
    pub status: String,
    #[serde(flatten)]
    pub summary: LoadSummary,
}

impl From<LoadSummary> for LoadResponse {
    fn from(summary: LoadSummary) -> Self {
        let status = if summary.failures.is_empty() { "ready" } else { "warning" };
        Self {
            status: status.to_string(),
            summary,
        }
    }
}

/// Filtered view returned by `GET /api/records`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordsResponse {
    pub total: usize,
    pub records: Vec<AssetRecord>,
}

/// Create an error response body
pub fn error_response(error: &str, failures: &[SourceFailure]) -> Value {
    json!({
        "status": "error",
        "error": error,
        "failures": failures,
    })
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Pipeline(PipelineError::NoDataLoaded { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Pipeline(PipelineError::Source(_)) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotLoaded => StatusCode::NOT_FOUND,
            Self::Export(_) | Self::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let failures: &[SourceFailure] = match &self {
            Self::Pipeline(PipelineError::NoDataLoaded { failures }) => failures.as_slice(),
            _ => &[],
        };
        let body = error_response(&self.to_string(), failures);
        (self.status_code(), Json(body)).into_response()
    }
}
