use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{AnalysisRecord, AnalysisStatus};

/// Request body for `POST /api/analysis`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalysisRequest {
    /// Raw base64 image data or a `data:image/...;base64,` URI.
    pub encoded_image: String,
}

/// Status block embedded in every analysis response; `code` mirrors the HTTP
/// status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ResponseStatus {
    pub code: u16,
    pub message: String,
}

impl ResponseStatus {
    fn new(code: StatusCode, message: &str) -> Self {
        Self {
            code: code.as_u16(),
            message: message.to_owned(),
        }
    }
}

/// Response body for an accepted submission.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalysisAccepted {
    pub status: ResponseStatus,
    /// Record id to poll at `GET /api/analysis/{id}`.
    pub id: i64,
}

impl AnalysisAccepted {
    pub fn new(id: i64) -> Self {
        Self {
            status: ResponseStatus::new(StatusCode::ACCEPTED, "Analysis started"),
            id,
        }
    }
}

/// Response body for `GET /api/analysis/{id}`.
///
/// Result fields are present only once completed; `error` only once failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AnalysisResultResponse {
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_between_water: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_to_maturity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisRecord {
    /// HTTP status and body reporting this record's state.
    pub fn to_response(&self) -> (StatusCode, AnalysisResultResponse) {
        let (code, message) = match self.status {
            AnalysisStatus::Pending => (StatusCode::ACCEPTED, "Analysis in progress"),
            AnalysisStatus::Completed => (StatusCode::OK, "Success"),
            AnalysisStatus::Failed => (StatusCode::INTERNAL_SERVER_ERROR, "Analysis failed"),
        };
        let completed = self.status == AnalysisStatus::Completed;
        let failed = self.status == AnalysisStatus::Failed;

        let body = AnalysisResultResponse {
            status: ResponseStatus::new(code, message),
            name: completed.then(|| self.name.clone()),
            days_between_water: completed.then_some(self.days_between_water),
            days_to_maturity: completed.then_some(self.days_to_maturity),
            error: failed.then(|| self.error.clone()),
        };
        (code, body)
    }
}
