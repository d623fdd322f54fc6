//! Plant analysis endpoints: submit an image, then poll for the result.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::info;
use utoipa::OpenApi;

use crate::entities::AnalysisStore;
use crate::error::ServerError;
use crate::schemas::api::analysis::{
    AnalysisAccepted, AnalysisRequest, AnalysisResultResponse, ResponseStatus,
};
use crate::services::image::extract_base64_payload;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(submit_analysis, get_analysis),
    components(schemas(AnalysisRequest, AnalysisAccepted, AnalysisResultResponse, ResponseStatus))
)]
pub struct AnalysisApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/analysis", post(submit_analysis))
        .route("/analysis/{id}", get(get_analysis))
}

/// Submit a plant image for analysis (`POST /api/analysis`).
///
/// Validates the payload, stores a `pending` record and starts the analysis
/// in the background. Returns the record id immediately; poll
/// `GET /api/analysis/{id}` for the outcome.
#[utoipa::path(
    post,
    path = "/api/analysis",
    tag = "analysis",
    request_body = AnalysisRequest,
    responses(
        (status = 202, description = "Analysis started", body = AnalysisAccepted),
        (status = 400, description = "Malformed body, data URI or base64"),
        (status = 413, description = "Body too large"),
        (status = 500, description = "Record could not be created"),
    )
)]
pub async fn submit_analysis(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AnalysisAccepted>), ServerError> {
    let Json(req) = body?;
    let payload = extract_base64_payload(&req.encoded_image)?;

    let id = state
        .store
        .create_analysis()
        .await
        .map_err(ServerError::RecordCreation)?;
    state.worker.launch(id, payload.to_owned());

    info!(analysis_id = id, payload_len = payload.len(), "analysis started");
    Ok((StatusCode::ACCEPTED, Json(AnalysisAccepted::new(id))))
}

/// Poll an analysis (`GET /api/analysis/{id}`).
///
/// The HTTP status tracks the record: 202 while pending, 200 with the result
/// once completed, 500 with the stored error once failed.
#[utoipa::path(
    get,
    path = "/api/analysis/{id}",
    tag = "analysis",
    params(
        ("id" = i64, Path, description = "Record id returned by the submission")
    ),
    responses(
        (status = 200, description = "Analysis completed", body = AnalysisResultResponse),
        (status = 202, description = "Analysis in progress", body = AnalysisResultResponse),
        (status = 400, description = "Id is not an integer"),
        (status = 404, description = "Analysis not found"),
        (status = 500, description = "Analysis failed", body = AnalysisResultResponse),
    )
)]
pub async fn get_analysis(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<(StatusCode, Json<AnalysisResultResponse>), ServerError> {
    let id: i64 = raw_id
        .parse()
        .map_err(|_| ServerError::BadRequest("Invalid analysis ID".into()))?;

    let record = state
        .store
        .get_analysis(id)
        .await?
        .ok_or_else(|| ServerError::NotFound("Analysis not found".into()))?;

    let (code, body) = record.to_response();
    Ok((code, Json(body)))
}
