//! Liveness endpoint.

use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::schemas::api::ping::PingResponse;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(ping), components(schemas(PingResponse)))]
pub struct PingApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/ping", get(ping))
}

/// Returns `{"message": "pong"}` with HTTP 200.
#[utoipa::path(
    get,
    path = "/api/ping",
    tag = "health",
    responses(
        (status = 200, description = "Server is alive", body = PingResponse)
    )
)]
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        message: "pong".to_owned(),
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn ping_answers_pong() {
        let Json(body) = ping().await;
        assert_eq!(body.message, "pong");
    }
}
