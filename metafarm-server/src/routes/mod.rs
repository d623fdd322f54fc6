//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS, per-request trace-ID injection, panic recovery,
//!   body limit)
//! - Optional Swagger UI / OpenAPI spec endpoint (disable with `METAFARM_ENABLE_SWAGGER=false`)
//! - `/api` routes (ping, analysis submission and polling)

mod api;
pub mod doc;

use crate::middleware::{cors, trace};
use crate::state::AppState;
use axum::{extract::DefaultBodyLimit, middleware, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use utoipa_swagger_ui::SwaggerUi;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let mut app = Router::new().nest("/api", api::router());

    // ── Swagger UI ────────────────────────────────────────────────────────────
    if state.config.enable_swagger {
        app = app.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", doc::get_docs()));
    }

    let body_limit = state.config.max_body_mb.saturating_mul(1024 * 1024);

    app.layer(DefaultBodyLimit::max(body_limit))
        // Outermost layers execute first on the way in.
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::new())
                .layer(cors::cors_layer(&state.config)),
        )
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}
