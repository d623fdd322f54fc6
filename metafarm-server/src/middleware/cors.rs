use crate::config::Config;
use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};

/// CORS layer from `METAFARM_CORS_ORIGINS`. Unset, or a list with no
/// parseable origin, allows any origin.
pub fn cors_layer(config: &Config) -> CorsLayer {
    let cors = CorsLayer::new().allow_headers(Any).allow_methods(Any);

    let Some(origins_str) = &config.cors_allowed_origins else {
        return cors.allow_origin(Any);
    };
    let origins: Vec<HeaderValue> = origins_str
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    async fn allowed_origin(config: &Config, origin: &str) -> Option<String> {
        let app: Router = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(cors_layer(config));
        let resp = app
            .oneshot(
                Request::get("/")
                    .header(header::ORIGIN, origin)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        resp.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .map(|v| v.to_str().unwrap().to_owned())
    }

    #[tokio::test]
    async fn wildcard_when_unconfigured() {
        let config = Config::default();
        assert_eq!(
            allowed_origin(&config, "http://example.com").await.as_deref(),
            Some("*")
        );
    }

    #[tokio::test]
    async fn configured_origins_are_enforced() {
        let config = Config {
            cors_allowed_origins: Some("http://farm.local, http://other.local".to_owned()),
            ..Config::default()
        };
        assert_eq!(
            allowed_origin(&config, "http://farm.local").await.as_deref(),
            Some("http://farm.local")
        );
        assert_eq!(allowed_origin(&config, "http://evil.local").await, None);
    }

    #[tokio::test]
    async fn blank_origin_list_falls_back_to_wildcard() {
        let config = Config {
            cors_allowed_origins: Some(" , ".to_owned()),
            ..Config::default()
        };
        assert_eq!(
            allowed_origin(&config, "http://farm.local").await.as_deref(),
            Some("*")
        );
    }
}
