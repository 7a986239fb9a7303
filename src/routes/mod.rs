//! Inbound HTTP surface: CORS, API passthrough, torrent upload and the SPA

pub mod proxy;
pub mod upload;

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{any, post},
    Router,
};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::qbit::Forwarder;

#[derive(Clone)]
pub struct AppState {
    pub forwarder: Arc<Forwarder>,
}

impl AppState {
    pub fn new(forwarder: Arc<Forwarder>) -> Self {
        Self { forwarder }
    }
}

/// Build the application router.
///
/// Static files are served from `static_dir` only if it exists at start-up,
/// with `index.html` answering every unmatched `GET`.
pub fn build_router(state: AppState, static_dir: &Path, max_body_bytes: usize) -> Router {
    let mut router = Router::new()
        .route(
            "/api/v2/torrents/add",
            post(upload::add_torrent).fallback(proxy::forward),
        )
        .route("/api/v2", any(proxy::forward))
        .route("/api/v2/*path", any(proxy::forward))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state);

    if static_dir.is_dir() {
        tracing::info!("Serving frontend from {}", static_dir.display());
        let index = ServeFile::new(static_dir.join("index.html"));
        router = router.fallback_service(ServeDir::new(static_dir).fallback(index));
    }

    router
        .layer(middleware::from_fn(cors))
        .layer(TraceLayer::new_for_http())
}

/// Permissive CORS on `/api`, answering preflight requests directly
async fn cors(request: Request, next: Next) -> Response {
    let path = request.uri().path();
    if path != "/api" && !path.starts_with("/api/") {
        return next.run(request).await;
    }

    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}
