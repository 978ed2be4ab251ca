pub mod api;
pub mod config;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::LifecycleConfig;
use crate::services::lifecycle::LifecycleManager;
use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Room for multipart framing and the form's text fields on top of the file itself
const MULTIPART_SLACK: usize = 10 * 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::files::upload_file,
        api::handlers::files::convert_all,
        api::handlers::files::download_file,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::files::UploadResponse,
            api::handlers::files::ConvertAllRequest,
            api::handlers::files::ConvertAllResponse,
            api::handlers::health::HealthResponse,
            models::ConversionKind,
        )
    ),
    tags(
        (name = "files", description = "Upload, conversion and download endpoints"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<LifecycleManager>,
    pub config: LifecycleConfig,
}

impl AppState {
    pub fn new(manager: Arc<LifecycleManager>) -> Self {
        let config = manager.config().clone();
        Self { manager, config }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route("/upload", post(api::handlers::files::upload_file))
        .route("/convert_all", post(api::handlers::files::convert_all))
        .route(
            "/download/:filename",
            get(api::handlers::files::download_file),
        )
        .layer(from_fn(api::middleware::metrics::metrics_middleware))
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers(Any),
        )
        .layer(axum::extract::DefaultBodyLimit::max(
            state.config.max_upload_size.saturating_add(MULTIPART_SLACK),
        ))
        .with_state(state)
}
