use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use super::{
    handlers::{
        download_pdf, generate_pdf, get_health, get_improvements, get_results, get_upload,
        improvements_pdf, login, retry_image, upload,
    },
    middleware::auth_middleware,
    state::AppState,
};

/// Create the main application router with all routes and middleware
pub fn router(state: AppState) -> Router {
    // Teacher-only routes
    let protected = Router::new()
        .route("/upload", post(upload))
        .route("/get_results", get(get_results))
        .route("/retry_image", post(retry_image))
        .route("/generate_pdf", post(generate_pdf))
        .route("/get_improvements", post(get_improvements))
        .route("/improvements_pdf", post(improvements_pdf))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let public = Router::new()
        .route("/login", post(login))
        .route("/download_pdf/:filename", get(download_pdf))
        .route("/uploads/*filename", get(get_upload))
        .route("/health", get(get_health));

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(state.config.max_upload_bytes)),
        )
        .with_state(state)
}
