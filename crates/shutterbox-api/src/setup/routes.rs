//! Route configuration.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

use crate::api_doc::ApiDoc;
use crate::auth::auth_middleware;
use crate::handlers;
use crate::state::AppState;

/// Assemble the full router: public probe and docs, protected API surface,
/// request tracing.
pub fn setup_routes(state: Arc<AppState>) -> Router {
    // Upload bodies are size-checked while streaming; the framework's
    // in-memory limit must not cap them first.
    let body_limit = DefaultBodyLimit::disable();

    let protected = Router::new()
        .route("/metadata", get(handlers::metadata::list_metadata))
        .route("/metadata/{id}", get(handlers::metadata::get_metadata))
        .route("/photos", get(handlers::metadata::list_photos))
        .route("/videos", get(handlers::metadata::list_videos))
        .route("/metadata-count-by-label", get(handlers::labels::count_by_label))
        .route(
            "/labels/{key}",
            get(handlers::labels::get_labels).post(handlers::labels::set_labels),
        )
        .route(
            "/file/{key}",
            get(handlers::files::serve_file)
                .post(handlers::upload::upload_file)
                .delete(handlers::files::delete_file),
        )
        .route("/thumbnail/{filekey}", get(handlers::files::serve_thumbnail))
        .route("/tus", post(handlers::resumable::create_upload))
        .route(
            "/tus/{id}",
            patch(handlers::resumable::append_upload)
                .head(handlers::resumable::upload_offset)
                .delete(handlers::resumable::terminate_upload),
        )
        .layer(body_limit)
        .layer(axum::middleware::from_fn_with_state(
            state.auth_state(),
            auth_middleware,
        ));

    let public = Router::new()
        .route("/", get(handlers::health::health))
        .merge(RapiDoc::with_openapi("/openapi.json", ApiDoc::openapi()).path("/docs"));

    public
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
