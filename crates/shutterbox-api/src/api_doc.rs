//! OpenAPI documentation.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use shutterbox_core::models;

struct ApiKeySecurity;

impl Modify for ApiKeySecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Query(ApiKeyValue::new("api_key"))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Shutterbox API",
        version = "0.1.0",
        description = "Personal photo and video storage: authenticated upload (one-shot and resumable), metadata extraction, thumbnails, and byte-range serving."
    ),
    paths(
        handlers::health::health,
        // Upload
        handlers::upload::upload_file,
        handlers::resumable::create_upload,
        handlers::resumable::append_upload,
        handlers::resumable::upload_offset,
        handlers::resumable::terminate_upload,
        // Metadata
        handlers::metadata::list_metadata,
        handlers::metadata::get_metadata,
        handlers::metadata::list_photos,
        handlers::metadata::list_videos,
        // Files
        handlers::files::serve_file,
        handlers::files::serve_thumbnail,
        handlers::files::delete_file,
        // Labels
        handlers::labels::get_labels,
        handlers::labels::set_labels,
        handlers::labels::count_by_label,
    ),
    components(
        schemas(
            models::MediaRecord,
            models::MediaKind,
            models::Label,
            models::LabelCount,
            handlers::upload::IngestResponse,
            error::ErrorResponse,
        )
    ),
    modifiers(&ApiKeySecurity),
    tags(
        (name = "health", description = "Liveness"),
        (name = "upload", description = "One-shot multipart upload"),
        (name = "resumable", description = "Resumable (tus-style) uploads"),
        (name = "metadata", description = "Record listing and lookup"),
        (name = "files", description = "Binary serving and deletion"),
        (name = "labels", description = "Label attachment and counts")
    )
)]
pub struct ApiDoc;
