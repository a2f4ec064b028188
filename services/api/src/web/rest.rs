//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the history and download endpoints and the
//! master definition for the OpenAPI specification.

use crate::error::ApiError;
use crate::web::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, Response, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use gendoc_core::domain::{AuthContext, GeneratedFiles, HistoryRecord, OutputFormat, ParseSummary};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::error;
use utoipa::{Modify, OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::signup_handler,
        crate::web::auth::login_handler,
        crate::web::auth::me_handler,
        crate::web::generate::generate_handler,
        list_history_handler,
        delete_history_handler,
        download_handler,
    ),
    components(
        schemas(
            crate::web::auth::SignupRequest,
            crate::web::auth::LoginRequest,
            crate::web::auth::AuthResponse,
            crate::web::auth::MeResponse,
            HistoryItem,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "gendoc API", description = "API endpoints for code-to-document generation.")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// One history entry as the browser client expects it.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    #[schema(value_type = String)]
    pub format: OutputFormat,
    #[schema(value_type = Object)]
    pub parse_info: ParseSummary,
    pub project_info: String,
    pub uml_instructions: String,
    #[schema(value_type = Object)]
    pub generated_files: GeneratedFiles,
    pub created_at: DateTime<Utc>,
}

impl From<HistoryRecord> for HistoryItem {
    fn from(record: HistoryRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            file_name: record.file_name,
            format: record.format,
            parse_info: record.parse_summary,
            project_info: record.project_info,
            uml_instructions: record.uml_instructions,
            generated_files: record.generated_files,
            created_at: record.created_at,
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// GET /history - The caller's generation history, newest first.
#[utoipa::path(
    get,
    path = "/history",
    responses(
        (status = 200, description = "History records, newest first", body = [HistoryItem]),
        (status = 401, description = "No credential supplied"),
        (status = 403, description = "Credential rejected"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> Result<impl IntoResponse, ApiError> {
    let records = state.db.list_history(auth.user_id).await.map_err(|e| {
        error!("Failed to fetch history: {:?}", e);
        ApiError::from(e)
    })?;
    let items: Vec<HistoryItem> = records.into_iter().map(HistoryItem::from).collect();
    Ok(Json(items))
}

/// DELETE /history/:id - Remove one of the caller's records.
#[utoipa::path(
    delete,
    path = "/history/{id}",
    params(("id" = Uuid, Path, description = "History record id")),
    responses(
        (status = 200, description = "History item deleted"),
        (status = 400, description = "Invalid history ID"),
        (status = 401, description = "No credential supplied"),
        (status = 403, description = "Credential rejected"),
        (status = 404, description = "Not found or not owned by the caller"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| ApiError::Validation("Invalid history ID".to_string()))?;

    // The store scopes the delete to the owner; an id belonging to another
    // user comes back as "not deleted", never as a permission error.
    let deleted = state.db.delete_history(id, auth.user_id).await.map_err(|e| {
        error!("Failed to delete history: {:?}", e);
        ApiError::from(e)
    })?;

    if !deleted {
        return Err(ApiError::NotFound("History item not found".to_string()));
    }
    Ok(Json(json!({ "message": "History item deleted" })))
}

/// GET /download/:filetype/:filename - Stream a generated file from the
/// doc-builder to the caller, preserving content headers.
#[utoipa::path(
    get,
    path = "/download/{filetype}/{filename}",
    params(
        ("filetype" = String, Path, description = "Output format (docx|pdf|pptx)"),
        ("filename" = String, Path, description = "Generated filename")
    ),
    responses(
        (status = 200, description = "File bytes, Content-Disposition attachment"),
        (status = 401, description = "No credential supplied"),
        (status = 403, description = "Credential rejected"),
        (status = 500, description = "Proxy failure; downstream errors keep their status")
    ),
    security(("bearer_auth" = []))
)]
pub async fn download_handler(
    State(state): State<Arc<AppState>>,
    Extension(_auth): Extension<AuthContext>,
    Path((filetype, filename)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let download = state
        .doc_builder
        .download(&filetype, &filename)
        .await
        .map_err(|e| {
            error!("Download proxy error: {:?}", e);
            ApiError::from(e)
        })?;

    let status = StatusCode::from_u16(download.status).unwrap_or(StatusCode::OK);
    let mut builder = Response::builder().status(status).header(
        header::CONTENT_DISPOSITION,
        format!("attachment; filename={filename}"),
    );
    if let Some(content_type) = &download.content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    if let Some(content_length) = download.content_length {
        builder = builder.header(header::CONTENT_LENGTH, content_length);
    }

    builder
        .body(Body::from_stream(download.stream))
        .map_err(|e| ApiError::Internal(format!("Failed to build download response: {e}")))
}
