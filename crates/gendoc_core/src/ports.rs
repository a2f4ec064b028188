//! crates/gendoc_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of specific external implementations like the
//! database or the doc-builder service.

use crate::domain::{
    GeneratedFiles, HistoryRecord, NewHistoryRecord, OutputFormat, User, UserCredentials,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    /// The doc-builder answered with a non-success status. The body is kept
    /// verbatim so the caller can surface it as error detail.
    #[error("Downstream service returned status {status}")]
    Downstream { status: u16, body: String },
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Doc-Builder Payload Types
//=========================================================================================

/// The outbound payload for a document build.
///
/// `abstract_text` is serialized as `abstract` and always carries the same
/// value as `project_info`; an older consumer of the doc-builder reads that
/// field name.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BuildDocumentRequest {
    pub code: String,
    pub instructions: String,
    pub format: OutputFormat,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub project_info: String,
    pub uml_instructions: String,
}

/// A file streamed back from the doc-builder's download endpoint.
pub struct FileDownload {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub stream: Pin<Box<dyn Stream<Item = Result<Bytes, PortError>> + Send>>,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---
    async fn create_user(&self, email: &str, hashed_password: &str) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    // --- History Management ---
    /// Appends a record for a completed generation and returns its id.
    async fn create_history(&self, record: NewHistoryRecord) -> PortResult<Uuid>;

    /// Lists the user's records, newest first.
    async fn list_history(&self, user_id: Uuid) -> PortResult<Vec<HistoryRecord>>;

    /// Deletes a record only if `user_id` owns it. Returns false when the id
    /// does not exist or belongs to someone else; callers must not be able to
    /// tell those cases apart.
    async fn delete_history(&self, id: Uuid, user_id: Uuid) -> PortResult<bool>;
}

#[async_trait]
pub trait DocBuilderService: Send + Sync {
    /// Submits a build request and returns the map of produced filenames.
    async fn build_document(&self, request: &BuildDocumentRequest) -> PortResult<GeneratedFiles>;

    /// Fetches a previously generated file as a byte stream.
    async fn download(&self, filetype: &str, filename: &str) -> PortResult<FileDownload>;
}
