//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::uploads::UploadArea;
use gendoc_core::ports::{DatabaseService, DocBuilderService};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all
/// handlers. Requests share nothing mutable beyond the store behind `db` and
/// the uploads directory, both of which are safe under concurrency on their
/// own terms.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub doc_builder: Arc<dyn DocBuilderService>,
    pub uploads: UploadArea,
    pub config: Arc<Config>,
}
