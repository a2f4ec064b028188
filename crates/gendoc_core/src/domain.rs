//! crates/gendoc_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or transport concern,
//! though they carry serde derives because several of them cross the
//! HTTP boundary and the JSONB columns verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Represents a registered user - used throughout the app.
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login/signup - contains sensitive data.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

/// Immutable per-request identity, built by the auth gate from a verified
/// bearer token and passed explicitly to everything downstream.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,
}

/// The closed set of document formats the doc-builder can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Docx,
    Pdf,
    Pptx,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Docx
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutputFormat::Docx => "docx",
            OutputFormat::Pdf => "pdf",
            OutputFormat::Pptx => "pptx",
        };
        f.write_str(s)
    }
}

impl FromStr for OutputFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "docx" => Ok(OutputFormat::Docx),
            "pdf" => Ok(OutputFormat::Pdf),
            "pptx" => Ok(OutputFormat::Pptx),
            other => Err(UnknownFormat(other.to_string())),
        }
    }
}

/// Error returned when a caller supplies a format outside the enum.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unsupported output format '{0}'")]
pub struct UnknownFormat(pub String);

/// Structural digest of a submitted source file.
///
/// Either the scan succeeded (possibly with empty symbol lists for
/// unsupported extensions) or it failed with a message. The two shapes are
/// mutually exclusive, which `untagged` preserves on the wire:
/// `{"functions": [...], "classes": [...], "lines": n}` vs `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParseSummary {
    Parsed {
        functions: Vec<String>,
        classes: Vec<String>,
        lines: usize,
    },
    Failed {
        error: String,
    },
}

impl ParseSummary {
    /// A summary with a line count only, for files we do not structurally scan.
    pub fn lines_only(lines: usize) -> Self {
        ParseSummary::Parsed {
            functions: Vec::new(),
            classes: Vec::new(),
            lines,
        }
    }
}

/// Typed map of output format to the filename the doc-builder produced.
///
/// The downstream response is deserialized into this map directly; a key
/// outside [`OutputFormat`] fails deserialization rather than being passed
/// through untyped.
pub type GeneratedFiles = BTreeMap<OutputFormat, String>;

/// Persisted audit entry for one completed generation.
#[derive(Debug, Clone)]
pub struct HistoryRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    pub format: OutputFormat,
    pub parse_summary: ParseSummary,
    pub project_info: String,
    pub uml_instructions: String,
    pub generated_files: GeneratedFiles,
    pub created_at: DateTime<Utc>,
}

/// The fields the orchestrator supplies when persisting a new record;
/// id and timestamp are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewHistoryRecord {
    pub user_id: Uuid,
    pub file_name: String,
    pub format: OutputFormat,
    pub parse_summary: ParseSummary,
    pub project_info: String,
    pub uml_instructions: String,
    pub generated_files: GeneratedFiles,
}
