pub mod domain;
pub mod ports;
pub mod prompt;
pub mod summarize;

pub use domain::{
    AuthContext, GeneratedFiles, HistoryRecord, NewHistoryRecord, OutputFormat, ParseSummary,
    UnknownFormat, User, UserCredentials,
};
pub use ports::{
    BuildDocumentRequest, DatabaseService, DocBuilderService, FileDownload, PortError, PortResult,
};
pub use prompt::{build_project_info_prompt, build_uml_instructions_prompt};
pub use summarize::summarize;
