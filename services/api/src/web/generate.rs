//! services/api/src/web/generate.rs
//!
//! The generation pipeline: turn an uploaded source file plus free-text
//! instructions into a doc-builder request, record the outcome, and clean up
//! the temporary upload on every exit path.

use crate::error::ApiError;
use crate::uploads::TempUpload;
use crate::web::state::AppState;
use axum::{
    extract::{Multipart, State},
    Extension, Json,
};
use gendoc_core::domain::{AuthContext, GeneratedFiles, NewHistoryRecord, OutputFormat};
use gendoc_core::ports::{BuildDocumentRequest, DatabaseService, DocBuilderService, PortError};
use gendoc_core::{build_project_info_prompt, build_uml_instructions_prompt, summarize};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

//=========================================================================================
// Multipart Intake
//=========================================================================================

/// The raw fields of a /generate submission, before validation.
#[derive(Default)]
struct GenerateForm {
    file_name: Option<String>,
    file_bytes: Option<Vec<u8>>,
    file_count: usize,
    instructions: Option<String>,
    format: Option<String>,
}

async fn read_form(multipart: &mut Multipart) -> Result<GenerateForm, ApiError> {
    let mut form = GenerateForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Failed to read multipart data: {e}")))?
    {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("inputFile") => {
                form.file_count += 1;
                form.file_name = Some(field.file_name().unwrap_or("untitled").to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(format!("Failed to read file bytes: {e}")))?;
                form.file_bytes = Some(data.to_vec());
            }
            Some("instructions") => {
                form.instructions = Some(field.text().await.map_err(|e| {
                    ApiError::Validation(format!("Failed to read instructions: {e}"))
                })?);
            }
            Some("format") => {
                form.format = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::Validation(format!("Failed to read format: {e}")))?,
                );
            }
            // Unknown fields are ignored, matching the form's browser client.
            _ => {}
        }
    }
    Ok(form)
}

/// A submission that passed validation and is ready for the pipeline.
#[derive(Debug)]
struct GenerateInput {
    file_name: String,
    file_bytes: Vec<u8>,
    instructions: String,
    format: OutputFormat,
}

/// Checks the preconditions on a submitted form: exactly one file, non-empty
/// instructions, and a format inside the supported set (defaulting to docx
/// when absent). Each rejection is a distinct 400.
fn validate_form(form: GenerateForm) -> Result<GenerateInput, ApiError> {
    if form.file_count > 1 {
        return Err(ApiError::Validation(
            "Exactly one file must be uploaded".to_string(),
        ));
    }
    let (file_name, file_bytes) = match (form.file_name, form.file_bytes) {
        (Some(name), Some(bytes)) => (name, bytes),
        _ => return Err(ApiError::Validation("A source file is required".to_string())),
    };
    let instructions = match form.instructions {
        Some(ref s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => return Err(ApiError::Validation("Instructions are required".to_string())),
    };
    // Unrecognized formats are rejected here rather than passed through for
    // the doc-builder to choke on.
    let format = match form.format {
        Some(ref s) if !s.trim().is_empty() => s
            .parse::<OutputFormat>()
            .map_err(|e| ApiError::Validation(e.to_string()))?,
        _ => OutputFormat::default(),
    };
    Ok(GenerateInput {
        file_name,
        file_bytes,
        instructions,
        format,
    })
}

//=========================================================================================
// The /generate Handler
//=========================================================================================

/// POST /generate - Build documentation for an uploaded source file.
#[utoipa::path(
    post,
    path = "/generate",
    request_body(content_type = "multipart/form-data",
        description = "inputFile (single file), instructions (text), format (docx|pdf|pptx, optional)"),
    responses(
        (status = 200, description = "Map of output format to generated filename"),
        (status = 400, description = "Missing file or instructions, or unsupported format"),
        (status = 401, description = "No credential supplied"),
        (status = 403, description = "Credential rejected"),
        (status = 500, description = "Doc-builder or storage failure, detail attached")
    ),
    security(("bearer_auth" = []))
)]
pub async fn generate_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    mut multipart: Multipart,
) -> Result<Json<GeneratedFiles>, ApiError> {
    // 1. Collect and validate the form before anything touches disk
    let input = validate_form(read_form(&mut multipart).await?)?;

    // 2. Spill the upload to the shared area under a unique name
    let upload = state
        .uploads
        .store(&input.file_name, &input.file_bytes)
        .await?;

    // 3. Run the pipeline; cleanup happens inside regardless of outcome
    let files = run_generation(
        state.db.as_ref(),
        state.doc_builder.as_ref(),
        &auth,
        &input.file_name,
        upload,
        &input.instructions,
        input.format,
    )
    .await?;

    Ok(Json(files))
}

//=========================================================================================
// The Pipeline
//=========================================================================================

/// Runs validate -> summarize -> prompts -> downstream -> persist for one
/// request, then removes the temporary upload whichever way the pipeline
/// exited. The downstream body is returned verbatim on success.
pub async fn run_generation(
    db: &dyn DatabaseService,
    doc_builder: &dyn DocBuilderService,
    auth: &AuthContext,
    original_name: &str,
    upload: TempUpload,
    instructions: &str,
    format: OutputFormat,
) -> Result<GeneratedFiles, ApiError> {
    let result = build_and_record(
        db,
        doc_builder,
        auth,
        original_name,
        &upload,
        instructions,
        format,
    )
    .await;

    // Strictly after the pipeline, on every path. A removal failure is
    // logged inside the guard and never overrides the primary result.
    upload.remove().await;
    result
}

async fn build_and_record(
    db: &dyn DatabaseService,
    doc_builder: &dyn DocBuilderService,
    auth: &AuthContext,
    original_name: &str,
    upload: &TempUpload,
    instructions: &str,
    format: OutputFormat,
) -> Result<GeneratedFiles, ApiError> {
    // 1. Read the upload back as text; failure is fatal, no downstream call
    let code = upload
        .read_text()
        .await
        .map_err(|e| ApiError::FileRead(e.to_string()))?;

    // 2. Best-effort structural summary; a failed scan still generates
    let extension = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let parse_summary = summarize(&code, extension);

    // 3. Render the two prompts
    let project_info = build_project_info_prompt(&code, instructions);
    let uml_instructions = build_uml_instructions_prompt(&code, instructions);

    // 4. Assemble the payload; `abstract` mirrors project_info for the older
    //    consumer shape
    let request = BuildDocumentRequest {
        code,
        instructions: instructions.to_string(),
        format,
        abstract_text: project_info.clone(),
        project_info: project_info.clone(),
        uml_instructions: uml_instructions.clone(),
    };

    // 5. Call the doc-builder; no retry, downstream failures are terminal
    let generated_files = doc_builder.build_document(&request).await.map_err(|e| match e {
        PortError::Downstream { status, body } => ApiError::Downstream { status, body },
        other => ApiError::Integration(other.to_string()),
    })?;

    info!(
        user_id = %auth.user_id,
        file = original_name,
        %format,
        outputs = generated_files.len(),
        "Document generation succeeded"
    );

    // 6. Persist the history record. Generation already succeeded, so a
    //    storage failure is logged and the success still returned.
    let record = NewHistoryRecord {
        user_id: auth.user_id,
        file_name: original_name.to_string(),
        format,
        parse_summary,
        project_info,
        uml_instructions,
        generated_files: generated_files.clone(),
    };
    if let Err(e) = db.create_history(record).await {
        error!(
            user_id = %auth.user_id,
            "Failed to persist history after successful generation: {e}"
        );
    }

    Ok(generated_files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uploads::UploadArea;
    use async_trait::async_trait;
    use gendoc_core::domain::{HistoryRecord, ParseSummary, User, UserCredentials};
    use gendoc_core::ports::{FileDownload, PortResult};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use uuid::Uuid;

    //------------------------------------------------------------------------------
    // Mock ports
    //------------------------------------------------------------------------------

    #[derive(Default)]
    struct MockDb {
        created: Mutex<Vec<NewHistoryRecord>>,
        fail_create: bool,
    }

    #[async_trait]
    impl DatabaseService for MockDb {
        async fn create_user(&self, _: &str, _: &str) -> PortResult<User> {
            unreachable!("not used by the pipeline")
        }
        async fn get_user_by_email(&self, _: &str) -> PortResult<UserCredentials> {
            unreachable!("not used by the pipeline")
        }
        async fn get_user_by_id(&self, _: Uuid) -> PortResult<User> {
            unreachable!("not used by the pipeline")
        }
        async fn create_history(&self, record: NewHistoryRecord) -> PortResult<Uuid> {
            if self.fail_create {
                return Err(PortError::Unexpected("disk full".to_string()));
            }
            self.created.lock().unwrap().push(record);
            Ok(Uuid::new_v4())
        }
        async fn list_history(&self, _: Uuid) -> PortResult<Vec<HistoryRecord>> {
            unreachable!("not used by the pipeline")
        }
        async fn delete_history(&self, _: Uuid, _: Uuid) -> PortResult<bool> {
            unreachable!("not used by the pipeline")
        }
    }

    struct MockBuilder {
        calls: AtomicUsize,
        last_request: Mutex<Option<BuildDocumentRequest>>,
        response: Result<GeneratedFiles, (u16, String)>,
    }

    impl MockBuilder {
        fn succeeding(files: GeneratedFiles) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
                response: Ok(files),
            }
        }
        fn failing(status: u16, body: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
                response: Err((status, body.to_string())),
            }
        }
    }

    #[async_trait]
    impl DocBuilderService for MockBuilder {
        async fn build_document(
            &self,
            request: &BuildDocumentRequest,
        ) -> PortResult<GeneratedFiles> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());
            match &self.response {
                Ok(files) => Ok(files.clone()),
                Err((status, body)) => Err(PortError::Downstream {
                    status: *status,
                    body: body.clone(),
                }),
            }
        }
        async fn download(&self, _: &str, _: &str) -> PortResult<FileDownload> {
            unreachable!("not used by the pipeline")
        }
    }

    fn docx_files() -> GeneratedFiles {
        let mut files = GeneratedFiles::new();
        files.insert(OutputFormat::Docx, "abc.docx".to_string());
        files
    }

    fn ctx() -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            email: "dev@example.com".to_string(),
        }
    }

    //------------------------------------------------------------------------------
    // Form validation tests
    //------------------------------------------------------------------------------

    fn full_form() -> GenerateForm {
        GenerateForm {
            file_name: Some("app.js".to_string()),
            file_bytes: Some(b"function run() {}".to_vec()),
            file_count: 1,
            instructions: Some("explain the app".to_string()),
            format: Some("pdf".to_string()),
        }
    }

    fn validation_message(err: ApiError) -> String {
        match err {
            ApiError::Validation(msg) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn form_without_a_file_is_rejected() {
        let form = GenerateForm {
            file_name: None,
            file_bytes: None,
            file_count: 0,
            ..full_form()
        };
        let msg = validation_message(validate_form(form).unwrap_err());
        assert_eq!(msg, "A source file is required");
    }

    #[test]
    fn form_with_two_files_is_rejected() {
        let form = GenerateForm {
            file_count: 2,
            ..full_form()
        };
        let msg = validation_message(validate_form(form).unwrap_err());
        assert_eq!(msg, "Exactly one file must be uploaded");
    }

    #[test]
    fn blank_instructions_are_rejected() {
        for instructions in [None, Some("".to_string()), Some("   \n".to_string())] {
            let form = GenerateForm {
                instructions,
                ..full_form()
            };
            let msg = validation_message(validate_form(form).unwrap_err());
            assert_eq!(msg, "Instructions are required");
        }
    }

    #[test]
    fn unrecognized_format_is_rejected_before_any_downstream_work() {
        let form = GenerateForm {
            format: Some("odt".to_string()),
            ..full_form()
        };
        let msg = validation_message(validate_form(form).unwrap_err());
        assert!(msg.contains("odt"));
    }

    #[test]
    fn absent_format_defaults_to_docx() {
        for format in [None, Some("".to_string())] {
            let form = GenerateForm {
                format,
                ..full_form()
            };
            let input = validate_form(form).unwrap();
            assert_eq!(input.format, OutputFormat::Docx);
        }
    }

    #[test]
    fn valid_form_passes_through_trimmed() {
        let form = GenerateForm {
            instructions: Some("  explain the app  ".to_string()),
            ..full_form()
        };
        let input = validate_form(form).unwrap();
        assert_eq!(input.file_name, "app.js");
        assert_eq!(input.instructions, "explain the app");
        assert_eq!(input.format, OutputFormat::Pdf);
    }

    //------------------------------------------------------------------------------
    // Pipeline tests
    //------------------------------------------------------------------------------

    #[tokio::test]
    async fn success_persists_one_owned_record_and_removes_the_upload() {
        let dir = tempfile::tempdir().unwrap();
        let area = UploadArea::new(dir.path().to_path_buf());
        let upload = area
            .store("app.js", b"function run() {}\nclass App {}\n")
            .await
            .unwrap();
        let temp_path = upload.path().to_path_buf();

        let db = MockDb::default();
        let builder = MockBuilder::succeeding(docx_files());
        let auth = ctx();

        let files = run_generation(
            &db,
            &builder,
            &auth,
            "app.js",
            upload,
            "explain the app",
            OutputFormat::Docx,
        )
        .await
        .unwrap();

        assert_eq!(files.get(&OutputFormat::Docx).unwrap(), "abc.docx");
        assert!(!temp_path.exists());

        let created = db.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        let record = &created[0];
        assert_eq!(record.user_id, auth.user_id);
        assert_eq!(record.file_name, "app.js");
        assert_eq!(record.generated_files, docx_files());
        match &record.parse_summary {
            ParseSummary::Parsed {
                functions, classes, ..
            } => {
                assert_eq!(functions, &vec!["run".to_string()]);
                assert_eq!(classes, &vec!["App".to_string()]);
            }
            other => panic!("unexpected summary {other:?}"),
        }
    }

    #[tokio::test]
    async fn payload_carries_code_prompts_and_abstract_alias() {
        let dir = tempfile::tempdir().unwrap();
        let area = UploadArea::new(dir.path().to_path_buf());
        let upload = area.store("lib.py", b"def fetch():\n    pass\n").await.unwrap();

        let db = MockDb::default();
        let builder = MockBuilder::succeeding(docx_files());

        run_generation(
            &db,
            &builder,
            &ctx(),
            "lib.py",
            upload,
            "document the fetcher",
            OutputFormat::Pdf,
        )
        .await
        .unwrap();

        let request = builder.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.format, OutputFormat::Pdf);
        assert!(request.code.contains("def fetch()"));
        assert!(request.project_info.contains("def fetch()"));
        assert!(request.project_info.contains("document the fetcher"));
        assert!(request.uml_instructions.contains("document the fetcher"));
        assert_eq!(request.abstract_text, request.project_info);
    }

    #[tokio::test]
    async fn downstream_failure_writes_nothing_and_still_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let area = UploadArea::new(dir.path().to_path_buf());
        let upload = area.store("app.js", b"function run() {}").await.unwrap();
        let temp_path = upload.path().to_path_buf();

        let db = MockDb::default();
        let builder = MockBuilder::failing(503, "builder offline");

        let err = run_generation(
            &db,
            &builder,
            &ctx(),
            "app.js",
            upload,
            "explain",
            OutputFormat::Docx,
        )
        .await
        .unwrap_err();

        match err {
            ApiError::Downstream { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "builder offline");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(db.created.lock().unwrap().is_empty());
        assert!(!temp_path.exists());
    }

    #[tokio::test]
    async fn unreadable_upload_fails_before_any_downstream_call() {
        let dir = tempfile::tempdir().unwrap();
        let area = UploadArea::new(dir.path().to_path_buf());
        let upload = area.store("app.js", b"function run() {}").await.unwrap();

        // Yank the file out from under the pipeline to force a read failure.
        std::fs::remove_file(upload.path()).unwrap();

        let db = MockDb::default();
        let builder = MockBuilder::succeeding(docx_files());

        let err = run_generation(
            &db,
            &builder,
            &ctx(),
            "app.js",
            upload,
            "explain",
            OutputFormat::Docx,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ApiError::FileRead(_)));
        assert_eq!(builder.calls.load(Ordering::SeqCst), 0);
        assert!(db.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn storage_failure_after_success_still_returns_the_files() {
        let dir = tempfile::tempdir().unwrap();
        let area = UploadArea::new(dir.path().to_path_buf());
        let upload = area.store("app.js", b"function run() {}").await.unwrap();
        let temp_path = upload.path().to_path_buf();

        let db = MockDb {
            fail_create: true,
            ..Default::default()
        };
        let builder = MockBuilder::succeeding(docx_files());

        let files = run_generation(
            &db,
            &builder,
            &ctx(),
            "app.js",
            upload,
            "explain",
            OutputFormat::Docx,
        )
        .await
        .unwrap();

        assert_eq!(files, docx_files());
        assert!(!temp_path.exists());
    }

    #[tokio::test]
    async fn concurrent_requests_from_two_users_stay_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let area = UploadArea::new(dir.path().to_path_buf());
        let upload_a = area.store("a.js", b"function a() {}").await.unwrap();
        let upload_b = area.store("a.js", b"function b() {}").await.unwrap();
        assert_ne!(upload_a.path(), upload_b.path());

        let db = MockDb::default();
        let builder = MockBuilder::succeeding(docx_files());
        let user_a = ctx();
        let user_b = ctx();

        let (ra, rb) = tokio::join!(
            run_generation(
                &db,
                &builder,
                &user_a,
                "a.js",
                upload_a,
                "explain a",
                OutputFormat::Docx,
            ),
            run_generation(
                &db,
                &builder,
                &user_b,
                "a.js",
                upload_b,
                "explain b",
                OutputFormat::Docx,
            ),
        );
        ra.unwrap();
        rb.unwrap();

        let created = db.created.lock().unwrap();
        assert_eq!(created.len(), 2);
        let mut owners: Vec<Uuid> = created.iter().map(|r| r.user_id).collect();
        owners.sort();
        let mut expected = vec![user_a.user_id, user_b.user_id];
        expected.sort();
        assert_eq!(owners, expected);
    }
}
