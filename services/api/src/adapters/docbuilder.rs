//! services/api/src/adapters/docbuilder.rs
//!
//! This module contains the adapter for the external doc-builder service.
//! It implements the `DocBuilderService` port from the `core` crate over
//! plain HTTP with a bounded request timeout.

use async_trait::async_trait;
use futures::TryStreamExt;
use gendoc_core::domain::GeneratedFiles;
use gendoc_core::ports::{
    BuildDocumentRequest, DocBuilderService, FileDownload, PortError, PortResult,
};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use std::time::Duration;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `DocBuilderService` port against the
/// doc-builder's HTTP API.
#[derive(Clone)]
pub struct HttpDocBuilder {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDocBuilder {
    /// Creates a new `HttpDocBuilder`. The timeout bounds every request,
    /// including the long-running build call.
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn send_error(e: reqwest::Error) -> PortError {
        if e.is_timeout() {
            PortError::Unexpected("doc-builder request timed out".to_string())
        } else {
            PortError::Unexpected(format!("doc-builder request failed: {e}"))
        }
    }
}

//=========================================================================================
// `DocBuilderService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DocBuilderService for HttpDocBuilder {
    /// Submits a build request. Any non-200 answer is surfaced as a
    /// `Downstream` error with the body kept verbatim; there is no retry -
    /// downstream failures are terminal for the request.
    async fn build_document(&self, request: &BuildDocumentRequest) -> PortResult<GeneratedFiles> {
        let url = format!("{}/build-document", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(Self::send_error)?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(PortError::Downstream {
                status: status.as_u16(),
                body,
            });
        }

        // A response that does not decode to the typed format map is a
        // contract violation, not something to pass through untyped.
        response
            .json::<GeneratedFiles>()
            .await
            .map_err(|e| PortError::Unexpected(format!("unexpected doc-builder response shape: {e}")))
    }

    /// Fetches a generated file, preserving the downstream status and the
    /// content headers so the caller can proxy them unchanged.
    async fn download(&self, filetype: &str, filename: &str) -> PortResult<FileDownload> {
        let url = format!("{}/download/{}/{}", self.base_url, filetype, filename);
        let response = self.client.get(&url).send().await.map_err(Self::send_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PortError::Downstream {
                status: status.as_u16(),
                body,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let content_length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        let stream = response
            .bytes_stream()
            .map_err(|e| PortError::Unexpected(format!("doc-builder stream error: {e}")));

        Ok(FileDownload {
            status: status.as_u16(),
            content_type,
            content_length,
            stream: Box::pin(stream),
        })
    }
}
