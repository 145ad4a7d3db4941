//! Files API: asset upload and asynchronous processing.
//!
//! Uploaded files are processed asynchronously by the backend. The record
//! mutates only server-side; clients observe progress by polling
//! [`FilesApi::get`] or via the bounded [`FilesApi::wait_ready`] loop.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::error::{HyperError, Result};
use crate::transport::{Transport, UploadPart};

/// Asynchronous processing state of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum FileState {
    /// Backend is still processing the upload.
    Processing,
    /// Processing finished; the file is usable.
    Done,
    /// Processing failed; see the record's error message.
    Failed,
    /// Any state string this client does not recognize.
    #[default]
    Unknown,
}

impl From<String> for FileState {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "processing" => Self::Processing,
            "done" => Self::Done,
            "failed" => Self::Failed,
            _ => Self::Unknown,
        }
    }
}

impl From<FileState> for String {
    fn from(value: FileState) -> Self {
        match value {
            FileState::Processing => Self::from("processing"),
            FileState::Done => Self::from("done"),
            FileState::Failed => Self::from("failed"),
            FileState::Unknown => Self::from("unknown"),
        }
    }
}

/// An uploaded file record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    /// File identifier.
    #[serde(default)]
    pub id: String,
    /// Owning user identifier.
    #[serde(default)]
    pub user_id: String,
    /// Original filename.
    #[serde(default)]
    pub filename: String,
    /// MIME content type.
    #[serde(default)]
    pub content_type: String,
    /// Size in bytes.
    #[serde(default)]
    pub file_size: u64,
    /// Opaque storage reference, only valid for use in HyperCLI renders.
    #[serde(default)]
    pub url: String,
    /// Asynchronous processing state, if reported.
    #[serde(default)]
    pub state: Option<FileState>,
    /// Error message when processing failed.
    #[serde(default)]
    pub error: Option<String>,
    /// Creation timestamp (ISO-8601 string).
    #[serde(default)]
    pub created_at: Option<String>,
}

impl File {
    /// Returns true if processing finished successfully.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state == Some(FileState::Done)
    }

    /// Returns true if processing failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.state == Some(FileState::Failed)
    }

    /// Returns true if the backend is still processing the upload.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.state == Some(FileState::Processing)
    }
}

/// Guesses a MIME content type from a filename extension.
#[must_use]
pub fn guess_content_type(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

/// Files API namespace.
#[derive(Debug, Clone, Copy)]
pub struct FilesApi<'a> {
    http: &'a Transport,
}

impl<'a> FilesApi<'a> {
    pub(crate) const fn new(http: &'a Transport) -> Self {
        Self { http }
    }

    /// Uploads a file from disk, guessing the content type from its
    /// extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the API call fails.
    pub async fn upload(&self, path: impl AsRef<Path>) -> Result<File> {
        let path = path.as_ref();
        let content = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content_type = guess_content_type(&filename);

        self.upload_bytes(content, &filename, content_type).await
    }

    /// Uploads raw bytes as a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn upload_bytes(
        &self,
        content: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Result<File> {
        info!("Uploading file: {filename} ({} bytes)", content.len());
        let parts = vec![UploadPart {
            field: String::from("file"),
            filename: filename.to_string(),
            content,
            content_type: content_type.to_string(),
        }];
        self.http.post_multipart("/api/files/multi", parts).await
    }

    /// Registers a file to be fetched from a URL (processed asynchronously
    /// by the backend).
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn upload_url(&self, url: &str, path: Option<&str>) -> Result<File> {
        let mut payload = serde_json::json!({ "url": url });
        if let Some(path) = path {
            payload["path"] = serde_json::json!(path);
        }
        self.http.post("/api/files/url", &payload).await
    }

    /// Uploads base64-encoded data (processed asynchronously by the
    /// backend).
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn upload_b64(
        &self,
        data: &str,
        filename: &str,
        content_type: Option<&str>,
        path: Option<&str>,
    ) -> Result<File> {
        let mut payload = serde_json::json!({ "data": data, "filename": filename });
        if let Some(content_type) = content_type {
            payload["content_type"] = serde_json::json!(content_type);
        }
        if let Some(path) = path {
            payload["path"] = serde_json::json!(path);
        }
        self.http.post("/api/files/b64", &payload).await
    }

    /// Fetches a file record.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the identifier is unknown.
    pub async fn get(&self, file_id: &str) -> Result<File> {
        self.http.get(&format!("/api/files/{file_id}"), &[]).await
    }

    /// Deletes an uploaded file.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn delete(&self, file_id: &str) -> Result<serde_json::Value> {
        self.http.delete(&format!("/api/files/{file_id}")).await
    }

    /// Polls a file until asynchronous processing completes.
    ///
    /// Returns the ready record, fails with [`HyperError::UploadFailed`] if
    /// processing ends in the `failed` state, or with a timeout error once
    /// the deadline elapses.
    ///
    /// # Errors
    ///
    /// See above; API errors from individual polls also propagate.
    pub async fn wait_ready(
        &self,
        file_id: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<File> {
        let start = Instant::now();
        let mut last_state = None;

        loop {
            let file = self.get(file_id).await?;

            if file.is_ready() {
                return Ok(file);
            }
            if file.is_failed() {
                return Err(HyperError::UploadFailed {
                    file_id: file_id.to_string(),
                    message: file.error.unwrap_or_else(|| String::from("unknown error")),
                });
            }

            last_state = file.state.map(|s| String::from(s));
            debug!(
                "File {file_id} not ready yet (state: {})",
                last_state.as_deref().unwrap_or("unknown")
            );

            if start.elapsed() >= timeout {
                return Err(HyperError::timeout(
                    format!("file {file_id} processing"),
                    start.elapsed(),
                    last_state,
                ));
            }

            tokio::time::sleep(poll_interval).await;

            if start.elapsed() >= timeout {
                return Err(HyperError::timeout(
                    format!("file {file_id} processing"),
                    start.elapsed(),
                    last_state,
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport(server: &MockServer) -> Transport {
        Transport::new(&server.uri(), "k", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_file_from_empty_object_defaults() {
        let file: File = serde_json::from_value(json!({})).unwrap();
        assert_eq!(file.id, "");
        assert_eq!(file.file_size, 0);
        assert!(file.state.is_none());
        assert!(!file.is_ready());
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type("cat.png"), "image/png");
        assert_eq!(guess_content_type("photo.JPEG"), "image/jpeg");
        assert_eq!(guess_content_type("track.mp3"), "audio/mpeg");
        assert_eq!(guess_content_type("archive.tar.gz"), "application/octet-stream");
        assert_eq!(guess_content_type("noext"), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_wait_ready_returns_done_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/files/f1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "f1",
                "state": "done"
            })))
            .mount(&server)
            .await;

        let transport = transport(&server);
        let files = FilesApi::new(&transport);
        let file = files
            .wait_ready("f1", Duration::from_secs(5), Duration::from_millis(10))
            .await
            .unwrap();
        assert!(file.is_ready());
    }

    #[tokio::test]
    async fn test_wait_ready_surfaces_processing_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/files/f2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "f2",
                "state": "failed",
                "error": "unsupported codec"
            })))
            .mount(&server)
            .await;

        let transport = transport(&server);
        let files = FilesApi::new(&transport);
        let err = files
            .wait_ready("f2", Duration::from_secs(5), Duration::from_millis(10))
            .await
            .unwrap_err();
        match err {
            HyperError::UploadFailed { file_id, message } => {
                assert_eq!(file_id, "f2");
                assert_eq!(message, "unsupported codec");
            }
            other => panic!("expected UploadFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_wait_ready_times_out_on_stuck_processing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/files/f3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "f3",
                "state": "processing"
            })))
            .mount(&server)
            .await;

        let transport = transport(&server);
        let files = FilesApi::new(&transport);
        let err = files
            .wait_ready("f3", Duration::from_millis(50), Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        if let HyperError::Timeout { last_state, .. } = err {
            assert_eq!(last_state.as_deref(), Some("processing"));
        }
    }
}
