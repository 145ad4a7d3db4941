//! Authenticated HTTP transport for the HyperCLI REST API.
//!
//! Every request targets the configured base URL, carries a bearer token,
//! and honors the configured timeout. Non-2xx responses become typed API
//! errors; network failures become transport errors so callers can
//! distinguish "the server rejected this" from "the server was unreachable".
//! The transport performs no retries: failures surface immediately and retry
//! policy belongs to the caller.

use reqwest::{Client, StatusCode, header, multipart};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, trace};

use crate::error::{HyperError, Result};

/// A single part of a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadPart {
    /// Form field name.
    pub field: String,
    /// File name reported to the server.
    pub filename: String,
    /// Raw file content.
    pub content: Vec<u8>,
    /// MIME content type.
    pub content_type: String,
}

/// HTTP transport bound to one base URL and API key.
#[derive(Debug, Clone)]
pub struct Transport {
    /// Underlying HTTP client.
    client: Client,
    /// Base URL with any trailing slash removed.
    base_url: String,
    /// Bearer token attached to every request.
    api_key: String,
}

impl Transport {
    /// Creates a new transport.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the HTTP client cannot be created.
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HyperError::transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Returns the base URL this transport targets.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the configured API key.
    #[must_use]
    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Returns the underlying HTTP client, for requests that target a
    /// job's own service endpoint rather than the API.
    #[must_use]
    pub(crate) const fn http(&self) -> &Client {
        &self.client
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }

    /// Issues a GET request.
    ///
    /// # Errors
    ///
    /// Returns a transport error on network failure or an API error on a
    /// non-2xx response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        trace!("GET {path}");
        let mut request = self
            .client
            .get(self.url(path))
            .header(header::AUTHORIZATION, self.bearer());

        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await.map_err(request_error)?;
        handle_response(response).await
    }

    /// Issues a POST request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns a transport error on network failure or an API error on a
    /// non-2xx response.
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        trace!("POST {path}");
        let response = self
            .client
            .post(self.url(path))
            .header(header::AUTHORIZATION, self.bearer())
            .json(body)
            .send()
            .await
            .map_err(request_error)?;
        handle_response(response).await
    }

    /// Issues a PATCH request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns a transport error on network failure or an API error on a
    /// non-2xx response.
    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        trace!("PATCH {path}");
        let response = self
            .client
            .patch(self.url(path))
            .header(header::AUTHORIZATION, self.bearer())
            .json(body)
            .send()
            .await
            .map_err(request_error)?;
        handle_response(response).await
    }

    /// Issues a DELETE request, returning the raw acknowledgement body.
    ///
    /// # Errors
    ///
    /// Returns a transport error on network failure or an API error on a
    /// non-2xx response.
    pub async fn delete(&self, path: &str) -> Result<serde_json::Value> {
        trace!("DELETE {path}");
        let response = self
            .client
            .delete(self.url(path))
            .header(header::AUTHORIZATION, self.bearer())
            .send()
            .await
            .map_err(request_error)?;
        handle_response(response).await
    }

    /// Issues a multipart POST for file uploads.
    ///
    /// The content-type header is left to the HTTP client so it can set the
    /// multipart boundary.
    ///
    /// # Errors
    ///
    /// Returns a transport error on network failure or an API error on a
    /// non-2xx response.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        parts: Vec<UploadPart>,
    ) -> Result<T> {
        trace!("POST (multipart) {path}");
        let mut form = multipart::Form::new();
        for part in parts {
            let piece = multipart::Part::bytes(part.content)
                .file_name(part.filename)
                .mime_str(&part.content_type)
                .map_err(|e| {
                    HyperError::invalid_response(format!("Invalid content type: {e}"))
                })?;
            form = form.part(part.field, piece);
        }

        let response = self
            .client
            .post(self.url(path))
            .header(header::AUTHORIZATION, self.bearer())
            .multipart(form)
            .send()
            .await
            .map_err(request_error)?;
        handle_response(response).await
    }
}

/// Maps a request-level failure to a transport error.
fn request_error(e: reqwest::Error) -> HyperError {
    if e.is_timeout() {
        HyperError::transport(format!("Request timed out: {e}"))
    } else {
        HyperError::transport(format!("Request failed: {e}"))
    }
}

/// Converts an HTTP response into a typed value or error.
///
/// 404 becomes [`HyperError::NotFound`]; any other non-2xx status becomes
/// [`HyperError::Api`] with the detail text extracted from the body.
pub(crate) async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();

    if !status.is_success() {
        let detail = error_detail(status, response).await;
        debug!("API request failed: {status} - {detail}");
        if status == StatusCode::NOT_FOUND {
            return Err(HyperError::not_found(detail));
        }
        return Err(HyperError::api(status.as_u16(), detail));
    }

    if status == StatusCode::NO_CONTENT {
        return serde_json::from_value(serde_json::Value::Null).map_err(|e| {
            HyperError::invalid_response(format!("Empty response not accepted: {e}"))
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| HyperError::invalid_response(format!("Failed to parse response: {e}")))
}

/// Extracts a human-readable detail string from an error response body.
///
/// Prefers the JSON `detail` field, falls back to the raw body, then to the
/// status reason phrase.
async fn error_detail(status: StatusCode, response: reqwest::Response) -> String {
    let body = response.text().await.unwrap_or_default();

    serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|value| {
            value
                .get("detail")
                .and_then(|d| d.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                body
            }
        })
}
