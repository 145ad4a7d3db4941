//! Renders API: managed template-driven generation tasks.
//!
//! A render is analogous to a job but runs a managed workflow instead of an
//! arbitrary container. Records mutate only server-side; progress is
//! observed via [`RendersApi::status`].

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::transport::Transport;

/// An asynchronous render task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Render {
    /// Render identifier.
    #[serde(default, alias = "id")]
    pub render_id: String,
    /// Current lifecycle state.
    #[serde(default)]
    pub state: String,
    /// Template the render was created from, if any.
    #[serde(default)]
    pub template: Option<String>,
    /// Render type (e.g. `comfyui`).
    #[serde(default, alias = "type")]
    pub render_type: Option<String>,
    /// URL of the finished result, once available.
    #[serde(default)]
    pub result_url: Option<String>,
    /// Error message when the render failed.
    #[serde(default)]
    pub error: Option<String>,
    /// Creation timestamp (epoch seconds).
    #[serde(default)]
    pub created_at: Option<i64>,
    /// Start timestamp (epoch seconds).
    #[serde(default)]
    pub started_at: Option<i64>,
    /// Completion timestamp (epoch seconds).
    #[serde(default)]
    pub completed_at: Option<i64>,
}

/// Lightweight polling snapshot of a render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderStatus {
    /// Render identifier.
    #[serde(default, alias = "id")]
    pub render_id: String,
    /// Current lifecycle state.
    #[serde(default)]
    pub state: String,
    /// Progress fraction, if reported.
    #[serde(default)]
    pub progress: Option<f64>,
}

/// The render list endpoint returns either `{"items": [...]}` or a bare
/// array.
#[derive(Deserialize)]
#[serde(untagged)]
enum RenderListResponse {
    Wrapped {
        #[serde(default)]
        items: Vec<Render>,
    },
    Bare(Vec<Render>),
}

/// Filters for listing renders.
#[derive(Debug, Clone, Default)]
pub struct RenderFilter {
    /// Only renders in this state.
    pub state: Option<String>,
    /// Only renders created from this template.
    pub template: Option<String>,
    /// Only renders of this type.
    pub render_type: Option<String>,
}

/// Renders API namespace.
#[derive(Debug, Clone, Copy)]
pub struct RendersApi<'a> {
    http: &'a Transport,
}

impl<'a> RendersApi<'a> {
    pub(crate) const fn new(http: &'a Transport) -> Self {
        Self { http }
    }

    /// Lists renders matching the filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn list(&self, filter: &RenderFilter) -> Result<Vec<Render>> {
        let mut query = Vec::new();
        if let Some(state) = &filter.state {
            query.push(("state", state.clone()));
        }
        if let Some(template) = &filter.template {
            query.push(("template", template.clone()));
        }
        if let Some(render_type) = &filter.render_type {
            query.push(("type", render_type.clone()));
        }

        let response: RenderListResponse = self.http.get("/api/renders", &query).await?;
        Ok(match response {
            RenderListResponse::Wrapped { items } | RenderListResponse::Bare(items) => items,
        })
    }

    /// Fetches a render.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the identifier is unknown.
    pub async fn get(&self, render_id: &str) -> Result<Render> {
        self.http.get(&format!("/api/renders/{render_id}"), &[]).await
    }

    /// Creates a new render.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the request.
    pub async fn create(
        &self,
        params: serde_json::Value,
        render_type: &str,
        notify_url: Option<&str>,
    ) -> Result<Render> {
        let mut payload = serde_json::json!({
            "type": render_type,
            "params": params,
        });
        if let Some(url) = notify_url {
            payload["notify_url"] = serde_json::json!(url);
        }

        self.http.post("/api/renders", &payload).await
    }

    /// Requests cancellation of a render. Advisory, like job cancellation.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn cancel(&self, render_id: &str) -> Result<serde_json::Value> {
        self.http.delete(&format!("/api/renders/{render_id}")).await
    }

    /// Fetches the lightweight polling status of a render.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the identifier is unknown.
    pub async fn status(&self, render_id: &str) -> Result<RenderStatus> {
        self.http
            .get(&format!("/api/renders/{render_id}/status"), &[])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_accepts_id_alias() {
        let render: Render = serde_json::from_value(json!({
            "id": "r1",
            "state": "running",
            "type": "comfyui"
        }))
        .unwrap();
        assert_eq!(render.render_id, "r1");
        assert_eq!(render.render_type.as_deref(), Some("comfyui"));
    }

    #[test]
    fn test_render_from_empty_object_defaults() {
        let render: Render = serde_json::from_value(json!({})).unwrap();
        assert_eq!(render.render_id, "");
        assert!(render.result_url.is_none());
        assert!(render.created_at.is_none());
    }

    #[test]
    fn test_status_progress_optional() {
        let status: RenderStatus =
            serde_json::from_value(json!({"render_id": "r1", "state": "queued"})).unwrap();
        assert!(status.progress.is_none());
    }
}
