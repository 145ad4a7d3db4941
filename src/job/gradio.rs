//! Gradio job specialization.
//!
//! Gradio services default to token-gated, load-balanced exposure; the
//! specialization contributes only the service conventions and creation
//! defaults. All polling and transport behavior lives in [`BaseJob`].

use std::time::Duration;

use crate::api::Job;
use crate::client::HyperClient;
use crate::error::Result;

use super::{BaseJob, JobHandleOptions, ServiceProfile};

/// Port Gradio listens on when not load-balanced.
pub const GRADIO_PORT: u16 = 7860;

/// A job handle specialized for Gradio-based service images.
#[derive(Debug, Clone)]
pub struct GradioJob {
    /// Underlying handle.
    inner: BaseJob,
}

impl GradioJob {
    /// Service conventions for Gradio images. Gradio apps are slower to
    /// answer their first request, so the health probe allows more time.
    pub const PROFILE: ServiceProfile = ServiceProfile {
        default_image: "",
        default_gpu_type: "l4",
        service_port: Some(GRADIO_PORT),
        health_path: "/",
        health_timeout: Duration::from_secs(10),
    };

    /// Wraps an existing job snapshot.
    #[must_use]
    pub fn attach(client: HyperClient, job: Job) -> Self {
        Self {
            inner: BaseJob::attach_with_profile(client, job, Self::PROFILE),
        }
    }

    /// Creates a Gradio job for a service image.
    ///
    /// The service is token-gated and routed through the load balancer,
    /// on the Gradio port unless the options name another.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the request.
    pub async fn create_for_service(
        client: &HyperClient,
        image: &str,
        mut options: JobHandleOptions,
    ) -> Result<Self> {
        options.image = Some(image.to_string());
        if options.lb.is_none() {
            options.lb = Some(GRADIO_PORT);
        }
        options.auth = true;

        let inner = BaseJob::create(client, Self::PROFILE, options).await?;
        Ok(Self { inner })
    }
}

impl std::ops::Deref for GradioJob {
    type Target = BaseJob;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl std::ops::DerefMut for GradioJob {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use serde_json::json;

    fn offline_client() -> HyperClient {
        let settings = Settings {
            api_key: String::from("hyper_api_test"),
            api_url: String::from("http://127.0.0.1:9"),
            ws_url: String::from("ws://127.0.0.1:9"),
            timeout: Duration::from_secs(1),
        };
        HyperClient::from_settings(settings, None, false).unwrap()
    }

    #[test]
    fn test_attached_handle_uses_gradio_port() {
        let job: Job = serde_json::from_value(json!({
            "job_id": "j1",
            "state": "running",
            "hostname": "gpu-7.hypercli.com"
        }))
        .unwrap();

        let handle = GradioJob::attach(offline_client(), job);
        assert_eq!(
            handle.base_url().as_deref(),
            Some("http://gpu-7.hypercli.com:7860")
        );
        assert_eq!(handle.profile().default_gpu_type, "l4");
    }
}
