//! Job handles: client-side wrappers around one job's snapshot.
//!
//! A [`BaseJob`] binds a [`Job`] snapshot to the owning client and offers
//! service connection helpers: base-URL derivation, token-gated auth
//! headers, a boolean health check, and bounded fixed-interval readiness
//! polling. Specializations ([`ComfyUiJob`], [`GradioJob`]) override only
//! the service defaults and add service-specific helpers; all polling and
//! transport logic lives here.

mod comfyui;
mod gradio;

pub use comfyui::{
    COMFYUI_PORT, ComfyUiJob, WorkflowParams, apply_graph_modes, apply_params,
    default_object_info, find_node, find_nodes, graph_to_api,
};
pub use gradio::{GRADIO_PORT, GradioJob};

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::api::{CreateJobRequest, DEFAULT_GPU_TYPE, Job, JobState};
use crate::client::HyperClient;
use crate::error::{HyperError, Result};

/// Connection conventions for a known service image.
#[derive(Debug, Clone, Copy)]
pub struct ServiceProfile {
    /// Image used when a create request does not name one.
    pub default_image: &'static str,
    /// GPU type used when a create request does not name one.
    pub default_gpu_type: &'static str,
    /// Port the service listens on when not load-balanced.
    pub service_port: Option<u16>,
    /// Path probed by the health check.
    pub health_path: &'static str,
    /// Per-probe timeout for the health check.
    pub health_timeout: Duration,
}

impl ServiceProfile {
    /// Profile for arbitrary containers with no known service convention.
    pub const GENERIC: Self = Self {
        default_image: "",
        default_gpu_type: DEFAULT_GPU_TYPE,
        service_port: None,
        health_path: "/",
        health_timeout: Duration::from_secs(5),
    };
}

/// Options for creating a job through a handle.
#[derive(Debug, Clone)]
pub struct JobHandleOptions {
    /// Container image; the profile default when unset.
    pub image: Option<String>,
    /// GPU type; the profile default when unset.
    pub gpu_type: Option<String>,
    /// Number of GPUs.
    pub gpu_count: u32,
    /// Runtime budget in seconds.
    pub runtime: u64,
    /// Region preference.
    pub region: Option<String>,
    /// Command override.
    pub command: Option<String>,
    /// Environment variables.
    pub env: HashMap<String, String>,
    /// Route through the load balancer on this port instead of exposing
    /// the service port directly.
    pub lb: Option<u16>,
    /// Require the job-scoped token on the exposed service.
    pub auth: bool,
}

impl Default for JobHandleOptions {
    fn default() -> Self {
        Self {
            image: None,
            gpu_type: None,
            gpu_count: 1,
            runtime: 3600,
            region: None,
            command: None,
            env: HashMap::new(),
            lb: None,
            auth: false,
        }
    }
}

impl JobHandleOptions {
    /// Sets the container image.
    #[must_use]
    pub fn with_image(mut self, image: &str) -> Self {
        self.image = Some(image.to_string());
        self
    }

    /// Sets the GPU type.
    #[must_use]
    pub fn with_gpu_type(mut self, gpu_type: &str) -> Self {
        self.gpu_type = Some(gpu_type.to_string());
        self
    }

    /// Sets the GPU count.
    #[must_use]
    pub const fn with_gpu_count(mut self, count: u32) -> Self {
        self.gpu_count = count;
        self
    }

    /// Sets the runtime budget in seconds.
    #[must_use]
    pub const fn with_runtime(mut self, runtime: u64) -> Self {
        self.runtime = runtime;
        self
    }

    /// Adds an environment variable.
    #[must_use]
    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    /// Routes the service through the load balancer on the given port.
    #[must_use]
    pub const fn with_lb(mut self, port: u16) -> Self {
        self.lb = Some(port);
        self
    }

    /// Requires the job-scoped token on the exposed service.
    #[must_use]
    pub const fn with_auth(mut self, auth: bool) -> Self {
        self.auth = auth;
        self
    }
}

/// A handle bound to one job's snapshot.
#[derive(Debug, Clone)]
pub struct BaseJob {
    /// Owning client.
    client: HyperClient,
    /// Latest fetched snapshot.
    job: Job,
    /// Service connection conventions.
    profile: ServiceProfile,
    /// Whether the service is reached through the load balancer.
    use_lb: bool,
    /// Whether the service requires the job-scoped token.
    use_auth: bool,
    /// Cached job-scoped token, fetched by [`BaseJob::ensure_token`].
    token: Option<String>,
}

impl BaseJob {
    /// Wraps an existing job snapshot with the generic profile.
    #[must_use]
    pub fn attach(client: HyperClient, job: Job) -> Self {
        Self::attach_with_profile(client, job, ServiceProfile::GENERIC)
    }

    /// Wraps an existing job snapshot with a service profile.
    #[must_use]
    pub const fn attach_with_profile(
        client: HyperClient,
        job: Job,
        profile: ServiceProfile,
    ) -> Self {
        Self {
            client,
            job,
            profile,
            use_lb: false,
            use_auth: false,
            token: None,
        }
    }

    /// Creates a new job and returns a handle to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the request.
    pub async fn create(
        client: &HyperClient,
        profile: ServiceProfile,
        options: JobHandleOptions,
    ) -> Result<Self> {
        let mut request =
            CreateJobRequest::new(options.image.as_deref().unwrap_or(profile.default_image))
                .with_gpu_type(options.gpu_type.as_deref().unwrap_or(profile.default_gpu_type))
                .with_gpu_count(options.gpu_count)
                .with_runtime(options.runtime);

        if let Some(region) = &options.region {
            request = request.with_region(region);
        }
        if let Some(command) = &options.command {
            request = request.with_command(command);
        }
        if !options.env.is_empty() {
            request = request.with_env_map(options.env.clone());
        }
        if let Some(lb) = options.lb {
            request = request.with_lb(lb);
        } else if let Some(port) = profile.service_port {
            request = request.with_port(port);
        }
        if options.auth {
            request = request.with_auth(true);
        }

        let job = client.jobs().create(&request).await?;

        Ok(Self {
            client: client.clone(),
            job,
            profile,
            use_lb: options.lb.is_some(),
            use_auth: options.auth,
            token: None,
        })
    }

    /// Returns a handle to the first running job, optionally requiring the
    /// image to contain a substring. `None` when nothing is running.
    ///
    /// # Errors
    ///
    /// Returns an error if the list call fails.
    pub async fn get_running(
        client: &HyperClient,
        profile: ServiceProfile,
        image_filter: Option<&str>,
    ) -> Result<Option<Self>> {
        let jobs = client.jobs().list(Some(JobState::Running)).await?;

        Ok(jobs
            .into_iter()
            .find(|job| {
                image_filter
                    .is_none_or(|filter| filter.is_empty() || job.docker_image.contains(filter))
            })
            .map(|job| Self::attach_with_profile(client.clone(), job, profile)))
    }

    /// Returns a handle to the job matching an identifier (UUID, hostname,
    /// or IP address).
    ///
    /// # Errors
    ///
    /// Returns a not-found error when nothing matches.
    pub async fn get_by_instance(
        client: &HyperClient,
        profile: ServiceProfile,
        identifier: &str,
        state: Option<JobState>,
    ) -> Result<Self> {
        let job = client
            .jobs()
            .find(identifier, state)
            .await?
            .ok_or_else(|| HyperError::not_found(format!("No job matching: {identifier}")))?;

        Ok(Self::attach_with_profile(client.clone(), job, profile))
    }

    /// Returns a handle to a running job with a matching image, creating
    /// one when none exists (or when `reuse` is false).
    ///
    /// # Errors
    ///
    /// Returns an error if an underlying API call fails.
    pub async fn get_or_create(
        client: &HyperClient,
        profile: ServiceProfile,
        options: JobHandleOptions,
        reuse: bool,
    ) -> Result<Self> {
        if reuse {
            let filter = options
                .image
                .clone()
                .unwrap_or_else(|| profile.default_image.to_string());
            if let Some(existing) = Self::get_running(client, profile, Some(&filter)).await? {
                debug!("Reusing running job {}", existing.job.job_id);
                return Ok(existing);
            }
        }

        Self::create(client, profile, options).await
    }

    /// Returns the owning client.
    #[must_use]
    pub const fn client(&self) -> &HyperClient {
        &self.client
    }

    /// Returns the wrapped snapshot.
    #[must_use]
    pub const fn job(&self) -> &Job {
        &self.job
    }

    /// Returns the job identifier.
    #[must_use]
    pub fn job_id(&self) -> &str {
        &self.job.job_id
    }

    /// Returns the assigned hostname, if the job has been scheduled.
    #[must_use]
    pub fn hostname(&self) -> Option<&str> {
        self.job.hostname.as_deref()
    }

    /// Returns the current lifecycle state from the wrapped snapshot.
    #[must_use]
    pub const fn state(&self) -> JobState {
        self.job.state
    }

    /// Returns whether the service is reached through the load balancer.
    #[must_use]
    pub const fn use_lb(&self) -> bool {
        self.use_lb
    }

    /// Sets load-balanced mode. The base URL is derived per call, so the
    /// change takes effect immediately.
    pub const fn set_use_lb(&mut self, use_lb: bool) {
        self.use_lb = use_lb;
    }

    /// Sets whether the service requires the job-scoped token.
    pub const fn set_use_auth(&mut self, use_auth: bool) {
        self.use_auth = use_auth;
    }

    /// Returns the service base URL, or `None` until the backend assigns a
    /// hostname (i.e. while the job is still queued).
    #[must_use]
    pub fn base_url(&self) -> Option<String> {
        let hostname = self.hostname()?;
        Some(if self.use_lb {
            format!("https://{hostname}")
        } else {
            match self.profile.service_port {
                Some(port) => format!("http://{hostname}:{port}"),
                None => format!("http://{hostname}"),
            }
        })
    }

    /// Fetches the job-scoped token if it has not been fetched yet.
    ///
    /// Must be called before [`BaseJob::auth_headers`] on a token-gated
    /// handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the token endpoint fails.
    pub async fn ensure_token(&mut self) -> Result<&str> {
        if self.token.is_none() {
            let token = self.client.jobs().token(&self.job.job_id).await?;
            self.token = Some(token);
        }
        Ok(self.token.as_deref().unwrap_or_default())
    }

    /// Returns the cached job-scoped token, if fetched.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Returns the headers the wrapped service needs to authenticate
    /// inbound requests.
    ///
    /// # Errors
    ///
    /// Returns a precondition error if the handle is token-gated and
    /// [`BaseJob::ensure_token`] has not been awaited yet.
    pub fn auth_headers(&self) -> Result<HeaderMap> {
        let value = if self.use_auth {
            let token = self.token.as_deref().ok_or_else(|| {
                HyperError::precondition(
                    "Job token not loaded. Await ensure_token() before auth_headers() \
                     on a token-gated job.",
                )
            })?;
            format!("Bearer {token}")
        } else {
            format!("Bearer {}", self.client.api_key())
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&value)
                .map_err(|e| HyperError::config(format!("Invalid bearer value: {e}")))?,
        );
        Ok(headers)
    }

    /// Re-fetches the job snapshot from the API.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn refresh(&mut self) -> Result<&Job> {
        self.job = self.client.jobs().get(&self.job.job_id).await?;
        Ok(&self.job)
    }

    /// Probes the service health endpoint once.
    ///
    /// Returns false instead of erroring so callers can poll without
    /// exception-handling boilerplate: no hostname yet, a non-running
    /// state, missing auth state, or any request failure all read as
    /// unhealthy.
    pub async fn health_check(&self) -> bool {
        let Some(base_url) = self.base_url() else {
            return false;
        };
        if self.job.state != JobState::Running {
            return false;
        }
        let Ok(headers) = self.auth_headers() else {
            debug!("Health check skipped: auth headers unavailable");
            return false;
        };

        let url = format!("{base_url}{}", self.profile.health_path);
        match self
            .client
            .transport()
            .http()
            .get(&url)
            .headers(headers)
            .timeout(self.profile.health_timeout)
            .send()
            .await
        {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                debug!("Health check failed for {url}: {e}");
                false
            }
        }
    }

    /// Polls the job snapshot until it is running with an assigned
    /// hostname.
    ///
    /// # Errors
    ///
    /// Returns [`HyperError::JobTerminal`] if the job reaches a terminal
    /// state first, or a timeout error once the deadline elapses.
    pub async fn wait_for_running(
        &mut self,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<()> {
        self.wait_for_running_from(Instant::now(), timeout, poll_interval)
            .await
    }

    async fn wait_for_running_from(
        &mut self,
        start: Instant,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<()> {
        loop {
            self.refresh().await?;

            if self.job.state == JobState::Running && self.job.hostname.is_some() {
                return Ok(());
            }
            if self.job.state.is_terminal() {
                return Err(HyperError::JobTerminal {
                    job_id: self.job.job_id.clone(),
                    state: self.job.state.to_string(),
                });
            }

            debug!("Job {} not running yet (state: {})", self.job.job_id, self.job.state);

            if start.elapsed() >= timeout {
                return Err(HyperError::timeout(
                    format!("job {} to start running", self.job.job_id),
                    start.elapsed(),
                    Some(self.job.state.to_string()),
                ));
            }

            tokio::time::sleep(poll_interval).await;

            if start.elapsed() >= timeout {
                return Err(HyperError::timeout(
                    format!("job {} to start running", self.job.job_id),
                    start.elapsed(),
                    Some(self.job.state.to_string()),
                ));
            }
        }
    }

    /// Polls until the service answers its health check, first waiting out
    /// the queued phase if necessary.
    ///
    /// The loop uses a fixed interval with no backoff and always performs
    /// at least one health check, even when `poll_interval` exceeds
    /// `timeout`. Dropping the returned future cancels the wait.
    ///
    /// # Errors
    ///
    /// Returns [`HyperError::JobTerminal`] if the job reaches a terminal
    /// state, or a timeout error once the deadline elapses.
    pub async fn wait_until_ready(
        &mut self,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<()> {
        let start = Instant::now();

        self.refresh().await?;
        if self.job.state.is_terminal() {
            return Err(HyperError::JobTerminal {
                job_id: self.job.job_id.clone(),
                state: self.job.state.to_string(),
            });
        }

        if self.job.state != JobState::Running || self.job.hostname.is_none() {
            self.wait_for_running_from(start, timeout, poll_interval)
                .await?;
        }

        loop {
            if self.health_check().await {
                info!("Job {} is ready", self.job.job_id);
                return Ok(());
            }

            if start.elapsed() >= timeout {
                return Err(HyperError::timeout(
                    format!("job {} to become healthy", self.job.job_id),
                    start.elapsed(),
                    Some(self.job.state.to_string()),
                ));
            }

            tokio::time::sleep(poll_interval).await;

            if start.elapsed() >= timeout {
                return Err(HyperError::timeout(
                    format!("job {} to become healthy", self.job.job_id),
                    start.elapsed(),
                    Some(self.job.state.to_string()),
                ));
            }
        }
    }

    /// Requests cancellation of the job. Advisory; re-poll
    /// [`BaseJob::refresh`] for confirmation.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn shutdown(&self) -> Result<serde_json::Value> {
        self.client.jobs().cancel(&self.job.job_id).await
    }

    /// Extends the runtime budget and updates the wrapped snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn extend(&mut self, runtime: u64) -> Result<&Job> {
        self.job = self.client.jobs().extend(&self.job.job_id, runtime).await?;
        Ok(&self.job)
    }

    /// Returns the service profile of this handle.
    #[must_use]
    pub const fn profile(&self) -> &ServiceProfile {
        &self.profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> HyperClient {
        let settings = Settings {
            api_key: String::from("hyper_api_test"),
            api_url: server.uri(),
            ws_url: String::from("ws://unused"),
            timeout: Duration::from_secs(5),
        };
        HyperClient::from_settings(settings, None, false).unwrap()
    }

    fn offline_client() -> HyperClient {
        let settings = Settings {
            api_key: String::from("hyper_api_test"),
            api_url: String::from("http://127.0.0.1:9"),
            ws_url: String::from("ws://127.0.0.1:9"),
            timeout: Duration::from_secs(1),
        };
        HyperClient::from_settings(settings, None, false).unwrap()
    }

    fn job_with(state: &str, hostname: Option<&str>) -> Job {
        serde_json::from_value(json!({
            "job_id": "j1",
            "state": state,
            "hostname": hostname,
        }))
        .unwrap()
    }

    #[test]
    fn test_base_url_is_none_until_hostname_assigned() {
        let handle = BaseJob::attach(offline_client(), job_with("queued", None));
        assert!(handle.base_url().is_none());
    }

    #[test]
    fn test_base_url_respects_profile_port_and_lb_mode() {
        let profile = ServiceProfile {
            service_port: Some(8188),
            ..ServiceProfile::GENERIC
        };
        let mut handle = BaseJob::attach_with_profile(
            offline_client(),
            job_with("running", Some("gpu-1.hypercli.com")),
            profile,
        );

        assert_eq!(
            handle.base_url().as_deref(),
            Some("http://gpu-1.hypercli.com:8188")
        );

        handle.set_use_lb(true);
        assert_eq!(
            handle.base_url().as_deref(),
            Some("https://gpu-1.hypercli.com")
        );
    }

    #[test]
    fn test_auth_headers_require_token_when_gated() {
        let mut handle =
            BaseJob::attach(offline_client(), job_with("running", Some("gpu-1")));
        handle.set_use_auth(true);

        let err = handle.auth_headers().unwrap_err();
        assert!(matches!(err, HyperError::Precondition { .. }));
    }

    #[test]
    fn test_auth_headers_use_api_key_when_not_gated() {
        let handle = BaseJob::attach(offline_client(), job_with("running", Some("gpu-1")));
        let headers = handle.auth_headers().unwrap();
        assert_eq!(
            headers.get(AUTHORIZATION).unwrap().to_str().unwrap(),
            "Bearer hyper_api_test"
        );
    }

    #[tokio::test]
    async fn test_ensure_token_unlocks_auth_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/jobs/j1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "jobtok"})))
            .mount(&server)
            .await;

        let mut handle =
            BaseJob::attach(client_for(&server), job_with("running", Some("gpu-1")));
        handle.set_use_auth(true);

        assert_eq!(handle.ensure_token().await.unwrap(), "jobtok");
        let headers = handle.auth_headers().unwrap();
        assert_eq!(
            headers.get(AUTHORIZATION).unwrap().to_str().unwrap(),
            "Bearer jobtok"
        );
    }

    #[tokio::test]
    async fn test_wait_for_running_surfaces_terminal_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/jobs/j1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "job_id": "j1",
                "state": "failed"
            })))
            .mount(&server)
            .await;

        let mut handle = BaseJob::attach(client_for(&server), job_with("queued", None));
        let err = handle
            .wait_for_running(Duration::from_secs(5), Duration::from_millis(10))
            .await
            .unwrap_err();
        match err {
            HyperError::JobTerminal { job_id, state } => {
                assert_eq!(job_id, "j1");
                assert_eq!(state, "failed");
            }
            other => panic!("expected JobTerminal, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_wait_until_ready_succeeds_on_healthy_service() {
        let server = MockServer::start().await;
        let hostname = server.address().to_string();

        Mock::given(method("GET"))
            .and(path("/api/jobs/j1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "job_id": "j1",
                "state": "running",
                "hostname": hostname
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let profile = ServiceProfile {
            health_path: "/health",
            ..ServiceProfile::GENERIC
        };
        let mut handle = BaseJob::attach_with_profile(
            client_for(&server),
            job_with("queued", None),
            profile,
        );

        handle
            .wait_until_ready(Duration::from_secs(5), Duration::from_millis(10))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_interval_longer_than_timeout_still_checks_once() {
        let server = MockServer::start().await;
        let hostname = server.address().to_string();

        Mock::given(method("GET"))
            .and(path("/api/jobs/j1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "job_id": "j1",
                "state": "running",
                "hostname": hostname
            })))
            .mount(&server)
            .await;
        // Exactly one probe must arrive before the deadline fires.
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let profile = ServiceProfile {
            health_path: "/health",
            ..ServiceProfile::GENERIC
        };
        let mut handle = BaseJob::attach_with_profile(
            client_for(&server),
            job_with("queued", None),
            profile,
        );

        let err = handle
            .wait_until_ready(Duration::from_millis(50), Duration::from_millis(400))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_get_running_filters_by_image() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/jobs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jobs": [
                    {"job_id": "j1", "state": "running", "docker_image": "vendor/other:1"},
                    {"job_id": "j2", "state": "running",
                     "docker_image": "ghcr.io/compute3ai/images/comfyui:latest"}
                ]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let found = BaseJob::get_running(&client, ServiceProfile::GENERIC, Some("comfyui"))
            .await
            .unwrap()
            .expect("should match the comfyui job");
        assert_eq!(found.job_id(), "j2");

        let none = BaseJob::get_running(&client, ServiceProfile::GENERIC, Some("gradio"))
            .await
            .unwrap();
        assert!(none.is_none());
    }
}
