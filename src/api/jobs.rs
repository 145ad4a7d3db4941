//! Jobs API: GPU job creation, lookup, and lifecycle management.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{HyperError, Result};
use crate::transport::Transport;

/// Job lifecycle state.
///
/// Unrecognized values from the backend are preserved as [`JobState::Unknown`]
/// rather than failing deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum JobState {
    /// Submitted, not yet queued for scheduling.
    Pending,
    /// Waiting for capacity.
    Queued,
    /// Container is up and billed.
    Running,
    /// Cancellation requested, not yet confirmed.
    Canceling,
    /// Cancelled by the user.
    Cancelled,
    /// Exited with an error.
    Failed,
    /// Exited successfully.
    Completed,
    /// Terminated by the backend (runtime budget exhausted).
    Terminated,
    /// Any state string this client does not recognize.
    #[default]
    Unknown,
}

impl JobState {
    /// Returns the canonical wire representation of this state.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Canceling => "canceling",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Completed => "completed",
            Self::Terminated => "terminated",
            Self::Unknown => "unknown",
        }
    }

    /// Returns true if the job can no longer transition to `running`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Cancelled | Self::Failed | Self::Completed | Self::Terminated
        )
    }
}

impl From<String> for JobState {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "queued" => Self::Queued,
            "running" => Self::Running,
            "canceling" | "cancelling" => Self::Canceling,
            "cancelled" | "canceled" => Self::Cancelled,
            "failed" => Self::Failed,
            "completed" | "succeeded" => Self::Completed,
            "terminated" => Self::Terminated,
            _ => Self::Unknown,
        }
    }
}

impl From<JobState> for String {
    fn from(value: JobState) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A remote GPU job snapshot.
///
/// The backend owns the job; this is an immutable snapshot fetched on
/// demand. Deserializing an empty object yields documented defaults for
/// every field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier.
    #[serde(default)]
    pub job_id: String,
    /// Key scoping the job's log stream.
    #[serde(default)]
    pub job_key: String,
    /// Current lifecycle state.
    #[serde(default)]
    pub state: JobState,
    /// Requested GPU type.
    #[serde(default)]
    pub gpu_type: String,
    /// Number of GPUs attached.
    #[serde(default = "default_one")]
    pub gpu_count: u32,
    /// Region the job was scheduled in.
    #[serde(default)]
    pub region: String,
    /// Whether the job may be interrupted for capacity.
    #[serde(default = "default_true")]
    pub interruptible: bool,
    /// Hourly price rate.
    #[serde(default)]
    pub price_per_hour: f64,
    /// Per-second price rate.
    #[serde(default)]
    pub price_per_second: f64,
    /// Container image the job runs.
    #[serde(default)]
    pub docker_image: String,
    /// Runtime budget in seconds.
    #[serde(default)]
    pub runtime: u64,
    /// Assigned hostname; present only once the job has been scheduled.
    #[serde(default)]
    pub hostname: Option<String>,
    /// Exposed port mappings (container port or `lb` -> host port).
    #[serde(default)]
    pub ports: HashMap<String, u16>,
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

const fn default_one() -> u32 {
    1
}

const fn default_true() -> bool {
    true
}

/// Point-in-time utilization snapshot for one GPU.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuMetrics {
    /// GPU index within the job.
    #[serde(default)]
    pub index: u32,
    /// GPU device name.
    #[serde(default)]
    pub name: String,
    /// GPU utilization percentage.
    #[serde(default, rename = "utilization_gpu_percent")]
    pub utilization: f64,
    /// Memory in use, in MB.
    #[serde(default, rename = "memory_used_mb")]
    pub memory_used: f64,
    /// Total memory, in MB.
    #[serde(default, rename = "memory_total_mb")]
    pub memory_total: f64,
    /// Temperature in degrees Celsius.
    #[serde(default, rename = "temperature_c")]
    pub temperature: f64,
    /// Power draw in watts.
    #[serde(default, rename = "power_draw_w")]
    pub power_draw: f64,
}

/// Point-in-time system utilization snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemMetrics {
    /// CPU utilization percentage.
    #[serde(default)]
    pub cpu_percent: f64,
    /// Number of CPU cores.
    #[serde(default = "default_one")]
    pub cpu_cores: u32,
    /// Unix-style CPU percentage (may exceed 100 on multi-core).
    #[serde(default)]
    pub cpu_unix_percent: f64,
    /// Memory in use, in MB.
    #[serde(default, rename = "memory_used_mb")]
    pub memory_used: f64,
    /// Memory limit, in MB.
    #[serde(default, rename = "memory_limit_mb")]
    pub memory_limit: f64,
}

/// GPU and system metrics for a running job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMetrics {
    /// Per-GPU utilization snapshots.
    #[serde(default)]
    pub gpus: Vec<GpuMetrics>,
    /// System-level snapshot, if reported.
    #[serde(default)]
    pub system: Option<SystemMetrics>,
}

/// Registry credentials for private images.
#[derive(Debug, Clone, Serialize)]
pub struct RegistryAuth {
    /// Registry username.
    pub username: String,
    /// Registry password or token.
    pub password: String,
}

/// Request to create a new job.
///
/// The server is authoritative on feasibility (GPU availability, quota); no
/// local validation is performed beyond the type shape.
#[derive(Debug, Clone, Serialize)]
pub struct CreateJobRequest {
    /// Container image to run.
    pub docker_image: String,
    /// GPU type identifier.
    pub gpu_type: String,
    /// Number of GPUs.
    pub gpu_count: u32,
    /// Whether the job may be interrupted for capacity.
    pub interruptible: bool,
    /// Base64-encoded command, empty when the image default is used.
    pub command: String,
    /// Region preference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Runtime budget in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<u64>,
    /// Environment variables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_vars: Option<HashMap<String, String>>,
    /// Port mappings (container port or `lb` -> host port).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ports: Option<HashMap<String, u16>>,
    /// Whether the exposed service requires the job-scoped token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<bool>,
    /// Credentials for pulling a private image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_auth: Option<RegistryAuth>,
}

/// Default GPU type used when a request does not specify one.
pub const DEFAULT_GPU_TYPE: &str = "l40s";

impl CreateJobRequest {
    /// Creates a request for the given image with default settings.
    #[must_use]
    pub fn new(image: &str) -> Self {
        Self {
            docker_image: image.to_string(),
            gpu_type: String::from(DEFAULT_GPU_TYPE),
            gpu_count: 1,
            interruptible: true,
            command: String::new(),
            region: None,
            runtime: None,
            env_vars: None,
            ports: None,
            auth: None,
            registry_auth: None,
        }
    }

    /// Sets the command, base64-encoding it for the wire.
    #[must_use]
    pub fn with_command(mut self, command: &str) -> Self {
        self.command = BASE64.encode(command);
        self
    }

    /// Sets the GPU type.
    #[must_use]
    pub fn with_gpu_type(mut self, gpu_type: &str) -> Self {
        self.gpu_type = gpu_type.to_string();
        self
    }

    /// Sets the GPU count.
    #[must_use]
    pub const fn with_gpu_count(mut self, count: u32) -> Self {
        self.gpu_count = count;
        self
    }

    /// Sets the region preference.
    #[must_use]
    pub fn with_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_string());
        self
    }

    /// Sets the runtime budget in seconds.
    #[must_use]
    pub const fn with_runtime(mut self, runtime: u64) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Sets whether the job may be interrupted.
    #[must_use]
    pub const fn with_interruptible(mut self, interruptible: bool) -> Self {
        self.interruptible = interruptible;
        self
    }

    /// Adds an environment variable.
    #[must_use]
    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env_vars
            .get_or_insert_with(HashMap::new)
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Sets all environment variables.
    #[must_use]
    pub fn with_env_map(mut self, env: HashMap<String, String>) -> Self {
        self.env_vars = Some(env);
        self
    }

    /// Exposes a container port on the same host port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.ports
            .get_or_insert_with(HashMap::new)
            .insert(port.to_string(), port);
        self
    }

    /// Routes the service through the load balancer on the given port.
    #[must_use]
    pub fn with_lb(mut self, port: u16) -> Self {
        self.ports
            .get_or_insert_with(HashMap::new)
            .insert(String::from("lb"), port);
        self
    }

    /// Enables job-scoped token auth on the exposed service.
    #[must_use]
    pub const fn with_auth(mut self, auth: bool) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Sets registry credentials for a private image.
    #[must_use]
    pub fn with_registry_auth(mut self, username: &str, password: &str) -> Self {
        self.registry_auth = Some(RegistryAuth {
            username: username.to_string(),
            password: password.to_string(),
        });
        self
    }
}

/// The job list endpoint returns either `{"jobs": [...]}` or a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum JobListResponse {
    Wrapped {
        #[serde(default)]
        jobs: Vec<Job>,
    },
    Bare(Vec<Job>),
}

#[derive(Deserialize)]
struct LogsResponse {
    #[serde(default)]
    logs: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: String,
}

/// Jobs API namespace.
#[derive(Debug, Clone, Copy)]
pub struct Jobs<'a> {
    http: &'a Transport,
}

impl<'a> Jobs<'a> {
    pub(crate) const fn new(http: &'a Transport) -> Self {
        Self { http }
    }

    /// Lists all jobs, optionally filtered by lifecycle state.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn list(&self, state: Option<JobState>) -> Result<Vec<Job>> {
        let mut query = Vec::new();
        if let Some(state) = state {
            query.push(("state", state.as_str().to_string()));
        }

        let response: JobListResponse = self.http.get("/api/jobs", &query).await?;
        Ok(match response {
            JobListResponse::Wrapped { jobs } | JobListResponse::Bare(jobs) => jobs,
        })
    }

    /// Fetches the current snapshot of a job.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the identifier is unknown.
    pub async fn get(&self, job_id: &str) -> Result<Job> {
        self.http.get(&format!("/api/jobs/{job_id}"), &[]).await
    }

    /// Submits a new job.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the request.
    pub async fn create(&self, request: &CreateJobRequest) -> Result<Job> {
        info!(
            "Creating job: image={}, gpu={}x{}",
            request.docker_image, request.gpu_count, request.gpu_type
        );
        let job: Job = self.http.post("/api/jobs", request).await?;
        info!("Created job {} in state {}", job.job_id, job.state);
        Ok(job)
    }

    /// Requests termination of a job.
    ///
    /// Cancellation is advisory: the next snapshot may still show a
    /// transitional `canceling` state. Callers that need confirmation must
    /// re-poll [`Jobs::get`].
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn cancel(&self, job_id: &str) -> Result<serde_json::Value> {
        info!("Cancelling job: {job_id}");
        self.http.delete(&format!("/api/jobs/{job_id}")).await
    }

    /// Extends the runtime budget of a job.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn extend(&self, job_id: &str, runtime: u64) -> Result<Job> {
        self.http
            .patch(
                &format!("/api/jobs/{job_id}"),
                &serde_json::json!({ "runtime": runtime }),
            )
            .await
    }

    /// Returns the current log buffer of a job.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn logs(&self, job_id: &str) -> Result<String> {
        let response: LogsResponse = self.http.get(&format!("/api/jobs/{job_id}/logs"), &[]).await?;
        Ok(response.logs)
    }

    /// Returns GPU and system metrics for a running job.
    ///
    /// Metrics require an active container; for a job that is not running
    /// the backend rejects the request and this method returns the typed
    /// [`HyperError::MetricsUnavailable`] kind.
    ///
    /// # Errors
    ///
    /// Returns [`HyperError::MetricsUnavailable`] when the job is not
    /// running, or another error if the API call fails.
    pub async fn metrics(&self, job_id: &str) -> Result<JobMetrics> {
        match self
            .http
            .get(&format!("/api/jobs/{job_id}/metrics"), &[])
            .await
        {
            Err(HyperError::Api { status, detail }) if status == 400 || status == 409 => {
                Err(HyperError::MetricsUnavailable {
                    job_id: job_id.to_string(),
                    detail,
                })
            }
            other => other,
        }
    }

    /// Returns a short-lived bearer token scoped to the job's exposed
    /// service.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn token(&self, job_id: &str) -> Result<String> {
        let response: TokenResponse = self
            .http
            .get(&format!("/api/jobs/{job_id}/token"), &[])
            .await?;
        Ok(response.token)
    }

    /// Finds a job by identifier, returning `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures other than absence.
    pub async fn find_by_id(&self, job_id: &str) -> Result<Option<Job>> {
        match self.get(job_id).await {
            Ok(job) => Ok(Some(job)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Finds a job by hostname (exact or prefix match) by scanning the job
    /// list, returning `None` if no job matches.
    ///
    /// # Errors
    ///
    /// Returns an error if the list call fails.
    pub async fn find_by_hostname(
        &self,
        hostname: &str,
        state: Option<JobState>,
    ) -> Result<Option<Job>> {
        let jobs = self.list(state).await?;
        Ok(match_hostname(&jobs, hostname).cloned())
    }

    /// Finds a job whose hostname resolves to the given IP address,
    /// returning `None` if no job matches.
    ///
    /// Resolution is performed client-side because the backend has no
    /// query-by-address endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the list call fails. DNS failures for individual
    /// hostnames are skipped, not surfaced.
    pub async fn find_by_ip(&self, ip: &str, state: Option<JobState>) -> Result<Option<Job>> {
        let jobs = self.list(state).await?;

        for job in jobs {
            let Some(hostname) = job.hostname.clone() else {
                continue;
            };
            match tokio::net::lookup_host((hostname.as_str(), 443)).await {
                Ok(mut addrs) => {
                    if addrs.any(|addr| addr.ip().to_string() == ip) {
                        return Ok(Some(job));
                    }
                }
                Err(e) => {
                    debug!("DNS lookup failed for {hostname}: {e}");
                }
            }
        }

        Ok(None)
    }

    /// Finds a job by UUID, hostname, or IP address.
    ///
    /// UUIDs go straight to [`Jobs::get`]; anything else is matched against
    /// the job list by hostname first, then by resolved address.
    ///
    /// # Errors
    ///
    /// Returns an error if an underlying API call fails.
    pub async fn find(&self, identifier: &str, state: Option<JobState>) -> Result<Option<Job>> {
        if is_uuid(identifier) {
            return self.find_by_id(identifier).await;
        }

        if let Some(job) = self.find_by_hostname(identifier, state).await? {
            return Ok(Some(job));
        }

        self.find_by_ip(identifier, state).await
    }
}

/// Returns true if the string is a well-formed UUID.
///
/// Used to decide which lookup strategy applies to a user-supplied
/// identifier.
#[must_use]
pub fn is_uuid(s: &str) -> bool {
    Uuid::parse_str(s).is_ok()
}

/// Returns the first job whose hostname equals or starts with `hostname`.
#[must_use]
pub fn match_hostname<'a>(jobs: &'a [Job], hostname: &str) -> Option<&'a Job> {
    jobs.iter().find(|job| {
        job.hostname
            .as_deref()
            .is_some_and(|h| h == hostname || h.starts_with(hostname))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport(server: &MockServer) -> Transport {
        Transport::new(&server.uri(), "k", std::time::Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_job_from_empty_object_uses_defaults() {
        let job: Job = serde_json::from_value(json!({})).unwrap();
        assert_eq!(job.job_id, "");
        assert_eq!(job.state, JobState::Unknown);
        assert_eq!(job.gpu_count, 1);
        assert!(job.interruptible);
        assert!(job.hostname.is_none());
        assert!(job.ports.is_empty());
    }

    #[test]
    fn test_job_state_parses_vendor_aliases() {
        assert_eq!(JobState::from(String::from("cancelling")), JobState::Canceling);
        assert_eq!(JobState::from(String::from("canceled")), JobState::Cancelled);
        assert_eq!(JobState::from(String::from("succeeded")), JobState::Completed);
        assert_eq!(JobState::from(String::from("RUNNING")), JobState::Running);
        assert_eq!(JobState::from(String::from("warp-speed")), JobState::Unknown);
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Terminated.is_terminal());
        assert!(!JobState::Queued.is_terminal());
        assert!(!JobState::Canceling.is_terminal());
    }

    #[test]
    fn test_is_uuid() {
        assert!(is_uuid("550e8400-e29b-41d4-a716-446655440000"));
        assert!(!is_uuid("my-job-name"));
        assert!(!is_uuid(""));
    }

    #[test]
    fn test_match_hostname_prefix_and_none() {
        let jobs: Vec<Job> = serde_json::from_value(json!([
            {"job_id": "a", "hostname": "gpu-1234.hypercli.com"},
            {"job_id": "b"}
        ]))
        .unwrap();

        assert_eq!(match_hostname(&jobs, "gpu-1234").unwrap().job_id, "a");
        assert_eq!(
            match_hostname(&jobs, "gpu-1234.hypercli.com").unwrap().job_id,
            "a"
        );
        assert!(match_hostname(&jobs, "gpu-9999").is_none());
    }

    #[test]
    fn test_create_request_encodes_command() {
        let request = CreateJobRequest::new("nvidia/cuda:12.0").with_command("echo hello");
        assert_eq!(request.command, BASE64.encode("echo hello"));

        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(wire["docker_image"], "nvidia/cuda:12.0");
        assert_eq!(wire["gpu_type"], "l40s");
        assert!(wire.get("runtime").is_none());
    }

    #[test]
    fn test_metrics_wire_field_names() {
        let metrics: JobMetrics = serde_json::from_value(json!({
            "gpus": [{
                "index": 0,
                "name": "L40S",
                "utilization_gpu_percent": 87.5,
                "memory_used_mb": 30000.0,
                "memory_total_mb": 46068.0,
                "temperature_c": 61.0,
                "power_draw_w": 212.0
            }],
            "system": {"cpu_percent": 40.0, "cpu_cores": 16}
        }))
        .unwrap();

        assert_eq!(metrics.gpus.len(), 1);
        assert!((metrics.gpus[0].utilization - 87.5).abs() < f64::EPSILON);
        assert_eq!(metrics.system.unwrap().cpu_cores, 16);
    }

    #[tokio::test]
    async fn test_create_echoes_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/jobs"))
            .and(body_partial_json(json!({"gpu_type": "l4", "gpu_count": 1})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "job_id": "550e8400-e29b-41d4-a716-446655440000",
                "state": "queued",
                "gpu_type": "l4",
                "gpu_count": 1
            })))
            .mount(&server)
            .await;

        let transport = transport(&server);
        let jobs = Jobs::new(&transport);
        let request = CreateJobRequest::new("x").with_gpu_type("l4").with_runtime(60);
        let job = jobs.create(&request).await.unwrap();

        assert_eq!(job.state, JobState::Queued);
        assert_eq!(job.gpu_type, "l4");
        assert_eq!(job.gpu_count, 1);
    }

    #[tokio::test]
    async fn test_list_state_filter_and_wrapped_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/jobs"))
            .and(query_param("state", "running"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jobs": [{"job_id": "j1", "state": "running"}],
                "total_count": 1
            })))
            .mount(&server)
            .await;

        let transport = transport(&server);
        let jobs = Jobs::new(&transport);
        let listed = jobs.list(Some(JobState::Running)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].job_id, "j1");
    }

    #[tokio::test]
    async fn test_find_by_id_absent_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/jobs/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "no such job"})))
            .mount(&server)
            .await;

        let transport = transport(&server);
        let jobs = Jobs::new(&transport);
        assert!(jobs.find_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_metrics_unavailable_for_queued_job() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/jobs/j1/metrics"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "detail": "metrics only available for running jobs"
            })))
            .mount(&server)
            .await;

        let transport = transport(&server);
        let jobs = Jobs::new(&transport);
        let err = jobs.metrics("j1").await.unwrap_err();
        match err {
            HyperError::MetricsUnavailable { job_id, detail } => {
                assert_eq!(job_id, "j1");
                assert!(detail.contains("running"));
            }
            other => panic!("expected MetricsUnavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_logs_returns_buffer_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/jobs/j1/logs"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"logs": "line one\nline two"})),
            )
            .mount(&server)
            .await;

        let transport = transport(&server);
        let jobs = Jobs::new(&transport);
        assert_eq!(jobs.logs("j1").await.unwrap(), "line one\nline two");
    }
}
