// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible

// ============================================================================
// Crate Documentation
// ============================================================================

//! # HyperCLI
//!
//! Async Rust client for the HyperCLI GPU-compute and inference API.
//!
//! ## Overview
//!
//! The crate wraps the HyperCLI REST API behind typed, stateless resource
//! clients and adds the pieces a caller actually needs around them:
//!
//! - Submit and manage GPU **jobs**, with client-side lookup by id,
//!   hostname, or address
//! - **Job handles** with service URL derivation, health checks, and
//!   bounded readiness polling (ComfyUI and Gradio conventions built in)
//! - One-shot and **streaming log** retrieval over WebSocket, fully
//!   cancellable
//! - Billing, user, instance catalog, file upload, API key, render, and
//!   Claw subscription endpoints
//!
//! Configuration (API key, base URLs) resolves once at construction:
//! explicit option > environment variable > `~/.hypercli/config` > default.
//! The client never retries on its own and keeps no cross-call state, so
//! failure handling and caching stay in the caller's hands.
//!
//! ## Modules
//!
//! - [`config`]: settings resolution and the on-disk config file
//! - [`api`]: one stateless namespace per REST resource
//! - [`job`]: job handles and readiness polling
//! - [`logs`]: log fetch and WebSocket streaming
//! - [`error`]: the error taxonomy shared by every operation
//!
//! ## Example
//!
//! ```no_run
//! use hypercli::{CreateJobRequest, HyperClient};
//! use std::time::Duration;
//!
//! # async fn run() -> hypercli::Result<()> {
//! let client = HyperClient::new()?;
//!
//! let job = client
//!     .jobs()
//!     .create(&CreateJobRequest::new("nvidia/cuda:12.0").with_gpu_type("l4").with_runtime(600))
//!     .await?;
//!
//! let mut handle = hypercli::job::BaseJob::attach(client.clone(), job);
//! handle
//!     .wait_until_ready(Duration::from_secs(300), Duration::from_secs(5))
//!     .await?;
//! println!("service at {:?}", handle.base_url());
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod job;
pub mod logs;
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

pub use api::{
    ApiKey, AvailableGpu, Balance, Billing, Claw, ClawKey, ClawModel, ClawPlan, CreateJobRequest,
    File, FileState, FilesApi, GpuMetrics, GpuType, Instances, Job, JobMetrics, JobState, Jobs,
    KeysApi, Render, RenderFilter, RenderStatus, RendersApi, Transaction, User, UserApi, is_uuid,
};
pub use client::{ClientOptions, HyperClient};
pub use config::{DEFAULT_API_URL, Settings, configure};
pub use error::{HyperError, Result};
pub use job::{BaseJob, ComfyUiJob, GradioJob, JobHandleOptions, ServiceProfile, WorkflowParams};
pub use logs::{LogStream, StreamOptions, fetch_logs, stream_logs};
pub use transport::Transport;
