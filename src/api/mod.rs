//! Resource clients for the HyperCLI REST API.
//!
//! Each namespace is a stateless mapper bound to the shared transport: one
//! HTTP call per method, pure serde mapping of the wire JSON, no retries,
//! no caching. Transport and API errors propagate unchanged to the caller.

mod billing;
mod claw;
mod files;
mod instances;
mod jobs;
mod keys;
mod renders;
mod user;

pub use billing::{Balance, Billing, Transaction};
pub use claw::{
    CLAW_API_BASE, CLAW_DEV_API_BASE, Claw, ClawKey, ClawModel, ClawPlan, DiscoveryHealth,
};
pub use files::{File, FileState, FilesApi, guess_content_type};
pub use instances::{
    AvailableGpu, GpuConfig, GpuPricing, GpuType, Instances, PricingTier, Region,
    parse_pricing_key,
};
pub use jobs::{
    CreateJobRequest, DEFAULT_GPU_TYPE, GpuMetrics, Job, JobMetrics, JobState, Jobs, RegistryAuth,
    SystemMetrics, is_uuid, match_hostname,
};
pub use keys::{ApiKey, KeysApi};
pub use renders::{Render, RenderFilter, RenderStatus, RendersApi};
pub use user::{User, UserApi};
