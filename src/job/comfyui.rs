//! ComfyUI job specialization and node-graph utilities.
//!
//! The graph helpers operate on API-format workflows: a JSON object keyed
//! by node id, each node carrying `class_type`, `inputs`, and an optional
//! `_meta.title`. [`graph_to_api`] converts the UI's graph export into that
//! format using the server's object-info catalog (or a built-in subset for
//! offline conversion).

use serde_json::{Map, Value, json};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::api::guess_content_type;
use crate::client::HyperClient;
use crate::config::COMFYUI_IMAGE;
use crate::error::{HyperError, Result};

use super::{BaseJob, JobHandleOptions, ServiceProfile};

/// Port ComfyUI listens on when not load-balanced.
pub const COMFYUI_PORT: u16 = 8188;

/// Text-encoder node types checked for prompt patching, in priority order.
const CLIP_TYPES: &[&str] = &[
    "CLIPTextEncode",
    "CLIPTextEncodeFlux",
    "CLIPTextEncodeSD3",
    "TextEncodeQwenImageEditPlus",
];

/// Latent-generator node types checked for dimension patching.
const LATENT_TYPES: &[&str] = &[
    "EmptySD3LatentImage",
    "EmptyFlux2LatentImage",
    "EmptyLatentImage",
    "EmptyHunyuanLatentVideo",
    "EmptyMochiLatentVideo",
    "EmptyLTXVLatentVideo",
    "WanImageToVideo",
    "WanStartEndFrames",
    "WanHuMoImageToVideo",
];

/// Sampler node types checked for steps/cfg patching.
const SAMPLER_TYPES: &[&str] = &[
    "KSampler",
    "KSamplerAdvanced",
    "SamplerCustom",
    "SamplerCustomAdvanced",
];

/// Save node types checked for filename-prefix patching.
const SAVE_TYPES: &[&str] = &["SaveImage", "SaveVideo", "SaveAnimatedWEBP", "SaveAnimatedPNG"];

/// Returns the ids of nodes matching a class type and optional title
/// substring (case-insensitive).
#[must_use]
pub fn find_nodes(workflow: &Value, class_type: &str, title_contains: Option<&str>) -> Vec<String> {
    let Some(nodes) = workflow.as_object() else {
        return Vec::new();
    };

    nodes
        .iter()
        .filter(|(_, node)| {
            if node.get("class_type").and_then(Value::as_str) != Some(class_type) {
                return false;
            }
            title_contains.is_none_or(|needle| {
                node.pointer("/_meta/title")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_lowercase()
                    .contains(&needle.to_lowercase())
            })
        })
        .map(|(id, _)| id.clone())
        .collect()
}

/// Returns the id of the first node matching a class type and optional
/// title substring.
#[must_use]
pub fn find_node(workflow: &Value, class_type: &str, title_contains: Option<&str>) -> Option<String> {
    find_nodes(workflow, class_type, title_contains).into_iter().next()
}

/// Returns the first match across several class types.
fn find_first(workflow: &Value, class_types: &[&str], title_contains: Option<&str>) -> Option<String> {
    class_types
        .iter()
        .find_map(|class_type| find_node(workflow, class_type, title_contains))
}

fn set_input(workflow: &mut Value, node_id: &str, key: &str, value: Value) {
    if let Some(inputs) = workflow
        .get_mut(node_id)
        .and_then(|node| node.get_mut("inputs"))
        .and_then(Value::as_object_mut)
    {
        inputs.insert(key.to_string(), value);
    }
}

/// Parameters applied to a workflow's well-known nodes.
#[derive(Debug, Clone, Default)]
pub struct WorkflowParams {
    /// Positive prompt text.
    pub prompt: Option<String>,
    /// Negative prompt text.
    pub negative: Option<String>,
    /// Output width.
    pub width: Option<u64>,
    /// Output height.
    pub height: Option<u64>,
    /// Video length in frames.
    pub length: Option<u64>,
    /// Sampler seed.
    pub seed: Option<i64>,
    /// Sampler step count.
    pub steps: Option<u64>,
    /// Classifier-free guidance scale.
    pub cfg: Option<f64>,
    /// Output filename prefix.
    pub filename_prefix: Option<String>,
    /// Raw per-node input overrides, keyed by node id.
    pub nodes: Option<Map<String, Value>>,
}

impl WorkflowParams {
    /// Sets the positive prompt.
    #[must_use]
    pub fn with_prompt(mut self, prompt: &str) -> Self {
        self.prompt = Some(prompt.to_string());
        self
    }

    /// Sets the negative prompt.
    #[must_use]
    pub fn with_negative(mut self, negative: &str) -> Self {
        self.negative = Some(negative.to_string());
        self
    }

    /// Sets the output dimensions.
    #[must_use]
    pub const fn with_size(mut self, width: u64, height: u64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Sets the sampler seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the sampler step count.
    #[must_use]
    pub const fn with_steps(mut self, steps: u64) -> Self {
        self.steps = Some(steps);
        self
    }

    /// Sets the output filename prefix.
    #[must_use]
    pub fn with_filename_prefix(mut self, prefix: &str) -> Self {
        self.filename_prefix = Some(prefix.to_string());
        self
    }
}

/// Applies parameters to an API-format workflow in place.
///
/// Each parameter is routed to the first matching well-known node; missing
/// nodes are skipped silently so one parameter set can drive many
/// templates.
pub fn apply_params(workflow: &mut Value, params: &WorkflowParams) {
    if let Some(prompt) = &params.prompt {
        if let Some(id) = find_node(workflow, "TextEncodeQwenImageEditPlus", Some("positive")) {
            set_input(workflow, &id, "prompt", json!(prompt));
        } else if let Some(id) = find_first(workflow, CLIP_TYPES, Some("positive"))
            .or_else(|| find_first(workflow, CLIP_TYPES, None))
        {
            set_input(workflow, &id, "text", json!(prompt));
        }
    }

    if let Some(negative) = &params.negative {
        if let Some(id) = find_node(workflow, "TextEncodeQwenImageEditPlus", Some("negative")) {
            set_input(workflow, &id, "prompt", json!(negative));
        } else if let Some(id) = find_first(workflow, CLIP_TYPES, Some("negative")) {
            set_input(workflow, &id, "text", json!(negative));
        }
    }

    if params.width.is_some() || params.height.is_some() || params.length.is_some() {
        if let Some(id) = find_first(workflow, LATENT_TYPES, None) {
            if let Some(width) = params.width {
                set_input(workflow, &id, "width", json!(width));
            }
            if let Some(height) = params.height {
                set_input(workflow, &id, "height", json!(height));
            }
            if let Some(length) = params.length {
                set_input(workflow, &id, "length", json!(length));
            }
        }
    }

    if let Some(seed) = params.seed {
        if let Some(id) = find_node(workflow, "KSampler", None) {
            set_input(workflow, &id, "seed", json!(seed));
        } else {
            let advanced = find_nodes(workflow, "KSamplerAdvanced", None);
            // Prefer the sampler that injects noise; it owns the seed.
            let target = advanced
                .iter()
                .find(|id| {
                    workflow
                        .pointer(&format!("/{id}/inputs/add_noise"))
                        .and_then(Value::as_str)
                        == Some("enable")
                })
                .or_else(|| advanced.first());
            if let Some(id) = target {
                set_input(workflow, &id.clone(), "noise_seed", json!(seed));
            }
        }
    }

    if let Some(steps) = params.steps {
        if let Some(id) = find_first(workflow, SAMPLER_TYPES, None) {
            set_input(workflow, &id, "steps", json!(steps));
        }
    }

    if let Some(cfg) = params.cfg {
        if let Some(id) = find_first(workflow, SAMPLER_TYPES, None) {
            set_input(workflow, &id, "cfg", json!(cfg));
        }
    }

    if let Some(prefix) = &params.filename_prefix {
        if let Some(id) = find_first(workflow, SAVE_TYPES, None) {
            set_input(workflow, &id, "filename_prefix", json!(prefix));
        }
    }

    if let Some(overrides) = &params.nodes {
        for (node_id, values) in overrides {
            let node_type = workflow
                .pointer(&format!("/{node_id}/class_type"))
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            let Some(values) = values.as_object() else {
                continue;
            };

            for (key, value) in values {
                let routed_key = match (key.as_str(), node_type.as_str()) {
                    ("image", "LoadImage") => "image",
                    ("audio", "LoadAudio") => "audio",
                    ("text", t) if t.contains("Text") => "text",
                    (other, _) => other,
                };
                set_input(workflow, node_id, routed_key, value.clone());
            }
        }
    }
}

/// Returns the built-in object-info subset used for offline workflow
/// conversion when the server catalog is unavailable.
#[must_use]
pub fn default_object_info() -> Value {
    json!({
        "CLIPTextEncode": {
            "input_order": {"required": ["clip", "text"], "optional": []}
        },
        "CLIPLoader": {
            "input_order": {"required": ["clip_name", "type", "device"], "optional": []}
        },
        "KSampler": {
            "input_order": {"required": [
                "model", "positive", "negative", "latent_image",
                "seed", "steps", "cfg", "sampler_name", "scheduler", "denoise"
            ], "optional": []}
        },
        "EmptyLatentImage": {
            "input_order": {"required": ["width", "height", "batch_size"], "optional": []}
        },
        "UNETLoader": {
            "input_order": {"required": ["unet_name", "weight_dtype"], "optional": []}
        },
        "VAELoader": {
            "input_order": {"required": ["vae_name"], "optional": []}
        },
        "CheckpointLoaderSimple": {
            "input_order": {"required": ["ckpt_name"], "optional": []}
        },
        "VAEDecode": {
            "input_order": {"required": ["samples", "vae"], "optional": []}
        },
        "SaveImage": {
            "input_order": {"required": ["images", "filename_prefix"], "optional": []}
        },
        "LoadImage": {
            "input_order": {"required": ["image"], "optional": []}
        },
        "LoadAudio": {
            "input_order": {"required": ["audio"], "optional": []}
        }
    })
}

/// Converts a UI-format graph export into an API-format workflow.
///
/// Note, Reroute, and muted/bypassed nodes are skipped. Connected inputs
/// become `[node_id, slot]` references; remaining widget values are mapped
/// to input names using the object-info input order.
#[must_use]
pub fn graph_to_api(graph: &Value, object_info: Option<&Value>) -> Value {
    let fallback = default_object_info();
    let object_info = object_info.unwrap_or(&fallback);

    // link id -> (source node, source slot)
    let mut links: std::collections::HashMap<i64, (i64, i64)> = std::collections::HashMap::new();
    for link in graph.get("links").and_then(Value::as_array).unwrap_or(&Vec::new()) {
        if let Some(entry) = link.as_array() {
            if let (Some(link_id), Some(from_node), Some(from_slot)) = (
                entry.first().and_then(Value::as_i64),
                entry.get(1).and_then(Value::as_i64),
                entry.get(2).and_then(Value::as_i64),
            ) {
                links.insert(link_id, (from_node, from_slot));
            }
        }
    }

    let mut api = Map::new();

    for node in graph.get("nodes").and_then(Value::as_array).unwrap_or(&Vec::new()) {
        let Some(node_id) = node.get("id").and_then(Value::as_i64) else {
            continue;
        };
        let Some(class_type) = node.get("type").and_then(Value::as_str) else {
            continue;
        };
        if matches!(class_type, "Note" | "Reroute" | "MarkdownNote") {
            continue;
        }
        // Modes 2 and 4 are muted/bypassed in the UI.
        if matches!(node.get("mode").and_then(Value::as_i64), Some(2 | 4)) {
            continue;
        }

        let mut inputs = Map::new();
        let mut connected = std::collections::HashSet::new();

        for input in node.get("inputs").and_then(Value::as_array).unwrap_or(&Vec::new()) {
            let Some(name) = input.get("name").and_then(Value::as_str) else {
                continue;
            };
            if let Some((from_node, from_slot)) = input
                .get("link")
                .and_then(Value::as_i64)
                .and_then(|link_id| links.get(&link_id).copied())
            {
                inputs.insert(name.to_string(), json!([from_node.to_string(), from_slot]));
                connected.insert(name.to_string());
            }
        }

        let info = object_info.get(class_type);
        let mut input_order: Vec<String> = Vec::new();
        for section in ["required", "optional"] {
            if let Some(names) = info
                .and_then(|i| i.pointer(&format!("/input_order/{section}")))
                .and_then(Value::as_array)
            {
                input_order.extend(names.iter().filter_map(Value::as_str).map(str::to_string));
            }
        }

        let widgets = node
            .get("widgets_values")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let mut widget_index = 0;

        for name in input_order {
            if connected.contains(&name) {
                continue;
            }
            if let Some(value) = widgets.get(widget_index) {
                inputs.insert(name, value.clone());
                widget_index += 1;
            }
        }

        let title = node
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or(class_type);

        api.insert(
            node_id.to_string(),
            json!({
                "class_type": class_type,
                "inputs": inputs,
                "_meta": {"title": title},
            }),
        );
    }

    Value::Object(api)
}

/// Enables or disables nodes in a UI-format graph in place.
///
/// Each entry of `nodes_config` may carry an explicit `mode` or an
/// `enabled` flag (false maps to the bypassed mode 4).
pub fn apply_graph_modes(graph: &mut Value, nodes_config: &Value) {
    let Some(config) = nodes_config.as_object() else {
        return;
    };
    let Some(nodes) = graph.get_mut("nodes").and_then(Value::as_array_mut) else {
        return;
    };

    for node in nodes {
        let Some(node_id) = node.get("id").and_then(Value::as_i64) else {
            continue;
        };
        let Some(entry) = config.get(&node_id.to_string()) else {
            continue;
        };

        if let Some(mode) = entry.get("mode").and_then(Value::as_i64) {
            node["mode"] = json!(mode);
        } else if let Some(enabled) = entry.get("enabled").and_then(Value::as_bool) {
            node["mode"] = json!(if enabled { 0 } else { 4 });
        }
    }
}

/// A job handle specialized for the managed ComfyUI image.
#[derive(Debug, Clone)]
pub struct ComfyUiJob {
    /// Underlying handle.
    inner: BaseJob,
    /// Template the job was started with, if any.
    template: Option<String>,
    /// Cached server object-info catalog.
    object_info: Option<Value>,
}

impl ComfyUiJob {
    /// Service conventions of the managed ComfyUI image.
    pub const PROFILE: ServiceProfile = ServiceProfile {
        default_image: COMFYUI_IMAGE,
        default_gpu_type: "l40s",
        service_port: Some(COMFYUI_PORT),
        health_path: "/system_stats",
        health_timeout: Duration::from_secs(5),
    };

    /// Wraps an existing job snapshot.
    #[must_use]
    pub fn attach(client: HyperClient, job: crate::api::Job) -> Self {
        Self {
            inner: BaseJob::attach_with_profile(client, job, Self::PROFILE),
            template: None,
            object_info: None,
        }
    }

    /// Creates a ComfyUI job configured for a workflow template.
    ///
    /// The template name is passed to the image through the
    /// `COMFYUI_TEMPLATES` environment variable.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the request.
    pub async fn create_for_template(
        client: &HyperClient,
        template: &str,
        options: JobHandleOptions,
    ) -> Result<Self> {
        let options = options.with_env("COMFYUI_TEMPLATES", template);
        let inner = BaseJob::create(client, Self::PROFILE, options).await?;

        Ok(Self {
            inner,
            template: Some(template.to_string()),
            object_info: None,
        })
    }

    /// Returns the template this job was started with, if any.
    #[must_use]
    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    /// Returns the server's object-info catalog, fetching it on first use.
    ///
    /// # Errors
    ///
    /// Returns a precondition error before the job has a hostname, or a
    /// transport/API error if the fetch fails.
    pub async fn object_info(&mut self, refresh: bool) -> Result<&Value> {
        if refresh || self.object_info.is_none() {
            let fetched = self.fetch_object_info().await?;
            self.object_info = Some(fetched);
        }
        self.object_info
            .as_ref()
            .ok_or_else(|| HyperError::invalid_response("object info unavailable"))
    }

    async fn fetch_object_info(&self) -> Result<Value> {
        let base_url = self.service_url()?;
        let headers = self.inner.auth_headers()?;

        debug!("Fetching object info from {base_url}");
        let response = self
            .inner
            .client()
            .transport()
            .http()
            .get(format!("{base_url}/object_info"))
            .headers(headers)
            .send()
            .await
            .map_err(|e| HyperError::transport(format!("Object info request failed: {e}")))?;

        crate::transport::handle_response(response).await
    }

    /// Converts a UI-format graph into an API-format workflow using the
    /// server's object-info catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be fetched.
    pub async fn convert_workflow(&mut self, graph: &Value) -> Result<Value> {
        let info = self.object_info(false).await?;
        Ok(graph_to_api(graph, Some(info)))
    }

    /// Uploads a media file to the ComfyUI server, returning the name the
    /// server stored it under.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the upload fails.
    pub async fn upload_image(
        &self,
        path: impl AsRef<Path>,
        filename: Option<&str>,
    ) -> Result<String> {
        let path = path.as_ref();
        let content = tokio::fs::read(path).await?;
        let name = filename.map_or_else(
            || {
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            },
            str::to_string,
        );
        let content_type = guess_content_type(&name);

        self.upload_media(content, &name, content_type).await
    }

    /// Uploads raw media bytes to the ComfyUI server.
    ///
    /// ComfyUI accepts every media kind through its image-upload endpoint.
    ///
    /// # Errors
    ///
    /// Returns a precondition error before the job has a hostname, or a
    /// transport/API error if the upload fails.
    pub async fn upload_media(
        &self,
        content: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Result<String> {
        let base_url = self.service_url()?;
        let headers = self.inner.auth_headers()?;

        let part = reqwest::multipart::Part::bytes(content)
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(|e| HyperError::invalid_response(format!("Invalid content type: {e}")))?;
        let form = reqwest::multipart::Form::new().part("image", part);

        let response = self
            .inner
            .client()
            .transport()
            .http()
            .post(format!("{base_url}/upload/image"))
            .headers(headers)
            .multipart(form)
            .send()
            .await
            .map_err(|e| HyperError::transport(format!("Upload failed: {e}")))?;

        let value: Value = crate::transport::handle_response(response).await?;
        Ok(value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(filename)
            .to_string())
    }

    fn service_url(&self) -> Result<String> {
        self.inner.base_url().ok_or_else(|| {
            HyperError::precondition(
                "Job has no hostname yet. Await wait_until_ready() before using the service.",
            )
        })
    }
}

impl std::ops::Deref for ComfyUiJob {
    type Target = BaseJob;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl std::ops::DerefMut for ComfyUiJob {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}
