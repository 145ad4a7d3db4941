//! Instances API: GPU types, regions, pricing, and capacity.
//!
//! These are read-only catalog endpoints. Every method performs a fresh
//! HTTP call; the client keeps no cross-call state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;
use crate::transport::Transport;

/// One hardware configuration of a GPU type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuConfig {
    /// Number of GPUs in this configuration.
    #[serde(default = "default_one")]
    pub gpu_count: u32,
    /// CPU cores included.
    #[serde(default)]
    pub cpu_cores: u32,
    /// Memory in GB.
    #[serde(default)]
    pub memory_gb: u32,
    /// Storage in GB.
    #[serde(default)]
    pub storage_gb: u32,
    /// Regions offering this configuration.
    #[serde(default)]
    pub regions: Vec<String>,
}

const fn default_one() -> u32 {
    1
}

/// Wire shape of a GPU type entry (keyed by id in the response map).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct GpuTypeWire {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    configs: Vec<GpuConfig>,
}

/// A GPU type and its available configurations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuType {
    /// GPU type identifier (e.g. `h100`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Marketing description.
    pub description: String,
    /// Available hardware configurations.
    pub configs: Vec<GpuConfig>,
}

impl GpuType {
    fn from_wire(id: String, wire: GpuTypeWire) -> Self {
        let name = if wire.name.is_empty() {
            id.clone()
        } else {
            wire.name
        };
        Self {
            id,
            name,
            description: wire.description,
            configs: wire.configs,
        }
    }

    /// Returns the regions offering this type at the given GPU count.
    #[must_use]
    pub fn available_regions(&self, gpu_count: u32) -> &[String] {
        self.configs
            .iter()
            .find(|config| config.gpu_count == gpu_count)
            .map_or(&[], |config| config.regions.as_slice())
    }

    /// Returns the GPU counts that are offered in at least one region.
    #[must_use]
    pub fn available_counts(&self) -> Vec<u32> {
        self.configs
            .iter()
            .filter(|config| !config.regions.is_empty())
            .map(|config| config.gpu_count)
            .collect()
    }
}

/// Wire shape of a region entry (keyed by id in the response map).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct RegionWire {
    #[serde(default)]
    description: String,
    #[serde(default)]
    country: String,
}

/// A scheduling region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    /// Region identifier.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Country code.
    pub country: String,
}

/// Per-region price points for one GPU configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingTier {
    /// Region identifier.
    pub region: String,
    /// On-demand hourly price, if offered.
    pub on_demand: Option<f64>,
    /// Interruptible hourly price, if offered.
    pub interruptible: Option<f64>,
}

/// Wire shape of one pricing tier. The backend spells the interruptible
/// field `interruptable`.
#[derive(Debug, Clone, Deserialize, Default)]
struct PricingTierWire {
    #[serde(default, rename = "on-demand")]
    on_demand: Option<f64>,
    #[serde(default, rename = "interruptable")]
    interruptible: Option<f64>,
}

/// Pricing for one GPU type and count across regions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuPricing {
    /// GPU type identifier.
    pub gpu_type: String,
    /// Number of GPUs the key refers to.
    pub gpu_count: u32,
    /// Per-region price points.
    pub tiers: Vec<PricingTier>,
}

/// Parses a pricing key like `h100_x8` into (`gpu_type`, `gpu_count`).
#[must_use]
pub fn parse_pricing_key(key: &str) -> (String, u32) {
    key.rsplit_once("_x").map_or_else(
        || (key.to_string(), 1),
        |(gpu_type, count)| (gpu_type.to_string(), count.parse().unwrap_or(1)),
    )
}

/// One row of the available-GPU join: a configuration in a region with its
/// prices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableGpu {
    /// GPU type identifier.
    pub gpu_type: String,
    /// Human-readable GPU name.
    pub gpu_name: String,
    /// Number of GPUs.
    pub gpu_count: u32,
    /// CPU cores included.
    pub cpu_cores: u32,
    /// Memory in GB.
    pub memory_gb: u32,
    /// Storage in GB.
    pub storage_gb: u32,
    /// Region identifier.
    pub region: String,
    /// Region description.
    pub region_name: String,
    /// Country code.
    pub country: String,
    /// Interruptible hourly price, if offered.
    pub price_spot: Option<f64>,
    /// On-demand hourly price, if offered.
    pub price_on_demand: Option<f64>,
}

/// Instances API namespace.
#[derive(Debug, Clone, Copy)]
pub struct Instances<'a> {
    http: &'a Transport,
}

impl<'a> Instances<'a> {
    pub(crate) const fn new(http: &'a Transport) -> Self {
        Self { http }
    }

    /// Returns the available GPU types, keyed by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn types(&self) -> Result<HashMap<String, GpuType>> {
        let wire: HashMap<String, GpuTypeWire> = self.http.get("/instances/types", &[]).await?;
        Ok(wire
            .into_iter()
            .map(|(id, entry)| (id.clone(), GpuType::from_wire(id, entry)))
            .collect())
    }

    /// Returns the available regions, keyed by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn regions(&self) -> Result<HashMap<String, Region>> {
        let wire: HashMap<String, RegionWire> = self.http.get("/instances/regions", &[]).await?;
        Ok(wire
            .into_iter()
            .map(|(id, entry)| {
                let description = if entry.description.is_empty() {
                    id.clone()
                } else {
                    entry.description
                };
                (
                    id.clone(),
                    Region {
                        id,
                        description,
                        country: entry.country,
                    },
                )
            })
            .collect())
    }

    /// Returns pricing for every GPU configuration, keyed by the backend's
    /// `<type>_x<count>` convention.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn pricing(&self) -> Result<HashMap<String, GpuPricing>> {
        let wire: HashMap<String, HashMap<String, PricingTierWire>> =
            self.http.get("/instances/pricing", &[]).await?;

        Ok(wire
            .into_iter()
            .map(|(key, regions)| {
                let (gpu_type, gpu_count) = parse_pricing_key(&key);
                let tiers = regions
                    .into_iter()
                    .map(|(region, tier)| PricingTier {
                        region,
                        on_demand: tier.on_demand,
                        interruptible: tier.interruptible,
                    })
                    .collect();
                (
                    key,
                    GpuPricing {
                        gpu_type,
                        gpu_count,
                        tiers,
                    },
                )
            })
            .collect())
    }

    /// Returns a single GPU type, or `None` if the identifier is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn get_type(&self, gpu_type: &str) -> Result<Option<GpuType>> {
        Ok(self.types().await?.remove(gpu_type))
    }

    /// Returns a single region, or `None` if the identifier is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn get_region(&self, region_id: &str) -> Result<Option<Region>> {
        Ok(self.regions().await?.remove(region_id))
    }

    /// Returns the hourly price for a GPU configuration in a region, or
    /// `None` if it is not offered.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn price_for(
        &self,
        gpu_type: &str,
        gpu_count: u32,
        region: &str,
        interruptible: bool,
    ) -> Result<Option<f64>> {
        let key = format!("{gpu_type}_x{gpu_count}");
        let pricing = self.pricing().await?;

        Ok(pricing.get(&key).and_then(|entry| {
            entry.tiers.iter().find(|tier| tier.region == region).and_then(|tier| {
                if interruptible {
                    tier.interruptible
                } else {
                    tier.on_demand
                }
            })
        }))
    }

    /// Returns real-time GPU capacity, optionally filtered by type.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn capacity(&self, gpu_type: Option<&str>) -> Result<serde_json::Value> {
        let mut query = Vec::new();
        if let Some(gpu_type) = gpu_type {
            query.push(("gpu_type", gpu_type.to_string()));
        }
        self.http.get("/api/jobs/instances/capacity", &query).await
    }

    /// Joins types, regions, and pricing into a flat availability listing,
    /// optionally filtered by GPU type and region.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the three catalog calls fails.
    pub async fn list_available(
        &self,
        gpu_type: Option<&str>,
        region: Option<&str>,
    ) -> Result<Vec<AvailableGpu>> {
        let types = self.types().await?;
        let regions = self.regions().await?;
        let pricing = self.pricing().await?;

        let mut results = Vec::new();

        for (type_id, gpu) in &types {
            if gpu_type.is_some_and(|wanted| wanted != type_id) {
                continue;
            }

            for config in &gpu.configs {
                if config.regions.is_empty() {
                    continue;
                }
                if region.is_some_and(|wanted| !config.regions.iter().any(|r| r == wanted)) {
                    continue;
                }

                let key = format!("{type_id}_x{}", config.gpu_count);
                let gpu_pricing = pricing.get(&key);

                for region_id in &config.regions {
                    if region.is_some_and(|wanted| wanted != region_id) {
                        continue;
                    }

                    let tier = gpu_pricing
                        .and_then(|p| p.tiers.iter().find(|t| &t.region == region_id));
                    let region_info = regions.get(region_id);

                    results.push(AvailableGpu {
                        gpu_type: type_id.clone(),
                        gpu_name: gpu.name.clone(),
                        gpu_count: config.gpu_count,
                        cpu_cores: config.cpu_cores,
                        memory_gb: config.memory_gb,
                        storage_gb: config.storage_gb,
                        region: region_id.clone(),
                        region_name: region_info
                            .map_or_else(|| region_id.clone(), |r| r.description.clone()),
                        country: region_info.map_or_else(String::new, |r| r.country.clone()),
                        price_spot: tier.and_then(|t| t.interruptible),
                        price_on_demand: tier.and_then(|t| t.on_demand),
                    });
                }
            }
        }

        Ok(results)
    }
}
