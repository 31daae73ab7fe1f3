use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants;
use crate::error::{EtlError, Result};
use crate::pipeline::{default_plans, CleaningStep, SourceSpec, TablePlan};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source_db: SourceDbConfig,
    pub warehouse: WarehouseConfig,
    pub store_api: StoreApiConfig,
    pub object_store: ObjectStoreConfig,
    pub logging: LoggingConfig,
    /// Per-table overrides keyed by plan name.
    pub tables: BTreeMap<String, TableOverride>,
    /// File the config was read from; `None` when running on defaults.
    #[serde(skip)]
    pub loaded_from: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceDbConfig {
    pub path: String,
}

impl Default for SourceDbConfig {
    fn default() -> Self {
        Self {
            path: "data/legacy.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    pub path: String,
    /// Also write the row index as a leading `index` column.
    pub write_index: bool,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            path: "data/warehouse.db".to_string(),
            write_index: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreApiConfig {
    pub count_url: String,
    /// Must contain `{store_number}`.
    pub detail_url: String,
    pub api_key_env: String,
    pub timeout_seconds: u64,
}

impl Default for StoreApiConfig {
    fn default() -> Self {
        Self {
            count_url: constants::STORE_COUNT_URL.to_string(),
            detail_url: constants::STORE_DETAIL_URL.to_string(),
            api_key_env: constants::STORE_API_KEY_ENV.to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObjectStoreConfig {
    /// HTTPS template for `s3://` references, with `{bucket}` and `{key}`.
    pub endpoint_template: String,
    pub timeout_seconds: u64,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            endpoint_template: constants::S3_ENDPOINT_TEMPLATE.to_string(),
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: "logs".to_string(),
        }
    }
}

/// Fields replacing those of a built-in plan. A name with no built-in plan
/// must give all three.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableOverride {
    pub source: Option<SourceSpec>,
    pub destination: Option<String>,
    pub steps: Option<Vec<CleaningStep>>,
}

impl Config {
    /// Load `path`. A missing file yields the defaults; a malformed one is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let mut config = Self::from_toml(&content)?;
        config.loaded_from = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        if !config.store_api.detail_url.contains("{store_number}") {
            return Err(EtlError::Config(
                "store_api.detail_url must contain '{store_number}'".to_string(),
            ));
        }
        Ok(config)
    }

    /// Built-in plans with overrides applied, in run order. Plans only named in
    /// the config run after the built-in ones.
    pub fn plans(&self) -> Result<Vec<TablePlan>> {
        let mut plans = default_plans();
        for (name, table) in &self.tables {
            match plans.iter_mut().find(|p| &p.name == name) {
                Some(plan) => {
                    if let Some(source) = &table.source {
                        plan.source = source.clone();
                    }
                    if let Some(destination) = &table.destination {
                        plan.destination = destination.clone();
                    }
                    if let Some(steps) = &table.steps {
                        plan.steps = steps.clone();
                    }
                }
                None => match (&table.source, &table.destination, &table.steps) {
                    (Some(source), Some(destination), Some(steps)) => plans.push(TablePlan {
                        name: name.clone(),
                        source: source.clone(),
                        destination: destination.clone(),
                        steps: steps.clone(),
                    }),
                    _ => {
                        return Err(EtlError::Config(format!(
                            "table '{}' has no built-in plan; source, destination and steps are all required",
                            name
                        )))
                    }
                },
            }
        }
        Ok(plans)
    }

    /// The configured plans whose names appear in `names`, in the order given.
    pub fn select_plans(&self, names: &[String]) -> Result<Vec<TablePlan>> {
        let plans = self.plans()?;
        names
            .iter()
            .map(|name| {
                plans
                    .iter()
                    .find(|p| &p.name == name)
                    .cloned()
                    .ok_or_else(|| EtlError::Config(format!("Unknown table '{}'", name)))
            })
            .collect()
    }
}
