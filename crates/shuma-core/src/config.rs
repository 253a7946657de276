//! Extraction configuration
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/shuma/config/extraction.toml)
//! 2. Fall back to embedded defaults (compiled into binary)

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::{DocType, ExtractionKind};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/extraction.toml");

/// Settings for a single extraction kind
#[derive(Debug, Clone)]
pub struct KindConfig {
    /// Model override; `None` uses the backend's configured model
    pub model: Option<String>,
    pub timeout: Duration,
}

/// Extraction configuration
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Issue and merge order; later entries win on flat-key collisions
    pub merge_order: Vec<DocType>,
    pub default_timeout: Duration,
    pub max_tokens: u32,
    pub kinds: HashMap<ExtractionKind, KindConfig>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            merge_order: DocType::all().to_vec(),
            default_timeout: Duration::from_secs(120),
            max_tokens: 8192,
            kinds: HashMap::new(),
        }
    }
}

impl ExtractionConfig {
    /// Load from the default override location, else the embedded default
    pub fn load() -> Result<Self> {
        load_config(None)
    }

    /// Load from a specific path (falls back to the embedded default if missing)
    pub fn with_config_path(path: PathBuf) -> Result<Self> {
        load_config(Some(&path))
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        parse_config(content)
    }

    pub fn model_for(&self, kind: ExtractionKind) -> Option<&str> {
        self.kinds.get(&kind).and_then(|k| k.model.as_deref())
    }

    pub fn timeout_for(&self, kind: ExtractionKind) -> Duration {
        self.kinds
            .get(&kind)
            .map(|k| k.timeout)
            .unwrap_or(self.default_timeout)
    }

    /// Order a work set by the configured merge order
    ///
    /// Types missing from the configured order go last, in their natural order.
    pub fn ordered(&self, work: &BTreeSet<DocType>) -> Vec<DocType> {
        let mut ordered: Vec<DocType> = self
            .merge_order
            .iter()
            .filter(|t| work.contains(*t))
            .copied()
            .collect();
        for doc_type in work {
            if !ordered.contains(doc_type) {
                ordered.push(*doc_type);
            }
        }
        ordered
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("shuma").join("config").join("extraction.toml"))
}

/// Load configuration (override first, then default)
fn load_config(override_path: Option<&PathBuf>) -> Result<ExtractionConfig> {
    let path = override_path.cloned().or_else(default_config_path);
    let content = match path {
        Some(path) if path.exists() => fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?,
        _ => DEFAULT_CONFIG.to_string(),
    };
    parse_config(&content)
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    merge: Option<RawMerge>,
    defaults: Option<RawDefaults>,
    models: Option<HashMap<String, RawKindConfig>>,
}

#[derive(Debug, Deserialize)]
struct RawMerge {
    order: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawDefaults {
    timeout_secs: Option<u64>,
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawKindConfig {
    model: Option<String>,
    timeout_secs: Option<u64>,
}

fn parse_config(content: &str) -> Result<ExtractionConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid extraction config TOML: {}", e)))?;

    let mut config = ExtractionConfig::default();

    if let Some(order) = raw.merge.and_then(|m| m.order) {
        let mut merge_order = Vec::with_capacity(order.len());
        for name in order {
            let doc_type: DocType = name.parse().map_err(Error::Config)?;
            if merge_order.contains(&doc_type) {
                return Err(Error::Config(format!(
                    "Document type {} listed twice in merge order",
                    doc_type
                )));
            }
            merge_order.push(doc_type);
        }
        config.merge_order = merge_order;
    }

    if let Some(defaults) = raw.defaults {
        if let Some(timeout) = defaults.timeout_secs {
            config.default_timeout = Duration::from_secs(timeout);
        }
        if let Some(max_tokens) = defaults.max_tokens {
            config.max_tokens = max_tokens;
        }
    }

    if let Some(models) = raw.models {
        for (kind_name, kind_config) in models {
            let kind: ExtractionKind = match kind_name.parse() {
                Ok(kind) => kind,
                Err(_) => continue, // Skip unknown kinds
            };
            config.kinds.insert(
                kind,
                KindConfig {
                    model: kind_config.model,
                    timeout: kind_config
                        .timeout_secs
                        .map(Duration::from_secs)
                        .unwrap_or(config.default_timeout),
                },
            );
        }
    }

    Ok(config)
}
