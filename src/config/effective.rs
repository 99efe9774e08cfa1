//! Effective settings with provenance
//!
//! Records the merged settings together with every file that contributed
//! to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;
use crate::ids::{CounterIdGenerator, HashIdGenerator, IdGenerator, RandomIdGenerator};
use crate::model::{Nature, ProjectNatures};

/// Schema version for effective settings
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "buildcfg/effective_settings@1";

/// Project-level settings file name.
pub const PROJECT_FILE: &str = ".buildcfg.toml";

const ID_STRATEGIES: &[&str] = &["counter", "hash", "random"];
const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Origin of a settings source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    User,
    Project,
    Cli,
}

/// A contributing settings source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Merged settings plus the sources they came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveSettings {
    pub schema_version: u32,
    pub schema_id: String,

    /// When these settings were computed
    pub created_at: DateTime<Utc>,

    /// The merged settings object
    pub settings: Value,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,
}

/// Token source selected by `ids.strategy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdStrategy {
    Counter,
    Hash,
    Random,
}

impl EffectiveSettings {
    /// Default location of the user settings file.
    pub fn user_path() -> Option<PathBuf> {
        std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config/buildcfg/config.toml"))
    }

    /// Merge built-in defaults, the user file, the project file and CLI
    /// overrides. Missing files are skipped.
    pub fn build(
        user_path: Option<&Path>,
        project_path: Option<&Path>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut layers = vec![BuiltinDefaults::default().to_value()];
        let mut sources = vec![ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        }];

        for (origin, path) in [(ConfigOrigin::User, user_path), (ConfigOrigin::Project, project_path)] {
            let Some(path) = path.filter(|p| p.exists()) else {
                continue;
            };
            let (value, digest) = load_toml_file(path)?;
            debug!(path = %path.display(), origin = ?origin, "loaded settings file");
            layers.push(value);
            sources.push(ConfigSource {
                origin,
                path: Some(path.to_string_lossy().to_string()),
                digest: Some(digest),
            });
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let merged = merge_layers(layers);
        validate_settings(&merged)?;

        Ok(Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            settings: merged,
            sources,
        })
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Get a value by dot-separated path
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.settings;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|v| v.as_str())
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(|v| v.as_bool())
    }

    pub fn log_level(&self) -> &str {
        self.get_str("log.level").unwrap_or("warn")
    }

    pub fn managed_build(&self) -> bool {
        self.get_bool("build.managed").unwrap_or(true)
    }

    pub fn id_strategy(&self) -> IdStrategy {
        match self.get_str("ids.strategy") {
            Some("hash") => IdStrategy::Hash,
            Some("random") => IdStrategy::Random,
            _ => IdStrategy::Counter,
        }
    }

    /// Token source for the model, built from `ids.strategy` and `ids.salt`.
    pub fn id_generator(&self) -> Box<dyn IdGenerator> {
        match self.id_strategy() {
            IdStrategy::Counter => Box::new(CounterIdGenerator::default()),
            IdStrategy::Hash => Box::new(HashIdGenerator::new(self.get_str("ids.salt").unwrap_or_default())),
            IdStrategy::Random => Box::new(RandomIdGenerator::from_entropy()),
        }
    }

    /// Natures for configurations created without a project document.
    pub fn natures(&self) -> ProjectNatures {
        let natures: Vec<Nature> = self
            .get("project.natures")
            .and_then(|v| v.as_array())
            .map(|list| list.iter().filter_map(|n| n.as_str().and_then(Nature::parse)).collect())
            .unwrap_or_default();
        if natures.is_empty() {
            ProjectNatures::default()
        } else {
            ProjectNatures::from_list(&natures)
        }
    }
}

/// Load and parse a TOML file, returning the value and digest
fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
    let bytes = fs::read(path).map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hex::encode(hasher.finalize());

    let contents =
        String::from_utf8(bytes).map_err(|e| ConfigError::ParseError(format!("Invalid UTF-8: {}", e)))?;
    let toml_value: toml::Value =
        toml::from_str(&contents).map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

    Ok((toml_to_json(toml_value), digest))
}

fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(table.into_iter().map(|(k, v)| (k, toml_to_json(v))).collect()),
    }
}

fn validate_settings(settings: &Value) -> Result<(), ConfigError> {
    let strategy = settings.pointer("/ids/strategy").and_then(|v| v.as_str());
    if let Some(strategy) = strategy {
        if !ID_STRATEGIES.contains(&strategy) {
            return Err(ConfigError::ValidationError(format!(
                "ids.strategy must be one of {:?}, got '{}'",
                ID_STRATEGIES, strategy
            )));
        }
    }

    if let Some(level) = settings.pointer("/log/level").and_then(|v| v.as_str()) {
        if !LOG_LEVELS.contains(&level) {
            return Err(ConfigError::ValidationError(format!("log.level '{}' is not a level", level)));
        }
    }

    if let Some(natures) = settings.pointer("/project/natures") {
        let list = natures
            .as_array()
            .ok_or_else(|| ConfigError::ValidationError("project.natures must be a list".to_string()))?;
        for nature in list {
            if nature.as_str().and_then(Nature::parse).is_none() {
                return Err(ConfigError::ValidationError(format!(
                    "project.natures: unknown nature {}",
                    nature
                )));
            }
        }
    }

    if let Some(managed) = settings.pointer("/build/managed") {
        if !managed.is_boolean() {
            return Err(ConfigError::ValidationError("build.managed must be a boolean".to_string()));
        }
    }

    Ok(())
}

/// Settings errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
