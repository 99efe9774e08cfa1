//! Built-in settings (layer 1)

use serde::{Deserialize, Serialize};

/// Built-in default settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Token source for adjusted extension ids (default: "counter")
    pub ids_strategy: String,

    /// Salt mixed into hashed tokens (default: "")
    pub ids_salt: String,

    /// Log filter for the CLI (default: "warn")
    pub log_level: String,

    /// Natures given to configurations created from scratch (default: ["c"])
    pub project_natures: Vec<String>,

    /// Whether new configurations use the managed build (default: true)
    pub build_managed: bool,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            ids_strategy: "counter".to_string(),
            ids_salt: String::new(),
            log_level: "warn".to_string(),
            project_natures: vec!["c".to_string()],
            build_managed: true,
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "ids": {
                "strategy": self.ids_strategy,
                "salt": self.ids_salt
            },
            "log": {
                "level": self.log_level
            },
            "project": {
                "natures": self.project_natures
            },
            "build": {
                "managed": self.build_managed
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let defaults = BuiltinDefaults::default();
        assert_eq!(defaults.ids_strategy, "counter");
        assert_eq!(defaults.log_level, "warn");
        assert_eq!(defaults.project_natures, vec!["c"]);
        assert!(defaults.build_managed);
    }

    #[test]
    fn test_to_value() {
        let value = BuiltinDefaults::default().to_value();
        assert_eq!(value["ids"]["strategy"], "counter");
        assert_eq!(value["project"]["natures"][0], "c");
        assert_eq!(value["build"]["managed"], true);
    }
}
