//! Tool settings
//!
//! Four layers, later ones winning:
//! 1. Built-in defaults
//! 2. User settings (~/.config/buildcfg/config.toml)
//! 3. Project settings (.buildcfg.toml)
//! 4. CLI flags

mod defaults;
mod effective;
mod merge;

pub use defaults::BuiltinDefaults;
pub use effective::{ConfigError, ConfigOrigin, ConfigSource, EffectiveSettings, IdStrategy, PROJECT_FILE};
pub use merge::{deep_merge, merge_layers};
