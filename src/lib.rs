//! buildcfg - managed build-configuration model
//!
//! Tools, tool chains and options are defined once as shared extension
//! entities and specialized per project through superclass chains. This
//! crate merges those chains into effective option sets, places overrides
//! on the right level, computes and applies tool-set modifications,
//! tracks dirty and rebuild state, and loads and stores the whole graph
//! through the element tree of `buildcfg-storage`.

pub mod config;
pub mod error;
pub mod holder;
pub mod ids;
pub mod model;
pub mod modify;
pub mod overrides;
pub mod query;
pub mod reference;
pub mod state;
pub mod storage;
pub mod value;

pub use error::{ModelError, ResolveError, Result};
pub use holder::Lineage;
pub use ids::{CounterIdGenerator, HashIdGenerator, IdGenerator, RandomIdGenerator};
pub use model::{
    BuildModel, CategoryId, ConfigId, EntityKey, HolderKey, OptionId, OptionRefId, ResourceId, ToolChainId,
    ToolId, ToolParent, ToolRefId,
};
pub use modify::{AppliedModification, ConverterRule, TargetToolChange, ToolSetModification};
pub use overrides::{OverrideMode, WriteOutcome};
pub use query::CommandLine;
pub use reference::{OptionHandle, ToolHandle};
pub use state::ChangeStamp;
pub use storage::LoadSummary;
pub use value::{TypedValue, ValueKind};
