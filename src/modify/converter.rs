//! Tool converters.
//!
//! A converter rule says that settings of one tool (or tool chain)
//! definition can be migrated to another. Rules name a converter
//! implementation registered under a string id.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::model::{BuildModel, EntityKey, HolderKey, OptionId, ToolChainId, ToolId, ToolParent};
use crate::reference::OptionHandle;

/// Name of the built-in converter copying matching option values.
pub const COPY_SETTINGS: &str = "copySettings";

/// A registered conversion path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterRule {
    pub id: String,
    /// Id anywhere in the source element's superclass chain.
    pub from_id: String,
    /// Id anywhere in the target element's superclass chain.
    pub to_id: String,
    /// Converter implementation name.
    pub converter: String,
}

/// What a converter produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Converted {
    Tool(ToolId),
    Option(OptionId),
    ToolChain(ToolChainId),
    None,
}

impl Converted {
    /// Whether the result has the same kind as `original`.
    pub fn matches_kind(&self, original: EntityKey) -> bool {
        matches!(
            (self, original),
            (Converted::Tool(_), EntityKey::Tool(_))
                | (Converted::Option(_), EntityKey::Option(_))
                | (Converted::ToolChain(_), EntityKey::ToolChain(_))
        )
    }
}

/// Migrates one element's settings onto a new element derived from `to`.
pub trait ToolConverter: Send + Sync {
    fn name(&self) -> &str;

    /// Convert `from` into a new project element under `parent` whose
    /// superclass is `to`.
    fn convert(&self, model: &mut BuildModel, from: EntityKey, to: EntityKey, parent: ToolParent) -> Converted;
}

/// Creates the new tool and copies every project-level option value with a
/// matching counterpart.
#[derive(Debug, Default)]
pub struct CopySettingsConverter;

impl ToolConverter for CopySettingsConverter {
    fn name(&self) -> &str {
        COPY_SETTINGS
    }

    fn convert(&self, model: &mut BuildModel, from: EntityKey, to: EntityKey, parent: ToolParent) -> Converted {
        match (from, to) {
            (EntityKey::Tool(from), EntityKey::Tool(to)) => {
                let tool = model.create_project_tool(parent, to);
                if let Some(cmd) = project_command(model, from) {
                    model.tool_mut(tool).command = Some(cmd);
                }
                let copied = copy_settings(model, from.into(), tool.into(), true);
                debug!(from = %model.tool(from).meta.id, to = %model.tool(tool).meta.id, copied, "converted tool");
                Converted::Tool(tool)
            }
            _ => Converted::None,
        }
    }
}

fn project_command(model: &BuildModel, tool: ToolId) -> Option<String> {
    model
        .tool_lineage(tool)
        .take_while(|t| !model.tool(*t).meta.is_extension)
        .find_map(|t| model.tool(t).command.clone())
}

/// Whether a project-level option on the chain carries a value.
fn has_project_value(model: &BuildModel, option: OptionId) -> bool {
    model
        .option_chain(option)
        .take_while(|o| !model.option(*o).meta.is_extension)
        .any(|o| model.option(o).value.is_some())
}

fn root_option(model: &BuildModel, option: OptionId) -> OptionId {
    model.option_chain(option).last().unwrap_or(option)
}

/// Copy project-level option values of `from` to matching options of `to`.
///
/// Options match on their root option, then on name with the same value
/// shape. Without `overwrite`, options `to` already overrides locally are
/// left alone. Returns the number of values written.
pub fn copy_settings(model: &mut BuildModel, from: HolderKey, to: HolderKey, overwrite: bool) -> usize {
    let targets = model.effective_options(to);
    let mut written = 0;
    for source in model.effective_options(from) {
        if !has_project_value(model, source) {
            continue;
        }
        let root = root_option(model, source);
        let shape = model.option_value_type(source).map(|k| k.shape());
        let name = model.option_name(source).map(str::to_string);
        let target = targets
            .iter()
            .copied()
            .find(|t| root_option(model, *t) == root)
            .or_else(|| {
                targets.iter().copied().find(|t| {
                    name.is_some()
                        && model.option_name(*t).map(str::to_string) == name
                        && model.option_value_type(*t).map(|k| k.shape()) == shape
                })
            });
        let Some(target) = target else {
            continue;
        };
        let owned = model.option(target).holder == to && !model.option(target).meta.is_extension;
        if owned && !overwrite && model.option(target).value.is_some() {
            continue;
        }
        let Some(value) = model.option_value(source) else {
            continue;
        };
        if let Ok(outcome) = model.set_option_value(to, OptionHandle::Direct(target), value) {
            if outcome.target().is_some() {
                written += 1;
            }
        }
    }
    written
}

/// Converter rules plus the implementations they name.
#[derive(Clone)]
pub struct ConverterRegistry {
    rules: Vec<ConverterRule>,
    converters: BTreeMap<String, Arc<dyn ToolConverter>>,
    /// Rules before this index have been checked by the link pass.
    pub(crate) checked: usize,
}

impl std::fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("rules", &self.rules)
            .field("converters", &self.converters.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        let mut registry = Self {
            rules: Vec::new(),
            converters: BTreeMap::new(),
            checked: 0,
        };
        registry.register_converter(Arc::new(CopySettingsConverter));
        registry
    }
}

impl ConverterRegistry {
    pub fn register_rule(&mut self, rule: ConverterRule) {
        self.rules.push(rule);
    }

    pub fn register_converter(&mut self, converter: Arc<dyn ToolConverter>) {
        self.converters.insert(converter.name().to_string(), converter);
    }

    pub fn rules(&self) -> &[ConverterRule] {
        &self.rules
    }

    pub fn converter(&self, name: &str) -> Option<Arc<dyn ToolConverter>> {
        self.converters.get(name).cloned()
    }

    /// Rules whose source appears in `chain_ids`.
    pub fn rules_from<'a>(&'a self, chain_ids: &'a [&'a str]) -> impl Iterator<Item = &'a ConverterRule> + 'a {
        self.rules
            .iter()
            .filter(move |r| chain_ids.contains(&r.from_id.as_str()))
    }

    /// First rule converting something in `from_ids` to something in `to_ids`.
    pub fn find_rule(&self, from_ids: &[&str], to_ids: &[&str]) -> Option<&ConverterRule> {
        self.rules.iter().find(|r| {
            from_ids.contains(&r.from_id.as_str()) && to_ids.contains(&r.to_id.as_str())
        })
    }
}

impl BuildModel {
    /// Ids along a tool's superclass chain.
    pub fn tool_chain_ids(&self, tool: ToolId) -> Vec<&str> {
        self.tool_lineage(tool)
            .map(|t| self.tool(t).meta.id.as_str())
            .collect()
    }

    /// Ids along a tool chain's superclass chain.
    pub fn tool_chain_lineage_ids(&self, tc: ToolChainId) -> Vec<&str> {
        self.tool_chain_lineage(tc)
            .map(|t| self.tool_chain(t).meta.id.as_str())
            .collect()
    }

    /// Converter rule from tool `from` to tool `to`.
    pub fn tool_converter_rule(&self, from: ToolId, to: ToolId) -> Option<&ConverterRule> {
        self.converters
            .find_rule(&self.tool_chain_ids(from), &self.tool_chain_ids(to))
    }

    pub fn has_tool_converters(&self, from: ToolId) -> bool {
        let ids = self.tool_chain_ids(from);
        let found = self.converters.rules_from(&ids).next().is_some();
        found
    }
}
