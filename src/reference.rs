//! Legacy tool and option references.
//!
//! A reference stands in for a tool or option the configuration does not
//! own. It may carry a local command or value; every other query is
//! forwarded to its target. Targets are tagged handles, so "is this a
//! reference" is a pattern match and the transitive walk is a plain loop.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ModelError, Result};
use crate::model::{BuildModel, ConfigId, OptionId, OptionRefId, ToolChainId, ToolId, ToolParent, ToolRefId};
use crate::value::TypedValue;

/// A tool, either real or reached through a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolHandle {
    Direct(ToolId),
    Override(ToolRefId),
}

/// An option, either real or reached through a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionHandle {
    Direct(OptionId),
    Override(OptionRefId),
}

impl From<ToolId> for ToolHandle {
    fn from(t: ToolId) -> Self {
        ToolHandle::Direct(t)
    }
}

impl From<OptionId> for OptionHandle {
    fn from(o: OptionId) -> Self {
        OptionHandle::Direct(o)
    }
}

/// Configuration-owned proxy for a tool.
#[derive(Debug, Clone)]
pub struct ToolReference {
    pub owner: ConfigId,
    /// `None` until the stored target id is resolved.
    pub target: Option<ToolHandle>,
    pub(crate) target_ref: Option<String>,
    pub command: Option<String>,
    pub options: Vec<OptionRefId>,
}

/// Tool-reference-owned proxy for an option.
#[derive(Debug, Clone)]
pub struct OptionReference {
    pub owner: ToolRefId,
    pub target: Option<OptionHandle>,
    pub(crate) target_ref: Option<String>,
    pub value: Option<TypedValue>,
    pub(crate) raw_value: Option<String>,
}

impl BuildModel {
    pub fn create_tool_reference(&mut self, owner: ConfigId, target: ToolHandle) -> ToolRefId {
        let key = self.insert_tool_reference(ToolReference {
            owner,
            target: Some(target),
            target_ref: None,
            command: None,
            options: Vec::new(),
        });
        self.mark_changed(owner.into());
        key
    }

    pub fn create_option_reference(
        &mut self,
        owner: ToolRefId,
        target: OptionHandle,
        value: Option<TypedValue>,
    ) -> OptionRefId {
        let key = self.insert_option_reference(OptionReference {
            owner,
            target: Some(target),
            target_ref: None,
            value,
            raw_value: None,
        });
        let cfg = self.tool_reference(owner).owner;
        self.mark_changed(cfg.into());
        key
    }

    /// Tool a handle finally designates.
    pub fn real_tool_of(&self, handle: ToolHandle) -> Option<ToolId> {
        let mut current = handle;
        for _ in 0..=self.tool_refs.len() {
            match current {
                ToolHandle::Direct(t) => return Some(t),
                ToolHandle::Override(r) => current = self.tool_reference(r).target?,
            }
        }
        None
    }

    /// Option a handle finally designates.
    pub fn real_option_of(&self, handle: OptionHandle) -> Option<OptionId> {
        let mut current = handle;
        for _ in 0..=self.option_refs.len() {
            match current {
                OptionHandle::Direct(o) => return Some(o),
                OptionHandle::Override(r) => current = self.option_reference(r).target?,
            }
        }
        None
    }

    /// Whether `handle` designates `target` directly or through any number
    /// of references.
    pub fn references(&self, handle: ToolHandle, target: ToolId) -> bool {
        self.real_tool_of(handle) == Some(target)
    }

    /// Command through a handle: the first local command on the reference
    /// chain, else the real tool's.
    pub fn handle_tool_command(&self, handle: ToolHandle) -> Option<&str> {
        let mut current = handle;
        for _ in 0..=self.tool_refs.len() {
            match current {
                ToolHandle::Direct(t) => return self.tool_command(t),
                ToolHandle::Override(r) => {
                    let reference = self.tool_reference(r);
                    if let Some(cmd) = reference.command.as_deref() {
                        return Some(cmd);
                    }
                    current = reference.target?;
                }
            }
        }
        None
    }

    /// Value through a handle: the first local value on the reference chain,
    /// else the real option's effective value.
    pub fn handle_option_value(&self, handle: OptionHandle) -> Option<TypedValue> {
        let mut current = handle;
        for _ in 0..=self.option_refs.len() {
            match current {
                OptionHandle::Direct(o) => return self.option_value(o),
                OptionHandle::Override(r) => {
                    let reference = self.option_reference(r);
                    if let Some(v) = &reference.value {
                        return Some(v.clone());
                    }
                    current = reference.target?;
                }
            }
        }
        None
    }

    pub fn reference_options(&self, reference: ToolRefId) -> &[OptionRefId] {
        &self.tool_reference(reference).options
    }

    /// Point an option reference at `target` and drop its local value.
    pub(crate) fn retarget_option_reference(&mut self, reference: OptionRefId, target: OptionId) {
        let r = self.option_reference_mut(reference);
        r.target = Some(OptionHandle::Direct(target));
        r.value = None;
        r.raw_value = None;
    }

    /// Replace a tool reference by a real project tool under `tool_chain`.
    ///
    /// Each option reference becomes a project option flagged as created from
    /// a reference, overriding the referenced option. The reference is
    /// detached from its configuration.
    pub fn materialize_tool_reference(&mut self, reference: ToolRefId, tool_chain: ToolChainId) -> Result<ToolId> {
        let target = self
            .tool_reference(reference)
            .target
            .and_then(|h| self.real_tool_of(h))
            .ok_or_else(|| {
                ModelError::UnknownId(
                    self.tool_reference(reference)
                        .target_ref
                        .clone()
                        .unwrap_or_else(|| format!("{}", reference)),
                )
            })?;
        if self.tool_chain(tool_chain).meta.is_extension {
            return Err(ModelError::ImmutableExtension(self.tool_chain(tool_chain).meta.id.clone()));
        }

        let command = self.tool_reference(reference).command.clone();
        let tool = self.create_project_tool(ToolParent::ToolChain(tool_chain), target);
        if command.is_some() {
            self.tool_mut(tool).command = command;
        }

        for option_ref in self.tool_reference(reference).options.clone() {
            let handle = OptionHandle::Override(option_ref);
            let Some(real) = self.real_option_of(handle) else {
                continue;
            };
            let value = self.handle_option_value(handle);
            let option = self.create_project_option(tool.into(), real);
            let o = self.option_mut(option);
            o.value = value;
            o.from_reference = true;
        }

        let owner = self.tool_reference(reference).owner;
        self.configuration_mut(owner)
            .tool_references
            .retain(|r| *r != reference);
        self.mark_changed(owner.into());
        debug!(tool = %self.tool(tool).meta.id, "materialized tool reference");
        Ok(tool)
    }
}
