//! Choosing the option instance that receives a write.
//!
//! A write never lands on a shared extension option owned by another
//! holder. Project holders get a project-level override whose id derives
//! from the extension ancestor; extension holders get an "adjusted"
//! extension option with a generated id.

use tracing::{debug, error};

use crate::error::{ModelError, ResolveError, Result};
use crate::model::{BuildModel, HolderKey, OptionId, ToolId};
use crate::reference::{OptionHandle, ToolHandle};
use crate::value::TypedValue;

/// Where a new override may live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideMode {
    /// Project-level option with a deterministic id.
    Project,
    /// Shared extension-level option with a generated id.
    AdjustExtension,
}

/// Result of a value write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The value was stored on this option.
    Changed(OptionId),
    /// This option already had the value.
    Unchanged(OptionId),
    /// No option could be chosen; nothing was written.
    Aborted(ResolveError),
}

impl WriteOutcome {
    pub fn target(&self) -> Option<OptionId> {
        match self {
            WriteOutcome::Changed(o) | WriteOutcome::Unchanged(o) => Some(*o),
            WriteOutcome::Aborted(_) => None,
        }
    }
}

impl BuildModel {
    /// Option of `holder`'s merged view standing for `option`.
    ///
    /// Matches the option's own id first, then its direct superclass id.
    fn reachable_option(&self, holder: HolderKey, option: OptionId) -> std::result::Result<OptionId, ResolveError> {
        if self.option(option).holder == holder {
            return Ok(option);
        }
        let merged = self.merged_options(holder);
        let by_id = |id: &str| merged.iter().copied().find(|m| self.option_chain_contains(*m, id));

        let own = &self.option(option).meta.id;
        if let Some(found) = by_id(own) {
            return Ok(found);
        }
        if let Some(sup) = self.option(option).super_class {
            if let Some(found) = by_id(&self.option(sup).meta.id) {
                return Ok(found);
            }
        }
        Err(ResolveError::Unreachable {
            holder: self.meta(holder.into()).id.clone(),
            option: own.clone(),
        })
    }

    /// Decide which option a write to `option` through `holder` must touch,
    /// creating the override when needed.
    ///
    /// The returned option belongs to `holder` and has `option`'s value type.
    pub fn resolve_option_to_set(
        &mut self,
        holder: HolderKey,
        option: OptionId,
        mode: OverrideMode,
    ) -> std::result::Result<OptionId, ResolveError> {
        let option = self.reachable_option(holder, option)?;
        if self.option_value_type(option).is_none() {
            return Err(ResolveError::UntypedOption {
                option: self.option(option).meta.id.clone(),
            });
        }
        let no_anchor = || ResolveError::NoExtensionAncestor {
            option: self.option(option).meta.id.clone(),
        };

        match mode {
            OverrideMode::AdjustExtension => {
                let ext = self
                    .option_chain(option)
                    .find(|o| self.option(*o).meta.is_extension)
                    .ok_or_else(no_anchor)?;
                if self.option(ext).holder == holder {
                    return Ok(ext);
                }
                let anchor = if self.option(ext).from_reference {
                    self.option(ext).super_class.unwrap_or(ext)
                } else {
                    ext
                };
                Ok(self.create_adjusted_option(holder, anchor))
            }
            OverrideMode::Project => {
                let current = self.option(option);
                if current.holder == holder && !current.meta.is_extension {
                    return Ok(option);
                }
                let anchor = self
                    .option_chain(option)
                    .find(|o| {
                        let o = self.option(*o);
                        o.meta.is_extension && !o.adjusted && !o.from_reference
                    })
                    .ok_or_else(no_anchor)?;
                Ok(self.create_project_option(holder, anchor))
            }
        }
    }

    /// Write `value` to `option` as seen from `holder`.
    ///
    /// The value shape must match the option's kind. Project holders write
    /// through a project-level override, extension holders through an
    /// adjusted extension option. Writing through a reference retargets the
    /// reference to the option that received the value.
    pub fn set_option_value(
        &mut self,
        holder: HolderKey,
        option: OptionHandle,
        value: TypedValue,
    ) -> Result<WriteOutcome> {
        let real = self.real_option_of(option).ok_or_else(|| match option {
            OptionHandle::Direct(o) => ModelError::UnknownId(self.option(o).meta.id.clone()),
            OptionHandle::Override(r) => ModelError::UnknownId(
                self.option_reference(r)
                    .target_ref
                    .clone()
                    .unwrap_or_else(|| r.to_string()),
            ),
        })?;
        let option_id = self.option(real).meta.id.clone();
        let kind = match self.option_value_type(real) {
            Some(kind) => kind,
            None => return Ok(self.abort_write(ResolveError::UntypedOption { option: option_id })),
        };
        value.check(&option_id, kind)?;

        let mode = if self.meta(holder.into()).is_extension {
            OverrideMode::AdjustExtension
        } else {
            OverrideMode::Project
        };
        let target = match self.resolve_option_to_set(holder, real, mode) {
            Ok(target) => target,
            Err(e) => return Ok(self.abort_write(e)),
        };

        if let OptionHandle::Override(r) = option {
            self.retarget_option_reference(r, target);
        }

        if self.option(target).value.as_ref() == Some(&value) {
            return Ok(WriteOutcome::Unchanged(target));
        }
        self.option_mut(target).value = Some(value);
        self.mark_changed(target.into());
        debug!(option = %self.option(target).meta.id, holder = %self.meta(holder.into()).id, "option value set");

        if let HolderKey::Tool(t) = holder {
            if let Some(resource) = self.owning_resource(t) {
                self.recompute_applicability(resource);
            }
        } else if let HolderKey::ToolChain(tc) = holder {
            if let Some(resource) = self.tool_chain(tc).folder {
                self.recompute_applicability(resource);
            }
        }
        Ok(WriteOutcome::Changed(target))
    }

    fn abort_write(&mut self, e: ResolveError) -> WriteOutcome {
        error!(error = %e, "option write aborted");
        self.diagnostics.push(e.clone());
        WriteOutcome::Aborted(e)
    }

    pub fn set_option_bool(&mut self, holder: HolderKey, option: OptionHandle, value: bool) -> Result<WriteOutcome> {
        self.set_option_value(holder, option, TypedValue::Bool(value))
    }

    pub fn set_option_string(
        &mut self,
        holder: HolderKey,
        option: OptionHandle,
        value: impl Into<String>,
    ) -> Result<WriteOutcome> {
        self.set_option_value(holder, option, TypedValue::Text(value.into()))
    }

    pub fn set_option_list(
        &mut self,
        holder: HolderKey,
        option: OptionHandle,
        value: Vec<String>,
    ) -> Result<WriteOutcome> {
        self.set_option_value(holder, option, TypedValue::List(value))
    }

    /// Set a tool's command; returns whether anything changed.
    ///
    /// Through a reference the command is stored on the reference.
    pub fn set_tool_command(&mut self, tool: ToolHandle, command: &str) -> Result<bool> {
        match tool {
            ToolHandle::Direct(t) => self.set_direct_tool_command(t, command),
            ToolHandle::Override(r) => {
                if self.handle_tool_command(tool) == Some(command) {
                    return Ok(false);
                }
                self.tool_reference_mut(r).command = Some(command.to_string());
                let owner = self.tool_reference(r).owner;
                self.mark_changed(owner.into());
                Ok(true)
            }
        }
    }

    fn set_direct_tool_command(&mut self, tool: ToolId, command: &str) -> Result<bool> {
        if self.tool(tool).meta.is_extension {
            return Err(ModelError::ImmutableExtension(self.tool(tool).meta.id.clone()));
        }
        if self.tool_command(tool) == Some(command) {
            return Ok(false);
        }
        self.tool_mut(tool).command = Some(command.to_string());
        self.mark_changed(tool.into());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures;
    use crate::value::ValueShape;

    fn setup() -> (BuildModel, fixtures::Gnu, ToolId) {
        let mut model = BuildModel::new();
        let gnu = fixtures::gnu(&mut model);
        let cfg = model.new_configuration("cfg", None, gnu.tool_chain).unwrap();
        let tc = model.resource(model.root_folder(cfg).unwrap()).tool_chain().unwrap();
        let tool = model
            .tool_chain_tools(tc)
            .into_iter()
            .find(|t| model.real_tool(*t) == gnu.compiler)
            .unwrap();
        (model, gnu, tool)
    }

    #[test]
    fn test_project_mode_is_idempotent() {
        let (mut model, gnu, tool) = setup();
        let first = model
            .resolve_option_to_set(tool.into(), gnu.debug, OverrideMode::Project)
            .unwrap();
        let second = model
            .resolve_option_to_set(tool.into(), gnu.debug, OverrideMode::Project)
            .unwrap();
        assert_eq!(first, second);
        assert_ne!(first, gnu.debug);
        assert_eq!(model.option(first).holder, HolderKey::Tool(tool));
        assert_eq!(model.option(first).super_class, Some(gnu.debug));
    }

    #[test]
    fn test_adjust_mode_leaves_foreign_extension_alone() {
        let mut model = BuildModel::new();
        let gnu = fixtures::gnu(&mut model);
        let derived = model.define_tool(None, "gnu.cc.derived_1.0.0", None);
        model.tool_mut(derived).super_class = Some(gnu.compiler);

        let adjusted = model
            .resolve_option_to_set(derived.into(), gnu.debug, OverrideMode::AdjustExtension)
            .unwrap();
        assert_ne!(adjusted, gnu.debug);
        assert!(model.option(adjusted).meta.is_extension);
        assert!(model.option(adjusted).adjusted);
        assert_eq!(model.option(adjusted).meta.id, "gnu.cc.debug.1");
        assert_eq!(model.option(gnu.debug).holder, HolderKey::Tool(gnu.compiler));

        let again = model
            .resolve_option_to_set(derived.into(), gnu.debug, OverrideMode::AdjustExtension)
            .unwrap();
        assert_eq!(again, adjusted);
    }

    #[test]
    fn test_unreachable_option_is_reported() {
        let (mut model, gnu, tool) = setup();
        let err = model
            .resolve_option_to_set(tool.into(), gnu.libs, OverrideMode::Project)
            .unwrap_err();
        assert!(matches!(err, ResolveError::Unreachable { .. }));

        let outcome = model
            .set_option_list(tool.into(), gnu.libs.into(), vec!["m".into()])
            .unwrap();
        assert!(matches!(outcome, WriteOutcome::Aborted(_)));
    }

    #[test]
    fn test_write_rejects_wrong_shape() {
        let (mut model, gnu, tool) = setup();
        let err = model
            .set_option_string(tool.into(), gnu.debug.into(), "yes")
            .unwrap_err();
        match err {
            ModelError::TypeMismatch { expected, found, .. } => {
                assert_eq!(expected, ValueShape::Bool);
                assert_eq!(found, ValueShape::Text);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(model.option_set(tool.into()).options.len(), 0);
    }

    #[test]
    fn test_write_reports_unchanged() {
        let (mut model, gnu, tool) = setup();
        let first = model.set_option_bool(tool.into(), gnu.debug.into(), true).unwrap();
        let second = model.set_option_bool(tool.into(), gnu.debug.into(), true).unwrap();
        assert!(matches!(first, WriteOutcome::Changed(_)));
        assert_eq!(second, WriteOutcome::Unchanged(first.target().unwrap()));
    }

    #[test]
    fn test_write_through_reference_retargets() {
        let (mut model, gnu, tool) = setup();
        let cfg = model.config_of(tool.into()).unwrap();
        let r = model.create_tool_reference(cfg, gnu.compiler.into());
        let o = model.create_option_reference(r, gnu.debug.into(), Some(TypedValue::Bool(false)));

        let outcome = model
            .set_option_bool(tool.into(), OptionHandle::Override(o), true)
            .unwrap();
        let target = outcome.target().unwrap();
        assert_eq!(model.option_reference(o).target, Some(OptionHandle::Direct(target)));
        assert_eq!(model.handle_option_value(OptionHandle::Override(o)), Some(TypedValue::Bool(true)));
    }

    #[test]
    fn test_tool_command() {
        let (mut model, gnu, tool) = setup();
        assert!(model.set_tool_command(tool.into(), "clang").unwrap());
        assert!(!model.set_tool_command(tool.into(), "clang").unwrap());
        assert_eq!(model.tool_command(tool), Some("clang"));
        assert!(matches!(
            model.set_tool_command(gnu.compiler.into(), "cc"),
            Err(ModelError::ImmutableExtension(_))
        ));
    }
}
