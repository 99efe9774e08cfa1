//! Queries consumed by build-file generators, and configuration management.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use crate::error::{ModelError, Result};
use crate::model::resource::{normalize_path, parent_paths};
use crate::model::{
    BuildModel, CategoryId, ConfigId, Configuration, EntityKey, EntityMeta, HolderKey, OptionId, ResourceId,
    ResourceInfo, ResourceKind, ToolChainId, ToolId, ToolParent,
};
use crate::modify::copy_settings;
use crate::reference::{OptionHandle, OptionReference, ToolReference};
use crate::value::{TypedValue, ValueKind, ValueShape};

/// Command line for one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandLine {
    pub tool: String,
    pub command: String,
    pub flags: Vec<String>,
    pub input: String,
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command)?;
        for flag in &self.flags {
            write!(f, " {}", flag)?;
        }
        write!(f, " {}", self.input)
    }
}

fn extension_of(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next()?;
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() {
        None
    } else {
        Some(ext)
    }
}

/// `command` followed by `value`, or `value` substituted for `${value}`.
fn join_flag(command: Option<&str>, value: &str) -> String {
    match command {
        Some(cmd) if cmd.contains("${value}") => cmd.replace("${value}", value),
        Some(cmd) => format!("{}{}", cmd, value),
        None => value.to_string(),
    }
}

/// State carried while cloning a configuration.
struct CloneContext {
    copy_ids: bool,
    owner_id: String,
    map: HashMap<EntityKey, EntityKey>,
    created: Vec<EntityKey>,
}

impl BuildModel {
    /// Drop tools that do not apply to `resource`.
    ///
    /// Tools are filtered by nature and enablement. Below the root folder,
    /// tools consuming all inputs of a type at once and the root's target
    /// tools are project-wide and excluded.
    pub fn filter_tools(&self, resource: ResourceId, tools: &[ToolId]) -> Vec<ToolId> {
        let info = self.resource(resource);
        let natures = self.configuration(info.configuration).natures;
        let root_tc = self
            .root_folder(info.configuration)
            .and_then(|r| self.resource(r).tool_chain());
        let nested_folder = info.is_folder() && !info.is_root();

        tools
            .iter()
            .copied()
            .filter(|t| !self.tool(*t).is_abstract)
            .filter(|t| self.tool_nature_filter(*t).accepts(natures))
            .filter(|t| {
                self.tool_enablement(*t)
                    .map(|rule| self.evaluate(rule, HolderKey::Tool(*t)))
                    .unwrap_or(true)
            })
            .filter(|t| {
                if !nested_folder {
                    return true;
                }
                let project_wide = self.tool_input_types(*t).iter().any(|it| it.multiple_of_type);
                let root_target = root_tc.map(|tc| self.is_target_tool(tc, *t)).unwrap_or(false);
                !(project_wide || root_target)
            })
            .collect()
    }

    /// Tools that apply to `resource`.
    pub fn effective_tools(&self, resource: ResourceId) -> Vec<ToolId> {
        self.filter_tools(resource, &self.resource_tools(resource))
    }

    /// Resource configuration governing `path`: the exact entry, else the
    /// nearest ancestor folder. Falls back to the legacy parent configuration.
    pub fn resource_for_path(&self, cfg: ConfigId, path: &str) -> Option<ResourceId> {
        let path = normalize_path(path);
        let lookup = |c: ConfigId| {
            let resources = &self.configuration(c).resources;
            resources.get(&path).copied().or_else(|| {
                parent_paths(&path).find_map(|p| {
                    resources
                        .get(p)
                        .copied()
                        .filter(|r| self.resource(*r).is_folder())
                })
            })
        };
        lookup(cfg).or_else(|| self.configuration(cfg).parent.and_then(lookup))
    }

    pub fn tool_for_input_extension(&self, resource: ResourceId, ext: &str) -> Option<ToolId> {
        self.effective_tools(resource)
            .into_iter()
            .find(|t| self.builds_file_type(*t, ext))
    }

    pub fn tool_for_output_extension(&self, resource: ResourceId, ext: &str) -> Option<ToolId> {
        self.effective_tools(resource)
            .into_iter()
            .find(|t| self.produces_file_type(*t, ext))
    }

    /// Command-line flags from a tool's effective options, in option order.
    pub fn tool_flags(&self, tool: ToolId) -> Vec<String> {
        let mut flags = Vec::new();
        for option in self.effective_options(tool.into()) {
            flags.extend(self.option_flags(option));
        }
        flags.retain(|f| !f.is_empty());
        flags
    }

    fn option_flags(&self, option: OptionId) -> Vec<String> {
        let Some(kind) = self.option_value_type(option) else {
            return Vec::new();
        };
        let Some(value) = self.option_value(option) else {
            return Vec::new();
        };
        let command = self.option_command(option);
        match (kind, &value) {
            (ValueKind::Enumerated, _) => self
                .option_enum_command(option)
                .map(|c| vec![c.to_string()])
                .unwrap_or_default(),
            (_, TypedValue::Bool(true)) => command.map(|c| vec![c.to_string()]).unwrap_or_default(),
            (_, TypedValue::Bool(false)) => self
                .option_command_false(option)
                .map(|c| vec![c.to_string()])
                .unwrap_or_default(),
            (_, TypedValue::Text(text)) if text.is_empty() => Vec::new(),
            (_, TypedValue::Text(text)) => vec![join_flag(command, text)],
            (_, TypedValue::List(entries)) => entries.iter().map(|e| join_flag(command, e)).collect(),
        }
    }

    /// Command line building `path` under `cfg`, if a tool applies.
    pub fn command_for_file(&self, cfg: ConfigId, path: &str) -> Option<CommandLine> {
        let resource = self.resource_for_path(cfg, path)?;
        if self.resource(resource).excluded {
            return None;
        }
        let ext = extension_of(path)?;
        let tool = self.tool_for_input_extension(resource, ext)?;
        Some(CommandLine {
            tool: self.tool(tool).meta.id.clone(),
            command: self.tool_command(tool).unwrap_or_default().to_string(),
            flags: self.tool_flags(tool),
            input: normalize_path(path),
        })
    }

    fn require_new_path(&self, cfg: ConfigId, path: &str) -> Result<ResourceId> {
        if self.configuration(cfg).resources.contains_key(path) {
            return Err(ModelError::DuplicateId(Self::resource_id(&self.configuration(cfg).meta.id, path)));
        }
        let parent = parent_paths(path)
            .find_map(|p| {
                self.configuration(cfg)
                    .resources
                    .get(p)
                    .copied()
                    .filter(|r| self.resource(*r).is_folder())
            })
            .ok_or_else(|| ModelError::UnknownId(Self::resource_id(&self.configuration(cfg).meta.id, "")))?;
        if self.resource(parent).tool_chain().is_none() {
            return Err(ModelError::WrongResourceKind {
                id: self.resource(parent).meta.id.clone(),
                expected: "folder with a tool chain",
            });
        }
        Ok(parent)
    }

    /// Add a folder configuration at `path`, cloning the enclosing folder's
    /// tool chain and tool settings.
    pub fn create_folder_info(&mut self, cfg: ConfigId, path: &str) -> Result<ResourceId> {
        let path = normalize_path(path);
        if path.is_empty() {
            return Err(ModelError::DuplicateId(Self::resource_id(&self.configuration(cfg).meta.id, "")));
        }
        let parent = self.require_new_path(cfg, &path)?;
        let parent_tc = self
            .resource(parent)
            .tool_chain()
            .ok_or_else(|| ModelError::UnknownId(self.resource(parent).meta.id.clone()))?;
        let ext_tc = self.extension_tool_chain(parent_tc).unwrap_or(parent_tc);

        let meta = EntityMeta::new(Self::resource_id(&self.configuration(cfg).meta.id, &path), None, false);
        let folder = self.insert_resource(ResourceInfo::new(meta, cfg, path.clone(), ResourceKind::Folder { tool_chain: None }));
        let tc = self.create_project_tool_chain(folder, ext_tc);
        self.tool_chain_mut(tc).unused_children = self.tool_chain(parent_tc).unused_children.clone();
        copy_settings(self, parent_tc.into(), tc.into(), true);

        for tool in self.tool_chain_tools(parent_tc) {
            let base = self.extension_tool(tool).unwrap_or(tool);
            let copy = self.create_project_tool(ToolParent::ToolChain(tc), base);
            self.copy_tool_locals(tool, copy);
        }
        self.mark_changed(folder.into());
        self.recompute_applicability(folder);
        debug!(folder = %path, "created folder configuration");
        Ok(folder)
    }

    /// Add a file configuration at `path` with a copy of each enclosing
    /// folder tool that builds the file.
    pub fn create_file_info(&mut self, cfg: ConfigId, path: &str) -> Result<ResourceId> {
        let path = normalize_path(path);
        let parent = self.require_new_path(cfg, &path)?;
        let ext = extension_of(&path).unwrap_or_default().to_string();
        let tools: Vec<ToolId> = self
            .effective_tools(parent)
            .into_iter()
            .filter(|t| self.builds_file_type(*t, &ext))
            .collect();

        let meta = EntityMeta::new(Self::resource_id(&self.configuration(cfg).meta.id, &path), None, false);
        let file = self.insert_resource(ResourceInfo::new(meta, cfg, path.clone(), ResourceKind::File { tools: Vec::new() }));
        for tool in tools {
            let base = self.extension_tool(tool).unwrap_or(tool);
            let copy = self.create_project_tool(ToolParent::Resource(file), base);
            self.copy_tool_locals(tool, copy);
        }
        self.mark_changed(file.into());
        self.recompute_applicability(file);
        debug!(file = %path, "created file configuration");
        Ok(file)
    }

    fn copy_tool_locals(&mut self, from: ToolId, to: ToolId) {
        let command = self
            .tool_lineage(from)
            .take_while(|t| !self.tool(*t).meta.is_extension)
            .find_map(|t| self.tool(t).command.clone());
        if command.is_some() {
            self.tool_mut(to).command = command;
        }
        copy_settings(self, from.into(), to.into(), true);
    }

    /// Drop every local option override on the resource's project holders.
    ///
    /// Returns the number of overrides dropped.
    pub fn reset_option_settings(&mut self, resource: ResourceId) -> usize {
        let holders: Vec<HolderKey> = match &self.resource(resource).kind {
            ResourceKind::Folder { tool_chain: Some(tc) } => std::iter::once(HolderKey::ToolChain(*tc))
                .chain(self.tool_chain(*tc).tools.values().map(|t| HolderKey::Tool(*t)))
                .collect(),
            ResourceKind::Folder { tool_chain: None } => Vec::new(),
            ResourceKind::File { tools } => tools.iter().map(|t| HolderKey::Tool(*t)).collect(),
        };
        let mut dropped = 0;
        for holder in holders {
            if self.meta(holder.into()).is_extension {
                continue;
            }
            let count = self.option_set(holder).options.len();
            if count > 0 {
                self.option_set_mut(holder).options.clear();
                self.mark_changed(holder.into());
                dropped += count;
            }
        }
        self.recompute_applicability(resource);
        dropped
    }

    /// Copy a project configuration.
    ///
    /// With `copy_ids` the project entities keep their ids and change state;
    /// otherwise they get fresh ids derived from their extension ancestors
    /// and start dirty and in need of a rebuild.
    pub fn clone_configuration(&mut self, source: ConfigId, new_id: &str, name: Option<&str>, copy_ids: bool) -> Result<ConfigId> {
        if self.find_configuration(new_id).is_some() {
            return Err(ModelError::DuplicateId(new_id.to_string()));
        }
        let src = self.configuration(source).clone();
        let mut cfg = Configuration::new(EntityMeta::new(
            new_id,
            name.map(str::to_string).or_else(|| src.meta.name.clone()),
            false,
        ));
        cfg.parent = src.parent;
        cfg.properties = src.properties.clone();
        cfg.natures = src.natures;
        cfg.managed_build = src.managed_build;
        cfg.artifact_name = src.artifact_name.clone();
        if copy_ids {
            cfg.meta.stamp = src.meta.stamp;
        }
        let new_cfg = self.insert_configuration(cfg);

        let mut ctx = CloneContext {
            copy_ids,
            owner_id: new_id.to_string(),
            map: HashMap::new(),
            created: vec![new_cfg.into()],
        };

        for (path, old_resource) in &src.resources {
            let old = self.resource(*old_resource).clone();
            let mut info = ResourceInfo::new(
                EntityMeta::new(
                    if copy_ids { old.meta.id.clone() } else { Self::resource_id(new_id, path) },
                    old.meta.name.clone(),
                    false,
                ),
                new_cfg,
                path.clone(),
                match old.kind {
                    ResourceKind::Folder { .. } => ResourceKind::Folder { tool_chain: None },
                    ResourceKind::File { .. } => ResourceKind::File { tools: Vec::new() },
                },
            );
            info.excluded = old.excluded;
            info.meta.stamp = old.meta.stamp;
            let resource = self.insert_resource(info);
            ctx.map.insert((*old_resource).into(), resource.into());
            ctx.created.push(resource.into());

            match old.kind {
                ResourceKind::Folder { tool_chain: Some(tc) } => {
                    self.clone_tool_chain(tc, resource, &mut ctx);
                }
                ResourceKind::File { tools } => {
                    for tool in tools {
                        self.clone_tool(tool, ToolParent::Resource(resource), &mut ctx);
                    }
                }
                ResourceKind::Folder { tool_chain: None } => {}
            }
        }

        for reference in &src.tool_references {
            self.clone_tool_reference(*reference, new_cfg);
        }

        self.remap_clone(&ctx);
        for key in &ctx.created {
            if ctx.copy_ids {
                continue;
            }
            let at = self.tick();
            let stamp = &mut self.meta_mut(*key).stamp;
            *stamp = Default::default();
            stamp.mark_changed(at);
        }
        let resources: Vec<ResourceId> = self.configuration(new_cfg).resources.values().copied().collect();
        for resource in resources {
            self.recompute_applicability(resource);
        }
        debug!(source = %src.meta.id, clone = %new_id, copy_ids, "cloned configuration");
        Ok(new_cfg)
    }

    fn clone_id(&self, original: &str, extension_base: Option<&str>, ctx: &CloneContext) -> String {
        if ctx.copy_ids {
            original.to_string()
        } else {
            self.unique_child_id(extension_base.unwrap_or(original), &ctx.owner_id)
        }
    }

    fn clone_tool_chain(&mut self, tc: ToolChainId, folder: ResourceId, ctx: &mut CloneContext) -> ToolChainId {
        let mut copy = self.tool_chain(tc).clone();
        let base = self
            .extension_tool_chain(tc)
            .map(|e| self.tool_chain(e).meta.id.clone());
        copy.meta.id = self.clone_id(&copy.meta.id, base.as_deref(), ctx);
        copy.folder = Some(folder);
        copy.options = Default::default();
        copy.tools = Default::default();
        let key = self.insert_tool_chain(copy);
        ctx.map.insert(tc.into(), key.into());
        ctx.created.push(key.into());

        self.clone_holder_contents(tc.into(), key.into(), ctx);
        let tools: Vec<ToolId> = self.tool_chain(tc).tools.values().copied().collect();
        for tool in tools {
            self.clone_tool(tool, ToolParent::ToolChain(key), ctx);
        }
        key
    }

    fn clone_tool(&mut self, tool: ToolId, parent: ToolParent, ctx: &mut CloneContext) -> ToolId {
        let mut copy = self.tool(tool).clone();
        let base = self.extension_tool(tool).map(|e| self.tool(e).meta.id.clone());
        copy.meta.id = self.clone_id(&copy.meta.id, base.as_deref(), ctx);
        copy.parent = Some(parent);
        copy.options = Default::default();
        let key = self.insert_tool(copy);
        ctx.map.insert(tool.into(), key.into());
        ctx.created.push(key.into());
        self.clone_holder_contents(tool.into(), key.into(), ctx);
        key
    }

    fn clone_holder_contents(&mut self, from: HolderKey, to: HolderKey, ctx: &mut CloneContext) {
        let categories: Vec<CategoryId> = self.option_set(from).local_categories().collect();
        for category in categories {
            let mut copy = self.category(category).clone();
            let base = self
                .category_chain(category)
                .find(|c| self.category(*c).meta.is_extension)
                .map(|c| self.category(c).meta.id.clone());
            copy.meta.id = self.clone_id(&copy.meta.id, base.as_deref(), ctx);
            copy.holder = to;
            let key = self.insert_category(copy);
            ctx.map.insert(category.into(), key.into());
            ctx.created.push(key.into());
        }
        let options: Vec<OptionId> = self.option_set(from).local_options().collect();
        for option in options {
            let mut copy = self.option(option).clone();
            let base = self
                .option_chain(option)
                .find(|o| self.option(*o).meta.is_extension)
                .map(|o| self.option(o).meta.id.clone());
            copy.meta.id = self.clone_id(&copy.meta.id, base.as_deref(), ctx);
            copy.holder = to;
            let key = self.insert_option(copy);
            ctx.map.insert(option.into(), key.into());
            ctx.created.push(key.into());
        }
    }

    fn clone_tool_reference(&mut self, reference: crate::model::ToolRefId, owner: ConfigId) {
        let old = self.tool_reference(reference).clone();
        let key = self.insert_tool_reference(ToolReference {
            owner,
            target: old.target,
            target_ref: old.target_ref.clone(),
            command: old.command.clone(),
            options: Vec::new(),
        });
        for option_ref in old.options {
            let o = self.option_reference(option_ref).clone();
            self.insert_option_reference(OptionReference {
                owner: key,
                target: o.target,
                target_ref: o.target_ref,
                value: o.value,
                raw_value: o.raw_value,
            });
        }
    }

    /// Point superclass and category links of cloned entities at their clones.
    fn remap_clone(&mut self, ctx: &CloneContext) {
        let map = &ctx.map;
        for key in &ctx.created {
            match *key {
                EntityKey::Option(o) => {
                    if let Some(EntityKey::Option(s)) = self.option(o).super_class.and_then(|s| map.get(&EntityKey::from(s))) {
                        self.option_mut(o).super_class = Some(*s);
                    }
                    if let Some(EntityKey::Category(c)) = self.option(o).category.and_then(|c| map.get(&EntityKey::from(c))) {
                        self.option_mut(o).category = Some(*c);
                    }
                }
                EntityKey::Category(c) => {
                    if let Some(EntityKey::Category(s)) = self.category(c).super_class.and_then(|s| map.get(&EntityKey::from(s))) {
                        self.category_mut(c).super_class = Some(*s);
                    }
                    if let Some(EntityKey::Category(s)) = self.category(c).owner.and_then(|s| map.get(&EntityKey::from(s))) {
                        self.category_mut(c).owner = Some(*s);
                    }
                }
                EntityKey::Tool(t) => {
                    if let Some(EntityKey::Tool(s)) = self.tool(t).super_class.and_then(|s| map.get(&EntityKey::from(s))) {
                        self.tool_mut(t).super_class = Some(*s);
                    }
                }
                EntityKey::ToolChain(tc) => {
                    if let Some(EntityKey::ToolChain(s)) =
                        self.tool_chain(tc).super_class.and_then(|s| map.get(&EntityKey::from(s)))
                    {
                        self.tool_chain_mut(tc).super_class = Some(*s);
                    }
                }
                EntityKey::Resource(_) | EntityKey::Configuration(_) => {}
            }
        }
    }

    /// Write a value to the option `option_id` of a tool by ids; used by
    /// the command-line front end.
    pub fn set_option_by_id(&mut self, tool: ToolId, option_id: &str, raw: &str) -> Result<crate::overrides::WriteOutcome> {
        let option = self
            .merged_options(tool.into())
            .into_iter()
            .find(|o| self.option_chain_contains(*o, option_id))
            .ok_or_else(|| ModelError::UnknownId(option_id.to_string()))?;
        let kind = self
            .option_value_type(option)
            .ok_or_else(|| ModelError::UnknownId(option_id.to_string()))?;
        let value = TypedValue::parse(raw, kind).ok_or_else(|| ModelError::TypeMismatch {
            option: option_id.to_string(),
            expected: kind.shape(),
            found: ValueShape::Text,
        })?;
        self.set_option_value(tool.into(), OptionHandle::Direct(option), value)
    }
}
