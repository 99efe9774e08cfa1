//! Tools and their file-type descriptors.

use serde::{Deserialize, Serialize};

use super::configuration::PropertySupport;
use super::enablement::{Enablement, NatureFilter};
use super::entity::{EntityMeta, OptionSet};
use super::keys::{ResourceId, ToolChainId, ToolId};
use super::BuildModel;

/// Where a tool lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolParent {
    ToolChain(ToolChainId),
    /// Tools of a file resource configuration.
    Resource(ResourceId),
}

/// Role of one set of inputs for a tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputType {
    pub id: String,
    pub name: Option<String>,
    /// Source extensions without the dot.
    pub extensions: Vec<String>,
    /// Extensions of files pulled in as dependencies (headers).
    pub dependency_extensions: Vec<String>,
    /// All inputs of this type are passed in one invocation.
    pub multiple_of_type: bool,
    pub primary_input: bool,
    /// Input type (by id, in the tool's superclass chain) to inherit
    /// extensions from when none are listed.
    pub super_class: Option<String>,
}

/// One kind of file a tool produces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputType {
    pub id: String,
    pub name: Option<String>,
    pub extensions: Vec<String>,
    /// Variable naming the outputs in generated build files.
    pub build_variable: Option<String>,
    pub primary_output: bool,
}

#[derive(Debug, Clone)]
pub struct Tool {
    pub meta: EntityMeta,
    pub parent: Option<ToolParent>,
    pub super_class: Option<ToolId>,
    pub(crate) super_class_ref: Option<String>,
    pub options: OptionSet,
    pub command: Option<String>,
    pub input_types: Vec<InputType>,
    pub output_types: Vec<OutputType>,
    pub nature_filter: Option<NatureFilter>,
    pub supports_managed_build: Option<bool>,
    pub properties: Option<PropertySupport>,
    pub enablement: Option<Enablement>,
    pub is_abstract: bool,
}

impl Tool {
    pub fn new(meta: EntityMeta, parent: Option<ToolParent>) -> Self {
        Self {
            meta,
            parent,
            super_class: None,
            super_class_ref: None,
            options: OptionSet::default(),
            command: None,
            input_types: Vec::new(),
            output_types: Vec::new(),
            nature_filter: None,
            supports_managed_build: None,
            properties: None,
            enablement: None,
            is_abstract: false,
        }
    }
}

fn normalize(ext: &str) -> &str {
    ext.strip_prefix('.').unwrap_or(ext)
}

impl BuildModel {
    /// The tool followed by its superclass chain.
    pub fn tool_lineage(&self, id: ToolId) -> impl Iterator<Item = ToolId> + '_ {
        std::iter::successors(Some(id), move |t| self.tool(*t).super_class)
    }

    /// Root of the tool's superclass chain; identifies "the same tool"
    /// across configurations.
    pub fn real_tool(&self, id: ToolId) -> ToolId {
        self.tool_lineage(id).last().unwrap_or(id)
    }

    /// Nearest extension tool in the chain.
    pub fn extension_tool(&self, id: ToolId) -> Option<ToolId> {
        self.tool_lineage(id).find(|t| self.tool(*t).meta.is_extension)
    }

    pub fn tool_name(&self, id: ToolId) -> Option<&str> {
        self.tool_lineage(id)
            .find_map(|t| self.tool(t).meta.name.as_deref())
    }

    pub fn tool_command(&self, id: ToolId) -> Option<&str> {
        self.tool_lineage(id)
            .find_map(|t| self.tool(t).command.as_deref())
    }

    pub fn tool_input_types(&self, id: ToolId) -> &[InputType] {
        self.tool_lineage(id)
            .map(|t| self.tool(t).input_types.as_slice())
            .find(|v| !v.is_empty())
            .unwrap_or(&[])
    }

    pub fn tool_output_types(&self, id: ToolId) -> &[OutputType] {
        self.tool_lineage(id)
            .map(|t| self.tool(t).output_types.as_slice())
            .find(|v| !v.is_empty())
            .unwrap_or(&[])
    }

    pub fn tool_nature_filter(&self, id: ToolId) -> NatureFilter {
        self.tool_lineage(id)
            .find_map(|t| self.tool(t).nature_filter)
            .unwrap_or_default()
    }

    pub fn tool_supports_managed_build(&self, id: ToolId) -> bool {
        self.tool_lineage(id)
            .find_map(|t| self.tool(t).supports_managed_build)
            .unwrap_or(true)
    }

    pub fn tool_properties(&self, id: ToolId) -> Option<&PropertySupport> {
        self.tool_lineage(id)
            .find_map(|t| self.tool(t).properties.as_ref())
    }

    pub fn tool_enablement(&self, id: ToolId) -> Option<&Enablement> {
        self.tool_lineage(id)
            .find_map(|t| self.tool(t).enablement.as_ref())
    }

    /// Source extensions of one input type, following its input-type
    /// superclass when it lists none.
    pub fn input_type_extensions(&self, tool: ToolId, input: &InputType) -> Vec<String> {
        if !input.extensions.is_empty() || input.super_class.is_none() {
            return input.extensions.clone();
        }
        let wanted = input.super_class.as_deref();
        self.tool_lineage(tool)
            .flat_map(|t| self.tool(t).input_types.iter())
            .find(|it| Some(it.id.as_str()) == wanted && it.id != input.id)
            .map(|it| it.extensions.clone())
            .unwrap_or_default()
    }

    pub fn all_input_extensions(&self, id: ToolId) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for it in self.tool_input_types(id) {
            for ext in self.input_type_extensions(id, it) {
                if !out.contains(&ext) {
                    out.push(ext);
                }
            }
        }
        out
    }

    pub fn all_dependency_extensions(&self, id: ToolId) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for it in self.tool_input_types(id) {
            for ext in &it.dependency_extensions {
                if !out.contains(ext) {
                    out.push(ext.clone());
                }
            }
        }
        out
    }

    pub fn all_output_extensions(&self, id: ToolId) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for ot in self.tool_output_types(id) {
            for ext in &ot.extensions {
                if !out.contains(ext) {
                    out.push(ext.clone());
                }
            }
        }
        out
    }

    pub fn builds_file_type(&self, id: ToolId, ext: &str) -> bool {
        let ext = normalize(ext);
        self.all_input_extensions(id).iter().any(|e| e == ext)
    }

    pub fn produces_file_type(&self, id: ToolId, ext: &str) -> bool {
        let ext = normalize(ext);
        self.all_output_extensions(id).iter().any(|e| e == ext)
    }

    /// Whether `ext` is one of the tool's dependency (header) extensions.
    pub fn is_header(&self, id: ToolId, ext: &str) -> bool {
        let ext = normalize(ext);
        self.all_dependency_extensions(id).iter().any(|e| e == ext)
    }

    /// Extension of the file produced from a source with `src_ext`.
    ///
    /// Uses the primary output type, or the first one when none is marked.
    pub fn output_extension(&self, id: ToolId, src_ext: &str) -> Option<&str> {
        if !self.builds_file_type(id, src_ext) {
            return None;
        }
        let outputs = self.tool_output_types(id);
        outputs
            .iter()
            .find(|o| o.primary_output)
            .or_else(|| outputs.first())
            .and_then(|o| o.extensions.first())
            .map(String::as_str)
    }

    /// Tool chain a tool belongs to, if any.
    pub fn owning_tool_chain(&self, id: ToolId) -> Option<ToolChainId> {
        match self.tool(id).parent {
            Some(ToolParent::ToolChain(tc)) => Some(tc),
            _ => None,
        }
    }

    /// Resource configuration owning the tool directly or through its tool chain.
    pub fn owning_resource(&self, id: ToolId) -> Option<ResourceId> {
        match self.tool(id).parent? {
            ToolParent::ToolChain(tc) => self.tool_chain(tc).folder,
            ToolParent::Resource(r) => Some(r),
        }
    }
}
