//! Loading and persisting the model through the element tree.
//!
//! Extension definitions come from manifest documents and project entities
//! from project documents. Loaders only record the ids entities point at;
//! [`BuildModel::resolve_references`] turns them into keys once the whole
//! tree is in memory.

mod link;
mod manifest;
mod project;
mod serialize;

pub use manifest::LoadSummary;

use buildcfg_storage::{Document, DocumentKind, StorageElement};
use std::path::Path;
use tracing::info;

use crate::error::Result;
use crate::model::BuildModel;

// Element names.
pub const BUILD_DEFINITIONS: &str = "buildDefinitions";
pub const PROJECT: &str = "project";
pub const CONFIGURATION: &str = "configuration";
pub const FOLDER_INFO: &str = "folderInfo";
pub const FILE_INFO: &str = "fileInfo";
pub const TOOL_CHAIN: &str = "toolChain";
pub const TOOL: &str = "tool";
pub const OPTION: &str = "option";
pub const OPTION_CATEGORY: &str = "optionCategory";
pub const ENUM_VALUE: &str = "enumeratedOptionValue";
pub const LIST_VALUE: &str = "listOptionValue";
pub const INPUT_TYPE: &str = "inputType";
pub const OUTPUT_TYPE: &str = "outputType";
pub const ENABLEMENT: &str = "enablement";
pub const CONVERTER: &str = "converter";
pub const PROPERTY_TYPE: &str = "buildPropertyType";
pub const TOOL_REFERENCE: &str = "toolReference";
pub const OPTION_REFERENCE: &str = "optionReference";

// Enablement expression elements.
pub const CHECK_OPTION: &str = "checkOption";
pub const CHECK_NATURE: &str = "checkNature";
pub const AND: &str = "and";
pub const OR: &str = "or";
pub const NOT: &str = "not";

// Attribute names.
pub const ID: &str = "id";
pub const NAME: &str = "name";
pub const SUPER_CLASS: &str = "superClass";
pub const VALUE_TYPE: &str = "valueType";
pub const VALUE: &str = "value";
pub const DEFAULT_VALUE: &str = "defaultValue";
pub const CATEGORY: &str = "category";
pub const OWNER: &str = "owner";
pub const COMMAND: &str = "command";
pub const COMMAND_FALSE: &str = "commandFalse";
pub const IS_DEFAULT: &str = "isDefault";
pub const IS_ABSTRACT: &str = "isAbstract";
pub const NATURE_FILTER: &str = "natureFilter";
pub const NATURE: &str = "nature";
pub const OPTION_ID: &str = "optionId";
pub const SUPPORTS_MANAGED_BUILD: &str = "supportsManagedBuild";
pub const SUPPORTED_PROPERTIES: &str = "supportedProperties";
pub const REQUIRED_PROPERTIES: &str = "requiredProperties";
pub const TARGET_TOOL: &str = "targetTool";
pub const UNUSED_CHILDREN: &str = "unusedChildren";
pub const SOURCES: &str = "sources";
pub const DEPENDENCY_EXTENSIONS: &str = "dependencyExtensions";
pub const MULTIPLE_OF_TYPE: &str = "multipleOfType";
pub const PRIMARY_INPUT: &str = "primaryInput";
pub const OUTPUTS: &str = "outputs";
pub const BUILD_VARIABLE: &str = "buildVariable";
pub const PRIMARY_OUTPUT: &str = "primaryOutput";
pub const FROM_ID: &str = "fromId";
pub const TO_ID: &str = "toId";
pub const VALUES: &str = "values";
pub const PATH: &str = "path";
pub const EXCLUDED: &str = "excluded";
pub const PARENT: &str = "parent";
pub const ARTIFACT_NAME: &str = "artifactName";
pub const BUILD_PROPERTIES: &str = "buildProperties";
pub const NATURES: &str = "natures";
pub const MANAGED_BUILD: &str = "managedBuild";
pub const FROM_REFERENCE: &str = "fromReference";

/// Load a manifest and (optionally) a project document into `model` and
/// resolve stored ids.
pub fn open(model: &mut BuildModel, manifest: &Path, project: Option<&Path>) -> Result<LoadSummary> {
    let doc = Document::read(manifest, DocumentKind::Manifest)?;
    let mut summary = model.load_manifest(&doc.root)?;
    if let Some(path) = project {
        let doc = Document::read(path, DocumentKind::Project)?;
        summary += model.load_project(&doc.root)?;
    }
    summary.resolved = model.resolve_references();
    summary.diagnostics = model.diagnostics().len();
    info!(
        manifest = %manifest.display(),
        configurations = summary.configurations,
        diagnostics = summary.diagnostics,
        "opened build model"
    );
    Ok(summary)
}

/// Write every configuration to a project document and mark them persisted.
pub fn save_project(model: &mut BuildModel, path: &Path) -> Result<()> {
    let mut root = StorageElement::new(PROJECT);
    model.serialize_project(&mut root);
    Document::new(DocumentKind::Project, root).write(path)?;

    let configurations: Vec<_> = model.configurations().collect();
    for cfg in configurations {
        model.set_dirty(cfg.into(), false);
    }
    info!(path = %path.display(), "saved project");
    Ok(())
}

/// Write the extension definitions to a manifest document.
pub fn save_manifest(model: &BuildModel, path: &Path) -> Result<()> {
    let mut root = StorageElement::new(BUILD_DEFINITIONS);
    model.serialize_manifest(&mut root);
    Document::new(DocumentKind::Manifest, root).write(path)?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Manifest with a gnu-like tool chain, a standalone derived compiler
    /// and a converter between the two compilers.
    pub fn gnu_manifest() -> StorageElement {
        StorageElement::new(BUILD_DEFINITIONS)
            .with_child(
                StorageElement::new(TOOL_CHAIN)
                    .with_attribute(ID, "gnu.tc")
                    .with_attribute(NAME, "GNU")
                    .with_attribute(TARGET_TOOL, "gnu.link")
                    .with_child(
                        StorageElement::new(TOOL)
                            .with_attribute(ID, "gnu.cc")
                            .with_attribute(COMMAND, "gcc")
                            .with_child(
                                StorageElement::new(INPUT_TYPE)
                                    .with_attribute(ID, "gnu.cc.in")
                                    .with_attribute(SOURCES, "c")
                                    .with_attribute(DEPENDENCY_EXTENSIONS, "h"),
                            )
                            .with_child(
                                StorageElement::new(OUTPUT_TYPE)
                                    .with_attribute(ID, "gnu.cc.out")
                                    .with_attribute(OUTPUTS, "o"),
                            )
                            .with_child(StorageElement::new(OPTION_CATEGORY).with_attribute(ID, "gnu.cc.cat"))
                            .with_child(
                                StorageElement::new(OPTION)
                                    .with_attribute(ID, "gnu.cc.debug")
                                    .with_attribute(VALUE_TYPE, "boolean")
                                    .with_attribute(DEFAULT_VALUE, "false")
                                    .with_attribute(CATEGORY, "gnu.cc.cat")
                                    .with_attribute(COMMAND, "-g"),
                            )
                            .with_child(
                                StorageElement::new(OPTION)
                                    .with_attribute(ID, "gnu.cc.std")
                                    .with_attribute(VALUE_TYPE, "enumerated")
                                    .with_child(
                                        StorageElement::new(ENUM_VALUE)
                                            .with_attribute(ID, "c99")
                                            .with_attribute(COMMAND, "-std=c99"),
                                    )
                                    .with_child(
                                        StorageElement::new(ENUM_VALUE)
                                            .with_attribute(ID, "c11")
                                            .with_attribute(COMMAND, "-std=c11")
                                            .with_attribute(IS_DEFAULT, "true"),
                                    ),
                            ),
                    )
                    .with_child(
                        StorageElement::new(TOOL)
                            .with_attribute(ID, "gnu.link")
                            .with_attribute(COMMAND, "ld")
                            .with_child(
                                StorageElement::new(INPUT_TYPE)
                                    .with_attribute(ID, "gnu.link.in")
                                    .with_attribute(SOURCES, "o")
                                    .with_attribute(MULTIPLE_OF_TYPE, "true"),
                            )
                            .with_child(
                                StorageElement::new(OUTPUT_TYPE)
                                    .with_attribute(ID, "gnu.link.out")
                                    .with_attribute(OUTPUTS, "elf"),
                            ),
                    ),
            )
            .with_child(
                StorageElement::new(TOOL)
                    .with_attribute(ID, "gnu.cc.strict")
                    .with_attribute(SUPER_CLASS, "gnu.cc")
                    .with_child(
                        StorageElement::new(OPTION)
                            .with_attribute(ID, "gnu.cc.debug.strict")
                            .with_attribute(SUPER_CLASS, "gnu.cc.debug")
                            .with_attribute(VALUE, "true"),
                    ),
            )
            .with_child(
                StorageElement::new(CONVERTER)
                    .with_attribute(ID, "cc-to-strict")
                    .with_attribute(FROM_ID, "gnu.cc")
                    .with_attribute(TO_ID, "gnu.cc.strict"),
            )
    }
}
