//! Shared fixtures for integration tests.
//!
//! Builds a small gnu-like manifest through the element tree and loads it
//! the same way the CLI does.

#![allow(dead_code)]

use buildcfg::storage::*;
use buildcfg::{BuildModel, ConfigId, ResourceId, ToolChainId, ToolId};
use buildcfg_storage::StorageElement;

fn option(id: &str, value_type: &str, command: &str) -> StorageElement {
    StorageElement::new(OPTION)
        .with_attribute(ID, id)
        .with_attribute(VALUE_TYPE, value_type)
        .with_attribute(COMMAND, command)
}

fn input(id: &str, sources: &str) -> StorageElement {
    StorageElement::new(INPUT_TYPE)
        .with_attribute(ID, id)
        .with_attribute(SOURCES, sources)
}

fn output(id: &str, outputs: &str) -> StorageElement {
    StorageElement::new(OUTPUT_TYPE)
        .with_attribute(ID, id)
        .with_attribute(OUTPUTS, outputs)
}

/// Tool chain `gnu.tc` with `gnu.cc` (gcc) and `gnu.link` (ld), plus the
/// standalone tools `gnu.link2` and `clang.cc` and a converter from the
/// first linker to the second.
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
                        .with_attribute(NAME, "GCC")
                        .with_attribute(COMMAND, "gcc")
                        .with_child(input("gnu.cc.in", "c").with_attribute(DEPENDENCY_EXTENSIONS, "h"))
                        .with_child(output("gnu.cc.out", "o"))
                        .with_child(option("gnu.cc.debug", "boolean", "-g").with_attribute(DEFAULT_VALUE, "false"))
                        .with_child(option("gnu.cc.level", "string", "-O"))
                        .with_child(option("gnu.cc.includes", "includePath", "-I")),
                )
                .with_child(
                    StorageElement::new(TOOL)
                        .with_attribute(ID, "gnu.link")
                        .with_attribute(COMMAND, "ld")
                        .with_child(input("gnu.link.in", "o").with_attribute(MULTIPLE_OF_TYPE, "true"))
                        .with_child(output("gnu.link.out", "elf"))
                        .with_child(option("gnu.link.libs", "libs", "-l").with_attribute(NAME, "Libraries")),
                ),
        )
        .with_child(
            StorageElement::new(TOOL)
                .with_attribute(ID, "gnu.link2")
                .with_attribute(COMMAND, "ld.gold")
                .with_child(input("gnu.link2.in", "o").with_attribute(MULTIPLE_OF_TYPE, "true"))
                .with_child(output("gnu.link2.out", "elf"))
                .with_child(option("gnu.link2.libs", "libs", "-l").with_attribute(NAME, "Libraries")),
        )
        .with_child(
            StorageElement::new(TOOL)
                .with_attribute(ID, "clang.cc")
                .with_attribute(COMMAND, "clang")
                .with_child(input("clang.cc.in", "c"))
                .with_child(output("clang.cc.out", "o")),
        )
        .with_child(
            StorageElement::new(CONVERTER)
                .with_attribute(ID, "link-to-link2")
                .with_attribute(FROM_ID, "gnu.link")
                .with_attribute(TO_ID, "gnu.link2"),
        )
}

pub struct Fixture {
    pub model: BuildModel,
    pub tool_chain: ToolChainId,
    pub cfg: ConfigId,
    pub root: ResourceId,
}

impl Fixture {
    /// Extension tool by id.
    pub fn ext(&self, id: &str) -> ToolId {
        self.model
            .extension_tools()
            .find(|t| self.model.tool(*t).meta.id == id)
            .unwrap_or_else(|| panic!("no extension tool {id}"))
    }

    /// Project tool of the root folder whose chain reaches `id`.
    pub fn root_tool(&self, id: &str) -> ToolId {
        self.model
            .resource_tools(self.root)
            .into_iter()
            .find(|t| self.model.tool_lineage(*t).any(|l| self.model.tool(l).meta.id == id))
            .unwrap_or_else(|| panic!("no root tool derived from {id}"))
    }

    pub fn root_tool_ids(&self) -> Vec<String> {
        self.model
            .resource_tools(self.root)
            .into_iter()
            .map(|t| self.model.tool(t).meta.id.clone())
            .collect()
    }
}

/// Load the manifest and create configuration `cfg` from `gnu.tc`.
pub fn fixture() -> Fixture {
    let mut model = BuildModel::new();
    model.load_manifest(&gnu_manifest()).unwrap();
    model.resolve_references();
    let tool_chain = model.find_tool_chain("gnu.tc").unwrap();
    let cfg = model.new_configuration("cfg", Some("Debug"), tool_chain).unwrap();
    let root = model.root_folder(cfg).unwrap();
    Fixture {
        model,
        tool_chain,
        cfg,
        root,
    }
}
