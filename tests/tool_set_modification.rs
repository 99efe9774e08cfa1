//! Tool-set modification
//!
//! Conversions through registered converters, input-extension conflicts and
//! order independence of the computed result.

mod common;

use buildcfg::{TargetToolChange, TypedValue};
use common::fixture;

#[test]
fn test_removed_linker_converts_into_new_linker() {
    let mut fx = fixture();
    let ld = fx.root_tool("gnu.link");
    let ld2 = fx.ext("gnu.link2");
    let libs = fx.model.find_option("gnu.link.libs").unwrap();
    fx.model
        .set_option_list(ld.into(), libs.into(), vec!["m".to_string()])
        .unwrap();

    let m = fx.model.modify_tool_set(fx.root, &[ld], &[ld2]).unwrap();
    assert!(m.added_tools.is_empty());
    assert!(m.removed_tools.is_empty());
    assert_eq!(m.conversions.len(), 1);
    assert_eq!(m.conversions[0].from, ld);
    assert_eq!(m.conversions[0].rule.id, "link-to-link2");

    let applied = fx.model.apply_tool_set_modification(&m).unwrap();
    assert!(applied.added.is_empty());
    assert_eq!(applied.converted.len(), 1);
    let (from, converted) = applied.converted[0];
    assert_eq!(from, ld);
    assert_ne!(converted, ld2);
    assert_eq!(fx.model.tool(converted).super_class, Some(ld2));
    assert!(!fx.model.tool(converted).meta.is_extension);

    let tools = fx.model.resource_tools(fx.root);
    assert_eq!(tools.len(), 2);
    assert_eq!(fx.model.real_tool(tools[0]), fx.ext("gnu.cc"));
    assert_eq!(tools[1], converted);

    // settings follow the conversion by option name
    let new_libs = fx.model.option_by_id(converted.into(), "gnu.link2.libs").unwrap();
    assert_eq!(
        fx.model.option_value(new_libs),
        Some(TypedValue::List(vec!["m".to_string()]))
    );

    // the target list names the extension tool, not this configuration's copy
    assert_eq!(
        applied.target_tools,
        vec![TargetToolChange::Replaced {
            old: "gnu.link".into(),
            new: "gnu.link2".into(),
        }]
    );
    assert_eq!(fx.model.tool_chain_target_tools(fx.tool_chain), ["gnu.link".to_string()]);
    let project_tc = fx.model.resource(fx.root).tool_chain().unwrap();
    assert_eq!(fx.model.tool_chain_target_tools(project_tc), ["gnu.link2".to_string()]);
    assert!(fx.model.needs_rebuild(fx.root.into()));
}

#[test]
fn test_conflicting_inputs_reported_without_mutation() {
    let fx = fixture();
    let clang = fx.ext("clang.cc");
    let before = fx.root_tool_ids();

    let m = fx.model.modify_tool_set(fx.root, &[], &[clang]).unwrap();
    assert_eq!(m.conflicts.len(), 1);
    let group = &m.conflicts[0];
    assert_eq!(group.len(), 2);
    assert!(group.contains(&clang));
    assert!(group.contains(&fx.root_tool("gnu.cc")));
    assert!(!m.is_clean());

    assert_eq!(fx.root_tool_ids(), before);
}

#[test]
fn test_apply_after_conflict_adds_tool() {
    let mut fx = fixture();
    let clang = fx.ext("clang.cc");
    let m = fx.model.modify_tool_set(fx.root, &[], &[clang]).unwrap();
    let applied = fx.model.apply_tool_set_modification(&m).unwrap();
    assert_eq!(applied.added.len(), 1);
    assert_eq!(fx.model.tool(applied.added[0]).super_class, Some(clang));
    assert_eq!(fx.model.resource_tools(fx.root).len(), 3);
    assert!(applied.target_tools.is_empty());
}

#[test]
fn test_modification_independent_of_argument_order() {
    let fx = fixture();
    let cc = fx.root_tool("gnu.cc");
    let ld = fx.root_tool("gnu.link");
    let clang = fx.ext("clang.cc");
    let ld2 = fx.ext("gnu.link2");

    let a = fx.model.modify_tool_set(fx.root, &[cc, ld], &[clang, ld2]).unwrap();
    let b = fx.model.modify_tool_set(fx.root, &[ld, cc], &[ld2, clang]).unwrap();

    assert_eq!(a.conflicts, b.conflicts);
    assert_eq!(a.is_clean(), b.is_clean());
    assert_eq!(a.conversions.len(), b.conversions.len());

    let mut ra = a.resulting_tools.clone();
    let mut rb = b.resulting_tools.clone();
    ra.sort();
    rb.sort();
    assert_eq!(ra, rb);
}

#[test]
fn test_duplicate_entries_collapse_by_real_tool() {
    let fx = fixture();
    let clang = fx.ext("clang.cc");
    let once = fx.model.modify_tool_set(fx.root, &[], &[clang]).unwrap();
    let twice = fx.model.modify_tool_set(fx.root, &[], &[clang, clang]).unwrap();
    assert_eq!(once.added_tools, twice.added_tools);
    assert_eq!(once.resulting_tools, twice.resulting_tools);
}

#[test]
fn test_removed_linker_added_back_is_live() {
    let mut fx = fixture();
    let ld = fx.root_tool("gnu.link");
    let removal = fx.model.modify_tool_set(fx.root, &[ld], &[]).unwrap();
    fx.model.apply_tool_set_modification(&removal).unwrap();
    assert_eq!(fx.model.resource_tools(fx.root).len(), 1);

    let linker = fx.ext("gnu.link");
    let m = fx.model.modify_tool_set(fx.root, &[], &[linker]).unwrap();
    let predicted: Vec<_> = m.resulting_tools.iter().map(|t| fx.model.real_tool(*t)).collect();
    let applied = fx.model.apply_tool_set_modification(&m).unwrap();

    let live: Vec<_> = fx
        .model
        .resource_tools(fx.root)
        .into_iter()
        .map(|t| fx.model.real_tool(t))
        .collect();
    assert_eq!(live, predicted);
    assert_eq!(fx.root_tool("gnu.link"), applied.added[0]);
}
