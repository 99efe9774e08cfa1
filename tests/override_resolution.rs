//! Override placement and reference resolution
//!
//! Writes through project holders, the extension/project boundary and the
//! idempotence guarantees of the resolution passes.

mod common;

use buildcfg::{ModelError, OverrideMode, ResolveError, TypedValue, WriteOutcome};
use common::fixture;

#[test]
fn test_project_override_leaves_extension_untouched() {
    let mut fx = fixture();
    let compiler = fx.root_tool("gnu.cc");
    let ext_debug = fx.model.find_option("gnu.cc.debug").unwrap();

    let outcome = fx
        .model
        .set_option_bool(compiler.into(), ext_debug.into(), true)
        .unwrap();
    let written = match outcome {
        WriteOutcome::Changed(o) => o,
        other => panic!("expected a change, got {other:?}"),
    };

    let debug_entries: Vec<_> = fx
        .model
        .effective_options(compiler.into())
        .into_iter()
        .filter(|o| fx.model.option_chain_contains(*o, "gnu.cc.debug"))
        .collect();
    assert_eq!(debug_entries, vec![written]);
    assert_eq!(fx.model.option_value(written), Some(TypedValue::Bool(true)));
    assert!(!fx.model.option(written).meta.is_extension);

    assert!(fx.model.is_dirty(compiler.into()));
    assert_eq!(fx.model.option_value(ext_debug), Some(TypedValue::Bool(false)));
    assert!(!fx.model.is_dirty(ext_debug.into()));
}

#[test]
fn test_resolve_option_to_set_is_idempotent() {
    let mut fx = fixture();
    let compiler = fx.root_tool("gnu.cc");
    let level = fx.model.find_option("gnu.cc.level").unwrap();

    let first = fx
        .model
        .resolve_option_to_set(compiler.into(), level, OverrideMode::Project)
        .unwrap();
    let second = fx
        .model
        .resolve_option_to_set(compiler.into(), level, OverrideMode::Project)
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(fx.model.option(first).holder, compiler.into());
}

#[test]
fn test_unrelated_option_is_unreachable() {
    let mut fx = fixture();
    let clang = fx.ext("clang.cc");
    let debug = fx.model.find_option("gnu.cc.debug").unwrap();

    // clang does not inherit gcc's options
    let result = fx
        .model
        .resolve_option_to_set(clang.into(), debug, OverrideMode::AdjustExtension);
    assert!(matches!(result, Err(ResolveError::Unreachable { .. })));
}

#[test]
fn test_type_mismatch_is_an_error() {
    let mut fx = fixture();
    let compiler = fx.root_tool("gnu.cc");
    let level = fx.model.find_option("gnu.cc.level").unwrap();
    let before = fx.model.effective_options(compiler.into());

    let err = fx
        .model
        .set_option_bool(compiler.into(), level.into(), true)
        .unwrap_err();
    assert!(matches!(err, ModelError::TypeMismatch { .. }));
    assert_eq!(fx.model.effective_options(compiler.into()), before);
}

#[test]
fn test_resolve_references_is_idempotent() {
    let mut fx = fixture();
    let diagnostics = fx.model.diagnostics().len();
    assert_eq!(fx.model.resolve_references(), 0);
    assert_eq!(fx.model.resolve_references(), 0);
    assert_eq!(fx.model.diagnostics().len(), diagnostics);
}

#[test]
fn test_set_option_by_id_through_raw_value() {
    let mut fx = fixture();
    let compiler = fx.root_tool("gnu.cc");

    let outcome = fx
        .model
        .set_option_by_id(compiler, "gnu.cc.includes", "inc;/usr/include")
        .unwrap();
    let option = outcome.target().unwrap();
    assert_eq!(
        fx.model.option_list(option).unwrap(),
        vec!["inc".to_string(), "/usr/include".to_string()]
    );

    let line = fx.model.command_for_file(fx.cfg, "src/main.c").unwrap();
    assert_eq!(line.command, "gcc");
    assert!(line.flags.contains(&"-Iinc".to_string()));
    assert_eq!(line.input, "src/main.c");
}
