#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing
)]
//! Integration tests for compiling schema files into build plans.
//!
//! These tests drive [`compile_schema_path`] through real files on disk:
//! includes, trust and signature checks, ignore rules, and the rendered
//! plan listing.

mod common;

use std::path::Path;

use common::*;
use lrc_cli::error::CompileError;
use lrc_cli::plan::render::{render_json, render_text};
use lrc_cli::plan::{BuildPlan, Operation, compile_schema_path};

const DEMO_SCHEMA: &str = "\
# Project: Demo Site
@set NAME=demo
docs/
  index.md -> hello ${NAME}
@include parts/extra.lrc
notes.txt <<EOF
first
EOF
";

fn demo_workspace() -> SchemaWorkspace {
    WorkspaceBuilder::new()
        .with_file("site.lrc", DEMO_SCHEMA)
        .with_file("parts/extra.lrc", "extra/\n")
        .build()
}

fn listing(plan: &BuildPlan) -> Vec<String> {
    plan.actions()
        .iter()
        .map(|a| {
            format!(
                "{} {}",
                a.op.verb(),
                plan.relative(a.op.target())
                    .to_string_lossy()
                    .replace('\\', "/")
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Snapshot: rendered plan
// ---------------------------------------------------------------------------

/// Regression guard for the human-readable plan listing.
#[test]
fn demo_site_plan() {
    let ws = demo_workspace();
    let plan = ws.compile("site.lrc").unwrap();
    insta::assert_snapshot!("demo_site_plan", render_text(&plan).trim_end());
}

// ---------------------------------------------------------------------------
// Plan shape
// ---------------------------------------------------------------------------

#[test]
fn include_is_spliced_in_place() {
    let ws = demo_workspace();
    let plan = ws.compile("site.lrc").unwrap();
    assert_eq!(
        listing(&plan),
        ["mkdir docs", "write docs/index.md", "mkdir extra", "write notes.txt"]
    );
    let depths: Vec<usize> = plan.actions().iter().map(|a| a.depth).collect();
    assert_eq!(depths, [0, 0, 1, 0]);
}

#[test]
fn paths_are_absolute_under_output_root() {
    let ws = demo_workspace();
    let plan = ws.compile("site.lrc").unwrap();
    for action in plan.actions() {
        let target = action.op.target();
        assert!(target.is_absolute(), "{} is relative", target.display());
        assert!(
            target.starts_with(plan.root()),
            "{} outside root",
            target.display()
        );
    }
}

#[test]
fn variables_and_metadata_are_recorded() {
    let ws = demo_workspace();
    let plan = ws.compile("site.lrc").unwrap();
    assert_eq!(plan.project_name(), "Demo Site");
    assert_eq!(
        plan.variables().get("NAME").map(String::as_str),
        Some("demo")
    );
    assert!(matches!(
        &plan.actions()[1].op,
        Operation::WriteFile { content, .. } if content == "hello demo"
    ));
    assert!(matches!(
        &plan.actions()[3].op,
        Operation::WriteFile { content, .. } if content == "first\n"
    ));
}

#[test]
fn compiling_twice_is_deterministic() {
    let ws = demo_workspace();
    let first = ws.compile("site.lrc").unwrap();
    let second = ws.compile("site.lrc").unwrap();
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert_eq!(render_json(&first).unwrap(), render_json(&second).unwrap());
}

#[test]
fn fingerprint_ignores_output_root() {
    let ws = demo_workspace();
    let here = ws.compile("site.lrc").unwrap();
    let mut options = ws.options();
    options.output_root = ws.root.path().join("elsewhere");
    let there = compile_schema_path(
        &ws.schema_dir().join("site.lrc"),
        &options,
        &FakeVerifier::valid(),
    )
    .unwrap();
    assert_ne!(here.root(), there.root());
    assert_eq!(here.fingerprint(), there.fingerprint());
}

#[test]
fn ignore_rules_drop_later_entries() {
    let ws = WorkspaceBuilder::new()
        .with_file("app.lrc", "early.log\n@ignore *.log\nkeep.txt\ndrop.log\n")
        .build();
    let plan = ws.compile("app.lrc").unwrap();
    assert_eq!(listing(&plan), ["write early.log", "write keep.txt"]);
    assert_eq!(plan.ignores(), ["*.log"]);
}

#[test]
fn builtin_template_expands() {
    let ws = WorkspaceBuilder::new()
        .with_file("app.lrc", "@template rust-cli\n")
        .build();
    let plan = ws.compile("app.lrc").unwrap();
    let listed = listing(&plan);
    assert!(
        listed.iter().any(|l| l == "write Cargo.toml"),
        "got {listed:?}"
    );
}

#[test]
fn lint_warnings_do_not_stop_compile() {
    let ws = WorkspaceBuilder::new()
        .with_file("app.lrc", "a.txt   \n")
        .build();
    let plan = ws.compile("app.lrc").unwrap();
    assert_eq!(plan.diagnostics().len(), 1);
    assert_eq!(plan.actions().len(), 1);
}

// ---------------------------------------------------------------------------
// Fatal errors
// ---------------------------------------------------------------------------

#[test]
fn undefined_variable_is_fatal() {
    let ws = WorkspaceBuilder::new()
        .with_file("app.lrc", "ok.txt\n${MISSING}.txt\n")
        .build();
    let err = ws.compile("app.lrc").unwrap_err();
    assert!(
        matches!(&err, CompileError::UndefinedVariable { name, location } if name == "MISSING" && location.line == 2),
        "got {err:?}"
    );
}

#[test]
fn untrusted_template_is_fatal() {
    let ws = WorkspaceBuilder::new()
        .with_file("app.lrc", "@template not_allowed\n")
        .build();
    let err = ws.compile("app.lrc").unwrap_err();
    assert!(
        matches!(&err, CompileError::Trust { template, .. } if template == "not_allowed"),
        "got {err:?}"
    );
}

#[test]
fn include_cycle_is_fatal() {
    let ws = WorkspaceBuilder::new()
        .with_file("a.lrc", "@include b.lrc\n")
        .with_file("b.lrc", "@include a.lrc\n")
        .build();
    let err = ws.compile("a.lrc").unwrap_err();
    assert!(
        matches!(&err, CompileError::IncludeCycle { chain, .. } if chain.contains("a.lrc") && chain.contains("b.lrc")),
        "got {err:?}"
    );
}

#[test]
fn include_outside_schema_dir_is_fatal() {
    let ws = WorkspaceBuilder::new()
        .with_file("app.lrc", "@include ../outside.lrc\n")
        .build();
    std::fs::write(ws.root.path().join("outside.lrc"), "x.txt\n").unwrap();
    let err = ws.compile("app.lrc").unwrap_err();
    assert!(matches!(err, CompileError::PathEscape { .. }), "got {err:?}");
}

#[test]
fn entry_escaping_output_root_is_fatal() {
    let ws = WorkspaceBuilder::new()
        .with_file("app.lrc", "@set UP=../..\n${UP}/escape.txt -> x\n")
        .build();
    let err = ws.compile("app.lrc").unwrap_err();
    assert!(matches!(err, CompileError::PathEscape { .. }), "got {err:?}");
    assert!(!ws.output_dir().exists());
}

// ---------------------------------------------------------------------------
// Signatures
// ---------------------------------------------------------------------------

#[test]
fn unsigned_include_is_rejected_when_required() {
    let ws = WorkspaceBuilder::new()
        .with_file("app.lrc", "@include inc.lrc\n")
        .with_file("inc.lrc", "x.txt\n")
        .require_signed()
        .build();
    let err = ws.compile("app.lrc").unwrap_err();
    assert!(matches!(err, CompileError::Signature { .. }), "got {err:?}");
}

#[test]
fn signed_include_is_verified_when_required() {
    let ws = WorkspaceBuilder::new()
        .with_file("app.lrc", "@include inc.lrc\n")
        .with_file("inc.lrc", "x.txt\n")
        .with_file("inc.lrc.sig", "signature")
        .require_signed()
        .build();
    let verifier = FakeVerifier::valid();
    let plan = ws.compile_with("app.lrc", &verifier).unwrap();

    let files = verifier.verified_files();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].file_name(), Some(Path::new("inc.lrc").as_os_str()));
    assert!(plan.signatures().iter().any(|s| s.verified));
}

#[test]
fn invalid_signature_is_fatal_even_when_optional() {
    let ws = WorkspaceBuilder::new()
        .with_file("app.lrc", "@include inc.lrc\n")
        .with_file("inc.lrc", "x.txt\n")
        .with_file("inc.lrc.asc", "signature")
        .build();
    let err = ws
        .compile_with("app.lrc", &FakeVerifier::invalid("BAD signature"))
        .unwrap_err();
    assert!(
        matches!(&err, CompileError::Signature { reason, .. } if reason.contains("BAD")),
        "got {err:?}"
    );
}
