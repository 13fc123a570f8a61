// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed schema workspace and a fluent
// builder so each integration test can lay out schemas, includes and
// signatures without repeating filesystem boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use lrc_cli::logging::{Log, StepStatus};
use lrc_cli::plan::{BuildPlan, CompileOptions, compile_schema_path};
use lrc_cli::platform::LineEnding;
use lrc_cli::schema::parser::DEFAULT_MAX_INCLUDE_DEPTH;
use lrc_cli::security::{SignaturePolicy, SignatureVerifier, Verification};

/// Verifier that returns a fixed answer and counts calls.
#[derive(Debug)]
pub struct FakeVerifier {
    answer: Verification,
    calls: Mutex<Vec<PathBuf>>,
}

impl FakeVerifier {
    /// Every signature verifies.
    pub fn valid() -> Self {
        Self::answering(Verification::Valid)
    }

    /// Every signature is rejected with `reason`.
    pub fn invalid(reason: &str) -> Self {
        Self::answering(Verification::Invalid {
            reason: reason.to_string(),
        })
    }

    fn answering(answer: Verification) -> Self {
        Self {
            answer,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Files passed to [`SignatureVerifier::verify`], in call order.
    pub fn verified_files(&self) -> Vec<PathBuf> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl SignatureVerifier for FakeVerifier {
    fn verify(&self, file: &Path, _signature: &Path) -> Verification {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(file.to_path_buf());
        self.answer.clone()
    }
}

/// An isolated schema workspace backed by a [`tempfile::TempDir`].
///
/// Schemas live under `schemas/`; builds go to `out/`.
pub struct SchemaWorkspace {
    /// Temporary directory holding schemas and output.
    pub root: tempfile::TempDir,
    /// Signature policy used by [`SchemaWorkspace::compile`].
    pub signatures: SignaturePolicy,
}

impl SchemaWorkspace {
    /// Create an empty workspace.
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        std::fs::create_dir_all(root.path().join("schemas")).expect("create schemas dir");
        Self {
            root,
            signatures: SignaturePolicy::default(),
        }
    }

    /// Directory holding schema files.
    pub fn schema_dir(&self) -> PathBuf {
        self.root.path().join("schemas")
    }

    /// Output root for builds.
    pub fn output_dir(&self) -> PathBuf {
        self.root.path().join("out")
    }

    /// Write `content` to `schemas/<name>`, creating parent directories.
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.schema_dir().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create schema parent");
        }
        std::fs::write(&path, content).expect("write schema file");
        path
    }

    /// Compile options targeting [`SchemaWorkspace::output_dir`].
    pub fn options(&self) -> CompileOptions {
        CompileOptions {
            output_root: self.output_dir(),
            user_config_dir: None,
            signatures: self.signatures,
            line_ending: LineEnding::Unix,
            mark_scripts_executable: true,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }

    /// Compile `schemas/<name>` with `verifier`.
    pub fn compile_with(
        &self,
        name: &str,
        verifier: &dyn SignatureVerifier,
    ) -> Result<BuildPlan, lrc_cli::error::CompileError> {
        compile_schema_path(&self.schema_dir().join(name), &self.options(), verifier)
    }

    /// Compile `schemas/<name>` with a verifier that accepts everything.
    pub fn compile(&self, name: &str) -> Result<BuildPlan, lrc_cli::error::CompileError> {
        self.compile_with(name, &FakeVerifier::valid())
    }
}

/// Fluent builder for [`SchemaWorkspace`].
pub struct WorkspaceBuilder {
    ws: SchemaWorkspace,
}

impl WorkspaceBuilder {
    /// Begin building an empty workspace.
    pub fn new() -> Self {
        Self {
            ws: SchemaWorkspace::new(),
        }
    }

    /// Add a schema (or any other file) under `schemas/`.
    pub fn with_file(self, name: &str, content: &str) -> Self {
        self.ws.write(name, content);
        self
    }

    /// Require signatures on included schemas.
    pub fn require_signed(mut self) -> Self {
        self.ws.signatures = SignaturePolicy { require: true };
        self
    }

    /// Finish building.
    pub fn build(self) -> SchemaWorkspace {
        self.ws
    }
}

/// [`Log`] implementation that records every message in memory.
#[derive(Debug, Default)]
pub struct RecordingLog {
    lines: Mutex<Vec<String>>,
}

impl RecordingLog {
    /// All recorded lines, prefixed with their level.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn push(&self, level: &str, msg: &str) {
        self.lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(format!("{level}: {msg}"));
    }
}

impl Log for RecordingLog {
    fn stage(&self, msg: &str) {
        self.push("stage", msg);
    }
    fn info(&self, msg: &str) {
        self.push("info", msg);
    }
    fn debug(&self, msg: &str) {
        self.push("debug", msg);
    }
    fn warn(&self, msg: &str) {
        self.push("warn", msg);
    }
    fn error(&self, msg: &str) {
        self.push("error", msg);
    }
    fn dry_run(&self, msg: &str) {
        self.push("dry_run", msg);
    }
    fn record_step(&self, name: &str, status: StepStatus, _message: Option<&str>) {
        self.push("step", &format!("{name} {status:?}"));
    }
}
