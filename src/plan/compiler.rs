//! Schema → [`BuildPlan`] compiler.
//!
//! Resolves the trust policy, parses the schema (with includes and
//! templates) and flattens the action tree depth-first into an ordered list
//! of absolute-path operations. Any error aborts the whole compile; no
//! partial plan is ever returned.
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::{BuildPlan, Operation, PlanParts, PlannedAction};
use crate::error::CompileError;
use crate::platform::{LineEnding, Platform};
use crate::schema::parser::DEFAULT_MAX_INCLUDE_DEPTH;
use crate::schema::{Action, Node, ParseSession, Parser, SourceLocation};
use crate::security::paths::{canonicalize_existing, normalize, resolve_within};
use crate::security::signature::{SignaturePolicy, SignatureVerifier, check_file};
use crate::security::trust::TrustPolicy;

/// File name given to schema text compiled from memory.
///
/// The angle brackets keep it from colliding with a real include.
pub const INLINE_SCHEMA_NAME: &str = "<inline>.lrc";

/// Extensions that get an implicit `chmod 0755`.
pub const SCRIPT_EXTENSIONS: [&str; 4] = ["sh", "py", "pl", "rb"];

/// Knobs for one compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Directory every output path is resolved against.
    pub output_root: PathBuf,
    /// User config directory consulted for `trusted_templates.json`.
    pub user_config_dir: Option<PathBuf>,
    /// Run-wide signature policy.
    pub signatures: SignaturePolicy,
    /// Line ending for generated file content.
    pub line_ending: LineEnding,
    /// Add `chmod 0755` after writing script files.
    pub mark_scripts_executable: bool,
    /// Maximum `@include` nesting.
    pub max_include_depth: usize,
}

impl CompileOptions {
    /// Options for `output_root` with platform defaults.
    #[must_use]
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        let platform = Platform::detect();
        Self {
            output_root: output_root.into(),
            user_config_dir: None,
            signatures: SignaturePolicy::default(),
            line_ending: platform.line_ending(),
            mark_scripts_executable: platform.supports_chmod(),
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }
}

/// Compile the schema file at `path`.
///
/// A sibling signature of the top-level file is verified when present but
/// never required.
///
/// # Errors
///
/// Returns the first [`CompileError`] met; no plan is produced.
pub fn compile_schema_path(
    path: &Path,
    options: &CompileOptions,
    verifier: &dyn SignatureVerifier,
) -> Result<BuildPlan, CompileError> {
    let io = |source| CompileError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = dunce::canonicalize(path).map_err(io)?;
    let text = fs::read_to_string(&file).map_err(io)?;
    let schema_dir = file.parent().map(Path::to_path_buf).unwrap_or_default();

    let mut session = ParseSession::new();
    let (report, warning) = check_file(verifier, &file, false, &SourceLocation::file(&file))?;
    session.record_signature(report, warning);

    compile(&text, &file, &schema_dir, options, verifier, session)
}

/// Compile schema `text` as if it were a file in `schema_dir`.
///
/// # Errors
///
/// Returns the first [`CompileError`] met; no plan is produced.
pub fn compile_schema_str(
    text: &str,
    schema_dir: &Path,
    options: &CompileOptions,
    verifier: &dyn SignatureVerifier,
) -> Result<BuildPlan, CompileError> {
    let schema_dir = dunce::canonicalize(schema_dir).map_err(|source| CompileError::Io {
        path: schema_dir.to_path_buf(),
        source,
    })?;
    let file = schema_dir.join(INLINE_SCHEMA_NAME);
    compile(text, &file, &schema_dir, options, verifier, ParseSession::new())
}

fn compile(
    text: &str,
    file: &Path,
    schema_dir: &Path,
    options: &CompileOptions,
    verifier: &dyn SignatureVerifier,
    mut session: ParseSession,
) -> Result<BuildPlan, CompileError> {
    let trust = TrustPolicy::resolve(schema_dir, options.user_config_dir.as_deref())?;
    let parser = Parser::new(&trust, verifier, options.signatures, schema_dir)
        .with_max_depth(options.max_include_depth);
    let schema = parser.parse(text, file, &mut session)?;

    let root = std::path::absolute(&options.output_root).map_err(|source| CompileError::Io {
        path: options.output_root.clone(),
        source,
    })?;
    let root = normalize(&root);
    let mut emitter = Emitter {
        canonical_root: canonicalize_existing(&root),
        root,
        options,
        seen_dirs: HashSet::new(),
        actions: Vec::new(),
    };
    emitter.walk(&schema.nodes, 0)?;

    let (diagnostics, signatures) = session.into_parts();
    tracing::debug!(
        "compiled {} into {} action(s)",
        file.display(),
        emitter.actions.len()
    );
    Ok(PlanParts {
        source: file.to_path_buf(),
        root: emitter.root,
        metadata: schema.metadata,
        variables: schema.variables,
        ignores: schema.ignores,
        actions: emitter.actions,
        diagnostics,
        signatures,
    }
    .into())
}

/// Depth-first flattener for the resolved action tree.
struct Emitter<'o> {
    root: PathBuf,
    canonical_root: PathBuf,
    options: &'o CompileOptions,
    seen_dirs: HashSet<PathBuf>,
    actions: Vec<PlannedAction>,
}

impl Emitter<'_> {
    fn walk(&mut self, nodes: &[Node], depth: usize) -> Result<(), CompileError> {
        for node in nodes {
            let origin = &node.origin;
            match &node.action {
                Action::CreateDirectory { path } => {
                    let path = self.resolve(path, origin)?;
                    if self.seen_dirs.insert(path.clone()) {
                        self.push(depth, origin, Operation::MakeDir { path });
                    }
                }
                Action::CreateFile { path, content } => {
                    let path = self.resolve(path, origin)?;
                    let content = self.options.line_ending.apply(&content.render());
                    let script = self.options.mark_scripts_executable && is_script(&path);
                    self.push(depth, origin, Operation::WriteFile {
                        path: path.clone(),
                        content,
                    });
                    if script {
                        self.push(depth, origin, Operation::Chmod { path, mode: 0o755 });
                    }
                }
                Action::Chmod { path, mode } => {
                    let path = self.resolve(path, origin)?;
                    self.push(depth, origin, Operation::Chmod { path, mode: *mode });
                }
                Action::Copy { source, dest } => {
                    if source.is_dir() && self.canonical_root.starts_with(source) {
                        return Err(CompileError::parse(
                            origin.clone(),
                            "copy source contains the output directory",
                            source.display().to_string(),
                        ));
                    }
                    let dest = self.resolve(dest, origin)?;
                    self.push(depth, origin, Operation::Copy {
                        source: source.clone(),
                        dest,
                    });
                }
                Action::Symlink { target, link } => {
                    let link = self.resolve(link, origin)?;
                    let parent = link.parent().unwrap_or(&self.root);
                    if resolve_within(&self.root, &parent.join(target)).is_none() {
                        return Err(self.escape(target, origin));
                    }
                    self.push(depth, origin, Operation::Symlink {
                        target: target.clone(),
                        link,
                    });
                }
                Action::TemplateRef { expanded, .. } => self.walk(expanded, depth)?,
                Action::Include { schema, .. } => self.walk(&schema.nodes, depth + 1)?,
                Action::SetVariable { .. } | Action::IgnorePattern { .. } => {}
            }
        }
        Ok(())
    }

    fn resolve(&self, path: &Path, origin: &SourceLocation) -> Result<PathBuf, CompileError> {
        resolve_within(&self.root, path).ok_or_else(|| self.escape(path, origin))
    }

    fn escape(&self, path: &Path, origin: &SourceLocation) -> CompileError {
        CompileError::PathEscape {
            location: origin.clone(),
            path: path.display().to_string(),
            base: self.root.clone(),
        }
    }

    fn push(&mut self, depth: usize, origin: &SourceLocation, op: Operation) {
        self.actions.push(PlannedAction {
            seq: self.actions.len() + 1,
            depth,
            origin: origin.clone(),
            op,
        });
    }
}

fn is_script(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|e| SCRIPT_EXTENSIONS.contains(&e.as_str()))
}
