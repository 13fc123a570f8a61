//! Build plans: the inert, ordered output of a schema compile.
//!
//! A [`BuildPlan`] holds fully resolved absolute paths and is never mutated
//! after the compiler creates it. Printing or serializing it has no side
//! effects; applying it is the job of [`crate::apply`].
pub mod compiler;
pub mod manifest;
pub mod render;

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::schema::{Diagnostic, Metadata, SourceLocation};
use crate::security::SignatureReport;

pub use compiler::{CompileOptions, compile_schema_path, compile_schema_str};

/// Project name used when neither metadata nor a file stem is available.
pub const FALLBACK_PROJECT: &str = "lrc_output";

/// One filesystem operation with absolute paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Create a directory and its parents.
    MakeDir {
        /// Directory to create.
        path: PathBuf,
    },
    /// Write a file.
    WriteFile {
        /// File to write.
        path: PathBuf,
        /// Full content.
        content: String,
    },
    /// Set POSIX permission bits.
    Chmod {
        /// Target path.
        path: PathBuf,
        /// Permission bits.
        #[serde(serialize_with = "octal")]
        mode: u32,
    },
    /// Copy a file or directory from the schema directory.
    Copy {
        /// Absolute source inside the schema directory.
        source: PathBuf,
        /// Destination.
        dest: PathBuf,
    },
    /// Create a symbolic link.
    Symlink {
        /// Link target, as written in the schema.
        target: PathBuf,
        /// Link location.
        link: PathBuf,
    },
}

impl Operation {
    /// Short verb for listings.
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::MakeDir { .. } => "mkdir",
            Self::WriteFile { .. } => "write",
            Self::Chmod { .. } => "chmod",
            Self::Copy { .. } => "copy",
            Self::Symlink { .. } => "symlink",
        }
    }

    /// The output path this operation changes.
    #[must_use]
    pub fn target(&self) -> &Path {
        match self {
            Self::MakeDir { path } | Self::WriteFile { path, .. } | Self::Chmod { path, .. } => {
                path
            }
            Self::Copy { dest, .. } => dest,
            Self::Symlink { link, .. } => link,
        }
    }
}

fn octal<S: Serializer>(mode: &u32, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{mode:04o}"))
}

/// An operation with its position in the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedAction {
    /// 1-based execution order.
    pub seq: usize,
    /// Include nesting depth of the declaring file.
    pub depth: usize,
    /// Declaring schema line.
    pub origin: SourceLocation,
    /// What to do.
    #[serde(flatten)]
    pub op: Operation,
}

/// Compiled, immutable build plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildPlan {
    source: PathBuf,
    root: PathBuf,
    metadata: Metadata,
    variables: BTreeMap<String, String>,
    ignores: Vec<String>,
    actions: Vec<PlannedAction>,
    diagnostics: Vec<Diagnostic>,
    signatures: Vec<SignatureReport>,
}

/// Parts of a [`BuildPlan`], in the order the compiler produces them.
#[derive(Debug, Default)]
pub(crate) struct PlanParts {
    pub source: PathBuf,
    pub root: PathBuf,
    pub metadata: Metadata,
    pub variables: BTreeMap<String, String>,
    pub ignores: Vec<String>,
    pub actions: Vec<PlannedAction>,
    pub diagnostics: Vec<Diagnostic>,
    pub signatures: Vec<SignatureReport>,
}

impl From<PlanParts> for BuildPlan {
    fn from(parts: PlanParts) -> Self {
        Self {
            source: parts.source,
            root: parts.root,
            metadata: parts.metadata,
            variables: parts.variables,
            ignores: parts.ignores,
            actions: parts.actions,
            diagnostics: parts.diagnostics,
            signatures: parts.signatures,
        }
    }
}

impl BuildPlan {
    /// Top-level schema file.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Output root every path is resolved against.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Metadata of the top-level schema.
    #[must_use]
    pub const fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Variables bound at the end of the top-level schema.
    #[must_use]
    pub const fn variables(&self) -> &BTreeMap<String, String> {
        &self.variables
    }

    /// Ignore globs active at the end of the top-level schema.
    #[must_use]
    pub fn ignores(&self) -> &[String] {
        &self.ignores
    }

    /// Actions in execution order.
    #[must_use]
    pub fn actions(&self) -> &[PlannedAction] {
        &self.actions
    }

    /// Non-fatal findings.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Signature outcomes for the schema and its includes.
    #[must_use]
    pub fn signatures(&self) -> &[SignatureReport] {
        &self.signatures
    }

    /// Project name: metadata, else the schema file stem, else a fallback.
    #[must_use]
    pub fn project_name(&self) -> String {
        project_name(self.metadata.project.as_deref(), &self.source)
    }

    /// SHA-256 over the root-relative operations and their content.
    ///
    /// Two plans with the same fingerprint perform the same writes, whatever
    /// output root they were compiled for.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for action in &self.actions {
            hasher.update(action.op.verb().as_bytes());
            hasher.update([0]);
            hasher.update(self.relative(action.op.target()).to_string_lossy().as_bytes());
            hasher.update([0]);
            match &action.op {
                Operation::WriteFile { content, .. } => hasher.update(content.as_bytes()),
                Operation::Chmod { mode, .. } => hasher.update(mode.to_be_bytes()),
                Operation::Copy { source, .. } => hasher.update(source.to_string_lossy().as_bytes()),
                Operation::Symlink { target, .. } => {
                    hasher.update(target.to_string_lossy().as_bytes());
                }
                Operation::MakeDir { .. } => {}
            }
            hasher.update([0xff]);
        }
        let mut hex = String::with_capacity(64);
        for b in hasher.finalize() {
            // write! to a String is infallible; unwrap_or(()) makes that explicit.
            write!(hex, "{b:02x}").unwrap_or(());
        }
        hex
    }

    /// `path` relative to the output root (unchanged if outside it).
    #[must_use]
    pub fn relative<'p>(&self, path: &'p Path) -> &'p Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}

/// Project name from metadata, falling back to the schema stem.
#[must_use]
pub fn project_name(project: Option<&str>, schema: &Path) -> String {
    project
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(ToString::to_string)
        .or_else(|| {
            schema
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .filter(|s| !s.is_empty())
        })
        .unwrap_or_else(|| FALLBACK_PROJECT.to_string())
}

/// Replace every character outside `[A-Za-z0-9_.-]` with `_`.
///
/// # Examples
///
/// ```
/// use lrc_cli::plan::sanitize_dir_name;
///
/// assert_eq!(sanitize_dir_name("My App/v2"), "My_App_v2");
/// ```
#[must_use]
pub fn sanitize_dir_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
