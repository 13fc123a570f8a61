//! Template trust policy.
//!
//! The allow-list is the union of every policy file found plus the built-in
//! defaults. It is resolved once per compile and never changes afterwards.
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CompileError;
use crate::schema::templates::BUILTIN_TEMPLATES;

/// File name of a trust policy.
pub const POLICY_FILE: &str = "trusted_templates.json";

/// Where part of the allow-list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyOrigin {
    /// `<schema_dir>/trusted_templates.json`
    SchemaDir,
    /// `<schema_dir>/.lrc/trusted_templates.json`
    SchemaLrcDir,
    /// `<user_config_dir>/trusted_templates.json`
    User,
    /// Compiled-in defaults.
    BuiltIn,
}

impl fmt::Display for PolicyOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::SchemaDir => "schema directory",
            Self::SchemaLrcDir => "schema .lrc directory",
            Self::User => "user config",
            Self::BuiltIn => "built-in",
        };
        f.write_str(label)
    }
}

/// One contribution to the allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicySource {
    /// Which layer.
    pub origin: PolicyOrigin,
    /// Policy file read, if any.
    pub path: Option<PathBuf>,
    /// Normalized names it declared.
    pub names: BTreeSet<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PolicyFile {
    List(Vec<String>),
    Object { templates: Vec<String> },
}

impl PolicyFile {
    fn into_names(self) -> Vec<String> {
        match self {
            Self::List(names) | Self::Object { templates: names } => names,
        }
    }
}

/// Immutable allow-list of template names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustPolicy {
    names: BTreeSet<String>,
    sources: Vec<PolicySource>,
}

impl TrustPolicy {
    /// Read and union every policy layer.
    ///
    /// Missing files contribute nothing.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::Policy`] if a policy file exists but is not a
    /// JSON list of names (or an object with a `templates` list), and
    /// [`CompileError::Io`] if it cannot be read.
    pub fn resolve(schema_dir: &Path, user_config_dir: Option<&Path>) -> Result<Self, CompileError> {
        let mut candidates = vec![
            (PolicyOrigin::SchemaDir, schema_dir.join(POLICY_FILE)),
            (
                PolicyOrigin::SchemaLrcDir,
                schema_dir.join(".lrc").join(POLICY_FILE),
            ),
        ];
        if let Some(dir) = user_config_dir {
            candidates.push((PolicyOrigin::User, dir.join(POLICY_FILE)));
        }

        let mut sources = Vec::new();
        for (origin, path) in candidates {
            if let Some(names) = read_policy_file(&path)? {
                tracing::debug!("trust policy {}: {} name(s)", path.display(), names.len());
                sources.push(PolicySource {
                    origin,
                    path: Some(path),
                    names,
                });
            }
        }
        sources.push(builtin_source());
        Ok(Self::from_sources(sources))
    }

    /// Policy containing exactly `names` (after normalization).
    #[must_use]
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_sources(vec![PolicySource {
            origin: PolicyOrigin::BuiltIn,
            path: None,
            names: names
                .into_iter()
                .filter_map(|n| normalize_name(n.as_ref()))
                .collect(),
        }])
    }

    /// Policy with only the built-in defaults.
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_sources(vec![builtin_source()])
    }

    fn from_sources(sources: Vec<PolicySource>) -> Self {
        let names = sources
            .iter()
            .flat_map(|s| s.names.iter().cloned())
            .collect();
        Self { names, sources }
    }

    /// Whether `name` is on the allow-list.
    #[must_use]
    pub fn is_trusted(&self, name: &str) -> bool {
        normalize_name(name).is_some_and(|n| self.names.contains(&n))
    }

    /// Every trusted name, sorted.
    #[must_use]
    pub const fn names(&self) -> &BTreeSet<String> {
        &self.names
    }

    /// Contributions in priority order.
    #[must_use]
    pub fn sources(&self) -> &[PolicySource] {
        &self.sources
    }
}

fn builtin_source() -> PolicySource {
    PolicySource {
        origin: PolicyOrigin::BuiltIn,
        path: None,
        names: BUILTIN_TEMPLATES.iter().map(|n| (*n).to_string()).collect(),
    }
}

fn normalize_name(name: &str) -> Option<String> {
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_ascii_lowercase())
}

fn read_policy_file(path: &Path) -> Result<Option<BTreeSet<String>>, CompileError> {
    if !path.is_file() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(path).map_err(|source| CompileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: PolicyFile = serde_json::from_str(&text).map_err(|e| CompileError::Policy {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(Some(
        parsed
            .into_names()
            .iter()
            .filter_map(|n| normalize_name(n))
            .collect(),
    ))
}
