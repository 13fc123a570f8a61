//! Build manifest recorded next to a generated tree.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use serde::Serialize;

use super::BuildPlan;
use crate::audit::AuditSummary;
use crate::schema::Metadata;
use crate::security::SignatureReport;

/// Manifest file name inside the output directory.
pub const MANIFEST_FILE: &str = ".lrc-build.json";

/// What was built, from which schema, and how it was checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildManifest {
    /// Top-level schema file.
    pub schema: PathBuf,
    /// Output root the plan was compiled against.
    pub root: PathBuf,
    /// Resolved project name.
    pub project: String,
    /// Schema metadata.
    pub metadata: Metadata,
    /// Variables bound at the end of the top-level schema.
    pub variables: BTreeMap<String, String>,
    /// Ignore globs active at the end of the top-level schema.
    pub ignores: Vec<String>,
    /// Signature outcome for every schema file read.
    pub signatures: Vec<SignatureReport>,
    /// [`BuildPlan::fingerprint`].
    pub fingerprint: String,
    /// Number of planned actions.
    pub actions: usize,
    /// Directory the manifest was written to.
    pub output_dir: PathBuf,
    /// RFC 3339 UTC timestamp.
    pub generated_at: String,
    /// Post-build audit result, when one ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit: Option<AuditSummary>,
}

impl BuildManifest {
    /// Snapshot `plan` for `output_dir`.
    #[must_use]
    pub fn new(plan: &BuildPlan, output_dir: &Path, audit: Option<AuditSummary>) -> Self {
        Self {
            schema: plan.source().to_path_buf(),
            root: plan.root().to_path_buf(),
            project: plan.project_name(),
            metadata: plan.metadata().clone(),
            variables: plan.variables().clone(),
            ignores: plan.ignores().to_vec(),
            signatures: plan.signatures().to_vec(),
            fingerprint: plan.fingerprint(),
            actions: plan.actions().len(),
            output_dir: output_dir.to_path_buf(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            audit,
        }
    }

    /// Write the manifest as pretty JSON to `<output_dir>/.lrc-build.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn write(&self) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("creating {}", self.output_dir.display()))?;
        let path = self.output_dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(self).context("serializing build manifest")?;
        std::fs::write(&path, json + "\n")
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }
}
