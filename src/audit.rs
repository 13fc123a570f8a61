//! Post-build audit trigger.
//!
//! An audit is an external command configured in a small JSON file. It runs
//! once, after a real build, from inside the output directory. Only the
//! trigger contract lives here; the audit tool itself is out of scope.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};

use crate::exec::Executor;

/// Summary file written into the output directory.
pub const AUDIT_FILE: &str = ".lrc-audit.json";

/// Placeholder replaced with the absolute output directory.
pub const BUILD_DIR_PLACEHOLDER: &str = "${BUILD_DIR}";

/// Audit command line, as a single string or an argument list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AuditCommand {
    /// Whitespace-separated command line.
    Line(String),
    /// Program followed by its arguments.
    Args(Vec<String>),
}

impl AuditCommand {
    /// Split into `[program, args...]`.
    #[must_use]
    pub fn argv(&self) -> Vec<String> {
        match self {
            Self::Line(line) => line.split_whitespace().map(ToString::to_string).collect(),
            Self::Args(args) => args.clone(),
        }
    }
}

impl Default for AuditCommand {
    fn default() -> Self {
        Self::Args(Vec::new())
    }
}

/// Contents of the audit config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuditConfig {
    /// Whether the audit should run at all.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Command to run.
    #[serde(default)]
    pub command: AuditCommand,
    /// Extra environment for the command.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

const fn enabled_by_default() -> bool {
    true
}

/// Load the audit config at `path`; a missing file yields `None`.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or is not valid
/// audit JSON.
pub fn load_config(path: &Path) -> Result<Option<AuditConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read audit config: {}", path.display()))?;
    let config = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse audit config: {}", path.display()))?;
    Ok(Some(config))
}

/// Outcome of an audit run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    /// Command exited with status 0.
    Passed,
    /// Command exited non-zero or could not be started.
    Failed,
    /// No config, audit disabled, or no command configured.
    Skipped,
}

/// Recorded result of an audit run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditSummary {
    /// Outcome.
    pub status: AuditStatus,
    /// The command as executed, after placeholder substitution.
    pub command: Vec<String>,
    /// Process exit code, when the command ran to completion.
    pub exit_code: Option<i32>,
    /// Human-readable detail.
    pub message: String,
}

impl AuditSummary {
    fn skipped(message: &str) -> Self {
        Self {
            status: AuditStatus::Skipped,
            command: Vec::new(),
            exit_code: None,
            message: message.to_string(),
        }
    }

    /// Write the summary to `<build_dir>/.lrc-audit.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(&self, build_dir: &Path) -> Result<PathBuf> {
        let path = build_dir.join(AUDIT_FILE);
        let json = serde_json::to_string_pretty(self).context("serializing audit summary")?;
        std::fs::write(&path, json + "\n")
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }
}

/// Run the configured audit against `build_dir`.
///
/// Never fails: spawn errors become a [`AuditStatus::Failed`] summary.
#[must_use]
pub fn run_audit(
    executor: &dyn Executor,
    config: Option<&AuditConfig>,
    build_dir: &Path,
) -> AuditSummary {
    let Some(config) = config else {
        return AuditSummary::skipped("no audit config");
    };
    if !config.enabled {
        return AuditSummary::skipped("audit disabled");
    }

    let dir = build_dir.to_string_lossy();
    let command: Vec<String> = config
        .command
        .argv()
        .iter()
        .map(|arg| arg.replace(BUILD_DIR_PLACEHOLDER, &dir))
        .collect();
    let Some((program, args)) = command.split_first() else {
        return AuditSummary::skipped("no audit command configured");
    };
    let env: Vec<(String, String)> = config
        .env
        .iter()
        .map(|(k, v)| (k.clone(), v.replace(BUILD_DIR_PLACEHOLDER, &dir)))
        .collect();

    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let env_refs: Vec<(&str, &str)> = env.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    tracing::debug!("running audit: {}", command.join(" "));

    match executor.run_in_with_env_unchecked(build_dir, program, &args, &env_refs) {
        Ok(result) if result.success => AuditSummary {
            status: AuditStatus::Passed,
            exit_code: result.code,
            message: "audit passed".to_string(),
            command,
        },
        Ok(result) => {
            let detail = result
                .stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("")
                .trim()
                .to_string();
            AuditSummary {
                status: AuditStatus::Failed,
                exit_code: result.code,
                message: if detail.is_empty() {
                    "audit failed".to_string()
                } else {
                    format!("audit failed: {detail}")
                },
                command,
            }
        }
        Err(e) => AuditSummary {
            status: AuditStatus::Failed,
            exit_code: None,
            message: format!("{e:#}"),
            command,
        },
    }
}
