//! Top-level subcommand orchestration.
pub mod build;
pub mod plan;
pub mod trust;
pub mod version;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::cli::GlobalOpts;
use crate::config::{self, SETTINGS_FILE, Settings};
use crate::exec::{Executor, SystemExecutor};
use crate::logging::Log;
use crate::plan::{CompileOptions, project_name};
use crate::platform::Platform;
use crate::schema::lexer::extract_metadata;
use crate::security::{GpgVerifier, SignaturePolicy};

/// Shared state produced by the common command setup sequence.
///
/// Encapsulates platform detection, directory lookup and settings loading
/// so that each command does not have to repeat the boilerplate.
#[derive(Debug)]
pub struct CommandSetup {
    /// Current platform.
    pub platform: Platform,
    /// Loaded user settings.
    pub settings: Settings,
    /// User config directory, if one could be determined.
    pub config_dir: Option<PathBuf>,
    /// Home directory, if one could be determined.
    pub home: Option<PathBuf>,
    /// Runs external programs (signature verification, audit).
    pub executor: Arc<dyn Executor>,
}

impl CommandSetup {
    /// Detect the platform, locate the config directory and load settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file exists but cannot be parsed.
    pub fn init(global: &GlobalOpts, log: &dyn Log) -> Result<Self> {
        let home = config::home_dir();
        let config_dir = config::user_config_dir();
        let settings_path = global
            .config
            .clone()
            .or_else(|| config_dir.as_ref().map(|d| d.join(SETTINGS_FILE)));
        let settings = match &settings_path {
            Some(path) => {
                log.debug(&format!("settings: {}", path.display()));
                Settings::load(path)
                    .with_context(|| format!("loading settings from {}", path.display()))?
            }
            None => Settings::default(),
        };

        Ok(Self {
            platform: Platform::detect(),
            settings,
            config_dir,
            home,
            executor: Arc::new(SystemExecutor),
        })
    }

    /// Compile options for `output_root`, with the signature requirement
    /// OR'd from the environment, the settings file and `require_signed`.
    #[must_use]
    pub fn compile_options(&self, output_root: &Path, require_signed: bool) -> CompileOptions {
        CompileOptions {
            output_root: output_root.to_path_buf(),
            user_config_dir: self.config_dir.clone(),
            signatures: SignaturePolicy::from_env()
                .or_require(self.settings.security.require_signed_includes)
                .or_require(require_signed),
            line_ending: self.settings.output.line_endings.resolve(&self.platform),
            mark_scripts_executable: self.platform.supports_chmod(),
            max_include_depth: self.settings.limits.max_include_depth,
        }
    }

    /// Signature verifier using the configured program.
    #[must_use]
    pub fn verifier(&self) -> GpgVerifier {
        GpgVerifier::new(
            Arc::clone(&self.executor),
            self.settings.security.signature_program.clone(),
        )
    }

    /// Output directory for `schema`: `explicit`, or derived from the
    /// schema's project name and the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be read.
    pub fn output_dir(&self, schema: &Path, explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(dir) = explicit {
            return Ok(dir.to_path_buf());
        }
        let text = std::fs::read_to_string(schema)
            .with_context(|| format!("reading schema {}", schema.display()))?;
        let metadata = extract_metadata(&text);
        let project = project_name(metadata.project.as_deref(), schema);
        Ok(self
            .settings
            .output_dir(None, &project, self.home.as_deref()))
    }
}
