//! User settings for `lrc`.
//!
//! Settings live in `config.toml` inside the user config directory
//! (`$XDG_CONFIG_HOME/lrc`, falling back to `~/.config/lrc`). Every key is
//! optional; a missing file means defaults throughout.
pub mod toml_loader;

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::platform::{LineEnding, Platform};
use crate::plan::sanitize_dir_name;
use crate::schema::parser::DEFAULT_MAX_INCLUDE_DEPTH;

/// Settings file name inside the user config directory.
pub const SETTINGS_FILE: &str = "config.toml";

/// Default audit config file name inside the user config directory.
pub const AUDIT_CONFIG_FILE: &str = "audit.json";

/// Parsed `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// `[security]`
    pub security: SecuritySettings,
    /// `[output]`
    pub output: OutputSettings,
    /// `[limits]`
    pub limits: LimitSettings,
    /// `[audit]`
    pub audit: AuditSettings,
}

/// `[security]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
    /// Require a valid signature on every included schema.
    pub require_signed_includes: bool,
    /// Program used to verify detached signatures.
    pub signature_program: String,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            require_signed_includes: false,
            signature_program: "gpg".to_string(),
        }
    }
}

/// Line ending preference as written in the settings file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEndings {
    /// Whatever the current platform uses.
    #[default]
    Native,
    /// Always `\n`.
    Unix,
    /// Always `\r\n`.
    Windows,
}

impl LineEndings {
    /// Resolve to a concrete [`LineEnding`] for `platform`.
    #[must_use]
    pub const fn resolve(self, platform: &Platform) -> LineEnding {
        match self {
            Self::Native => platform.line_ending(),
            Self::Unix => LineEnding::Unix,
            Self::Windows => LineEnding::Windows,
        }
    }
}

/// `[output]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Parent directory for builds without `--output`; `~` is expanded.
    pub default_dir: Option<PathBuf>,
    /// Line endings of generated files.
    pub line_endings: LineEndings,
}

/// `[limits]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LimitSettings {
    /// Maximum `@include` nesting.
    pub max_include_depth: usize,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }
}

/// `[audit]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AuditSettings {
    /// Audit config path; defaults to `audit.json` in the config directory.
    pub config: Option<PathBuf>,
}

impl Settings {
    /// Load settings from `path`; a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        toml_loader::load_config(path)
    }

    /// Where to look for the audit config.
    #[must_use]
    pub fn audit_config_path(&self, config_dir: Option<&Path>, home: Option<&Path>) -> Option<PathBuf> {
        self.audit
            .config
            .as_deref()
            .map(|p| expand_home(p, home))
            .or_else(|| config_dir.map(|d| d.join(AUDIT_CONFIG_FILE)))
    }

    /// Output directory for `project`.
    ///
    /// An explicit directory wins; otherwise the sanitized project name is
    /// placed under `output.default_dir`, or under the current directory.
    #[must_use]
    pub fn output_dir(&self, explicit: Option<&Path>, project: &str, home: Option<&Path>) -> PathBuf {
        if let Some(dir) = explicit {
            return dir.to_path_buf();
        }
        let name = sanitize_dir_name(project);
        self.output.default_dir.as_deref().map_or_else(
            || PathBuf::from(".").join(&name),
            |base| expand_home(base, home).join(&name),
        )
    }
}

/// Expand a leading `~` to `home`.
///
/// # Examples
///
/// ```
/// use std::path::{Path, PathBuf};
/// use lrc_cli::config::expand_home;
///
/// let home = Path::new("/home/ada");
/// assert_eq!(expand_home(Path::new("~/projects"), Some(home)), PathBuf::from("/home/ada/projects"));
/// assert_eq!(expand_home(Path::new("/srv"), Some(home)), PathBuf::from("/srv"));
/// ```
#[must_use]
pub fn expand_home(path: &Path, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// User config directory: `$XDG_CONFIG_HOME/lrc`, else `<home>/.config/lrc`.
#[must_use]
pub fn user_config_dir_from(xdg_config_home: Option<&str>, home: Option<&Path>) -> Option<PathBuf> {
    xdg_app_dir(xdg_config_home, home, ".config")
}

/// User cache directory: `$XDG_CACHE_HOME/lrc`, else `<home>/.cache/lrc`.
///
/// Holds the per-command run logs.
#[must_use]
pub fn user_cache_dir_from(xdg_cache_home: Option<&str>, home: Option<&Path>) -> Option<PathBuf> {
    xdg_app_dir(xdg_cache_home, home, ".cache")
}

fn xdg_app_dir(xdg: Option<&str>, home: Option<&Path>, fallback: &str) -> Option<PathBuf> {
    xdg.filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| home.map(|h| h.join(fallback)))
        .map(|base| base.join("lrc"))
}

/// Home directory from `HOME`, else `USERPROFILE`.
#[must_use]
pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// User config directory for the current environment.
#[must_use]
pub fn user_config_dir() -> Option<PathBuf> {
    let xdg = std::env::var("XDG_CONFIG_HOME").ok();
    user_config_dir_from(xdg.as_deref(), home_dir().as_deref())
}

/// User cache directory for the current environment.
#[must_use]
pub fn user_cache_dir() -> Option<PathBuf> {
    let xdg = std::env::var("XDG_CACHE_HOME").ok();
    user_cache_dir_from(xdg.as_deref(), home_dir().as_deref())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Settings {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn empty_settings_use_defaults() {
        let settings = parse("");
        assert!(!settings.security.require_signed_includes);
        assert_eq!(settings.security.signature_program, "gpg");
        assert_eq!(settings.limits.max_include_depth, DEFAULT_MAX_INCLUDE_DEPTH);
        assert_eq!(settings.output.line_endings, LineEndings::Native);
        assert!(settings.output.default_dir.is_none());
    }

    #[test]
    fn full_settings_parse() {
        let settings = parse(
            r#"
[security]
require_signed_includes = true
signature_program = "gpg2"

[output]
default_dir = "~/projects"
line_endings = "windows"

[limits]
max_include_depth = 4

[audit]
config = "/etc/lrc/audit.json"
"#,
        );
        assert!(settings.security.require_signed_includes);
        assert_eq!(settings.security.signature_program, "gpg2");
        assert_eq!(settings.output.line_endings, LineEndings::Windows);
        assert_eq!(settings.limits.max_include_depth, 4);
        assert_eq!(
            settings.audit.config,
            Some(PathBuf::from("/etc/lrc/audit.json"))
        );
    }

    #[test]
    fn partial_table_keeps_other_defaults() {
        let settings = parse("[security]\nrequire_signed_includes = true\n");
        assert_eq!(settings.security.signature_program, "gpg");
    }

    #[test]
    fn unknown_line_ending_is_rejected() {
        assert!(toml::from_str::<Settings>("[output]\nline_endings = \"mac\"\n").is_err());
    }

    #[test]
    fn line_endings_resolve_against_platform() {
        use crate::platform::Os;
        let windows = Platform::new(Os::Windows);
        assert_eq!(LineEndings::Native.resolve(&windows), LineEnding::Windows);
        assert_eq!(LineEndings::Unix.resolve(&windows), LineEnding::Unix);
        assert_eq!(
            LineEndings::Windows.resolve(&Platform::new(Os::Linux)),
            LineEnding::Windows
        );
    }

    #[test]
    fn output_dir_precedence() {
        let home = Path::new("/home/ada");
        let mut settings = Settings::default();
        assert_eq!(
            settings.output_dir(Some(Path::new("/tmp/x")), "My App", Some(home)),
            PathBuf::from("/tmp/x")
        );
        assert_eq!(
            settings.output_dir(None, "My App", Some(home)),
            PathBuf::from("./My_App")
        );
        settings.output.default_dir = Some(PathBuf::from("~/projects"));
        assert_eq!(
            settings.output_dir(None, "My App", Some(home)),
            PathBuf::from("/home/ada/projects/My_App")
        );
    }

    #[test]
    fn audit_config_path_defaults_to_config_dir() {
        let mut settings = Settings::default();
        let dir = Path::new("/home/ada/.config/lrc");
        assert_eq!(
            settings.audit_config_path(Some(dir), None),
            Some(dir.join(AUDIT_CONFIG_FILE))
        );
        settings.audit.config = Some(PathBuf::from("~/audit.json"));
        assert_eq!(
            settings.audit_config_path(Some(dir), Some(Path::new("/home/ada"))),
            Some(PathBuf::from("/home/ada/audit.json"))
        );
        assert_eq!(Settings::default().audit_config_path(None, None), None);
    }

    #[test]
    fn config_dir_prefers_xdg() {
        assert_eq!(
            user_config_dir_from(Some("/xdg"), Some(Path::new("/home/ada"))),
            Some(PathBuf::from("/xdg/lrc"))
        );
        assert_eq!(
            user_config_dir_from(Some(""), Some(Path::new("/home/ada"))),
            Some(PathBuf::from("/home/ada/.config/lrc"))
        );
        assert_eq!(user_config_dir_from(None, None), None);
    }

    #[test]
    fn cache_dir_prefers_xdg_then_home() {
        let home = Path::new("/home/ada");
        assert_eq!(
            user_cache_dir_from(Some("/var/cache"), Some(home)),
            Some(PathBuf::from("/var/cache/lrc"))
        );
        assert_eq!(
            user_cache_dir_from(None, Some(home)),
            Some(PathBuf::from("/home/ada/.cache/lrc"))
        );
        assert_eq!(user_cache_dir_from(Some(""), None), None);
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "[limits]\nmax_include_depth = 2\n").unwrap();
        assert_eq!(Settings::load(&path).unwrap().limits.max_include_depth, 2);
    }
}
