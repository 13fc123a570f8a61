//! Schema front end: line classification, directives, variable scope,
//! ignore globs, built-in templates, and the recursive schema parser.
pub mod action;
pub mod directive;
pub mod ignore;
pub mod lexer;
pub mod parser;
pub mod scope;
pub mod templates;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

pub use action::{Action, ContentSource, Node, Schema};
pub use parser::{ParseSession, Parser};
pub use scope::Scope;

/// A `file:line` position inside a schema or include file.
///
/// # Examples
///
/// ```
/// use lrc_cli::schema::SourceLocation;
///
/// let loc = SourceLocation::new("project.lrc", 12);
/// assert_eq!(loc.to_string(), "project.lrc:12");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SourceLocation {
    /// Schema file the line belongs to.
    pub file: PathBuf,
    /// 1-based line number (0 when the error is not tied to a line).
    pub line: usize,
}

impl SourceLocation {
    /// Create a location.
    #[must_use]
    pub fn new(file: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// Location for a whole file rather than a specific line.
    #[must_use]
    pub fn file(file: &Path) -> Self {
        Self::new(file, 0)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}", self.file.display())
        } else {
            write!(f, "{}:{}", self.file.display(), self.line)
        }
    }
}

/// Free-form project metadata taken from `# Project:`-style comment lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    /// `# Project:` value.
    pub project: Option<String>,
    /// `# Description:` value.
    pub description: Option<String>,
    /// `# Version:` value.
    pub version: Option<String>,
}

impl Metadata {
    /// Record a metadata value unless the key was already seen.
    pub fn record(&mut self, key: MetadataKey, value: &str) {
        let slot = match key {
            MetadataKey::Project => &mut self.project,
            MetadataKey::Description => &mut self.description,
            MetadataKey::Version => &mut self.version,
        };
        if slot.is_none() && !value.is_empty() {
            *slot = Some(value.to_string());
        }
    }
}

/// Recognised metadata comment keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataKey {
    /// `# Project:`
    Project,
    /// `# Description:`
    Description,
    /// `# Version:`
    Version,
}

impl MetadataKey {
    /// All keys, in the order they are matched.
    pub const ALL: [Self; 3] = [Self::Project, Self::Description, Self::Version];

    /// Comment prefix for this key (matched case-insensitively).
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Project => "project:",
            Self::Description => "description:",
            Self::Version => "version:",
        }
    }

    /// Scope variable this key populates.
    #[must_use]
    pub const fn variable(self) -> &'static str {
        match self {
            Self::Project => "PROJECT",
            Self::Description => "DESCRIPTION",
            Self::Version => "VERSION",
        }
    }
}

/// Severity of a non-fatal [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational note.
    Info,
    /// Lint or degraded-policy warning.
    Warning,
}

impl Severity {
    /// Lowercase label used in listings.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
        }
    }
}

/// A non-fatal finding produced while compiling a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// How serious the finding is.
    pub severity: Severity,
    /// Where it was found.
    pub location: SourceLocation,
    /// Human-readable message.
    pub message: String,
}

impl Diagnostic {
    /// Create a warning.
    #[must_use]
    pub fn warning(location: SourceLocation, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            location,
            message: message.into(),
        }
    }

    /// Create an informational note.
    #[must_use]
    pub fn info(location: SourceLocation, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            location,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}: {}",
            self.location,
            self.severity.label(),
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_without_line_shows_file_only() {
        let loc = SourceLocation::file(Path::new("a.lrc"));
        assert_eq!(loc.to_string(), "a.lrc");
    }

    #[test]
    fn metadata_first_occurrence_wins() {
        let mut meta = Metadata::default();
        meta.record(MetadataKey::Project, "first");
        meta.record(MetadataKey::Project, "second");
        assert_eq!(meta.project.as_deref(), Some("first"));
    }

    #[test]
    fn metadata_ignores_empty_values() {
        let mut meta = Metadata::default();
        meta.record(MetadataKey::Version, "");
        meta.record(MetadataKey::Version, "1.0");
        assert_eq!(meta.version.as_deref(), Some("1.0"));
    }

    #[test]
    fn diagnostic_display() {
        let d = Diagnostic::warning(SourceLocation::new("s.lrc", 3), "trailing whitespace");
        assert_eq!(d.to_string(), "s.lrc:3: warning: trailing whitespace");
    }
}
