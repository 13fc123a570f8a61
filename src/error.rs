//! Domain-specific error types for the schema compiler.
//!
//! This module provides a structured error hierarchy using [`thiserror`].
//! Internal modules return typed errors (e.g., [`CompileError`], [`ConfigError`])
//! while command handlers at the CLI boundary convert them to [`anyhow::Error`]
//! via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! LrcError
//! ├── Config(ConfigError)      — settings file loading
//! ├── Compile(CompileError)    — lexing, parsing, trust, signatures, plan compilation
//! └── Resource(ResourceError)  — applying a build plan to the filesystem
//! ```
//!
//! Every [`CompileError`] is fatal to the compile that raised it: no partial
//! [`BuildPlan`](crate::plan::BuildPlan) is ever produced.

use std::path::PathBuf;

use thiserror::Error;

pub use crate::resources::error::ResourceError;
use crate::schema::SourceLocation;

/// Top-level error type for the schema compiler.
///
/// Aggregates domain-specific sub-errors and is convertible to
/// [`anyhow::Error`] for use at CLI command boundaries.
#[derive(Error, Debug)]
pub enum LrcError {
    /// Configuration-related error (settings file, audit config).
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Schema compilation error.
    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    /// Error applying a build plan.
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),
}

/// Errors that arise from loading user configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The settings file could not be read.
    #[error("IO error reading config file {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The settings file is not valid TOML or has the wrong shape.
    #[error("Invalid config syntax in {file}: {message}")]
    InvalidSyntax {
        /// Path of the offending file.
        file: String,
        /// Parser message.
        message: String,
    },
}

/// Errors raised while turning schema text into a build plan.
#[derive(Error, Debug)]
pub enum CompileError {
    /// Malformed directive, unterminated heredoc, bad indentation, missing include.
    #[error("{location}: {message} (at `{token}`)")]
    Parse {
        /// Where the defect is.
        location: SourceLocation,
        /// What is wrong.
        message: String,
        /// The offending text.
        token: String,
    },

    /// A `${NAME}` reference with no binding in scope.
    #[error("{location}: undefined variable `{name}`")]
    UndefinedVariable {
        /// Where the reference appears.
        location: SourceLocation,
        /// Variable name.
        name: String,
    },

    /// A `@template` whose name is not on the allow-list.
    #[error("{location}: template `{template}` is not trusted")]
    Trust {
        /// Where the template is referenced.
        location: SourceLocation,
        /// Template name as written.
        template: String,
    },

    /// A signature that is missing when required, or fails verification.
    #[error("{location}: signature check failed for {}: {reason}", path.display())]
    Signature {
        /// Where the signed file is referenced.
        location: SourceLocation,
        /// The signed file.
        path: PathBuf,
        /// Why verification failed.
        reason: String,
    },

    /// An include chain that revisits a file already being resolved.
    #[error("{location}: include cycle detected: {chain}")]
    IncludeCycle {
        /// The `@include` that closes the cycle.
        location: SourceLocation,
        /// Rendered chain, e.g. `a.lrc → b.lrc → a.lrc`.
        chain: String,
    },

    /// The signature verification tool is not installed and signatures are mandatory.
    #[error("{location}: `{tool}` is not available to verify {}", path.display())]
    ToolUnavailable {
        /// Where the signed file is referenced.
        location: SourceLocation,
        /// Missing program name.
        tool: String,
        /// The file that needed verification.
        path: PathBuf,
    },

    /// A resolved path that lies outside its base directory.
    #[error("{location}: path `{path}` escapes {}", base.display())]
    PathEscape {
        /// Where the path is declared.
        location: SourceLocation,
        /// The path as written (after variable expansion).
        path: String,
        /// The directory it must stay within.
        base: PathBuf,
    },

    /// A trust policy file that exists but cannot be understood.
    #[error("invalid trusted template policy {}: {message}", path.display())]
    Policy {
        /// Path of the policy file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// A schema or include that cannot be read.
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

impl CompileError {
    /// Shorthand for a [`CompileError::Parse`].
    pub fn parse(
        location: SourceLocation,
        message: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self::Parse {
            location,
            message: message.into(),
            token: token.into(),
        }
    }

    /// Source location of the defect, when the error has one.
    #[must_use]
    pub const fn location(&self) -> Option<&SourceLocation> {
        match self {
            Self::Parse { location, .. }
            | Self::UndefinedVariable { location, .. }
            | Self::Trust { location, .. }
            | Self::Signature { location, .. }
            | Self::IncludeCycle { location, .. }
            | Self::ToolUnavailable { location, .. }
            | Self::PathEscape { location, .. } => Some(location),
            Self::Policy { .. } | Self::Io { .. } => None,
        }
    }
}
