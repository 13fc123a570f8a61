//! Typed error variants for applying a build plan.
//!
//! This module provides [`ResourceError`], a structured error type for
//! resource check and apply operations.  Callers convert to
//! [`anyhow::Error`] via `?`.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that arise from resource checks and apply operations.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// A planned path does not lie inside the plan's output root.
    #[error("refusing to write outside the output root: {path} (root {root})")]
    OutsideRoot {
        /// Offending path.
        path: PathBuf,
        /// Output root of the plan.
        root: PathBuf,
    },

    /// A resource exists but is in a state the plan cannot fix.
    #[error("invalid state for '{resource}': {reason}")]
    InvalidState {
        /// Description of the resource in the invalid state.
        resource: String,
        /// Human-readable explanation of why the state is invalid.
        reason: String,
    },
}
