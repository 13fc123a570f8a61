//! Command: print version information.
use std::io::Write as _;

use anyhow::{Context as _, Result};

/// Version string, preferring the one stamped by the build script.
#[must_use]
pub fn version() -> &'static str {
    option_env!("LRC_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Print the lrc version to stdout.
///
/// # Errors
///
/// Returns an error if stdout cannot be written.
pub fn run() -> Result<()> {
    writeln!(std::io::stdout().lock(), "lrc {}", version()).context("writing version")
}
