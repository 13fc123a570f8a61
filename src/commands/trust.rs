//! Command: show the effective template allow-list.
use std::io::Write as _;

use anyhow::{Context as _, Result};

use crate::cli::{GlobalOpts, TrustOpts};
use crate::logging::Logger;
use crate::security::TrustPolicy;

use super::CommandSetup;

/// Run the trust command.
///
/// # Errors
///
/// Returns an error if a policy file is malformed or stdout cannot be
/// written.
pub fn run(global: &GlobalOpts, opts: &TrustOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let dir = match &opts.dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("resolving current directory")?,
    };
    let policy = TrustPolicy::resolve(&dir, setup.config_dir.as_deref())?;

    let mut out = std::io::stdout().lock();
    writeln!(out, "{}", format_policy(&policy)).context("writing trust policy")?;
    Ok(())
}

fn format_policy(policy: &TrustPolicy) -> String {
    let mut lines = vec![format!(
        "allowed templates: {}",
        policy.names().iter().cloned().collect::<Vec<_>>().join(", ")
    )];
    for source in policy.sources() {
        let path = source
            .path
            .as_ref()
            .map_or_else(String::new, |p| format!(" ({})", p.display()));
        let names = source.names.iter().cloned().collect::<Vec<_>>().join(", ");
        lines.push(format!("  {}{path}: {names}", source.origin));
    }
    lines.join("\n")
}
