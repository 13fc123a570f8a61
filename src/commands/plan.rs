//! Command: compile a schema and print the resulting plan.
use std::io::Write as _;

use anyhow::{Context as _, Result};

use crate::cli::{GlobalOpts, PlanFormat, PlanOpts};
use crate::logging::Logger;
use crate::plan::compile_schema_path;
use crate::plan::render::{render_json, render_text};

use super::CommandSetup;

/// Run the plan command. Nothing under the output directory is touched.
///
/// # Errors
///
/// Returns an error if settings cannot be loaded, the schema fails to
/// compile, or stdout cannot be written.
pub fn run(global: &GlobalOpts, opts: &PlanOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let output_dir = setup.output_dir(&opts.schema, opts.output.as_deref())?;
    let options = setup.compile_options(&output_dir, false);
    let plan = compile_schema_path(&opts.schema, &options, &setup.verifier())
        .with_context(|| format!("compiling {}", opts.schema.display()))?;

    let rendered = match opts.format {
        PlanFormat::Text => render_text(&plan),
        PlanFormat::Json => render_json(&plan).context("serializing plan")?,
    };
    let mut out = std::io::stdout().lock();
    writeln!(out, "{}", rendered.trim_end()).context("writing plan")?;
    Ok(())
}
