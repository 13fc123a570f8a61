//! Command: compile a schema and build its tree.
use anyhow::{Context as _, Result};

use crate::apply::{ApplyOptions, apply_plan};
use crate::audit::{self, AuditStatus, run_audit};
use crate::cli::{BuildOpts, GlobalOpts};
use crate::logging::{Log, Logger, StepStatus};
use crate::plan::compile_schema_path;
use crate::plan::manifest::BuildManifest;

use super::CommandSetup;

/// Run the build command.
///
/// # Errors
///
/// Returns an error if settings cannot be loaded, the schema fails to
/// compile, the manifest cannot be written, or any action or the audit
/// fails.
pub fn run(global: &GlobalOpts, opts: &BuildOpts, log: &Logger) -> Result<()> {
    log.info(&format!("lrc {}", super::version::version()));

    let setup = CommandSetup::init(global, log)?;
    let output_dir = setup.output_dir(&opts.schema, opts.output.as_deref())?;

    log.stage("Compiling schema");
    let options = setup.compile_options(&output_dir, opts.require_signed);
    let plan = compile_schema_path(&opts.schema, &options, &setup.verifier())
        .with_context(|| format!("compiling {}", opts.schema.display()))?;
    log.info(&format!(
        "project: {} ({} actions)",
        plan.project_name(),
        plan.actions().len()
    ));
    log.debug(&format!("output: {}", plan.root().display()));
    for diagnostic in plan.diagnostics() {
        log.diagnostic(diagnostic);
    }
    log.record_step("compile", StepStatus::Ok, Some(&plan.fingerprint()));

    log.stage("Applying plan");
    let apply_opts = ApplyOptions {
        dry_run: global.dry_run,
        force: opts.force,
    };
    let stats = apply_plan(&plan, &apply_opts, log);
    let apply_status = if stats.failed > 0 {
        StepStatus::Failed
    } else if global.dry_run {
        StepStatus::DryRun
    } else {
        StepStatus::Ok
    };
    log.record_step("apply", apply_status, Some(&stats.summary(global.dry_run)));

    if global.dry_run {
        log.record_step("manifest", StepStatus::DryRun, None);
    } else {
        std::fs::create_dir_all(plan.root())
            .with_context(|| format!("creating {}", plan.root().display()))?;
        let summary = if opts.audit {
            log.stage("Running audit");
            let config_path = opts.audit_config.clone().or_else(|| {
                setup
                    .settings
                    .audit_config_path(setup.config_dir.as_deref(), setup.home.as_deref())
            });
            let config = match &config_path {
                Some(path) => audit::load_config(path)?,
                None => None,
            };
            let summary = run_audit(setup.executor.as_ref(), config.as_ref(), plan.root());
            let status = match summary.status {
                AuditStatus::Passed => StepStatus::Ok,
                AuditStatus::Failed => StepStatus::Failed,
                AuditStatus::Skipped => StepStatus::Skipped,
            };
            log.record_step("audit", status, Some(&summary.message));
            summary.write(plan.root())?;
            Some(summary)
        } else {
            None
        };

        let path = BuildManifest::new(&plan, plan.root(), summary).write()?;
        log.debug(&format!("manifest: {}", path.display()));
        log.record_step("manifest", StepStatus::Ok, None);
    }

    log.print_summary();

    if log.failure_count() > 0 {
        anyhow::bail!("build of {} failed", opts.schema.display());
    }
    Ok(())
}
