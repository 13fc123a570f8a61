//! Applies a [`BuildPlan`] to the filesystem.
//!
//! Actions run strictly in plan order. Each one is mapped to an idempotent
//! [`Resource`], checked, and only changed when it differs from the desired
//! state. Failures are logged and counted so one bad action does not hide
//! the rest of the run.
use crate::logging::Log;
use crate::plan::{BuildPlan, Operation, PlannedAction};
use crate::resources::error::ResourceError;
use crate::resources::{
    ChmodResource, CopyResource, DirectoryResource, FileResource, Resource, ResourceChange,
    ResourceState, SymlinkResource,
};
use crate::security::paths::{is_within, normalize};

/// How a plan is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Log what would happen without touching storage.
    pub dry_run: bool,
    /// Replace existing files, links and copies whose content differs.
    pub force: bool,
}

/// Counters for one plan application.
///
/// # Examples
///
/// ```
/// use lrc_cli::apply::ApplyStats;
///
/// let stats = ApplyStats { changed: 3, already_ok: 10, ..ApplyStats::default() };
/// assert_eq!(stats.summary(false), "3 changed, 10 already ok");
/// assert_eq!(stats.summary(true), "3 would change, 10 already ok");
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ApplyStats {
    /// Actions applied (or that would be, in dry-run mode).
    pub changed: u32,
    /// Actions already in the desired state.
    pub already_ok: u32,
    /// Actions left alone (existing content kept, unsupported platform).
    pub skipped: u32,
    /// Actions that failed.
    pub failed: u32,
}

impl ApplyStats {
    /// Format the summary string (e.g. "3 changed, 10 already ok, 1 skipped").
    #[must_use]
    pub fn summary(&self, dry_run: bool) -> String {
        let verb = if dry_run { "would change" } else { "changed" };
        let mut out = format!("{} {verb}, {} already ok", self.changed, self.already_ok);
        if self.skipped > 0 {
            out.push_str(&format!(", {} skipped", self.skipped));
        }
        if self.failed > 0 {
            out.push_str(&format!(", {} failed", self.failed));
        }
        out
    }
}

/// Map a plan operation to the resource that realises it.
#[must_use]
pub fn resource_for(op: &Operation) -> Box<dyn Resource> {
    match op {
        Operation::MakeDir { path } => Box::new(DirectoryResource::new(path.clone())),
        Operation::WriteFile { path, content } => {
            Box::new(FileResource::new(path.clone(), content.clone()))
        }
        Operation::Chmod { path, mode } => Box::new(ChmodResource::new(path.clone(), *mode)),
        Operation::Copy { source, dest } => {
            Box::new(CopyResource::new(source.clone(), dest.clone()))
        }
        Operation::Symlink { target, link } => {
            Box::new(SymlinkResource::new(target.clone(), link.clone()))
        }
    }
}

/// Apply every action of `plan` in `seq` order.
#[must_use]
pub fn apply_plan(plan: &BuildPlan, opts: &ApplyOptions, log: &dyn Log) -> ApplyStats {
    let mut stats = ApplyStats::default();
    for action in plan.actions() {
        let resource = resource_for(&action.op);
        if opts.dry_run {
            log.dry_run(&format!(
                "would {} {}",
                action.op.verb(),
                resource.description()
            ));
            stats.changed += 1;
            continue;
        }
        apply_action(plan, action, resource.as_ref(), opts, log, &mut stats);
    }
    stats
}

fn apply_action(
    plan: &BuildPlan,
    action: &PlannedAction,
    resource: &dyn Resource,
    opts: &ApplyOptions,
    log: &dyn Log,
    stats: &mut ApplyStats,
) {
    let desc = resource.description();
    let target = normalize(action.op.target());
    if !is_within(plan.root(), &target) {
        let err = ResourceError::OutsideRoot {
            path: target,
            root: plan.root().to_path_buf(),
        };
        log.error(&format!("{}: {err}", action.origin));
        stats.failed += 1;
        return;
    }

    let state = match resource.current_state() {
        Ok(state) => state,
        Err(e) => {
            log.error(&format!("{}: failed to check {desc}: {e:#}", action.origin));
            stats.failed += 1;
            return;
        }
    };

    match state {
        ResourceState::Correct => {
            log.debug(&format!("ok: {desc}"));
            stats.already_ok += 1;
            return;
        }
        ResourceState::Invalid { reason } => {
            let err = ResourceError::InvalidState {
                resource: desc,
                reason,
            };
            log.error(&format!("{}: {err}", action.origin));
            stats.failed += 1;
            return;
        }
        ResourceState::Incorrect { current } if resource.replaces_content() && !opts.force => {
            log.warn(&format!(
                "keeping existing {desc} ({current}); use --force to replace"
            ));
            stats.skipped += 1;
            return;
        }
        ResourceState::Missing | ResourceState::Incorrect { .. } => {}
    }

    match resource.apply() {
        Ok(ResourceChange::Applied) => {
            log.debug(&format!("{}: {desc}", action.op.verb()));
            stats.changed += 1;
        }
        Ok(ResourceChange::AlreadyCorrect) => stats.already_ok += 1,
        Ok(ResourceChange::Skipped { reason }) => {
            log.warn(&format!("skipped {desc}: {reason}"));
            stats.skipped += 1;
        }
        Err(e) => {
            log.error(&format!(
                "{}: failed to {} {desc}: {e:#}",
                action.origin,
                action.op.verb()
            ));
            stats.failed += 1;
        }
    }
}
