//! Side-effect-free renderings of a [`BuildPlan`].
use std::fmt::Write as _;
use std::path::Path;

use super::{BuildPlan, Operation};

/// Human-readable listing with paths relative to the output root.
///
/// Copy sources are shown relative to the schema directory.
#[must_use]
pub fn render_text(plan: &BuildPlan) -> String {
    let schema_dir = plan.source().parent().unwrap_or_else(|| Path::new(""));
    let mut out = String::new();
    // write! to a String is infallible; unwrap_or(()) makes that explicit.
    writeln!(
        out,
        "plan: {} ({} action{})",
        plan.project_name(),
        plan.actions().len(),
        if plan.actions().len() == 1 { "" } else { "s" }
    )
    .unwrap_or(());

    for action in plan.actions() {
        let target = display(plan.relative(action.op.target()));
        let detail = match &action.op {
            Operation::MakeDir { .. } => format!("{target}/"),
            Operation::WriteFile { content, .. } => {
                format!("{target} ({} bytes)", content.len())
            }
            Operation::Chmod { mode, .. } => format!("{target} {mode:04o}"),
            Operation::Copy { source, .. } => {
                let source = source.strip_prefix(schema_dir).unwrap_or(source);
                format!("{target} <- {}", display(source))
            }
            Operation::Symlink { target: link_target, .. } => {
                format!("{target} -> {}", display(link_target))
            }
        };
        let indent = "  ".repeat(action.depth);
        writeln!(
            out,
            "{:>4}  {:<7}  {indent}{detail}",
            action.seq,
            action.op.verb()
        )
        .unwrap_or(());
    }

    for diagnostic in plan.diagnostics() {
        let file = diagnostic
            .location
            .file
            .strip_prefix(schema_dir)
            .unwrap_or(&diagnostic.location.file);
        writeln!(
            out,
            "{}:{}: {}: {}",
            display(file),
            diagnostic.location.line,
            diagnostic.severity.label(),
            diagnostic.message
        )
        .unwrap_or(());
    }
    out
}

/// Pretty JSON form of the plan.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_json(plan: &BuildPlan) -> serde_json::Result<String> {
    serde_json::to_string_pretty(plan)
}

/// Forward-slash path display, so listings read the same on every OS.
fn display(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::plan::{PlanParts, PlannedAction};
    use crate::schema::{Diagnostic, Metadata, SourceLocation};
    use std::path::PathBuf;

    fn sample() -> BuildPlan {
        let loc = SourceLocation::new("/s/app.lrc", 1);
        let action = |seq, depth, op| PlannedAction {
            seq,
            depth,
            origin: loc.clone(),
            op,
        };
        PlanParts {
            source: PathBuf::from("/s/app.lrc"),
            root: PathBuf::from("/out"),
            metadata: Metadata {
                project: Some("app".into()),
                ..Metadata::default()
            },
            actions: vec![
                action(1, 0, Operation::MakeDir {
                    path: PathBuf::from("/out/src"),
                }),
                action(2, 1, Operation::WriteFile {
                    path: PathBuf::from("/out/src/main.rs"),
                    content: "fn main() {}\n".into(),
                }),
                action(3, 0, Operation::Copy {
                    source: PathBuf::from("/s/assets/logo.svg"),
                    dest: PathBuf::from("/out/logo.svg"),
                }),
            ],
            diagnostics: vec![Diagnostic::warning(
                SourceLocation::new("/s/app.lrc", 4),
                "trailing whitespace",
            )],
            ..PlanParts::default()
        }
        .into()
    }

    #[test]
    fn text_listing_is_root_relative() {
        let text = render_text(&sample());
        assert_eq!(
            text,
            "plan: app (3 actions)\n   \
             1  mkdir    src/\n   \
             2  write      src/main.rs (13 bytes)\n   \
             3  copy     logo.svg <- assets/logo.svg\n\
             app.lrc:4: warning: trailing whitespace\n"
        );
    }

    #[test]
    fn json_contains_operations() {
        let json = render_json(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["actions"][1]["op"], "write_file");
        assert_eq!(value["actions"][1]["seq"], 2);
    }
}
