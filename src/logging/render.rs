//! Line rendering for the console and the run log.
//!
//! Rendering is kept apart from the tracing plumbing so both outputs can be
//! checked without installing a subscriber.
use std::borrow::Cow;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::Level;

/// Tracing target for stage headers.
pub(super) const STAGE_TARGET: &str = "lrc::stage";
/// Tracing target for dry-run action lines.
pub(super) const DRY_RUN_TARGET: &str = "lrc::dry_run";
/// Tracing target for schema diagnostics. Events carry `location` and
/// `severity` fields next to the message.
pub(super) const DIAGNOSTIC_TARGET: &str = "lrc::diagnostic";

/// How an event is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum LineKind<'a> {
    Stage,
    DryRun,
    /// A schema diagnostic, rendered compiler-style as `file:line: severity: msg`.
    Diagnostic {
        location: &'a str,
        severity: &'a str,
    },
    Plain(Level),
}

impl<'a> LineKind<'a> {
    /// Classify an event by its target.
    pub(super) fn classify(
        level: Level,
        target: &str,
        location: &'a str,
        severity: &'a str,
    ) -> Self {
        match target {
            STAGE_TARGET => Self::Stage,
            DRY_RUN_TARGET => Self::DryRun,
            DIAGNOSTIC_TARGET if !location.is_empty() => Self::Diagnostic { location, severity },
            _ => Self::Plain(level),
        }
    }
}

/// Colored console line, without the trailing newline.
pub(super) fn render_console(kind: LineKind<'_>, msg: &str) -> String {
    match kind {
        LineKind::Stage => format!("\x1b[1;36m::\x1b[0m \x1b[1m{msg}\x1b[0m"),
        LineKind::DryRun => format!("   \x1b[36mdry-run\x1b[0m {msg}"),
        LineKind::Diagnostic { location, severity } => {
            let color = if severity == "warning" { "33" } else { "2" };
            format!("\x1b[1m{location}:\x1b[0m \x1b[{color}m{severity}:\x1b[0m {msg}")
        }
        LineKind::Plain(Level::ERROR) => format!("\x1b[1;31merror:\x1b[0m {msg}"),
        LineKind::Plain(Level::WARN) => format!("\x1b[1;33mwarning:\x1b[0m {msg}"),
        LineKind::Plain(Level::INFO) => format!("   {msg}"),
        LineKind::Plain(_) => format!("   \x1b[2m{msg}\x1b[0m"),
    }
}

/// Plain run-log line stamped with `time`.
pub(super) fn render_file(time: &str, kind: LineKind<'_>, msg: &str) -> String {
    let msg = strip_ansi(msg);
    match kind {
        LineKind::Stage => format!("{time} :: {msg}"),
        LineKind::DryRun => format!("{time}    dry-run {msg}"),
        LineKind::Diagnostic { location, severity } => {
            format!("{time}    {location}: {severity}: {msg}")
        }
        LineKind::Plain(level) => {
            format!("{time}    {} {msg}", level.as_str().to_ascii_lowercase())
        }
    }
}

/// First line of every run log.
pub(super) fn run_header(version: &str, command: &str, started: DateTime<Utc>) -> String {
    format!(
        "# lrc {version} {command}, started {}\n",
        started.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

/// Wall-clock stamp for run-log lines.
pub(super) fn timestamp() -> String {
    Utc::now().format("%H:%M:%S%.3f").to_string()
}

/// Drop terminal escape sequences so the run log stays plain text.
///
/// `ESC [` starts a control sequence that runs up to a final byte in
/// `@`..=`~`; any other `ESC` swallows the one character after it.
pub(super) fn strip_ansi(text: &str) -> Cow<'_, str> {
    if !text.contains('\x1b') {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\x1b' {
            out.push(c);
        } else if chars.next_if_eq(&'[').is_some() {
            chars
                .by_ref()
                .take_while(|ch| !('@'..='~').contains(ch))
                .for_each(drop);
        } else {
            chars.next();
        }
    }
    Cow::Owned(out)
}
