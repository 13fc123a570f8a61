//! Recursive schema parser.
//!
//! Walks lexed lines in order, tracking directory nesting with an offside
//! rule, expanding variables through the active [`Scope`], and resolving
//! `@include` / `@template` against the run's security policy. Includes are
//! parsed depth-first in a child scope and spliced in place, so the
//! resulting tree is already in final document order.
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use super::action::{Action, ContentSource, Node, Schema};
use super::directive::Directive;
use super::ignore::IgnoreSet;
use super::lexer::{Entry, Line, LineKind, lex};
use super::scope::Scope;
use super::{Diagnostic, SourceLocation, templates};
use crate::error::CompileError;
use crate::security::paths::normalize;
use crate::security::signature::{SignaturePolicy, SignatureReport, SignatureVerifier, check_file};
use crate::security::trust::TrustPolicy;

/// Default limit on nested `@include` depth.
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 32;

/// File extensions that are never generated.
pub const DANGEROUS_EXTENSIONS: [&str; 10] = [
    "exe", "bat", "cmd", "bin", "app", "dmg", "pkg", "deb", "rpm", "msi",
];

/// Per-compile mutable state: the include resolution stack plus everything
/// collected along the way.
#[derive(Debug, Default)]
pub struct ParseSession {
    stack: Vec<PathBuf>,
    diagnostics: Vec<Diagnostic>,
    signatures: Vec<SignatureReport>,
}

impl ParseSession {
    /// Empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lint and policy warnings collected so far.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Signature outcomes collected so far.
    #[must_use]
    pub fn signatures(&self) -> &[SignatureReport] {
        &self.signatures
    }

    /// Record a signature outcome and its optional warning.
    pub fn record_signature(&mut self, report: SignatureReport, warning: Option<Diagnostic>) {
        self.signatures.push(report);
        self.diagnostics.extend(warning);
    }

    fn note_ignored(&mut self, loc: &SourceLocation, path: &Path) {
        tracing::debug!("{loc}: ignored {}", path.display());
        self.diagnostics.push(Diagnostic::info(
            loc.clone(),
            format!("`{}` skipped by @ignore", path.display()),
        ));
    }

    /// Consume the session.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Diagnostic>, Vec<SignatureReport>) {
        (self.diagnostics, self.signatures)
    }
}

/// Schema parser bound to one run's security policy.
pub struct Parser<'a> {
    trust: &'a TrustPolicy,
    verifier: &'a dyn SignatureVerifier,
    signatures: SignaturePolicy,
    jail: PathBuf,
    max_depth: usize,
}

impl fmt::Debug for Parser<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("trust", &self.trust.names())
            .field("signatures", &self.signatures)
            .field("jail", &self.jail)
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct Frame {
    indent: usize,
    path: PathBuf,
}

#[derive(Debug)]
struct Previous {
    path: PathBuf,
    opens: bool,
}

impl<'a> Parser<'a> {
    /// Create a parser. `jail` is the canonical directory of the top-level
    /// schema; includes and copy sources must stay inside it.
    #[must_use]
    pub fn new(
        trust: &'a TrustPolicy,
        verifier: &'a dyn SignatureVerifier,
        signatures: SignaturePolicy,
        jail: impl Into<PathBuf>,
    ) -> Self {
        Self {
            trust,
            verifier,
            signatures,
            jail: jail.into(),
            max_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }

    /// Override the include depth limit.
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Parse the top-level schema `text`, read from `file`.
    ///
    /// # Errors
    ///
    /// Returns the first [`CompileError`] met in this file or any include.
    pub fn parse(
        &self,
        text: &str,
        file: &Path,
        session: &mut ParseSession,
    ) -> Result<Schema, CompileError> {
        session.stack.push(file.to_path_buf());
        let result = self.parse_text(text, file, Scope::root(), session);
        session.stack.pop();
        result
    }

    fn parse_text(
        &self,
        text: &str,
        file: &Path,
        mut scope: Scope,
        session: &mut ParseSession,
    ) -> Result<Schema, CompileError> {
        let lexed = lex(text, file)?;
        session.diagnostics.extend(lexed.lints.iter().cloned());
        let metadata = lexed.metadata();
        scope.apply_metadata(&metadata);
        let base_dir = file.parent().map(Path::to_path_buf).unwrap_or_default();

        let mut frames = vec![Frame {
            indent: 0,
            path: PathBuf::new(),
        }];
        let mut previous: Option<Previous> = None;
        let mut nodes = Vec::new();

        for (index, line) in lexed.lines.iter().enumerate() {
            let loc = SourceLocation::new(file, line.number);
            match &line.kind {
                LineKind::Blank | LineKind::Comment | LineKind::Metadata { .. } => {}
                LineKind::Directive(raw) => {
                    let directive = Directive::parse(raw, &loc)?;
                    tracing::debug!("{loc}: {raw}");
                    if let Some(node) =
                        self.directive(directive, raw, &base_dir, &mut scope, session, &loc)?
                    {
                        nodes.push(node);
                    }
                }
                LineKind::Entry(entry) => {
                    nest(&mut frames, previous.as_ref(), line.indent, &loc, entry)?;
                    let (action, prev) =
                        entry_action(entry, &mut frames, &lexed.lines, index, &scope, &loc)?;
                    previous = Some(prev);
                    if let Some(path) = ignored_path(scope.ignores(), &action) {
                        session.note_ignored(&loc, path);
                        continue;
                    }
                    tracing::debug!("{loc}: {} {}", action.keyword(), describe(&action));
                    nodes.push(Node::new(action, loc));
                }
            }
        }

        Ok(Schema {
            source: file.to_path_buf(),
            metadata,
            nodes,
            variables: scope.variables().clone(),
            ignores: scope.ignores().patterns().to_vec(),
        })
    }

    fn directive(
        &self,
        directive: Directive,
        raw: &str,
        base_dir: &Path,
        scope: &mut Scope,
        session: &mut ParseSession,
        loc: &SourceLocation,
    ) -> Result<Option<Node>, CompileError> {
        let action = match directive {
            Directive::Set { name, value } => {
                let value = scope.resolve(&value, loc)?;
                scope.set(&name, value.clone());
                Action::SetVariable { name, value }
            }
            Directive::Ignore { globs } => {
                let mut added = Vec::with_capacity(globs.len());
                for glob in globs {
                    let glob = scope.resolve(&glob, loc)?;
                    scope.ignores_mut().add(&glob).map_err(|e| {
                        CompileError::parse(loc.clone(), format!("invalid ignore glob: {e}"), raw)
                    })?;
                    added.push(glob);
                }
                Action::IgnorePattern {
                    glob: added.join(" "),
                }
            }
            Directive::Template { name } => {
                if !self.trust.is_trusted(&name) {
                    return Err(CompileError::Trust {
                        location: loc.clone(),
                        template: name,
                    });
                }
                let mut expanded = templates::expand(&name, scope, loc)?;
                expanded.retain(|node| match ignored_path(scope.ignores(), &node.action) {
                    Some(path) => {
                        session.note_ignored(loc, path);
                        false
                    }
                    None => true,
                });
                Action::TemplateRef { name, expanded }
            }
            Directive::Chmod { path, mode } => {
                let path = normalize(Path::new(&scope.resolve(&path, loc)?));
                Action::Chmod { path, mode }
            }
            Directive::Include { path } => {
                let path = scope.resolve(&path, loc)?;
                return self
                    .include(&path, base_dir, scope, session, loc)
                    .map(Some);
            }
            Directive::Copy { source, dest } => {
                let source = scope.resolve(&source, loc)?;
                let source = self.resolve_in_jail(&source, base_dir, loc, "copy source")?;
                if source.is_dir() {
                    self.check_copy_tree(&source, loc)?;
                }
                let dest = normalize(Path::new(&scope.resolve(&dest, loc)?));
                check_extension(&dest, loc, raw)?;
                Action::Copy { source, dest }
            }
            Directive::Symlink { target, link } => Action::Symlink {
                target: PathBuf::from(scope.resolve(&target, loc)?),
                link: normalize(Path::new(&scope.resolve(&link, loc)?)),
            },
        };

        if let Some(path) = ignored_path(scope.ignores(), &action) {
            session.note_ignored(loc, path);
            return Ok(None);
        }
        Ok(Some(Node::new(action, loc.clone())))
    }

    fn include(
        &self,
        raw: &str,
        base_dir: &Path,
        scope: &Scope,
        session: &mut ParseSession,
        loc: &SourceLocation,
    ) -> Result<Node, CompileError> {
        let path = self.resolve_in_jail(raw, base_dir, loc, "include")?;
        if !path.is_file() {
            return Err(CompileError::parse(loc.clone(), "include is not a file", raw));
        }
        if session.stack.contains(&path) {
            let chain = session
                .stack
                .iter()
                .chain(std::iter::once(&path))
                .map(|p| display_name(p))
                .collect::<Vec<_>>()
                .join(" → ");
            return Err(CompileError::IncludeCycle {
                location: loc.clone(),
                chain,
            });
        }
        if session.stack.len() > self.max_depth {
            return Err(CompileError::parse(
                loc.clone(),
                format!("include depth limit of {} exceeded", self.max_depth),
                raw,
            ));
        }

        let required = self.signatures.require;
        let (report, warning) = check_file(self.verifier, &path, required, loc)?;
        session.record_signature(report, warning);

        let text = fs::read_to_string(&path).map_err(|source| CompileError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::debug!("{loc}: including {}", path.display());

        session.stack.push(path.clone());
        let schema = self.parse_text(&text, &path, scope.child(), session);
        session.stack.pop();

        Ok(Node::new(
            Action::Include {
                path,
                required_signature: required,
                schema: Box::new(schema?),
            },
            loc.clone(),
        ))
    }

    /// Reject symlinks under a copied directory that leave the schema jail or
    /// point at directories.
    fn check_copy_tree(&self, dir: &Path, loc: &SourceLocation) -> Result<(), CompileError> {
        let entries = fs::read_dir(dir).map_err(|source| CompileError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| CompileError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            let kind = entry.file_type().map_err(|source| CompileError::Io {
                path: path.clone(),
                source,
            })?;
            if kind.is_dir() {
                self.check_copy_tree(&path, loc)?;
                continue;
            }
            if !kind.is_symlink() {
                continue;
            }
            let target = dunce::canonicalize(&path).map_err(|source| CompileError::Io {
                path: path.clone(),
                source,
            })?;
            if !target.starts_with(&self.jail) {
                return Err(CompileError::PathEscape {
                    location: loc.clone(),
                    path: path.display().to_string(),
                    base: self.jail.clone(),
                });
            }
            if target.is_dir() {
                return Err(CompileError::parse(
                    loc.clone(),
                    "symlinked directory in copy source",
                    path.display().to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Resolve `raw` against `base_dir`, keep it inside the schema jail, and
    /// canonicalize it.
    fn resolve_in_jail(
        &self,
        raw: &str,
        base_dir: &Path,
        loc: &SourceLocation,
        what: &str,
    ) -> Result<PathBuf, CompileError> {
        let escape = || CompileError::PathEscape {
            location: loc.clone(),
            path: raw.to_string(),
            base: self.jail.clone(),
        };
        let candidate = normalize(&base_dir.join(raw));
        if !candidate.starts_with(&self.jail) {
            return Err(escape());
        }
        if !candidate.exists() {
            return Err(CompileError::parse(loc.clone(), format!("{what} not found"), raw));
        }
        let canonical = dunce::canonicalize(&candidate).map_err(|source| CompileError::Io {
            path: candidate.clone(),
            source,
        })?;
        if !canonical.starts_with(&self.jail) {
            return Err(escape());
        }
        Ok(canonical)
    }
}

/// Apply the offside rule for an entry at `indent`.
fn nest(
    frames: &mut Vec<Frame>,
    previous: Option<&Previous>,
    indent: usize,
    loc: &SourceLocation,
    entry: &Entry,
) -> Result<(), CompileError> {
    let top = frames.last().map_or(0, |f| f.indent);
    if indent > top {
        return match previous {
            Some(prev) if prev.opens => {
                frames.push(Frame {
                    indent,
                    path: prev.path.clone(),
                });
                Ok(())
            }
            Some(_) => Err(CompileError::parse(
                loc.clone(),
                "cannot nest entries under a file",
                entry_name(entry),
            )),
            None => Err(CompileError::parse(
                loc.clone(),
                "unexpected indentation",
                entry_name(entry),
            )),
        };
    }
    while frames.len() > 1 && frames.last().is_some_and(|f| f.indent > indent) {
        frames.pop();
    }
    if frames.last().map_or(0, |f| f.indent) == indent {
        Ok(())
    } else {
        Err(CompileError::parse(
            loc.clone(),
            "dedent does not match any enclosing directory",
            entry_name(entry),
        ))
    }
}

/// Build the action for an entry line and what it means for nesting.
fn entry_action(
    entry: &Entry,
    frames: &mut [Frame],
    lines: &[Line],
    index: usize,
    scope: &Scope,
    loc: &SourceLocation,
) -> Result<(Action, Previous), CompileError> {
    let Some(current) = frames.last_mut() else {
        return Err(CompileError::parse(loc.clone(), "no enclosing directory", entry_name(entry)));
    };
    let name = scope.resolve(entry_name(entry), loc)?;
    if name.trim().is_empty() {
        return Err(CompileError::parse(loc.clone(), "empty entry name", entry_name(entry)));
    }

    if let Entry::Section(_) = entry {
        let path = normalize(Path::new(&name));
        current.path.clone_from(&path);
        return Ok((
            Action::CreateDirectory { path: path.clone() },
            Previous { path, opens: true },
        ));
    }

    let path = normalize(&current.path.join(&name));
    let indent = lines.get(index).map_or(0, |l| l.indent);
    let content = match entry {
        Entry::Section(_) | Entry::Directory(_) => None,
        Entry::Plain(_) if opens_directory(lines, index, indent) => None,
        Entry::Plain(_) => Some(ContentSource::Empty),
        Entry::Inline { content, .. } => Some(ContentSource::Inline(scope.resolve(content, loc)?)),
        Entry::Heredoc {
            terminator, body, ..
        } => {
            let mut lines = Vec::with_capacity(body.len());
            for (offset, text) in body.iter().enumerate() {
                let at = SourceLocation::new(&loc.file, loc.line + offset + 1);
                lines.push(scope.resolve(text, &at)?);
            }
            Some(ContentSource::Heredoc {
                lines,
                terminator: terminator.clone(),
            })
        }
    };

    Ok(match content {
        None => (
            Action::CreateDirectory { path: path.clone() },
            Previous { path, opens: true },
        ),
        Some(content) => {
            check_extension(&path, loc, entry_name(entry))?;
            (
                Action::CreateFile {
                    path: path.clone(),
                    content,
                },
                Previous { path, opens: false },
            )
        }
    })
}

/// Whether the next entry line after `index` is indented deeper than `indent`.
fn opens_directory(lines: &[Line], index: usize, indent: usize) -> bool {
    lines
        .iter()
        .skip(index + 1)
        .find(|l| matches!(l.kind, LineKind::Entry(_)))
        .is_some_and(|l| l.indent > indent)
}

fn entry_name(entry: &Entry) -> &str {
    match entry {
        Entry::Section(name) | Entry::Directory(name) | Entry::Plain(name) => name,
        Entry::Inline { name, .. } | Entry::Heredoc { name, .. } => name,
    }
}

/// Output-relative path subject to ignore filtering.
fn output_path(action: &Action) -> Option<&Path> {
    match action {
        Action::CreateDirectory { path }
        | Action::CreateFile { path, .. }
        | Action::Chmod { path, .. } => Some(path),
        Action::Copy { dest, .. } => Some(dest),
        Action::Symlink { link, .. } => Some(link),
        Action::SetVariable { .. }
        | Action::IgnorePattern { .. }
        | Action::TemplateRef { .. }
        | Action::Include { .. } => None,
    }
}

/// Output path of `action` when the active ignore globs suppress it.
fn ignored_path<'a>(ignores: &IgnoreSet, action: &'a Action) -> Option<&'a Path> {
    let path = output_path(action)?;
    let hit = if matches!(action, Action::CreateDirectory { .. }) {
        ignores.is_dir_ignored(path)
    } else {
        ignores.is_ignored(path)
    };
    hit.then_some(path)
}

fn describe(action: &Action) -> String {
    output_path(action).map_or_else(String::new, |p| p.display().to_string())
}

fn check_extension(path: &Path, loc: &SourceLocation, token: &str) -> Result<(), CompileError> {
    let dangerous = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|e| DANGEROUS_EXTENSIONS.contains(&e.as_str()));
    if dangerous {
        return Err(CompileError::parse(
            loc.clone(),
            "potentially dangerous file extension",
            token,
        ));
    }
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}
