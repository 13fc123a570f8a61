//! Line classifier for schema text.
//!
//! Turns raw schema text into a flat list of [`Line`]s. Heredoc bodies are
//! captured here, verbatim, so the parser never sees them as lines of their
//! own. Lint findings (trailing whitespace) are returned alongside the lines
//! and never fail the lex.
use std::path::{Path, PathBuf};

use super::{Diagnostic, Metadata, MetadataKey, SourceLocation};
use crate::error::CompileError;

/// Terminator used by `name <<` with no explicit token.
pub const DEFAULT_TERMINATOR: &str = "EOF";

/// Result of lexing one schema file.
#[derive(Debug, Clone, Default)]
pub struct Lexed {
    /// Classified lines in file order (heredoc bodies folded into their opener).
    pub lines: Vec<Line>,
    /// Non-fatal lint findings.
    pub lints: Vec<Diagnostic>,
}

impl Lexed {
    /// Metadata declared by this file (first occurrence of each key wins).
    #[must_use]
    pub fn metadata(&self) -> Metadata {
        let mut meta = Metadata::default();
        for line in &self.lines {
            if let LineKind::Metadata { key, value } = &line.kind {
                meta.record(*key, value);
            }
        }
        meta
    }
}

/// One classified schema line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// 1-based line number.
    pub number: usize,
    /// Count of leading spaces.
    pub indent: usize,
    /// Classification.
    pub kind: LineKind,
}

/// What a schema line is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// Empty or whitespace-only.
    Blank,
    /// `# ...` comment with no metadata key.
    Comment,
    /// `# Project:` / `# Description:` / `# Version:` comment.
    Metadata {
        /// Which key.
        key: MetadataKey,
        /// Trimmed value.
        value: String,
    },
    /// `@keyword args...` (trimmed, including the `@`).
    Directive(String),
    /// File or directory entry.
    Entry(Entry),
}

/// Shape of a file-entry line. Names are unexpanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// `/name/`: a directory anchored at the output root.
    Section(String),
    /// `name/`: an explicit directory.
    Directory(String),
    /// `name`: a directory if followed by a deeper entry, else an empty file.
    Plain(String),
    /// `name -> content`.
    Inline {
        /// File name.
        name: String,
        /// Content after `->`, leading whitespace removed.
        content: String,
    },
    /// `name <<TOKEN` with its captured body.
    Heredoc {
        /// File name.
        name: String,
        /// Terminator token.
        terminator: String,
        /// Body lines, verbatim.
        body: Vec<String>,
    },
}

/// Classify every line of `text`.
///
/// # Errors
///
/// Returns [`CompileError::Parse`] for a tab in an entry's indentation or a
/// heredoc with no terminator line.
pub fn lex(text: &str, file: &Path) -> Result<Lexed, CompileError> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let raw: Vec<&str> = normalized.split('\n').collect();
    let mut lexed = Lexed::default();
    let at = |number: usize| SourceLocation::new(PathBuf::from(file), number);

    let mut index = 0;
    while let Some(&line) = raw.get(index) {
        let number = index + 1;
        index += 1;

        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !line.is_empty() {
                lexed
                    .lints
                    .push(Diagnostic::warning(at(number), "whitespace-only line"));
            }
            lexed.lines.push(Line {
                number,
                indent: 0,
                kind: LineKind::Blank,
            });
            continue;
        }
        if line.ends_with([' ', '\t']) {
            lexed
                .lints
                .push(Diagnostic::warning(at(number), "trailing whitespace"));
        }

        let leading = line
            .get(..line.len() - line.trim_start().len())
            .unwrap_or_default();
        let indent = leading.len();

        let kind = if let Some(comment) = trimmed.strip_prefix('#') {
            classify_comment(comment)
        } else if trimmed.starts_with('@') {
            LineKind::Directive(trimmed.to_string())
        } else {
            if leading.contains('\t') {
                return Err(CompileError::parse(
                    at(number),
                    "tab in indentation (use spaces)",
                    line,
                ));
            }
            match classify_entry(trimmed) {
                Entry::Heredoc {
                    name, terminator, ..
                } => {
                    let mut body = Vec::new();
                    let mut closed = false;
                    while let Some(&content) = raw.get(index) {
                        index += 1;
                        if content.trim() == terminator {
                            closed = true;
                            break;
                        }
                        body.push(content.to_string());
                    }
                    if !closed {
                        return Err(CompileError::parse(
                            at(number),
                            format!("unterminated heredoc, expected `{terminator}`"),
                            trimmed,
                        ));
                    }
                    LineKind::Entry(Entry::Heredoc {
                        name,
                        terminator,
                        body,
                    })
                }
                other => LineKind::Entry(other),
            }
        };
        lexed.lines.push(Line {
            number,
            indent,
            kind,
        });
    }
    Ok(lexed)
}

/// Metadata of `text` without building a plan.
///
/// Lex errors yield empty metadata; the real compile reports them.
#[must_use]
pub fn extract_metadata(text: &str) -> Metadata {
    lex(text, Path::new("schema"))
        .map(|lexed| lexed.metadata())
        .unwrap_or_default()
}

fn classify_comment(body: &str) -> LineKind {
    let body = body.trim();
    let lower = body.to_ascii_lowercase();
    for key in MetadataKey::ALL {
        if lower.starts_with(key.prefix()) {
            let value = body.get(key.prefix().len()..).unwrap_or_default().trim();
            return LineKind::Metadata {
                key,
                value: value.to_string(),
            };
        }
    }
    LineKind::Comment
}

fn classify_entry(entry: &str) -> Entry {
    if let Some(section) = entry.strip_prefix('/') {
        let section = section.strip_suffix('/').unwrap_or(section);
        return Entry::Section(section.trim().to_string());
    }
    if !entry.contains("->") && !entry.contains("<<") {
        if let Some(dir) = entry.strip_suffix('/') {
            return Entry::Directory(dir.trim().to_string());
        }
        return Entry::Plain(entry.to_string());
    }
    if let Some((name, token)) = entry.split_once("<<") {
        let token = token.trim();
        return Entry::Heredoc {
            name: name.trim().to_string(),
            terminator: if token.is_empty() {
                DEFAULT_TERMINATOR.to_string()
            } else {
                token.to_string()
            },
            body: Vec::new(),
        };
    }
    match entry.split_once("->") {
        Some((name, content)) => Entry::Inline {
            name: name.trim().to_string(),
            content: content.trim_start().to_string(),
        },
        None => Entry::Plain(entry.to_string()),
    }
}
