//! Typed action tree produced by the schema parser.
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::{Metadata, SourceLocation};

/// Where a file's content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    /// Plain `name` entry: an empty file.
    Empty,
    /// `name -> text` entry.
    Inline(String),
    /// `name <<TOKEN` entry, with its body lines (variables already expanded).
    Heredoc {
        /// Body lines between the opener and the terminator.
        lines: Vec<String>,
        /// The terminator token.
        terminator: String,
    },
}

impl ContentSource {
    /// Render the file content with `\n` line separators.
    ///
    /// Heredoc bodies get a trailing newline when they are non-empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use lrc_cli::schema::ContentSource;
    ///
    /// let body = ContentSource::Heredoc {
    ///     lines: vec!["a".into(), "b".into()],
    ///     terminator: "EOF".into(),
    /// };
    /// assert_eq!(body.render(), "a\nb\n");
    /// assert_eq!(ContentSource::Empty.render(), "");
    /// ```
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Inline(text) => text.clone(),
            Self::Heredoc { lines, .. } if lines.is_empty() => String::new(),
            Self::Heredoc { lines, .. } => {
                let mut text = lines.join("\n");
                text.push('\n');
                text
            }
        }
    }
}

/// A single schema action.
///
/// Paths are relative until plan compilation: output paths are relative to
/// the output root, while `Copy::source` and `Include::path` are absolute
/// paths inside the schema directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Create a directory.
    CreateDirectory {
        /// Output-relative path.
        path: PathBuf,
    },
    /// Create a file.
    CreateFile {
        /// Output-relative path.
        path: PathBuf,
        /// File content.
        content: ContentSource,
    },
    /// `@set NAME=VALUE` (no filesystem effect).
    SetVariable {
        /// Variable name.
        name: String,
        /// Expanded value.
        value: String,
    },
    /// `@ignore GLOB` (no filesystem effect).
    IgnorePattern {
        /// The glob as written.
        glob: String,
    },
    /// `@template NAME`, expanded after the trust check passed.
    TemplateRef {
        /// Template name as written.
        name: String,
        /// Canonical action subtree of the template.
        expanded: Vec<Node>,
    },
    /// `@chmod PATH MODE`.
    Chmod {
        /// Output-relative path.
        path: PathBuf,
        /// POSIX permission bits.
        mode: u32,
    },
    /// `@include PATH`, with the included schema spliced in.
    Include {
        /// Canonical absolute path of the included file.
        path: PathBuf,
        /// Whether signature verification was mandatory for this include.
        required_signature: bool,
        /// The parsed included schema.
        schema: Box<Schema>,
    },
    /// `@copy SRC DEST`.
    Copy {
        /// Absolute source path inside the schema directory.
        source: PathBuf,
        /// Output-relative destination.
        dest: PathBuf,
    },
    /// `@symlink TARGET LINK`.
    Symlink {
        /// Link target, kept as written.
        target: PathBuf,
        /// Output-relative link path.
        link: PathBuf,
    },
}

impl Action {
    /// Short keyword used in debug output.
    #[must_use]
    pub const fn keyword(&self) -> &'static str {
        match self {
            Self::CreateDirectory { .. } => "dir",
            Self::CreateFile { .. } => "file",
            Self::SetVariable { .. } => "set",
            Self::IgnorePattern { .. } => "ignore",
            Self::TemplateRef { .. } => "template",
            Self::Chmod { .. } => "chmod",
            Self::Include { .. } => "include",
            Self::Copy { .. } => "copy",
            Self::Symlink { .. } => "symlink",
        }
    }
}

/// An action together with the line that declared it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// The action.
    pub action: Action,
    /// Declaring line.
    pub origin: SourceLocation,
}

impl Node {
    /// Pair an action with its origin.
    #[must_use]
    pub const fn new(action: Action, origin: SourceLocation) -> Self {
        Self { action, origin }
    }
}

/// A parsed schema file (the top-level file or one `@include`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// File the schema was read from.
    pub source: PathBuf,
    /// Metadata comments of this file.
    pub metadata: Metadata,
    /// Actions in declaration order.
    pub nodes: Vec<Node>,
    /// Variable bindings in effect at the end of the file.
    pub variables: BTreeMap<String, String>,
    /// Ignore globs active at the end of the file.
    pub ignores: Vec<String>,
}

impl Schema {
    /// Count all nodes, descending into templates and includes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        count_nodes(&self.nodes)
    }
}

fn count_nodes(nodes: &[Node]) -> usize {
    nodes
        .iter()
        .map(|node| {
            1 + match &node.action {
                Action::TemplateRef { expanded, .. } => count_nodes(expanded),
                Action::Include { schema, .. } => schema.node_count(),
                _ => 0,
            }
        })
        .sum()
}
