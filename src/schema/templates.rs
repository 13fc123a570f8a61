//! Built-in project templates expanded by `@template NAME`.
//!
//! Templates are static action lists. Their text uses `${NAME:-default}`
//! references and is expanded with the scope active at the `@template`
//! line. Output paths are relative to the output root.
use std::path::PathBuf;

use super::action::{Action, ContentSource, Node};
use super::scope::Scope;
use super::SourceLocation;
use crate::error::CompileError;

/// Template names that are trusted without any policy file.
pub const BUILTIN_TEMPLATES: [&str; 3] = ["python-cli", "node-cli", "rust-cli"];

#[derive(Debug, Clone, Copy)]
enum Item {
    Dir(&'static str),
    File(&'static str, &'static str),
    Chmod(&'static str, u32),
}

const PYTHON_CLI: &[Item] = &[
    Item::Dir("src"),
    Item::File("src/__init__.py", ""),
    Item::File(
        "src/main.py",
        "#!/usr/bin/env python3\n\
\"\"\"${PROJECT:-App} - ${DESCRIPTION:-CLI application}\"\"\"\n\
\n\
def main():\n    print(\"Hello ${AUTHOR:-World}!\")\n\
\n\
if __name__ == \"__main__\":\n    main()\n",
    ),
    Item::File(
        "README.md",
        "# ${PROJECT:-App}\n\n${DESCRIPTION:-A minimal Python CLI.}\n",
    ),
    Item::File(
        ".gitignore",
        "__pycache__/\n.venv/\n.DS_Store\n*.pyc\n*.pyo\n*.pyd\n",
    ),
    Item::File(
        "pyproject.toml",
        "[project]\n\
name = \"${PKG:-app}\"\n\
version = \"${VERSION:-0.1.0}\"\n\
description = \"${DESCRIPTION:-CLI application}\"\n\
authors = [{name = \"${AUTHOR:-Unknown}\"}]\n\
requires-python = \">=3.8\"\n\
\n\
[project.scripts]\n\
${PKG:-app} = \"src.main:main\"\n",
    ),
];

const NODE_CLI: &[Item] = &[
    Item::Dir("bin"),
    Item::File("bin/cli.js", "#!/usr/bin/env node\nconsole.log('Hello CLI');\n"),
    Item::Chmod("bin/cli.js", 0o755),
    Item::File(
        "package.json",
        "{\n  \"name\": \"${PKG:-app}\",\n  \"version\": \"${VERSION:-0.1.0}\",\n  \
\"description\": \"${DESCRIPTION:-CLI application}\",\n  \"bin\": \"bin/cli.js\",\n  \
\"author\": \"${AUTHOR:-}\"\n}\n",
    ),
    Item::File(".gitignore", "node_modules/\n.DS_Store\nnpm-debug.log*\n"),
    Item::File("README.md", "# ${PROJECT:-Node CLI}\n"),
];

const RUST_CLI: &[Item] = &[
    Item::File(
        "Cargo.toml",
        "[package]\n\
name = \"${PKG:-app}\"\n\
version = \"${VERSION:-0.1.0}\"\n\
authors = [\"${AUTHOR:-Unknown}\"]\n\
description = \"${DESCRIPTION:-CLI application}\"\n\
\n\
[[bin]]\n\
name = \"${PKG:-app}\"\n\
path = \"src/main.rs\"\n",
    ),
    Item::Dir("src"),
    Item::File(
        "src/main.rs",
        "fn main() {\n    println!(\"Hello, Rust CLI!\");\n}\n",
    ),
];

fn items(name: &str) -> Option<&'static [Item]> {
    match name {
        "python-cli" | "py-cli" => Some(PYTHON_CLI),
        "node-cli" | "js-cli" => Some(NODE_CLI),
        "rust-cli" | "rs-cli" => Some(RUST_CLI),
        _ => None,
    }
}

/// Expand a template that already passed the trust check.
///
/// Names without a built-in body produce a single `README.md`.
///
/// # Errors
///
/// Propagates variable expansion errors from `scope`.
pub fn expand(name: &str, scope: &Scope, origin: &SourceLocation) -> Result<Vec<Node>, CompileError> {
    let key = name.trim().to_ascii_lowercase();
    let Some(items) = items(&key) else {
        let readme = format!("# {key}\n\nProject generated from template: {key}\n");
        return Ok(vec![Node::new(
            Action::CreateFile {
                path: PathBuf::from("README.md"),
                content: ContentSource::Inline(readme),
            },
            origin.clone(),
        )]);
    };

    items
        .iter()
        .map(|item| {
            let action = match *item {
                Item::Dir(path) => Action::CreateDirectory {
                    path: PathBuf::from(path),
                },
                Item::File(path, text) => Action::CreateFile {
                    path: PathBuf::from(path),
                    content: ContentSource::Inline(scope.resolve(text, origin)?),
                },
                Item::Chmod(path, mode) => Action::Chmod {
                    path: PathBuf::from(path),
                    mode,
                },
            };
            Ok(Node::new(action, origin.clone()))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn origin() -> SourceLocation {
        SourceLocation::new("s.lrc", 2)
    }

    fn file_content<'a>(nodes: &'a [Node], path: &str) -> &'a str {
        nodes
            .iter()
            .find_map(|n| match &n.action {
                Action::CreateFile {
                    path: p,
                    content: ContentSource::Inline(text),
                } if p == &PathBuf::from(path) => Some(text.as_str()),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn rust_cli_uses_scope_values() {
        let mut scope = Scope::root();
        scope.set("PKG", "demo");
        let nodes = expand("rust-cli", &scope, &origin()).unwrap();
        assert!(file_content(&nodes, "Cargo.toml").contains("name = \"demo\""));
        assert!(file_content(&nodes, "Cargo.toml").contains("version = \"0.1.0\""));
    }

    #[test]
    fn aliases_expand_identically() {
        let scope = Scope::root();
        assert_eq!(
            expand("py-cli", &scope, &origin()).unwrap(),
            expand("python-cli", &scope, &origin()).unwrap()
        );
    }

    #[test]
    fn node_cli_marks_entry_point_executable() {
        let nodes = expand("NODE-CLI", &Scope::root(), &origin()).unwrap();
        assert!(nodes.iter().any(|n| matches!(
            &n.action,
            Action::Chmod { path, mode: 0o755 } if path == &PathBuf::from("bin/cli.js")
        )));
    }

    #[test]
    fn unknown_trusted_name_gets_readme() {
        let nodes = expand("company-web", &Scope::root(), &origin()).unwrap();
        assert_eq!(nodes.len(), 1);
        assert!(file_content(&nodes, "README.md").contains("template: company-web"));
    }
}
