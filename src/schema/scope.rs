//! Variable scope with `${NAME}` expansion.
//!
//! A root scope is created per compile. Every `@include` parses in a
//! [`Scope::child`], which starts from a snapshot of the parent's bindings
//! and ignore globs; nothing written inside the child flows back out.
use std::collections::BTreeMap;

use super::ignore::IgnoreSet;
use super::{Metadata, MetadataKey, SourceLocation};
use crate::error::CompileError;

/// Variables bound in every root scope.
pub const BUILTIN_VARIABLES: [&str; 5] = ["AUTHOR", "PROJECT", "DESCRIPTION", "VERSION", "PKG"];

/// Variable bindings and ignore globs for one schema file.
#[derive(Debug, Clone)]
pub struct Scope {
    vars: BTreeMap<String, String>,
    ignores: IgnoreSet,
}

impl Scope {
    /// Root scope with the built-in variables bound to empty strings.
    #[must_use]
    pub fn root() -> Self {
        let vars = BUILTIN_VARIABLES
            .iter()
            .map(|name| ((*name).to_string(), String::new()))
            .collect();
        Self {
            vars,
            ignores: IgnoreSet::default(),
        }
    }

    /// Snapshot of this scope for a nested include.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            vars: self.vars.clone(),
            ignores: self.ignores.clone(),
        }
    }

    /// Bind `name`, replacing any earlier binding in this scope.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.vars.insert(name.to_string(), value.into());
    }

    /// Current value of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// All bindings, sorted by name.
    #[must_use]
    pub const fn variables(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    /// Active ignore globs.
    #[must_use]
    pub const fn ignores(&self) -> &IgnoreSet {
        &self.ignores
    }

    /// Mutable access to the ignore globs of this scope.
    pub const fn ignores_mut(&mut self) -> &mut IgnoreSet {
        &mut self.ignores
    }

    /// Bind `PROJECT`, `DESCRIPTION`, `VERSION` and `PKG` from metadata.
    pub fn apply_metadata(&mut self, metadata: &Metadata) {
        for key in MetadataKey::ALL {
            let value = match key {
                MetadataKey::Project => metadata.project.as_deref(),
                MetadataKey::Description => metadata.description.as_deref(),
                MetadataKey::Version => metadata.version.as_deref(),
            };
            if let Some(value) = value {
                self.set(key.variable(), value);
            }
        }
        if let Some(project) = metadata.project.as_deref() {
            self.set("PKG", slugify(project));
        }
    }

    /// Expand every `${NAME}` in `text`.
    ///
    /// `$${NAME}` produces the literal `${NAME}`, and `${NAME:-fallback}`
    /// yields `fallback` when `NAME` is unbound or empty.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::UndefinedVariable`] for an unbound name and
    /// [`CompileError::Parse`] for an unterminated or malformed reference.
    pub fn resolve(&self, text: &str, location: &SourceLocation) -> Result<String, CompileError> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(pos) = rest.find('$') {
            let (before, after) = rest.split_at(pos);
            out.push_str(before);
            if let Some(escaped) = after.strip_prefix("$${") {
                out.push_str("${");
                rest = escaped;
            } else if let Some(body) = after.strip_prefix("${") {
                let Some(end) = body.find('}') else {
                    return Err(CompileError::parse(
                        location.clone(),
                        "unterminated variable reference",
                        after,
                    ));
                };
                let (inner, tail) = body.split_at(end);
                out.push_str(&self.lookup(inner, location)?);
                rest = tail.get(1..).unwrap_or_default();
            } else {
                out.push('$');
                rest = after.get(1..).unwrap_or_default();
            }
        }
        out.push_str(rest);
        Ok(out)
    }

    fn lookup(&self, reference: &str, location: &SourceLocation) -> Result<String, CompileError> {
        let (name, fallback) = match reference.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (reference, None),
        };
        if !is_valid_name(name) {
            return Err(CompileError::parse(
                location.clone(),
                "invalid variable name",
                format!("${{{reference}}}"),
            ));
        }
        match (self.get(name), fallback) {
            (Some(value), Some(fallback)) if value.is_empty() => Ok(fallback.to_string()),
            (Some(value), _) => Ok(value.to_string()),
            (None, Some(fallback)) => Ok(fallback.to_string()),
            (None, None) => Err(CompileError::UndefinedVariable {
                location: location.clone(),
                name: name.to_string(),
            }),
        }
    }
}

/// Whether `name` is a legal variable name (`[A-Za-z_][A-Za-z0-9_]*`).
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Lowercase dash-separated slug of a project name.
///
/// # Examples
///
/// ```
/// use lrc_cli::schema::scope::slugify;
///
/// assert_eq!(slugify("My Cool App"), "my-cool-app");
/// ```
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
