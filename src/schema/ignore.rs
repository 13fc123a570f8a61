//! Ignore globs declared with `@ignore`.
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};

/// The set of ignore globs active in a scope.
///
/// A path is ignored when the whole output-relative path, or any single
/// component of it, matches one of the globs. A trailing `/` is dropped, so
/// `build/` hides the `build` directory and everything in it. A directory is
/// also ignored when a `<dir>/**` glob would hide all of its contents.
#[derive(Debug, Clone)]
pub struct IgnoreSet {
    patterns: Vec<String>,
    globs: Vec<Glob>,
    compiled: GlobSet,
    dir_globs: Vec<Glob>,
    dirs: GlobSet,
}

impl Default for IgnoreSet {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            globs: Vec::new(),
            compiled: GlobSet::empty(),
            dir_globs: Vec::new(),
            dirs: GlobSet::empty(),
        }
    }
}

impl IgnoreSet {
    /// Add a glob to the set.
    ///
    /// # Errors
    ///
    /// Returns the `globset` error message if the pattern is not a valid glob.
    pub fn add(&mut self, pattern: &str) -> Result<(), String> {
        let trimmed = match pattern.trim_end_matches('/') {
            "" => pattern,
            t => t,
        };
        let glob = Glob::new(trimmed).map_err(|e| e.kind().to_string())?;
        let dir_glob = match trimmed.strip_suffix("/**") {
            Some(dir) if !dir.is_empty() => {
                Some(Glob::new(dir).map_err(|e| e.kind().to_string())?)
            }
            _ => None,
        };

        self.compiled = build_set(&self.globs, &glob)?;
        if let Some(dir_glob) = dir_glob {
            self.dirs = build_set(&self.dir_globs, &dir_glob)?;
            self.dir_globs.push(dir_glob);
        }
        self.globs.push(glob);
        self.patterns.push(pattern.to_string());
        Ok(())
    }

    /// Whether `path` (relative to the output root) is suppressed.
    #[must_use]
    pub fn is_ignored(&self, path: &Path) -> bool {
        if self.globs.is_empty() {
            return false;
        }
        let normalized = path.to_string_lossy().replace('\\', "/");
        if self.compiled.is_match(&normalized) {
            return true;
        }
        normalized
            .split('/')
            .filter(|c| !c.is_empty())
            .any(|component| self.compiled.is_match(component))
    }

    /// Whether the directory at `path` is suppressed, either directly or
    /// because a `<dir>/**` glob hides everything inside it.
    #[must_use]
    pub fn is_dir_ignored(&self, path: &Path) -> bool {
        self.is_ignored(path)
            || (!self.dir_globs.is_empty()
                && self
                    .dirs
                    .is_match(path.to_string_lossy().replace('\\', "/").as_str()))
    }

    /// Patterns as written, in declaration order.
    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Whether no globs are active.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn build_set(existing: &[Glob], added: &Glob) -> Result<GlobSet, String> {
    let mut builder = GlobSetBuilder::new();
    for glob in existing {
        builder.add(glob.clone());
    }
    builder.add(added.clone());
    builder.build().map_err(|e| e.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn set(globs: &[&str]) -> IgnoreSet {
        let mut s = IgnoreSet::default();
        for g in globs {
            s.add(g).unwrap();
        }
        s
    }

    #[test]
    fn empty_set_ignores_nothing() {
        assert!(!IgnoreSet::default().is_ignored(Path::new("a.tmp")));
    }

    #[test]
    fn extension_glob_matches_file() {
        let s = set(&["*.tmp"]);
        assert!(s.is_ignored(Path::new("a.tmp")));
        assert!(!s.is_ignored(Path::new("a.txt")));
    }

    #[test]
    fn component_match_hides_nested_paths() {
        let s = set(&["node_modules"]);
        assert!(s.is_ignored(Path::new("web/node_modules/x.js")));
        assert!(!s.is_ignored(Path::new("web/src/x.js")));
    }

    #[test]
    fn full_path_glob_matches() {
        let s = set(&["build/**"]);
        assert!(s.is_ignored(Path::new("build/out/a.o")));
    }

    #[test]
    fn invalid_glob_is_rejected() {
        let mut s = IgnoreSet::default();
        assert!(s.add("a[").is_err());
        assert!(s.is_empty());
    }

    #[test]
    fn patterns_keep_declaration_order() {
        let s = set(&["*.log", "*.tmp"]);
        assert_eq!(s.patterns(), ["*.log", "*.tmp"]);
    }

    #[test]
    fn double_star_glob_hides_the_directory_itself() {
        let s = set(&["build/**"]);
        assert!(s.is_dir_ignored(Path::new("build")));
        assert!(!s.is_ignored(Path::new("build")));
        assert!(!s.is_dir_ignored(Path::new("src/build")));
        assert!(!s.is_dir_ignored(Path::new("builder")));
    }

    #[test]
    fn trailing_slash_names_a_directory() {
        let s = set(&["target/"]);
        assert!(s.is_dir_ignored(Path::new("target")));
        assert!(s.is_ignored(Path::new("target/debug/app")));
        assert_eq!(s.patterns(), ["target/"]);
    }
}
