//! Lexical path jail helpers.
//!
//! Paths are normalized without touching the filesystem so the same checks
//! work for outputs that do not exist yet.
use std::path::{Component, Path, PathBuf};

/// Lexically normalize `path`: drop `.` and fold `name/..` pairs.
///
/// Leading `..` components of a relative path are kept, and `..` directly
/// under the root is dropped.
///
/// # Examples
///
/// ```
/// use std::path::{Path, PathBuf};
/// use lrc_cli::security::paths::normalize;
///
/// assert_eq!(normalize(Path::new("a/./b/../c")), PathBuf::from("a/c"));
/// assert_eq!(normalize(Path::new("a/../../x")), PathBuf::from("../x"));
/// ```
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                Some(Component::ParentDir | Component::CurDir) | None => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.into_iter().map(Component::as_os_str).collect()
}

/// Whether `path` stays inside `base` after lexical normalization.
#[must_use]
pub fn is_within(base: &Path, path: &Path) -> bool {
    normalize(path).starts_with(normalize(base))
}

/// Join `relative` onto `base` and return the normalized result, or `None`
/// if it escapes `base`.
///
/// An absolute `relative` replaces `base` and is accepted only when it lies
/// inside `base`.
#[must_use]
pub fn resolve_within(base: &Path, relative: &Path) -> Option<PathBuf> {
    let joined = normalize(&base.join(relative));
    joined.starts_with(normalize(base)).then_some(joined)
}

/// Canonicalize the longest existing prefix of `path` and re-append the
/// rest, so an output root that does not exist yet compares against
/// canonical source paths.
#[must_use]
pub fn canonicalize_existing(path: &Path) -> PathBuf {
    for ancestor in path.ancestors() {
        let Ok(canonical) = dunce::canonicalize(ancestor) else {
            continue;
        };
        return match path.strip_prefix(ancestor) {
            Ok(rest) if !rest.as_os_str().is_empty() => canonical.join(rest),
            _ => canonical,
        };
    }
    path.to_path_buf()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_parent_dirs() {
        assert_eq!(normalize(Path::new("/out/a/../b")), PathBuf::from("/out/b"));
        assert_eq!(normalize(Path::new("/../x")), PathBuf::from("/x"));
        assert_eq!(normalize(Path::new("./")), PathBuf::new());
    }

    #[test]
    fn resolve_within_accepts_nested_paths() {
        assert_eq!(
            resolve_within(Path::new("/out"), Path::new("src/main.rs")),
            Some(PathBuf::from("/out/src/main.rs"))
        );
    }

    #[test]
    fn resolve_within_rejects_traversal() {
        assert_eq!(
            resolve_within(Path::new("/out"), Path::new("../../etc/passwd")),
            None
        );
        assert_eq!(resolve_within(Path::new("/out"), Path::new("/etc/passwd")), None);
    }

    #[test]
    fn resolve_within_rejects_sibling_prefix() {
        assert_eq!(resolve_within(Path::new("/out"), Path::new("../outside")), None);
    }

    #[test]
    fn is_within_compares_components() {
        assert!(is_within(Path::new("/out"), Path::new("/out/a/../b")));
        assert!(!is_within(Path::new("/out"), Path::new("/output/a")));
    }

    #[test]
    fn canonicalize_existing_keeps_missing_tail() {
        let dir = tempfile::tempdir().unwrap();
        let canonical = dunce::canonicalize(dir.path()).unwrap();
        assert_eq!(
            canonicalize_existing(&dir.path().join("out/site")),
            canonical.join("out/site")
        );
        assert_eq!(canonicalize_existing(dir.path()), canonical);
    }
}
