//! File-system resource helpers.
use anyhow::{Context as _, Result, bail};
use std::path::Path;

/// Ensure the parent directory of `path` exists, creating it (and any
/// ancestors) if necessary.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create parent: {}", parent.display()))?;
    }
    Ok(())
}

/// Remove whatever sits at `path`: a file, a symlink (including a broken
/// one), or a whole directory tree. Does nothing if `path` does not exist.
///
/// # Errors
///
/// Returns an error if the path exists but cannot be removed.
pub fn remove_existing(path: &Path) -> Result<()> {
    let Ok(meta) = path.symlink_metadata() else {
        return Ok(());
    };
    let removed = if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    removed.with_context(|| format!("remove existing: {}", path.display()))
}

/// Recursively copy a directory tree.
///
/// Only real directories are recursed into. A symlink to a file is copied as
/// the file's bytes and a symlink to a directory is refused, so a link cycle
/// cannot make the walk unbounded.
///
/// # Errors
///
/// Returns an error if `dst` lies inside `src`, the destination directory
/// cannot be created, a source entry cannot be read, a directory symlink is
/// met, or a file cannot be copied.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    if dst.starts_with(src) {
        bail!("{} is inside copy source {}", dst.display(), src.display());
    }
    std::fs::create_dir_all(dst)
        .with_context(|| format!("creating directory {}", dst.display()))?;
    for entry in
        std::fs::read_dir(src).with_context(|| format!("reading directory {}", src.display()))?
    {
        let entry = entry.with_context(|| format!("reading entry in {}", src.display()))?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        if is_real_dir(&entry)? {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else if src_path.is_dir() {
            bail!("refusing to copy directory symlink {}", src_path.display());
        } else {
            std::fs::copy(&src_path, &dst_path).with_context(|| {
                format!("copying {} to {}", src_path.display(), dst_path.display())
            })?;
        }
    }
    Ok(())
}

/// Whether every file under `src` exists under `dst` with identical bytes.
///
/// Extra entries in `dst` are ignored. Directory symlinks in `src` are not
/// followed and count as a mismatch.
///
/// # Errors
///
/// Returns an error if a directory or file cannot be read.
pub fn tree_matches(src: &Path, dst: &Path) -> Result<bool> {
    if !dst.is_dir() {
        return Ok(false);
    }
    for entry in
        std::fs::read_dir(src).with_context(|| format!("reading directory {}", src.display()))?
    {
        let entry = entry.with_context(|| format!("reading entry in {}", src.display()))?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        let same = if is_real_dir(&entry)? {
            tree_matches(&src_path, &dst_path)?
        } else {
            !src_path.is_dir() && dst_path.is_file() && files_match(&src_path, &dst_path)?
        };
        if !same {
            return Ok(false);
        }
    }
    Ok(true)
}

fn is_real_dir(entry: &std::fs::DirEntry) -> Result<bool> {
    let kind = entry
        .file_type()
        .with_context(|| format!("reading type of {}", entry.path().display()))?;
    Ok(kind.is_dir())
}

/// Whether two files have identical bytes.
///
/// # Errors
///
/// Returns an error if either file cannot be read.
pub fn files_match(a: &Path, b: &Path) -> Result<bool> {
    let left = std::fs::read(a).with_context(|| format!("reading {}", a.display()))?;
    let right = std::fs::read(b).with_context(|| format!("reading {}", b.display()))?;
    Ok(left == right)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ensure_parent_dir_creates_ancestors() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a/b/c.txt");
        ensure_parent_dir(&file).unwrap();
        assert!(dir.path().join("a/b").is_dir());
    }

    #[test]
    fn remove_existing_handles_files_dirs_and_absence() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f.txt");
        std::fs::write(&file, "x").unwrap();
        remove_existing(&file).unwrap();
        assert!(!file.exists());

        let tree = dir.path().join("tree");
        std::fs::create_dir_all(tree.join("inner")).unwrap();
        std::fs::write(tree.join("inner/g.txt"), "y").unwrap();
        remove_existing(&tree).unwrap();
        assert!(!tree.exists());

        remove_existing(&dir.path().join("absent")).unwrap();
    }

    #[test]
    fn copies_files_and_subdirectories() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();

        std::fs::write(src.path().join("a.txt"), b"aaa").unwrap();
        std::fs::create_dir(src.path().join("sub")).unwrap();
        std::fs::write(src.path().join("sub/b.txt"), b"bbb").unwrap();

        let target = dst.path().join("out");
        copy_dir_recursive(src.path(), &target).unwrap();

        assert_eq!(std::fs::read(target.join("a.txt")).unwrap(), b"aaa");
        assert_eq!(std::fs::read(target.join("sub/b.txt")).unwrap(), b"bbb");
    }

    #[test]
    fn tree_matches_after_copy_and_detects_drift() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        std::fs::create_dir(src.path().join("sub")).unwrap();
        std::fs::write(src.path().join("sub/b.txt"), b"bbb").unwrap();

        let target = dst.path().join("out");
        assert!(!tree_matches(src.path(), &target).unwrap());

        copy_dir_recursive(src.path(), &target).unwrap();
        std::fs::write(target.join("extra.txt"), b"kept").unwrap();
        assert!(tree_matches(src.path(), &target).unwrap());

        std::fs::write(target.join("sub/b.txt"), b"changed").unwrap();
        assert!(!tree_matches(src.path(), &target).unwrap());
    }

    #[test]
    fn refuses_destination_inside_source() {
        let src = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("a.txt"), b"aaa").unwrap();
        let err = copy_dir_recursive(src.path(), &src.path().join("snapshot")).unwrap_err();
        assert!(err.to_string().contains("inside copy source"), "got {err:?}");
        assert!(!src.path().join("snapshot").exists());
    }

    #[cfg(unix)]
    #[test]
    fn directory_symlinks_are_not_followed() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("a.txt"), b"aaa").unwrap();
        std::os::unix::fs::symlink(src.path(), src.path().join("loop")).unwrap();

        let target = dst.path().join("out");
        let err = copy_dir_recursive(src.path(), &target).unwrap_err();
        assert!(err.to_string().contains("directory symlink"), "got {err:?}");
        assert!(!tree_matches(src.path(), &target).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn file_symlinks_are_copied_as_content() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("a.txt"), b"aaa").unwrap();
        std::os::unix::fs::symlink(src.path().join("a.txt"), src.path().join("b.txt")).unwrap();

        let target = dst.path().join("out");
        copy_dir_recursive(src.path(), &target).unwrap();
        let copied = target.join("b.txt");
        assert!(!copied.symlink_metadata().unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read(copied).unwrap(), b"aaa");
        assert!(tree_matches(src.path(), &target).unwrap());
    }
}
