//! Generated file resource.
use anyhow::{Context as _, Result};
use std::path::PathBuf;

use super::helpers::fs::ensure_parent_dir;
use super::{Resource, ResourceChange, ResourceState};

/// A file whose full content is known up front.
#[derive(Debug, Clone)]
pub struct FileResource {
    /// File path (absolute).
    pub path: PathBuf,
    /// Desired content.
    pub content: String,
}

impl FileResource {
    /// Create a new file resource.
    #[must_use]
    pub const fn new(path: PathBuf, content: String) -> Self {
        Self { path, content }
    }
}

impl Resource for FileResource {
    fn description(&self) -> String {
        format!("{} ({} bytes)", self.path.display(), self.content.len())
    }

    fn current_state(&self) -> Result<ResourceState> {
        let Ok(meta) = self.path.symlink_metadata() else {
            return Ok(ResourceState::Missing);
        };
        if meta.is_dir() {
            return Ok(ResourceState::Invalid {
                reason: "path is a directory".to_string(),
            });
        }
        if meta.file_type().is_symlink() {
            return Ok(ResourceState::Incorrect {
                current: "path is a symlink".to_string(),
            });
        }
        let existing = std::fs::read(&self.path)
            .with_context(|| format!("read: {}", self.path.display()))?;
        if existing == self.content.as_bytes() {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Incorrect {
                current: format!("content differs ({} bytes on disk)", existing.len()),
            })
        }
    }

    fn apply(&self) -> Result<ResourceChange> {
        ensure_parent_dir(&self.path)?;
        if self
            .path
            .symlink_metadata()
            .is_ok_and(|m| m.file_type().is_symlink())
        {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("remove symlink: {}", self.path.display()))?;
        }
        std::fs::write(&self.path, &self.content)
            .with_context(|| format!("write: {}", self.path.display()))?;
        Ok(ResourceChange::Applied)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn writes_missing_file_with_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("src/main.py");
        let resource = FileResource::new(path.clone(), "print()\n".to_string());

        assert_eq!(resource.current_state().unwrap(), ResourceState::Missing);
        resource.apply().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "print()\n");
        assert_eq!(resource.current_state().unwrap(), ResourceState::Correct);
    }

    #[test]
    fn different_content_is_incorrect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("README.md");
        std::fs::write(&path, "old").unwrap();
        let state = FileResource::new(path, "new".to_string())
            .current_state()
            .unwrap();
        assert!(matches!(state, ResourceState::Incorrect { .. }));
    }

    #[test]
    fn directory_in_the_way_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let state = FileResource::new(dir.path().to_path_buf(), String::new())
            .current_state()
            .unwrap();
        assert!(matches!(state, ResourceState::Invalid { .. }));
    }

    #[test]
    fn empty_content_creates_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("__init__.py");
        FileResource::new(path.clone(), String::new()).apply().unwrap();
        assert_eq!(std::fs::read(&path).unwrap().len(), 0);
    }
}
