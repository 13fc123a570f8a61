//! Directory resource.
use anyhow::{Context as _, Result};
use std::path::PathBuf;

use super::{Resource, ResourceChange, ResourceState};

/// A directory that must exist.
#[derive(Debug, Clone)]
pub struct DirectoryResource {
    /// Directory path (absolute).
    pub path: PathBuf,
}

impl DirectoryResource {
    /// Create a new directory resource.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Resource for DirectoryResource {
    fn description(&self) -> String {
        format!("{}/", self.path.display())
    }

    fn current_state(&self) -> Result<ResourceState> {
        if self.path.is_dir() {
            Ok(ResourceState::Correct)
        } else if self.path.symlink_metadata().is_ok() {
            Ok(ResourceState::Invalid {
                reason: "path exists and is not a directory".to_string(),
            })
        } else {
            Ok(ResourceState::Missing)
        }
    }

    fn apply(&self) -> Result<ResourceChange> {
        if self.path.is_dir() {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        std::fs::create_dir_all(&self.path)
            .with_context(|| format!("create directory: {}", self.path.display()))?;
        Ok(ResourceChange::Applied)
    }

    fn replaces_content(&self) -> bool {
        false
    }
}
