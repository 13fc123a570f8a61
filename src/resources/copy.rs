//! Copy resource: a file or directory brought over from the schema directory.
use anyhow::{Context as _, Result};
use std::path::PathBuf;

use super::helpers::fs::{
    copy_dir_recursive, ensure_parent_dir, files_match, remove_existing, tree_matches,
};
use super::{Resource, ResourceChange, ResourceState};

/// A copy of `source` that must exist at `dest`.
#[derive(Debug, Clone)]
pub struct CopyResource {
    /// Source file or directory (absolute).
    pub source: PathBuf,
    /// Destination path (absolute).
    pub dest: PathBuf,
}

impl CopyResource {
    /// Create a new copy resource.
    #[must_use]
    pub const fn new(source: PathBuf, dest: PathBuf) -> Self {
        Self { source, dest }
    }
}

impl Resource for CopyResource {
    fn description(&self) -> String {
        format!("{} <- {}", self.dest.display(), self.source.display())
    }

    fn current_state(&self) -> Result<ResourceState> {
        if !self.source.exists() {
            return Ok(ResourceState::Invalid {
                reason: format!("source does not exist: {}", self.source.display()),
            });
        }
        if self.source.is_dir() && self.dest.starts_with(&self.source) {
            return Ok(ResourceState::Invalid {
                reason: format!("destination is inside source: {}", self.source.display()),
            });
        }
        if self.dest.symlink_metadata().is_err() {
            return Ok(ResourceState::Missing);
        }

        let same = if self.source.is_dir() {
            tree_matches(&self.source, &self.dest)?
        } else {
            self.dest.is_file() && files_match(&self.source, &self.dest)?
        };
        if same {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Incorrect {
                current: "destination differs from source".to_string(),
            })
        }
    }

    fn apply(&self) -> Result<ResourceChange> {
        remove_existing(&self.dest)?;
        if self.source.is_dir() {
            copy_dir_recursive(&self.source, &self.dest)?;
        } else {
            ensure_parent_dir(&self.dest)?;
            std::fs::copy(&self.source, &self.dest).with_context(|| {
                format!(
                    "copying {} to {}",
                    self.source.display(),
                    self.dest.display()
                )
            })?;
        }
        Ok(ResourceChange::Applied)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn copies_file_into_new_parent() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("logo.svg"), "<svg/>").unwrap();

        let resource = CopyResource::new(
            src.path().join("logo.svg"),
            out.path().join("assets/logo.svg"),
        );
        assert_eq!(resource.current_state().unwrap(), ResourceState::Missing);
        resource.apply().unwrap();
        assert_eq!(
            std::fs::read_to_string(out.path().join("assets/logo.svg")).unwrap(),
            "<svg/>"
        );
        assert_eq!(resource.current_state().unwrap(), ResourceState::Correct);
    }

    #[test]
    fn copies_directory_tree() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("static/css")).unwrap();
        std::fs::write(src.path().join("static/css/site.css"), "body{}").unwrap();

        let resource = CopyResource::new(src.path().join("static"), out.path().join("public"));
        resource.apply().unwrap();
        assert!(out.path().join("public/css/site.css").is_file());
        assert_eq!(resource.current_state().unwrap(), ResourceState::Correct);
    }

    #[test]
    fn changed_destination_is_incorrect_and_replaced() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("a.txt"), "new").unwrap();
        std::fs::write(out.path().join("a.txt"), "old").unwrap();

        let resource = CopyResource::new(src.path().join("a.txt"), out.path().join("a.txt"));
        assert!(matches!(
            resource.current_state().unwrap(),
            ResourceState::Incorrect { .. }
        ));
        resource.apply().unwrap();
        assert_eq!(std::fs::read_to_string(out.path().join("a.txt")).unwrap(), "new");
    }

    #[test]
    fn missing_source_is_invalid() {
        let out = tempfile::tempdir().unwrap();
        let resource = CopyResource::new(out.path().join("nope"), out.path().join("dest"));
        assert!(matches!(
            resource.current_state().unwrap(),
            ResourceState::Invalid { .. }
        ));
    }

    #[test]
    fn destination_inside_source_is_invalid() {
        let src = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("a.txt"), "a").unwrap();
        let resource = CopyResource::new(src.path().to_path_buf(), src.path().join("snapshot"));
        assert!(matches!(
            resource.current_state().unwrap(),
            ResourceState::Invalid { reason } if reason.contains("inside source")
        ));
    }
}
