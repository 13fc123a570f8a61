//! Permission-bits resource.
use anyhow::Result;
use std::path::PathBuf;

use super::{Resource, ResourceChange, ResourceState};

/// A permission mode that a path must carry (Unix only).
#[derive(Debug, Clone)]
pub struct ChmodResource {
    /// Target path (absolute).
    pub target: PathBuf,
    /// Permission bits, e.g. `0o755`.
    pub mode: u32,
}

impl ChmodResource {
    /// Create a new chmod resource.
    #[must_use]
    pub const fn new(target: PathBuf, mode: u32) -> Self {
        Self { target, mode }
    }
}

impl Resource for ChmodResource {
    fn description(&self) -> String {
        format!("{:04o} {}", self.mode, self.target.display())
    }

    fn current_state(&self) -> Result<ResourceState> {
        if !self.target.exists() {
            return Ok(ResourceState::Invalid {
                reason: format!("target does not exist: {}", self.target.display()),
            });
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let current_mode = std::fs::metadata(&self.target)?.permissions().mode() & 0o7777;

            if current_mode == self.mode {
                Ok(ResourceState::Correct)
            } else {
                Ok(ResourceState::Incorrect {
                    current: format!("{current_mode:o}"),
                })
            }
        }

        // Permission bits are not tracked here; apply() reports the skip
        #[cfg(not(unix))]
        {
            Ok(ResourceState::Missing)
        }
    }

    fn apply(&self) -> Result<ResourceChange> {
        #[cfg(unix)]
        {
            use anyhow::Context as _;
            use std::os::unix::fs::PermissionsExt;

            std::fs::set_permissions(&self.target, std::fs::Permissions::from_mode(self.mode))
                .with_context(|| format!("set permissions: {}", self.target.display()))?;
            Ok(ResourceChange::Applied)
        }

        #[cfg(not(unix))]
        {
            Ok(ResourceChange::Skipped {
                reason: "chmod not supported on this platform".to_string(),
            })
        }
    }

    fn replaces_content(&self) -> bool {
        false
    }
}
