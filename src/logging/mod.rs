//! Console and run-log output for lrc commands.
//!
//! Everything is emitted as [`tracing`] events. [`init_subscriber`] renders
//! them on the console and appends them to a per-command run log under the
//! user cache directory. Schema diagnostics travel as structured events so
//! both outputs can show them compiler-style.
use std::path::PathBuf;

mod logger;
mod render;
mod subscriber;
mod types;

pub use logger::Logger;
pub use subscriber::init_subscriber;
pub use types::{Log, StepEntry, StepStatus};

/// Run log for `command`: `<user cache dir>/<command>.log`.
///
/// Creates the cache directory. Returns `None` when there is no home or the
/// directory cannot be created; the run then goes without a log file.
#[must_use]
pub fn log_file_path(command: &str) -> Option<PathBuf> {
    let dir = crate::config::user_cache_dir()?;
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir.join(format!("{command}.log")))
}

/// A [`Logger`] whose events land in a temporary run log for the current
/// thread only.
#[cfg(test)]
pub(crate) struct LogCapture {
    pub(crate) logger: Logger,
    path: PathBuf,
    _dir: tempfile::TempDir,
    _guard: tracing::dispatcher::DefaultGuard,
}

#[cfg(test)]
#[allow(clippy::expect_used)]
impl LogCapture {
    pub(crate) fn new() -> Self {
        use tracing_subscriber::{Layer as _, filter::LevelFilter, layer::SubscriberExt as _};

        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("test.log");
        let layer = subscriber::FileLayer::create(&path, "test").expect("run log");
        let registry = tracing_subscriber::registry().with(layer.with_filter(LevelFilter::DEBUG));
        let guard = tracing::dispatcher::set_default(&tracing::Dispatch::new(registry));
        Self {
            logger: Logger::new(Some(path.clone())),
            path,
            _dir: dir,
            _guard: guard,
        }
    }

    pub(crate) fn contents(&self) -> String {
        std::fs::read_to_string(&self.path).expect("read run log")
    }
}
