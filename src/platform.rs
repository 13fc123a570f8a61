use std::fmt;

use serde::{Deserialize, Serialize};

/// Detected operating system platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    /// Linux and other Unix-like systems.
    Linux,
    /// Windows.
    Windows,
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::Windows => write!(f, "windows"),
        }
    }
}

/// Line terminator used for generated file content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    /// `\n`
    #[default]
    Unix,
    /// `\r\n`
    Windows,
}

impl LineEnding {
    /// Rewrite every line break in `text` to this ending.
    ///
    /// # Examples
    ///
    /// ```
    /// use lrc_cli::platform::LineEnding;
    ///
    /// assert_eq!(LineEnding::Windows.apply("a\nb\r\n"), "a\r\nb\r\n");
    /// assert_eq!(LineEnding::Unix.apply("a\r\nb\r"), "a\nb\n");
    /// ```
    #[must_use]
    pub fn apply(self, text: &str) -> String {
        let unix = text.replace("\r\n", "\n").replace('\r', "\n");
        match self {
            Self::Unix => unix,
            Self::Windows => unix.replace('\n', "\r\n"),
        }
    }
}

/// Platform information for the current system.
#[derive(Debug, Clone, Copy)]
pub struct Platform {
    /// Operating system.
    pub os: Os,
}

impl Platform {
    /// Detect the current platform.
    #[must_use]
    pub const fn detect() -> Self {
        Self {
            os: Self::detect_os(),
        }
    }

    /// Create a platform with explicit values (for testing).
    #[cfg(test)]
    #[must_use]
    pub const fn new(os: Os) -> Self {
        Self { os }
    }

    /// Whether this is Windows.
    #[must_use]
    pub const fn is_windows(&self) -> bool {
        matches!(self.os, Os::Windows)
    }

    /// Whether POSIX permission bits can be set.
    #[must_use]
    pub const fn supports_chmod(&self) -> bool {
        !self.is_windows()
    }

    /// Native line ending for generated files.
    #[must_use]
    pub const fn line_ending(&self) -> LineEnding {
        if self.is_windows() {
            LineEnding::Windows
        } else {
            LineEnding::Unix
        }
    }

    const fn detect_os() -> Os {
        if cfg!(target_os = "windows") {
            Os::Windows
        } else {
            // Default to Linux for other Unix-like systems
            Os::Linux
        }
    }
}
