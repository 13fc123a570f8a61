//! Detached-signature verification for schema files.
//!
//! An included schema is verified whenever a sibling `<file>.asc` or
//! `<file>.sig` exists. When signed includes are required, a missing
//! signature (or a missing verification tool) is fatal; otherwise it only
//! produces an unverified [`SignatureReport`].
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::error::CompileError;
use crate::exec::Executor;
use crate::schema::{Diagnostic, SourceLocation};

/// Environment variable that makes signed includes mandatory.
pub const REQUIRE_SIGNED_ENV: &str = "LRC_REQUIRE_SIGNED_INCLUDES";

/// Signature file extensions, in lookup order.
pub const SIGNATURE_EXTENSIONS: [&str; 2] = ["asc", "sig"];

/// Outcome of one verification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// The signature is valid for the file's current contents.
    Valid,
    /// The signature does not verify.
    Invalid {
        /// Tool output explaining the failure.
        reason: String,
    },
    /// The verification tool is not installed.
    ToolUnavailable {
        /// Program that was looked for.
        tool: String,
    },
}

/// Capability that checks a detached signature against a file.
#[cfg_attr(test, mockall::automock)]
pub trait SignatureVerifier {
    /// Verify `signature` against the current contents of `file`.
    fn verify(&self, file: &Path, signature: &Path) -> Verification;
}

/// [`SignatureVerifier`] that shells out to `gpg --verify`.
#[derive(Debug, Clone)]
pub struct GpgVerifier {
    executor: Arc<dyn Executor>,
    program: String,
}

impl GpgVerifier {
    /// Verifier running `program` (normally `gpg`) through `executor`.
    #[must_use]
    pub fn new(executor: Arc<dyn Executor>, program: impl Into<String>) -> Self {
        Self {
            executor,
            program: program.into(),
        }
    }
}

impl SignatureVerifier for GpgVerifier {
    fn verify(&self, file: &Path, signature: &Path) -> Verification {
        if !self.executor.which(&self.program) {
            return Verification::ToolUnavailable {
                tool: self.program.clone(),
            };
        }
        let sig = signature.to_string_lossy();
        let target = file.to_string_lossy();
        match self
            .executor
            .run_unchecked(&self.program, &["--batch", "--verify", &sig, &target])
        {
            Ok(result) if result.success => Verification::Valid,
            Ok(result) => {
                let reason = result
                    .stderr
                    .lines()
                    .map(str::trim)
                    .rfind(|l| !l.is_empty())
                    .map_or_else(
                        || format!("{} exited with code {}", self.program, result.code.unwrap_or(-1)),
                        ToString::to_string,
                    );
                Verification::Invalid { reason }
            }
            Err(e) => {
                tracing::debug!("{} could not be started: {e:#}", self.program);
                Verification::ToolUnavailable {
                    tool: self.program.clone(),
                }
            }
        }
    }
}

/// Run-wide signature policy, fixed once per compile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignaturePolicy {
    /// Whether every include must carry a valid signature.
    pub require: bool,
}

impl SignaturePolicy {
    /// Policy from the value of [`REQUIRE_SIGNED_ENV`] (`1`, `true`, `yes`).
    #[must_use]
    pub fn from_env_value(value: Option<&str>) -> Self {
        let require = value.is_some_and(|v| {
            matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
        });
        Self { require }
    }

    /// Policy from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_value(std::env::var(REQUIRE_SIGNED_ENV).ok().as_deref())
    }

    /// Require signatures if `required` is set, on top of this policy.
    #[must_use]
    pub const fn or_require(self, required: bool) -> Self {
        Self {
            require: self.require || required,
        }
    }
}

/// Recorded result of checking one schema file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureReport {
    /// The schema file.
    pub path: PathBuf,
    /// Whether a signature was verified successfully.
    pub verified: bool,
    /// The signature file that was checked, if any.
    pub signature: Option<PathBuf>,
    /// Short human-readable outcome.
    pub message: String,
}

/// First sibling signature of `file` that exists.
#[must_use]
pub fn detect_signature(file: &Path) -> Option<PathBuf> {
    SIGNATURE_EXTENSIONS.iter().find_map(|ext| {
        let mut name = file.as_os_str().to_os_string();
        name.push(".");
        name.push(ext);
        let candidate = PathBuf::from(name);
        candidate.is_file().then_some(candidate)
    })
}

/// Apply the signature policy to one schema file.
///
/// `required` makes a missing signature or tool fatal. A warning diagnostic
/// is returned when verification had to be skipped.
///
/// # Errors
///
/// Returns [`CompileError::Signature`] for an invalid signature or a missing
/// one when required, and [`CompileError::ToolUnavailable`] when the tool is
/// missing and signatures are required.
pub fn check_file(
    verifier: &dyn SignatureVerifier,
    file: &Path,
    required: bool,
    location: &SourceLocation,
) -> Result<(SignatureReport, Option<Diagnostic>), CompileError> {
    let Some(signature) = detect_signature(file) else {
        if required {
            return Err(CompileError::Signature {
                location: location.clone(),
                path: file.to_path_buf(),
                reason: "signature required but no .asc or .sig file found".to_string(),
            });
        }
        return Ok((
            SignatureReport {
                path: file.to_path_buf(),
                verified: false,
                signature: None,
                message: "signature missing".to_string(),
            },
            None,
        ));
    };

    match verifier.verify(file, &signature) {
        Verification::Valid => {
            tracing::debug!("signature ok: {}", signature.display());
            Ok((
                SignatureReport {
                    path: file.to_path_buf(),
                    verified: true,
                    signature: Some(signature),
                    message: "signature verified".to_string(),
                },
                None,
            ))
        }
        Verification::Invalid { reason } => Err(CompileError::Signature {
            location: location.clone(),
            path: file.to_path_buf(),
            reason,
        }),
        Verification::ToolUnavailable { tool } if required => Err(CompileError::ToolUnavailable {
            location: location.clone(),
            tool,
            path: file.to_path_buf(),
        }),
        Verification::ToolUnavailable { tool } => {
            let message = format!("`{tool}` not available, signature of {} not verified", file.display());
            tracing::warn!("{message}");
            Ok((
                SignatureReport {
                    path: file.to_path_buf(),
                    verified: false,
                    signature: Some(signature),
                    message: format!("{tool} unavailable"),
                },
                Some(Diagnostic::warning(location.clone(), message)),
            ))
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::exec::test_helpers::MockExecutor;
    use std::fs;

    fn loc() -> SourceLocation {
        SourceLocation::new("main.lrc", 3)
    }

    fn schema_with_sig(ext: Option<&str>) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("inc.lrc");
        fs::write(&file, "a.txt\n").unwrap();
        if let Some(ext) = ext {
            fs::write(dir.path().join(format!("inc.lrc.{ext}")), "sig").unwrap();
        }
        (dir, file)
    }

    // -----------------------------------------------------------------------
    // detect_signature
    // -----------------------------------------------------------------------

    #[test]
    fn detect_prefers_asc() {
        let (dir, file) = schema_with_sig(Some("sig"));
        fs::write(dir.path().join("inc.lrc.asc"), "sig").unwrap();
        assert_eq!(detect_signature(&file), Some(dir.path().join("inc.lrc.asc")));
    }

    #[test]
    fn detect_none_without_sibling() {
        let (_dir, file) = schema_with_sig(None);
        assert_eq!(detect_signature(&file), None);
    }

    // -----------------------------------------------------------------------
    // check_file
    // -----------------------------------------------------------------------

    #[test]
    fn missing_signature_is_fine_when_optional() {
        let (_dir, file) = schema_with_sig(None);
        let mut verifier = MockSignatureVerifier::new();
        verifier.expect_verify().never();
        let (report, diag) = check_file(&verifier, &file, false, &loc()).unwrap();
        assert!(!report.verified);
        assert!(diag.is_none());
    }

    #[test]
    fn missing_signature_is_fatal_when_required() {
        let (_dir, file) = schema_with_sig(None);
        let verifier = MockSignatureVerifier::new();
        let err = check_file(&verifier, &file, true, &loc()).unwrap_err();
        assert!(matches!(err, CompileError::Signature { .. }));
    }

    #[test]
    fn present_signature_is_always_verified() {
        let (_dir, file) = schema_with_sig(Some("asc"));
        let mut verifier = MockSignatureVerifier::new();
        verifier
            .expect_verify()
            .times(1)
            .returning(|_, _| Verification::Invalid {
                reason: "BAD signature".into(),
            });
        let err = check_file(&verifier, &file, false, &loc()).unwrap_err();
        assert!(err.to_string().contains("BAD signature"));
    }

    #[test]
    fn valid_signature_is_reported() {
        let (_dir, file) = schema_with_sig(Some("sig"));
        let mut verifier = MockSignatureVerifier::new();
        verifier.expect_verify().returning(|_, _| Verification::Valid);
        let (report, _) = check_file(&verifier, &file, true, &loc()).unwrap();
        assert!(report.verified);
        assert!(report.signature.is_some());
    }

    #[test]
    fn tool_unavailable_degrades_to_warning() {
        let (_dir, file) = schema_with_sig(Some("asc"));
        let mut verifier = MockSignatureVerifier::new();
        verifier
            .expect_verify()
            .returning(|_, _| Verification::ToolUnavailable { tool: "gpg".into() });
        let (report, diag) = check_file(&verifier, &file, false, &loc()).unwrap();
        assert!(!report.verified);
        assert!(diag.expect("warning").message.contains("gpg"));
    }

    #[test]
    fn tool_unavailable_is_fatal_when_required() {
        let (_dir, file) = schema_with_sig(Some("asc"));
        let mut verifier = MockSignatureVerifier::new();
        verifier
            .expect_verify()
            .returning(|_, _| Verification::ToolUnavailable { tool: "gpg".into() });
        let err = check_file(&verifier, &file, true, &loc()).unwrap_err();
        assert!(matches!(err, CompileError::ToolUnavailable { .. }));
    }

    // -----------------------------------------------------------------------
    // GpgVerifier
    // -----------------------------------------------------------------------

    #[test]
    fn gpg_missing_is_tool_unavailable() {
        let exec = Arc::new(MockExecutor::with_responses(vec![]).with_which(false));
        let verifier = GpgVerifier::new(exec.clone(), "gpg");
        assert_eq!(
            verifier.verify(Path::new("a"), Path::new("a.asc")),
            Verification::ToolUnavailable { tool: "gpg".into() }
        );
        assert!(exec.calls().is_empty());
    }

    #[test]
    fn gpg_success_is_valid() {
        let exec = Arc::new(MockExecutor::ok(""));
        let verifier = GpgVerifier::new(exec.clone(), "gpg");
        assert_eq!(
            verifier.verify(Path::new("a.lrc"), Path::new("a.lrc.asc")),
            Verification::Valid
        );
        let calls = exec.calls();
        assert_eq!(calls[0].1, ["--batch", "--verify", "a.lrc.asc", "a.lrc"]);
    }

    #[test]
    fn gpg_failure_keeps_last_stderr_line() {
        let exec = Arc::new(MockExecutor::fail("gpg: Signature made\ngpg: BAD signature\n"));
        let verifier = GpgVerifier::new(exec, "gpg");
        assert_eq!(
            verifier.verify(Path::new("a"), Path::new("a.asc")),
            Verification::Invalid {
                reason: "gpg: BAD signature".into()
            }
        );
    }

    // -----------------------------------------------------------------------
    // SignaturePolicy
    // -----------------------------------------------------------------------

    #[test]
    fn policy_env_values() {
        assert!(SignaturePolicy::from_env_value(Some("YES")).require);
        assert!(SignaturePolicy::from_env_value(Some("1")).require);
        assert!(!SignaturePolicy::from_env_value(Some("0")).require);
        assert!(!SignaturePolicy::from_env_value(None).require);
        assert!(SignaturePolicy::default().or_require(true).require);
    }
}
