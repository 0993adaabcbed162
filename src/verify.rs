//! Candidate-root verification.
//!
//! A basename hit only proves one file; acceptance requires every required
//! file of the specific application to be present under the inferred root.
//! This is a cheap existence probe (metadata only, no opens, no locks) run
//! before the user has committed to managing the install.

// -- std imports
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

// -- crate imports
use anyhow::{Context, Result};
use tokio::fs;
use tracing::debug;

/// Outcome of probing a candidate root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// All required files are present and readable.
    Confirmed,

    /// All files are present but at least one was permission-denied. The
    /// directory is plausible; the install may become manageable once
    /// permissions are resolved, so discovery proceeds with a warning.
    SoftAccept {
        /// The files that could not be read, for diagnostics.
        denied: Vec<PathBuf>,
    },

    /// A required file is absent. Not an error, just not this directory.
    Missing {
        /// The first required file found missing.
        path: PathBuf,
    },
}

impl Verification {
    /// Whether this outcome accepts the candidate.
    pub fn accepted(&self) -> bool {
        matches!(self, Verification::Confirmed | Verification::SoftAccept { .. })
    }
}

/// Confirm every file in `required` exists under `root`.
///
/// # Errors
/// - [`anyhow::Error`] for I/O failures other than not-found or
///   permission-denied; those reject the candidate and propagate.
pub async fn verify_required_files(root: &Path, required: &[String]) -> Result<Verification> {
    let mut denied = Vec::new();

    for relative in required {
        let candidate = root.join(relative);
        match fs::metadata(&candidate).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(file = %candidate.display(), "Required file missing");
                return Ok(Verification::Missing { path: candidate });
            }
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                denied.push(candidate);
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to probe {}", candidate.display()));
            }
        }
    }

    if denied.is_empty() {
        Ok(Verification::Confirmed)
    } else {
        Ok(Verification::SoftAccept { denied })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required(files: &[&str]) -> Vec<String> {
        files.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn confirms_when_all_files_exist() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("bin")).await.unwrap();
        fs::write(root.join("game.exe"), b"x").await.unwrap();
        fs::write(root.join("bin/data.pak"), b"x").await.unwrap();

        let outcome = verify_required_files(root, &required(&["game.exe", "bin/data.pak"]))
            .await
            .unwrap();
        assert_eq!(outcome, Verification::Confirmed);
        assert!(outcome.accepted());
    }

    #[tokio::test]
    async fn reports_first_missing_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path();
        fs::write(root.join("game.exe"), b"x").await.unwrap();

        let outcome = verify_required_files(root, &required(&["game.exe", "bin/data.pak"]))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            Verification::Missing {
                path: root.join("bin/data.pak")
            }
        );
        assert!(!outcome.accepted());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn permission_denied_soft_accepts_with_diagnostics() {
        use std::{fs::Permissions, os::unix::fs::PermissionsExt};

        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("locked")).await.unwrap();
        fs::write(root.join("locked/tool.exe"), b"x").await.unwrap();
        fs::write(root.join("open.exe"), b"x").await.unwrap();
        fs::set_permissions(root.join("locked"), Permissions::from_mode(0o000))
            .await
            .unwrap();

        let outcome =
            verify_required_files(root, &required(&["open.exe", "locked/tool.exe"])).await;

        fs::set_permissions(root.join("locked"), Permissions::from_mode(0o755))
            .await
            .unwrap();

        // Root can bypass directory permissions; only assert the strict
        // behavior when the probe was actually denied.
        match outcome.unwrap() {
            Verification::SoftAccept { denied } => {
                assert_eq!(denied, vec![root.join("locked/tool.exe")]);
            }
            Verification::Confirmed => {}
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
