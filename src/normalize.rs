//! Per-root filename normalization.
//!
//! Every filename comparison in the engine funnels through one [`Normalizer`]
//! built for the root in question, so case-insensitive and case-sensitive
//! filesystems are both handled without branching elsewhere.

// -- std imports
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

// -- crate imports
use anyhow::{Context, Result};
use tokio::fs;
use tracing::debug;

/// Pure filename-comparison function for one filesystem root.
///
/// Folds path separators to `/` and, when the root's filesystem is
/// case-insensitive, folds case. The produced keys are only ever compared
/// against other keys from the same normalizer.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    fold_case: bool,
}

impl Normalizer {
    /// Probe `root` and build the normalizer appropriate to its filesystem.
    ///
    /// # Errors
    /// - [`anyhow::Error`] if `root` cannot be stat'ed. Callers treat the
    ///   root as unusable and report an error for that root only.
    pub async fn for_root(root: &Path) -> Result<Self> {
        let fold_case = detect_case_insensitive(root).await?;
        debug!(root = %root.display(), fold_case, "Built normalizer");
        Ok(Self { fold_case })
    }

    /// A normalizer with explicit folding behavior, for callers that already
    /// know the filesystem semantics (and for tests).
    pub fn with_case_folding(fold_case: bool) -> Self {
        Self { fold_case }
    }

    /// Normalize a path (or path fragment) to a comparable key.
    pub fn normalize(&self, path: &str) -> String {
        let folded = path.replace('\\', "/");
        if self.fold_case {
            folded.to_lowercase()
        } else {
            folded
        }
    }

    /// Normalize the basename of `path`.
    pub fn normalize_basename(&self, path: &Path) -> Option<String> {
        let name = path.file_name()?.to_string_lossy();
        Some(self.normalize(&name))
    }
}

/// Decide whether the filesystem holding `root` compares names
/// case-insensitively.
///
/// Walks up from `root` to the first existing component containing a letter,
/// stats a case-swapped sibling name, and compares file identity. The stat of
/// `root` itself is the setup probe: if it fails the whole root is unusable
/// and the error propagates.
async fn detect_case_insensitive(root: &Path) -> Result<bool> {
    fs::metadata(root)
        .await
        .with_context(|| format!("Cannot stat search root: {}", root.display()))?;

    let mut probe = root.to_path_buf();
    loop {
        if let Some(name) = probe.file_name().and_then(|s| s.to_str()) {
            let swapped = swap_ascii_case(name);
            if swapped != name {
                return case_probe(&probe, &probe.with_file_name(swapped)).await;
            }
        }
        match probe.parent() {
            Some(parent) if parent != probe => probe = parent.to_path_buf(),
            _ => return Ok(platform_default()),
        }
    }
}

/// Compare `original` against its case-swapped spelling.
///
/// Both resolving to the same file means the filesystem folds case. A
/// missing swapped spelling means it does not. Any other outcome falls back
/// to the platform default.
async fn case_probe(original: &Path, swapped: &Path) -> Result<bool> {
    let original_meta = match fs::metadata(original).await {
        Ok(meta) => meta,
        Err(_) => return Ok(platform_default()),
    };

    match fs::metadata(swapped).await {
        Ok(swapped_meta) => Ok(same_file(&original_meta, &swapped_meta)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(_) => Ok(platform_default()),
    }
}

fn platform_default() -> bool {
    cfg!(any(windows, target_os = "macos"))
}

#[cfg(unix)]
fn same_file(a: &std::fs::Metadata, b: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    a.dev() == b.dev() && a.ino() == b.ino()
}

#[cfg(not(unix))]
fn same_file(_a: &std::fs::Metadata, _b: &std::fs::Metadata) -> bool {
    // Without inode identity, a successful stat of the swapped spelling is
    // treated as case folding.
    true
}

fn swap_ascii_case(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_lowercase() {
                c.to_ascii_uppercase()
            } else if c.is_ascii_uppercase() {
                c.to_ascii_lowercase()
            } else {
                c
            }
        })
        .collect()
}

/// Normalize a bare Windows drive-letter path (`C:`) to include a trailing
/// separator. Without it, some current-working-directory semantics resolve
/// `C:` to an unrelated directory before traversal even begins.
pub fn fix_drive_root(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    let bytes = raw.as_bytes();
    if bytes.len() == 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
        PathBuf::from(format!("{raw}\\"))
    } else {
        path.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_separators_always() {
        let n = Normalizer::with_case_folding(false);
        assert_eq!(n.normalize("bin\\Launcher.exe"), "bin/Launcher.exe");
    }

    #[test]
    fn folds_case_only_when_enabled() {
        let sensitive = Normalizer::with_case_folding(false);
        let insensitive = Normalizer::with_case_folding(true);
        assert_eq!(sensitive.normalize("Foo.EXE"), "Foo.EXE");
        assert_eq!(insensitive.normalize("Foo.EXE"), "foo.exe");
    }

    #[test]
    fn normalizes_basename() {
        let n = Normalizer::with_case_folding(true);
        let base = n.normalize_basename(Path::new("/games/Foo/Bin/Launch.EXE"));
        assert_eq!(base.as_deref(), Some("launch.exe"));
    }

    #[test]
    fn swap_case_roundtrip() {
        assert_eq!(swap_ascii_case("Foo7"), "fOO7");
        assert_eq!(swap_ascii_case("1234"), "1234");
    }

    #[test]
    fn drive_root_gets_separator() {
        assert_eq!(fix_drive_root(Path::new("C:")), PathBuf::from("C:\\"));
        assert_eq!(fix_drive_root(Path::new("C:\\games")), PathBuf::from("C:\\games"));
        assert_eq!(fix_drive_root(Path::new("/games")), PathBuf::from("/games"));
    }

    #[tokio::test]
    async fn missing_root_is_an_error() {
        let err = Normalizer::for_root(Path::new("/definitely/not/a/real/root/xyz")).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn existing_root_builds() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("Probe");
        tokio::fs::create_dir(&dir).await.unwrap();
        let n = Normalizer::for_root(&dir).await.unwrap();
        // Folding behavior depends on the host filesystem; the invariant is
        // that normalization is deterministic either way.
        assert_eq!(n.normalize("a/b"), n.normalize("a/b"));
    }
}
