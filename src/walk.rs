//! Streaming directory traversal.
//!
//! One walker instance per root. Entries are delivered through a bounded
//! channel in traversal order, so a slow consumer (a match callback doing
//! verification I/O) backpressures the walk instead of losing entries or
//! buffering the whole tree.
//!
//! Unreadable subdirectories are skipped and traversal continues; only an
//! unreadable *root* is the caller's problem (probed before walking).

// -- std imports
use std::path::{Path, PathBuf};

// -- crate imports
use futures::{SinkExt, channel::mpsc};
use tokio::fs;
use tracing::debug;

/// How many entries may be in flight between walker and consumer.
const CHANNEL_CAPACITY: usize = 256;

/// One event in a root's traversal stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkEvent {
    /// A directory was discovered. Emitted immediately on enumeration,
    /// before its subtree is entered.
    Directory(PathBuf),

    /// The entire subtree below this directory has been traversed.
    DirectoryDone(PathBuf),

    /// A regular file was enumerated.
    File(PathBuf),
}

/// Stream the full tree rooted at `root`.
///
/// Events arrive in depth-first order: a directory's immediate children are
/// enumerated first (each subdirectory producing a [`WalkEvent::Directory`]),
/// then each subtree is descended, then [`WalkEvent::DirectoryDone`] fires
/// for the directory itself. The returned receiver implements `Stream`.
pub fn walk_tree(root: PathBuf) -> mpsc::Receiver<WalkEvent> {
    let (mut tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    tokio::spawn(async move {
        walk_dir(root, &mut tx).await;
    });
    rx
}

async fn walk_dir(dir: PathBuf, tx: &mut mpsc::Sender<WalkEvent>) {
    let mut rd = match fs::read_dir(&dir).await {
        Ok(rd) => rd,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "Skipping unreadable directory");
            // Terminate the (empty) subtree so completion tracking stays
            // consistent for whoever is counting.
            let _ = tx.send(WalkEvent::DirectoryDone(dir)).await;
            return;
        }
    };

    let mut subdirs = Vec::new();

    loop {
        let ent = match rd.next_entry().await {
            Ok(Some(e)) => e,
            Ok(None) => break,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "Directory enumeration aborted");
                break;
            }
        };

        let ft = match ent.file_type().await {
            Ok(ft) => ft,
            Err(_) => continue,
        };

        if ft.is_symlink() {
            continue; // avoid loops
        }

        let path = ent.path();
        if ft.is_dir() {
            if tx.send(WalkEvent::Directory(path.clone())).await.is_err() {
                return; // consumer gone
            }
            subdirs.push(path);
        } else if ft.is_file() {
            if tx.send(WalkEvent::File(path)).await.is_err() {
                return;
            }
        }
    }
    drop(rd);

    for sub in subdirs {
        Box::pin(walk_dir(sub, tx)).await;
    }

    let _ = tx.send(WalkEvent::DirectoryDone(dir)).await;
}

/// Probe that `root` exists and can be enumerated.
///
/// The walker itself tolerates everything below the root; this is the one
/// hard failure the caller is expected to report.
pub async fn probe_root(root: &Path) -> std::io::Result<()> {
    fs::read_dir(root).await.map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::collections::HashSet;

    async fn collect(root: PathBuf) -> Vec<WalkEvent> {
        walk_tree(root).collect().await
    }

    #[tokio::test]
    async fn streams_files_and_directories() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path().to_path_buf();
        fs::create_dir_all(root.join("a/b")).await.unwrap();
        fs::write(root.join("a/one.txt"), b"x").await.unwrap();
        fs::write(root.join("a/b/two.txt"), b"x").await.unwrap();

        let events = collect(root.clone()).await;

        let files: HashSet<_> = events
            .iter()
            .filter_map(|e| match e {
                WalkEvent::File(p) => Some(p.clone()),
                _ => None,
            })
            .collect();
        assert!(files.contains(&root.join("a/one.txt")));
        assert!(files.contains(&root.join("a/b/two.txt")));

        let dirs: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, WalkEvent::Directory(_)))
            .collect();
        assert_eq!(dirs.len(), 2);
    }

    #[tokio::test]
    async fn directory_done_follows_full_subtree() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path().to_path_buf();
        fs::create_dir_all(root.join("top/deep")).await.unwrap();
        fs::write(root.join("top/deep/file"), b"x").await.unwrap();

        let events = collect(root.clone()).await;

        let done_top = events
            .iter()
            .position(|e| *e == WalkEvent::DirectoryDone(root.join("top")))
            .expect("terminator for top");
        let deep_file = events
            .iter()
            .position(|e| *e == WalkEvent::File(root.join("top/deep/file")))
            .expect("deep file");
        let done_deep = events
            .iter()
            .position(|e| *e == WalkEvent::DirectoryDone(root.join("top/deep")))
            .expect("terminator for deep");

        assert!(deep_file < done_deep);
        assert!(done_deep < done_top);

        // The root's own terminator comes last.
        assert_eq!(events.last(), Some(&WalkEvent::DirectoryDone(root)));
    }

    #[tokio::test]
    async fn top_level_directories_precede_descent() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path().to_path_buf();
        fs::create_dir_all(root.join("a/inner")).await.unwrap();
        fs::create_dir_all(root.join("b")).await.unwrap();
        fs::create_dir_all(root.join("c")).await.unwrap();

        let events = collect(root.clone()).await;

        let inner_pos = events
            .iter()
            .position(|e| *e == WalkEvent::Directory(root.join("a/inner")))
            .unwrap();
        for top in ["a", "b", "c"] {
            let pos = events
                .iter()
                .position(|e| *e == WalkEvent::Directory(root.join(top)))
                .unwrap();
            assert!(pos < inner_pos, "{top} enumerated after descent");
        }
    }

    #[tokio::test]
    async fn missing_root_yields_nothing_and_probe_fails() {
        let root = PathBuf::from("/definitely/not/here/xyz");
        assert!(probe_root(&root).await.is_err());
        let events = collect(root.clone()).await;
        // Only the root's own terminator, no entries.
        assert_eq!(events, vec![WalkEvent::DirectoryDone(root)]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unreadable_subdirectory_is_skipped() {
        use std::{fs::Permissions, os::unix::fs::PermissionsExt};

        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path().to_path_buf();
        fs::create_dir_all(root.join("locked")).await.unwrap();
        fs::create_dir_all(root.join("open")).await.unwrap();
        fs::write(root.join("open/file"), b"x").await.unwrap();
        fs::set_permissions(root.join("locked"), Permissions::from_mode(0o000))
            .await
            .unwrap();

        let events = collect(root.clone()).await;

        fs::set_permissions(root.join("locked"), Permissions::from_mode(0o755))
            .await
            .unwrap();

        assert!(events.contains(&WalkEvent::File(root.join("open/file"))));
        // The locked directory is still announced; its subtree is simply
        // empty in the stream.
        assert!(events.contains(&WalkEvent::Directory(root.join("locked"))));
        assert_eq!(events.last(), Some(&WalkEvent::DirectoryDone(root)));
    }
}
