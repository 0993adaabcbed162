//! Match index: normalized basenames to search for during traversal.
//!
//! Pure data transform, no I/O. The index is rebuilt per root because
//! normalization and the set of still-undiscovered targets differ per pass.
//!
//! A basename match is only a *candidate*: unrelated applications may require
//! files sharing one basename, and a required file may be nested
//! (`bin/launcher.exe`), so acceptance checks that the hit's normalized full
//! path ends with the entire normalized relative path before the verifier
//! confirms the remaining required files.

// -- std imports
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

// -- module imports
use crate::{catalog::SearchTarget, normalize::Normalizer};

/// The atomic unit exchanged between the index and the walker match test:
/// one required file of one search target.
#[derive(Clone)]
pub struct FileEntry<'a> {
    /// The application this required file belongs to.
    pub target: SearchTarget<'a>,

    /// The required path as written in the descriptor, relative to the
    /// install root.
    pub relative_path: String,

    /// Normalized form of `relative_path`, used for suffix acceptance.
    pub normalized_relative: String,
}

/// Reverse index from normalized basename to every file entry it could
/// satisfy. Membership doubles as the O(1) match set used during traversal.
pub struct MatchIndex<'a> {
    entries: HashMap<String, Vec<FileEntry<'a>>>,
}

impl<'a> MatchIndex<'a> {
    /// Build the index for one root.
    ///
    /// Targets with an empty required-file list are skipped: they cannot be
    /// located by search and must rely on self-reporting.
    pub fn build(
        targets: impl IntoIterator<Item = SearchTarget<'a>>,
        normalizer: &Normalizer,
    ) -> Self {
        let mut entries: HashMap<String, Vec<FileEntry<'a>>> = HashMap::new();

        for target in targets {
            for required in target.required_files() {
                let normalized = normalizer.normalize(required);
                let Some(basename) = normalized.rsplit('/').next() else {
                    continue;
                };
                if basename.is_empty() {
                    continue;
                }
                entries.entry(basename.to_string()).or_default().push(FileEntry {
                    target,
                    relative_path: required.clone(),
                    normalized_relative: normalized.clone(),
                });
            }
        }

        Self { entries }
    }

    /// True when no target contributed any required file.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct basenames in the match set.
    pub fn basename_count(&self) -> usize {
        self.entries.len()
    }

    /// All file entries whose required path ends in `basename`.
    pub fn candidates(&self, basename: &str) -> &[FileEntry<'a>] {
        self.entries.get(basename).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Acceptance test for one hit against one entry: the normalized hit path
/// must end with the *entire* normalized relative required path, on a path
/// component boundary.
pub fn suffix_matches(normalized_hit: &str, entry: &FileEntry<'_>) -> bool {
    let suffix = entry.normalized_relative.as_str();
    if !normalized_hit.ends_with(suffix) {
        return false;
    }
    let boundary = normalized_hit.len() - suffix.len();
    boundary == 0 || normalized_hit.as_bytes()[boundary - 1] == b'/'
}

/// Infer the install root for a hit: the hit path minus the matched relative
/// suffix. Removing one component per relative-path segment reproduces the
/// original relative path exactly, intermediate directories included, while
/// preserving the on-disk spelling of the remaining prefix.
pub fn candidate_root(hit: &Path, entry: &FileEntry<'_>) -> Option<PathBuf> {
    let segments = entry.normalized_relative.split('/').count();
    hit.ancestors().nth(segments).map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{GameDescriptor, IconMode, fixed_executable};

    fn game(id: &str, required: &[&str]) -> GameDescriptor {
        GameDescriptor {
            id: id.to_string(),
            name: id.to_string(),
            required_files: required.iter().map(|s| s.to_string()).collect(),
            executable: fixed_executable("game.exe"),
            self_report: None,
            icon_mode: IconMode::None,
            tools: vec![],
        }
    }

    #[test]
    fn empty_required_files_are_not_indexed() {
        let g = game("foo", &[]);
        let n = Normalizer::with_case_folding(true);
        let index = MatchIndex::build([SearchTarget::Game(&g)], &n);
        assert!(index.is_empty());
    }

    #[test]
    fn basename_collision_keeps_both_entries() {
        let flat = game("flat", &["launch.exe"]);
        let nested = game("nested", &["tool/launch.exe"]);
        let n = Normalizer::with_case_folding(true);
        let index =
            MatchIndex::build([SearchTarget::Game(&flat), SearchTarget::Game(&nested)], &n);

        assert_eq!(index.basename_count(), 1);
        assert_eq!(index.candidates("launch.exe").len(), 2);
    }

    #[test]
    fn suffix_match_respects_component_boundaries() {
        let nested = game("nested", &["tool/launch.exe"]);
        let n = Normalizer::with_case_folding(true);
        let index = MatchIndex::build([SearchTarget::Game(&nested)], &n);
        let entry = &index.candidates("launch.exe")[0];

        assert!(suffix_matches("/games/foo/tool/launch.exe", entry));
        // Same basename at the wrong depth must not cross-match.
        assert!(!suffix_matches("/games/foo/launch.exe", entry));
        // Partial component overlap is not a boundary.
        assert!(!suffix_matches("/games/footool/launch.exe", entry));

        let flat = game("flat", &["launch.exe"]);
        let flat_index = MatchIndex::build([SearchTarget::Game(&flat)], &n);
        let flat_entry = &flat_index.candidates("launch.exe")[0];
        assert!(suffix_matches("/games/foo/tool/launch.exe", flat_entry));
        assert!(suffix_matches("/games/foo/launch.exe", flat_entry));
    }

    #[test]
    fn case_folding_applies_to_required_paths() {
        let g = game("foo", &["Bin\\Launcher.EXE"]);
        let n = Normalizer::with_case_folding(true);
        let index = MatchIndex::build([SearchTarget::Game(&g)], &n);

        let candidates = index.candidates("launcher.exe");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].normalized_relative, "bin/launcher.exe");
    }

    #[test]
    fn candidate_root_strips_full_relative_suffix() {
        let g = game("foo", &["bin/data/marker.dat"]);
        let n = Normalizer::with_case_folding(false);
        let index = MatchIndex::build([SearchTarget::Game(&g)], &n);
        let entry = &index.candidates("marker.dat")[0];

        let root = candidate_root(Path::new("/games/Foo/bin/data/marker.dat"), entry);
        assert_eq!(root, Some(PathBuf::from("/games/Foo")));
    }
}
