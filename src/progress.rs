//! Adaptive progress estimation for a tree of a-priori-unknown size.
//!
//! The estimator starts from a deliberately huge total so the reported
//! percentage begins near zero, then converges as top-level subtrees finish.
//! The smoothing weights sum to slightly over 1.0 on purpose: keeping the
//! estimate a bit ahead of the true count stops the percentage from sitting
//! at 100% while trailing directories are still processed.

// -- std imports
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

/// Initial total estimate. Large enough that any realistic tree starts at a
/// percentage indistinguishable from zero.
const INITIAL_ESTIMATE: f64 = (1u32 << 24) as f64;

/// Smoothing weights. Intentionally over-unity, see module docs.
const KEEP_WEIGHT: f64 = 0.8;
const EXTRAPOLATE_WEIGHT: f64 = 0.202;

/// Online estimate of total directory count for one search root.
pub struct ProgressEstimator {
    root: PathBuf,
    estimated: f64,
    seen: u64,
    top_level: HashSet<PathBuf>,
    completed_top_level: u64,
    /// Once a non-top-level entry shows up, the immediate children of the
    /// root have all been enumerated and the top-level set is frozen. An
    /// approximation, acceptable because it only feeds progress estimation.
    sealed: bool,
    /// High-watermark of the reported percentage, so revisions of the
    /// estimate never make progress appear to regress.
    reported: f64,
}

impl ProgressEstimator {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            estimated: INITIAL_ESTIMATE,
            seen: 0,
            top_level: HashSet::new(),
            completed_top_level: 0,
            sealed: false,
            reported: 0.0,
        }
    }

    /// Record a directory-entry event.
    pub fn on_directory(&mut self, dir: &Path) {
        self.seen += 1;

        if !self.sealed {
            if let Ok(relative) = dir.strip_prefix(&self.root) {
                if relative.components().count() == 1 {
                    self.top_level.insert(dir.to_path_buf());
                } else {
                    self.sealed = true;
                }
            }
        }

        if self.seen as f64 > self.estimated {
            self.bump();
        }
    }

    /// Record a directory-terminator event. Terminators for top-level
    /// directories mark a finished subtree and trigger re-estimation.
    pub fn on_directory_done(&mut self, dir: &Path) {
        if !self.top_level.contains(dir) {
            return;
        }
        self.completed_top_level += 1;

        let seen = self.seen as f64;
        let per_subtree = seen / self.completed_top_level as f64;
        self.estimated = KEEP_WEIGHT * self.estimated.max(seen)
            + EXTRAPOLATE_WEIGHT * per_subtree * self.top_level.len() as f64;
    }

    /// Immediate upward revision for when reality outruns the estimate.
    fn bump(&mut self) {
        let top = self.top_level.len().max(1) as f64;
        let ratio = if self.completed_top_level > 0 {
            top / self.completed_top_level as f64
        } else {
            top
        };
        self.estimated = (self.seen as f64 * ratio).max(self.seen as f64);
    }

    /// Directories seen so far; the "work done" figure for this root.
    pub fn seen(&self) -> u64 {
        self.seen
    }

    /// Current estimated total, the step-count denominator for external
    /// progress reporting.
    pub fn estimated_total(&self) -> u64 {
        self.estimated.max(self.seen as f64) as u64
    }

    /// Monotonically non-decreasing percentage, capped below 100 until the
    /// caller declares traversal complete via [`Self::finish`].
    pub fn percent(&mut self) -> f64 {
        let raw = if self.estimated > 0.0 {
            (self.seen as f64 / self.estimated * 100.0).min(99.0)
        } else {
            99.0
        };
        self.reported = self.reported.max(raw);
        self.reported
    }

    /// Traversal is complete; the percentage is pinned to 100.
    pub fn finish(&mut self) -> f64 {
        self.reported = 100.0;
        self.reported
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> PathBuf {
        PathBuf::from("/search")
    }

    #[test]
    fn starts_near_zero() {
        let mut est = ProgressEstimator::new(&root());
        est.on_directory(Path::new("/search/a"));
        assert!(est.percent() < 0.01);
    }

    #[test]
    fn percent_is_monotone_and_capped() {
        let mut est = ProgressEstimator::new(&root());
        let mut last = 0.0;
        for i in 0..50 {
            let top = root().join(format!("top{i}"));
            est.on_directory(&top);
            for j in 0..20 {
                est.on_directory(&top.join(format!("sub{j}")));
            }
            est.on_directory_done(&top);

            let p = est.percent();
            assert!(p >= last, "progress regressed: {p} < {last}");
            assert!(p < 100.0);
            last = p;
        }
        assert_eq!(est.finish(), 100.0);
    }

    #[test]
    fn estimate_converges_toward_uniform_subtrees() {
        let mut est = ProgressEstimator::new(&root());
        // 100 top-level dirs of 10 subdirectories each, 1100 total.
        let tops: Vec<PathBuf> = (0..100).map(|i| root().join(format!("t{i}"))).collect();
        for top in &tops {
            est.on_directory(top);
        }
        for top in &tops {
            for j in 0..10 {
                est.on_directory(&top.join(format!("s{j}")));
            }
            est.on_directory_done(top);
        }
        // Over-unity smoothing keeps the estimate at or ahead of the true
        // count, but it must have come down from 2^24 to the right order of
        // magnitude.
        let total = est.estimated_total();
        assert!(total >= 1100, "estimate fell below work done: {total}");
        assert!(total < 3000, "estimate failed to converge: {total}");
    }

    #[test]
    fn seen_overrunning_estimate_bumps_without_division_by_zero() {
        let mut est = ProgressEstimator::new(&root());
        est.estimated = 4.0;
        // No top-level subtree has completed yet; the bump must still move
        // the estimate above the seen count.
        for i in 0..10 {
            est.on_directory(&root().join(format!("t{i}")));
        }
        assert!(est.estimated_total() >= est.seen());
        assert!(est.percent() <= 99.0);
    }

    #[test]
    fn top_level_set_seals_after_first_deep_entry() {
        let mut est = ProgressEstimator::new(&root());
        est.on_directory(Path::new("/search/a"));
        est.on_directory(Path::new("/search/a/deep"));
        // A later sibling of the root no longer joins the top-level set.
        est.on_directory(Path::new("/search/b"));

        est.on_directory_done(Path::new("/search/b"));
        assert_eq!(est.completed_top_level, 0);
        est.on_directory_done(Path::new("/search/a"));
        assert_eq!(est.completed_top_level, 1);
    }
}
