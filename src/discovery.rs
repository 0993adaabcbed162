//! Discovery orchestration.
//!
//! Two public algorithms drive the engine components over collections of
//! applications and search roots:
//!
//! - [`quick_discovery`] invokes each application's self-report capability
//!   and validates the answer.
//! - [`search_discovery`] brute-force walks each search root, recognizing
//!   install directories from marker-file hits.
//!
//! Failures are contained at the smallest unit that makes sense (per file,
//! per tool, per game, per root) and never bubble up to fail sibling units.
//! Results stream through the sink as soon as they are confirmed.

// -- std imports
use std::{
    collections::{HashMap, HashSet},
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Mutex,
};

// -- crate imports
use anyhow::Result;
use futures::{StreamExt, stream};
use tokio::fs;
use tracing::{debug, warn};

// -- module imports
use crate::{
    catalog::{
        Discovery, DiscoverySink, GameDescriptor, IconMode, SearchTarget, ToolDescriptor,
        ToolDiscovery,
    },
    index::{self, MatchIndex},
    normalize::{Normalizer, fix_drive_root},
    progress::ProgressEstimator,
    verify::{Verification, verify_required_files},
    walk::{WalkEvent, probe_root, walk_tree},
};

/// Error-sink title for a root that does not exist.
pub const MISSING_ROOT_ERROR: &str = "A search path doesn't exist or is not connected";

/// Error-sink title for a root that exists but cannot be listed.
pub const UNREADABLE_ROOT_ERROR: &str = "A search path could not be read";

/// Previously discovered games, keyed by game id.
pub type PreviousGames = HashMap<String, Discovery>;

/// Previously discovered tools, keyed by game id, then tool id.
pub type PreviousTools = HashMap<String, HashMap<String, ToolDiscovery>>;

/// Results confirmed during the current pass, shared across concurrently
/// processed roots so the same install is never emitted twice.
#[derive(Default)]
struct PassState {
    games: Mutex<HashSet<String>>,
    tools: Mutex<HashSet<(String, String)>>,
}

impl PassState {
    /// Check-and-claim a game id. Returns false when already claimed.
    fn claim_game(&self, id: &str) -> bool {
        self.games.lock().expect("pass state poisoned").insert(id.to_string())
    }

    fn game_claimed(&self, id: &str) -> bool {
        self.games.lock().expect("pass state poisoned").contains(id)
    }

    /// Give a claim back, so a later healthy hit (possibly from another
    /// root) can still win the id.
    fn release_game(&self, id: &str) {
        self.games.lock().expect("pass state poisoned").remove(id);
    }

    fn claim_tool(&self, game_id: &str, tool_id: &str) -> bool {
        self.tools
            .lock()
            .expect("pass state poisoned")
            .insert((game_id.to_string(), tool_id.to_string()))
    }
}

fn tool_known(previous_tools: &PreviousTools, game_id: &str, tool_id: &str) -> bool {
    previous_tools
        .get(game_id)
        .is_some_and(|tools| tools.contains_key(tool_id))
}

/// Locate applications via their own self-reported install paths.
///
/// Games are processed with bounded concurrency (`jobs` wide); within one
/// game, its tools follow the game itself. A missing self-report, a path
/// that turns out not to exist, or a defective descriptor each count as
/// "this one application not found" and never abort the rest of the pass.
///
/// Returns the ids of games discovered by this pass.
pub async fn quick_discovery(
    games: &[GameDescriptor],
    previous: &PreviousGames,
    previous_tools: &PreviousTools,
    jobs: usize,
    sink: &dyn DiscoverySink,
) -> Vec<String> {
    let jobs = jobs.max(1);
    debug!(games = games.len(), jobs, "Starting quick discovery");

    let discovered: Vec<Option<String>> = stream::iter(games)
        .map(|game| quick_discover_game(game, previous, previous_tools, sink))
        .buffer_unordered(jobs)
        .collect()
        .await;

    discovered.into_iter().flatten().collect()
}

async fn quick_discover_game(
    game: &GameDescriptor,
    previous: &PreviousGames,
    previous_tools: &PreviousTools,
    sink: &dyn DiscoverySink,
) -> Option<String> {
    let prior = previous.get(&game.id);

    let discovered = if prior.is_some_and(|p| p.path_set_manually) {
        debug!(game = %game.id, "Path set manually, leaving untouched");
        None
    } else {
        quick_discover_one(game, sink).await
    };

    if discovered.is_none() {
        invalidate_if_stale(&game.id, prior, sink).await;
    }

    // Tools with their own self-report capability, after the game.
    for tool in &game.tools {
        quick_discover_tool(game, tool, previous_tools, sink).await;
    }

    // Relative tools are only findable once the game root is known.
    if let Some(root) = &discovered {
        discover_relative_tools(game, root, previous_tools, sink).await;
    }

    discovered.map(|_| game.id.clone())
}

/// Run one game's self-report and emit a discovery if it checks out.
/// Returns the discovered install root.
async fn quick_discover_one(game: &GameDescriptor, sink: &dyn DiscoverySink) -> Option<PathBuf> {
    let provider = game.self_report.as_ref()?;

    let path = match provider.query_path().await {
        Ok(Some(path)) => path,
        Ok(None) => {
            debug!(game = %game.id, "No self-reported path");
            return None;
        }
        Err(e) => {
            // Descriptor defect: this one application counts as not found.
            warn!(game = %game.id, error = %e, "Self-report failed");
            return None;
        }
    };

    match fs::metadata(&path).await {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(game = %game.id, path = %path.display(), "Self-reported path does not exist");
            return None;
        }
        Err(e) => {
            warn!(game = %game.id, path = %path.display(), error = %e, "Cannot probe self-reported path");
            return None;
        }
    }

    let executable = match executable_override(&game.executable, &path) {
        Ok(exe) => exe,
        Err(e) => {
            warn!(game = %game.id, error = %e, "Executable resolution failed");
            return None;
        }
    };

    if game.icon_mode == IconMode::Executable {
        let launch = executable
            .clone()
            .or_else(|| (game.executable)(None).ok())
            .map(|exe| path.join(exe));
        if let Some(launch) = launch {
            spawn_icon_generation(sink, &game.id, &launch);
        }
    }

    debug!(game = %game.id, path = %path.display(), "Game discovered via self-report");
    sink.discovered_game(
        &game.id,
        Some(Discovery {
            path: path.clone(),
            executable,
            path_set_manually: false,
        }),
    );
    Some(path)
}

async fn quick_discover_tool(
    game: &GameDescriptor,
    tool: &ToolDescriptor,
    previous_tools: &PreviousTools,
    sink: &dyn DiscoverySink,
) {
    let Some(provider) = tool.self_report.as_ref() else {
        return;
    };
    if tool_known(previous_tools, &game.id, &tool.id) {
        return;
    }

    let path = match provider.query_path().await {
        Ok(Some(path)) => path,
        Ok(None) => return,
        Err(e) => {
            warn!(tool = %tool.id, error = %e, "Tool self-report failed");
            return;
        }
    };

    match fs::metadata(&path).await {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(tool = %tool.id, path = %path.display(), "Self-reported tool path does not exist");
            return;
        }
        Err(e) => {
            warn!(tool = %tool.id, path = %path.display(), error = %e, "Cannot probe tool path");
            return;
        }
    }

    emit_tool(SearchTarget::Tool { game, tool }, &path, sink);
}

/// Quick discovery re-validates stored automatic results: a stale entry whose
/// path is gone is cleared through the sink so the caller can drop it.
/// Manual entries are never touched.
async fn invalidate_if_stale(game_id: &str, prior: Option<&Discovery>, sink: &dyn DiscoverySink) {
    let Some(prior) = prior else { return };
    if prior.path_set_manually {
        return;
    }
    if let Err(e) = fs::metadata(&prior.path).await {
        if e.kind() == ErrorKind::NotFound {
            debug!(game = %game_id, path = %prior.path.display(), "Previous discovery is stale, clearing");
            sink.discovered_game(game_id, None);
        }
    }
}

/// Locate applications by walking `roots` and matching marker files.
///
/// Roots are processed concurrently (`jobs` wide); each failure domain is a
/// single root, reported once through the error sink and skipped. Returns
/// the total number of directories processed across all roots, a diagnostic
/// figure only.
pub async fn search_discovery(
    roots: &[PathBuf],
    games: &[GameDescriptor],
    previous: &PreviousGames,
    previous_tools: &PreviousTools,
    jobs: usize,
    sink: &dyn DiscoverySink,
) -> u64 {
    let jobs = jobs.max(1);
    let pass = PassState::default();
    debug!(roots = roots.len(), games = games.len(), jobs, "Starting search discovery");

    stream::iter(roots.iter().enumerate())
        .map(|(root_index, root)| {
            search_root(root_index, root, games, previous, previous_tools, &pass, sink)
        })
        .buffer_unordered(jobs)
        .fold(0u64, |total, dirs| async move { total + dirs })
        .await
}

/// Walk one search root to completion. Never fails: unusable roots are
/// reported to the error sink and count as zero directories.
async fn search_root(
    root_index: usize,
    root: &Path,
    games: &[GameDescriptor],
    previous: &PreviousGames,
    previous_tools: &PreviousTools,
    pass: &PassState,
    sink: &dyn DiscoverySink,
) -> u64 {
    let root = fix_drive_root(root);

    let normalizer = match Normalizer::for_root(&root).await {
        Ok(n) => n,
        Err(e) => {
            report_root_error(&root, &e, sink);
            return 0;
        }
    };
    if let Err(e) = probe_root(&root).await {
        report_root_error(&root, &anyhow::Error::new(e), sink);
        return 0;
    }

    let index = MatchIndex::build(search_targets(games, previous, previous_tools, pass), &normalizer);
    if index.is_empty() {
        debug!(root = %root.display(), "Nothing left to search for");
        return 0;
    }
    debug!(
        root = %root.display(),
        basenames = index.basename_count(),
        "Walking search root"
    );

    let mut estimator = ProgressEstimator::new(&root);
    let mut chained_dirs = 0u64;
    let mut events = walk_tree(root.clone());

    while let Some(event) = events.next().await {
        match event {
            WalkEvent::Directory(dir) => {
                estimator.on_directory(&dir);
                sink.progress(root_index, estimator.percent(), &dir.to_string_lossy());
            }
            WalkEvent::DirectoryDone(dir) => {
                estimator.on_directory_done(&dir);
            }
            WalkEvent::File(file) => {
                chained_dirs +=
                    handle_file_hit(&file, &normalizer, &index, previous_tools, pass, sink).await;
            }
        }
    }

    sink.progress(root_index, estimator.finish(), "");
    estimator.seen() + chained_dirs
}

/// Targets still worth searching for: undiscovered games, plus undiscovered
/// non-relative tools of every game.
fn search_targets<'a>(
    games: &'a [GameDescriptor],
    previous: &'a PreviousGames,
    previous_tools: &'a PreviousTools,
    pass: &'a PassState,
) -> Vec<SearchTarget<'a>> {
    let mut targets = Vec::new();
    for game in games {
        if !previous.contains_key(&game.id) && !pass.game_claimed(&game.id) {
            targets.push(SearchTarget::Game(game));
        }
        for tool in &game.tools {
            if tool.relative || tool_known(previous_tools, &game.id, &tool.id) {
                continue;
            }
            targets.push(SearchTarget::Tool { game, tool });
        }
    }
    targets
}

/// Test one enumerated file against the match index and act on every entry
/// it satisfies. Returns directories walked by chained relative-tool passes.
async fn handle_file_hit(
    file: &Path,
    normalizer: &Normalizer,
    index: &MatchIndex<'_>,
    previous_tools: &PreviousTools,
    pass: &PassState,
    sink: &dyn DiscoverySink,
) -> u64 {
    let Some(basename) = normalizer.normalize_basename(file) else {
        return 0;
    };
    let candidates = index.candidates(&basename);
    if candidates.is_empty() {
        return 0;
    }

    let normalized_hit = normalizer.normalize(&file.to_string_lossy());
    let mut chained_dirs = 0u64;

    for entry in candidates {
        if !index::suffix_matches(&normalized_hit, entry) {
            continue;
        }
        let Some(candidate) = index::candidate_root(file, entry) else {
            continue;
        };

        match verify_required_files(&candidate, entry.target.required_files()).await {
            Ok(outcome) if outcome.accepted() => {
                if let Verification::SoftAccept { denied } = &outcome {
                    warn!(
                        root = %candidate.display(),
                        denied = ?denied,
                        "Candidate accepted despite permission-denied files"
                    );
                }
            }
            Ok(Verification::Missing { path }) => {
                debug!(candidate = %candidate.display(), missing = %path.display(), "Candidate rejected");
                continue;
            }
            Ok(_) => continue,
            Err(e) => {
                debug!(candidate = %candidate.display(), error = %e, "Verification failed");
                continue;
            }
        }

        match entry.target {
            SearchTarget::Game(game) => {
                if !pass.claim_game(&game.id) {
                    continue; // another root got there first
                }
                if !emit_game(game, &candidate, sink) {
                    pass.release_game(&game.id);
                    continue;
                }
                // Chain the relative-tool pass for this game before moving
                // on with traversal.
                chained_dirs +=
                    discover_relative_tools(game, &candidate, previous_tools, sink).await;
            }
            SearchTarget::Tool { game, tool } => {
                if !pass.claim_tool(&game.id, &tool.id) {
                    continue;
                }
                emit_tool(entry.target, &candidate, sink);
            }
        }
    }

    chained_dirs
}

/// Walk a discovered game's own root for its `relative` tools.
///
/// Scoped to the game directory, matching only relative tools not yet
/// discovered. Failures are logged and swallowed; a game discovery never
/// fails because its tool pass did. Returns directories walked.
pub async fn discover_relative_tools(
    game: &GameDescriptor,
    game_root: &Path,
    previous_tools: &PreviousTools,
    sink: &dyn DiscoverySink,
) -> u64 {
    let normalizer = match Normalizer::for_root(game_root).await {
        Ok(n) => n,
        Err(e) => {
            warn!(game = %game.id, error = %e, "Cannot normalize game root for tool discovery");
            return 0;
        }
    };

    let targets: Vec<SearchTarget<'_>> = game
        .tools
        .iter()
        .filter(|tool| tool.relative && !tool_known(previous_tools, &game.id, &tool.id))
        .map(|tool| SearchTarget::Tool { game, tool })
        .collect();
    let index = MatchIndex::build(targets, &normalizer);
    if index.is_empty() {
        return 0;
    }

    let mut emitted: HashSet<&str> = HashSet::new();
    let mut dirs = 0u64;
    let mut events = walk_tree(game_root.to_path_buf());

    while let Some(event) = events.next().await {
        let file = match event {
            WalkEvent::Directory(_) => {
                dirs += 1;
                continue;
            }
            WalkEvent::DirectoryDone(_) => continue,
            WalkEvent::File(file) => file,
        };

        let Some(basename) = normalizer.normalize_basename(&file) else {
            continue;
        };
        let normalized_hit = normalizer.normalize(&file.to_string_lossy());

        for entry in index.candidates(&basename) {
            let tool_id = entry.target.id();
            if emitted.contains(tool_id) || !index::suffix_matches(&normalized_hit, entry) {
                continue;
            }
            let Some(candidate) = index::candidate_root(&file, entry) else {
                continue;
            };
            match verify_required_files(&candidate, entry.target.required_files()).await {
                Ok(outcome) if outcome.accepted() => {
                    emitted.insert(tool_id);
                    emit_tool(entry.target, &candidate, sink);
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(tool = %tool_id, error = %e, "Tool verification failed");
                }
            }
        }
    }

    dirs
}

/// Emit a game discovery for `root`. Returns false without emitting when the
/// executable resolver errors; a descriptor defect counts as "this one
/// application not found".
fn emit_game(game: &GameDescriptor, root: &Path, sink: &dyn DiscoverySink) -> bool {
    let executable = match executable_override(&game.executable, root) {
        Ok(exe) => exe,
        Err(e) => {
            warn!(game = %game.id, error = %e, "Executable resolution failed");
            return false;
        }
    };

    if game.icon_mode == IconMode::Executable {
        let launch = executable
            .clone()
            .or_else(|| (game.executable)(None).ok())
            .map(|exe| root.join(exe));
        if let Some(launch) = launch {
            spawn_icon_generation(sink, &game.id, &launch);
        }
    }

    debug!(game = %game.id, path = %root.display(), "Game discovered");
    sink.discovered_game(
        &game.id,
        Some(Discovery {
            path: root.to_path_buf(),
            executable,
            path_set_manually: false,
        }),
    );
    true
}

fn emit_tool(target: SearchTarget<'_>, root: &Path, sink: &dyn DiscoverySink) {
    let SearchTarget::Tool { game, tool } = target else {
        return;
    };

    let executable = match (tool.executable)(Some(root)) {
        Ok(exe) => exe,
        Err(e) => {
            warn!(tool = %tool.id, error = %e, "Tool executable resolution failed");
            return;
        }
    };

    if tool.icon_mode == IconMode::Executable {
        spawn_icon_generation(sink, &tool.id, &root.join(&executable));
    }

    debug!(tool = %tool.id, game = %game.id, path = %root.display(), "Tool discovered");
    sink.discovered_tool(
        &game.id,
        &tool.id,
        ToolDiscovery {
            path: root.to_path_buf(),
            executable,
            parameters: tool.parameters.clone(),
            hidden: tool.hidden,
            custom: false,
        },
    );
}

/// Resolve the executable for `root` and reduce it to an override: `None`
/// when it matches the descriptor's default.
fn executable_override(
    resolver: &crate::catalog::ExecutableResolver,
    root: &Path,
) -> Result<Option<PathBuf>> {
    let resolved = resolver(Some(root))?;
    let default = resolver(None)?;
    Ok((resolved != default).then_some(resolved))
}

/// Fire-and-forget icon generation. Detached from the discovery emission:
/// failures are logged and dropped.
fn spawn_icon_generation(sink: &dyn DiscoverySink, app_id: &str, executable: &Path) {
    let fut = sink.generate_icon(app_id, executable);
    let app_id = app_id.to_string();
    tokio::spawn(async move {
        if let Err(e) = fut.await {
            warn!(app = %app_id, error = %e, "Icon generation failed");
        }
    });
}

fn report_root_error(root: &Path, error: &anyhow::Error, sink: &dyn DiscoverySink) {
    let not_found = error
        .downcast_ref::<std::io::Error>()
        .is_some_and(|io| io.kind() == ErrorKind::NotFound);
    let title = if not_found { MISSING_ROOT_ERROR } else { UNREADABLE_ROOT_ERROR };

    warn!(root = %root.display(), error = %error, "Search root unusable");
    sink.error(title, &root.to_string_lossy());
}
