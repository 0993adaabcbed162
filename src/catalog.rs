//! Application catalog data model.
//!
//! Descriptors are supplied by the caller and are immutable for the duration
//! of a discovery pass. Discovery results are handed back through the
//! [`DiscoverySink`] trait; the engine holds no persistent state beyond a
//! single pass, and merge/conflict resolution (especially the manual-override
//! lock) stays with the caller's storage layer.

// -- std imports
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

// -- crate imports
use anyhow::Result;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

/// Resolves the launch executable for an application.
///
/// Called with `Some(root)` for a concrete candidate install directory and
/// with `None` for the descriptor's default. Returns a path *relative to the
/// install root*. The engine treats a returned error as a descriptor defect:
/// logged, and that one application counts as not found.
pub type ExecutableResolver = Arc<dyn Fn(Option<&Path>) -> Result<PathBuf> + Send + Sync>;

/// Build an [`ExecutableResolver`] that always resolves to a fixed relative
/// path, regardless of install root. Covers the common case where the
/// executable location does not depend on the install flavor.
pub fn fixed_executable(relative: impl Into<PathBuf>) -> ExecutableResolver {
    let relative = relative.into();
    Arc::new(move |_root| Ok(relative.clone()))
}

/// Asynchronous self-report contract.
///
/// An application that knows its own install location (registry entry, store
/// manifest, config file) exposes it through this trait. Synchronous sources
/// are wrapped at this boundary so downstream logic never branches on "was
/// this deferred". Returning `Ok(None)` means "not installed or not
/// detectable this way" and is not an error.
pub trait PathProvider: Send + Sync {
    fn query_path(&self) -> BoxFuture<'_, Result<Option<PathBuf>>>;
}

/// A [`PathProvider`] backed by a fixed candidate path.
///
/// Used for manifest hint paths: the path is only a claim, quick discovery
/// still verifies it exists before emitting anything.
pub struct FixedPathProvider(pub PathBuf);

impl PathProvider for FixedPathProvider {
    fn query_path(&self) -> BoxFuture<'_, Result<Option<PathBuf>>> {
        let path = self.0.clone();
        Box::pin(async move { Ok(Some(path)) })
    }
}

/// How an icon should be produced for a discovered application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IconMode {
    /// No icon generation.
    #[default]
    None,
    /// Auto-generate from the resolved executable (fire-and-forget).
    Executable,
}

/// Descriptor for a game known to the catalog.
#[derive(Clone)]
pub struct GameDescriptor {
    /// Unique identifier, stable across passes.
    pub id: String,

    /// Human-readable display name.
    pub name: String,

    /// Relative marker paths whose joint presence under a directory proves
    /// the game is installed there. Order-insensitive. A game with no
    /// required files cannot be located by search discovery and must rely on
    /// self-reporting.
    pub required_files: Vec<String>,

    /// Launch executable resolver.
    pub executable: ExecutableResolver,

    /// Optional self-report capability, used by quick discovery.
    pub self_report: Option<Arc<dyn PathProvider>>,

    /// Icon generation mode applied on discovery.
    pub icon_mode: IconMode,

    /// Support tools belonging to this game.
    pub tools: Vec<ToolDescriptor>,
}

/// Descriptor for a support tool attached to a game.
#[derive(Clone)]
pub struct ToolDescriptor {
    pub id: String,
    pub name: String,

    /// Relative marker paths proving the tool is installed under a candidate
    /// directory.
    pub required_files: Vec<String>,

    /// Launch executable resolver, relative to the tool's install root.
    pub executable: ExecutableResolver,

    /// Optional self-report capability.
    pub self_report: Option<Arc<dyn PathProvider>>,

    /// True only for tools that always live *inside* their parent game's
    /// install root. Relative tools are searched for after the game itself is
    /// found, scoped to the game directory, and never as independent search
    /// targets.
    pub relative: bool,

    /// Launch parameters carried into the discovery result.
    pub parameters: Vec<String>,

    /// Hide the tool from launch surfaces, carried into the discovery
    /// result.
    pub hidden: bool,

    /// Icon generation mode applied on discovery.
    pub icon_mode: IconMode,
}

/// A search target: either a game or one specific tool of a game.
///
/// Replaces "does this descriptor have a mod-path query?" style duck typing
/// with a tagged variant carrying the common installable capability.
#[derive(Clone, Copy)]
pub enum SearchTarget<'a> {
    Game(&'a GameDescriptor),
    Tool {
        game: &'a GameDescriptor,
        tool: &'a ToolDescriptor,
    },
}

impl<'a> SearchTarget<'a> {
    /// Identifier of the target itself (game id, or tool id).
    pub fn id(&self) -> &'a str {
        match self {
            SearchTarget::Game(game) => &game.id,
            SearchTarget::Tool { tool, .. } => &tool.id,
        }
    }

    /// Identifier of the owning game (the game itself for games).
    pub fn game_id(&self) -> &'a str {
        match self {
            SearchTarget::Game(game) => &game.id,
            SearchTarget::Tool { game, .. } => &game.id,
        }
    }

    pub fn required_files(&self) -> &'a [String] {
        match self {
            SearchTarget::Game(game) => &game.required_files,
            SearchTarget::Tool { tool, .. } => &tool.required_files,
        }
    }

    pub fn icon_mode(&self) -> IconMode {
        match self {
            SearchTarget::Game(game) => game.icon_mode,
            SearchTarget::Tool { tool, .. } => tool.icon_mode,
        }
    }

    /// Resolve the launch executable for `root` (or the default when `None`).
    pub fn resolve_executable(&self, root: Option<&Path>) -> Result<PathBuf> {
        match self {
            SearchTarget::Game(game) => (game.executable)(root),
            SearchTarget::Tool { tool, .. } => (tool.executable)(root),
        }
    }
}

/// A confirmed game discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discovery {
    /// Absolute install path.
    pub path: PathBuf,

    /// Executable override, set only when the resolved executable differs
    /// from the descriptor's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<PathBuf>,

    /// True when the user fixed the path by hand. Once set, automated
    /// discovery never overwrites (or re-emits for) this entry.
    #[serde(default)]
    pub path_set_manually: bool,
}

/// A confirmed tool discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDiscovery {
    /// Absolute install path of the tool.
    pub path: PathBuf,

    /// Launch executable, relative to `path`.
    pub executable: PathBuf,

    /// Launch parameters from the descriptor.
    #[serde(default)]
    pub parameters: Vec<String>,

    /// Whether the tool is hidden from launch surfaces.
    #[serde(default)]
    pub hidden: bool,

    /// True if manually added by the user. The engine only ever writes full
    /// automated entries and skips targets whose previous entry is custom;
    /// final enforcement lives in the caller's storage layer.
    #[serde(default)]
    pub custom: bool,
}

/// Receives discovery results, errors and progress as a pass runs.
///
/// All engine output funnels through this trait; the engine never mutates
/// caller-owned storage directly. Callbacks may be invoked from concurrently
/// processed roots in arbitrary interleaving.
pub trait DiscoverySink: Send + Sync {
    /// A game was discovered (`Some`), or a previously discovered automatic
    /// entry turned stale and should be cleared (`None`).
    fn discovered_game(&self, id: &str, result: Option<Discovery>);

    /// A tool of `game_id` was discovered.
    fn discovered_tool(&self, game_id: &str, tool_id: &str, result: ToolDiscovery);

    /// A search root is unusable. `title` distinguishes "doesn't exist / not
    /// connected" from generic I/O failure; `message` carries the root path.
    fn error(&self, title: &str, message: &str);

    /// Progress for one search root: percent in `0.0..=100.0` plus the
    /// directory currently being processed.
    fn progress(&self, _root_index: usize, _percent: f64, _label: &str) {}

    /// Produce an icon for a freshly discovered application. Spawned as a
    /// detached task; failures are logged and dropped and never delay the
    /// discovery emission itself.
    fn generate_icon(&self, _app_id: &str, _executable: &Path) -> BoxFuture<'static, Result<()>> {
        Box::pin(async { Ok(()) })
    }
}
