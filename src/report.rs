//! Result collection and reporting for the CLI.
//!
//! The engine streams results through a sink; the CLI gathers them into a
//! serializable report printed either human-readable or as JSON.

// -- std imports
use std::{
    collections::{BTreeMap, HashMap},
    sync::Mutex,
};

// -- crate imports
use serde::{Deserialize, Serialize};

// -- module imports
use game_scout::{Discovery, DiscoverySink, ToolDiscovery};

/// Previously discovered results, loaded from `--previous`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PreviousResults {
    #[serde(default)]
    pub games: HashMap<String, Discovery>,

    #[serde(default)]
    pub tools: HashMap<String, HashMap<String, ToolDiscovery>>,
}

/// A root-level failure reported by the engine.
#[derive(Debug, Clone, Serialize)]
pub struct RootError {
    pub title: String,
    pub message: String,
}

/// Everything one run produced.
#[derive(Debug, Default, Serialize)]
pub struct Report {
    /// Games discovered this run, keyed by id.
    pub games: BTreeMap<String, Discovery>,

    /// Previously discovered games whose stored path no longer exists.
    pub stale: Vec<String>,

    /// Tools discovered this run, keyed by game id then tool id.
    pub tools: BTreeMap<String, BTreeMap<String, ToolDiscovery>>,

    /// Unusable search roots.
    pub errors: Vec<RootError>,

    /// Total directories walked by search discovery (diagnostic).
    pub directories_scanned: u64,
}

/// Sink that collects engine callbacks into a [`Report`].
pub struct CollectingSink {
    report: Mutex<Report>,
    print_progress: bool,
}

impl CollectingSink {
    pub fn new(print_progress: bool) -> Self {
        Self {
            report: Mutex::new(Report::default()),
            print_progress,
        }
    }

    /// Snapshot of everything discovered so far, for feeding one pass's
    /// results into the next as known entries.
    pub fn discovered_snapshot(
        &self,
    ) -> (
        HashMap<String, Discovery>,
        HashMap<String, HashMap<String, ToolDiscovery>>,
    ) {
        let report = self.report.lock().expect("report lock poisoned");
        let games = report
            .games
            .iter()
            .map(|(id, d)| (id.clone(), d.clone()))
            .collect();
        let tools = report
            .tools
            .iter()
            .map(|(game_id, tools)| {
                (
                    game_id.clone(),
                    tools.iter().map(|(id, t)| (id.clone(), t.clone())).collect(),
                )
            })
            .collect();
        (games, tools)
    }

    /// Consume the sink, yielding the final report.
    pub fn into_report(self, directories_scanned: u64) -> Report {
        let mut report = self.report.into_inner().expect("report lock poisoned");
        report.directories_scanned = directories_scanned;
        report
    }
}

impl DiscoverySink for CollectingSink {
    fn discovered_game(&self, id: &str, result: Option<Discovery>) {
        let mut report = self.report.lock().expect("report lock poisoned");
        match result {
            Some(discovery) => {
                report.games.insert(id.to_string(), discovery);
            }
            None => report.stale.push(id.to_string()),
        }
    }

    fn discovered_tool(&self, game_id: &str, tool_id: &str, result: ToolDiscovery) {
        self.report
            .lock()
            .expect("report lock poisoned")
            .tools
            .entry(game_id.to_string())
            .or_default()
            .insert(tool_id.to_string(), result);
    }

    fn error(&self, title: &str, message: &str) {
        self.report.lock().expect("report lock poisoned").errors.push(RootError {
            title: title.to_string(),
            message: message.to_string(),
        });
    }

    fn progress(&self, root_index: usize, percent: f64, label: &str) {
        if self.print_progress {
            eprintln!("[root {root_index}] {percent:5.1}% {label}");
        }
    }
}
