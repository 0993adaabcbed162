// -- crate imports
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

// -- module definitions
mod args;
mod log;
mod report;

// -- module imports
use crate::args::Args;
use crate::report::{CollectingSink, PreviousResults};
use game_scout::manifest::Manifest;
use game_scout::{quick_discovery, search_discovery};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.no_log {
        tracing::subscriber::set_global_default(tracing::subscriber::NoSubscriber::default())
            .expect("Failed to set no-op subscriber");
    } else {
        log::init_tracing()?;
        info!("game-scout started");
        debug!("Parsed args: {args:#?}");
    }

    let catalog_text = tokio::fs::read_to_string(&args.catalog)
        .await
        .with_context(|| format!("Failed to read catalog {}", args.catalog.display()))?;
    let games = Manifest::from_json(&catalog_text)?.into_descriptors();

    let previous = match &args.previous {
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read previous results {}", path.display()))?;
            serde_json::from_str::<PreviousResults>(&text)
                .with_context(|| "Failed to parse previous results")?
        }
        None => PreviousResults::default(),
    };

    let jobs = args
        .jobs
        .unwrap_or_else(|| num_cpus::get().saturating_mul(4).max(8));

    let sink = CollectingSink::new(args.progress);

    let quick = quick_discovery(&games, &previous.games, &previous.tools, jobs, &sink).await;
    debug!(discovered = quick.len(), "Quick discovery finished");

    // Anything quick discovery already found is treated as known when the
    // search pass builds its per-root match index.
    let mut known_games = previous.games.clone();
    let mut known_tools = previous.tools.clone();
    let (quick_games, quick_tools) = sink.discovered_snapshot();
    known_games.extend(quick_games);
    for (game_id, tools) in quick_tools {
        known_tools.entry(game_id).or_default().extend(tools);
    }

    let mut directories_scanned = 0;
    if !args.no_search && !args.roots.is_empty() {
        directories_scanned =
            search_discovery(&args.roots, &games, &known_games, &known_tools, jobs, &sink).await;
        debug!(directories_scanned, "Search discovery finished");
    }

    let report = sink.into_report(directories_scanned);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if report.games.is_empty() && report.tools.is_empty() {
        println!("No games or tools discovered.");
    } else {
        println!("Discovered games ({}):\n", report.games.len());
        for (id, discovery) in &report.games {
            println!("- {id}");
            println!("  Path: {}", discovery.path.display());
            if let Some(exe) = &discovery.executable {
                println!("  Executable: {}", exe.display());
            }
            if let Some(tools) = report.tools.get(id) {
                for (tool_id, tool) in tools {
                    println!("  Tool {tool_id}: {}", tool.path.join(&tool.executable).display());
                }
            }
            println!();
        }
    }

    for stale in &report.stale {
        println!("Stale (path no longer exists): {stale}");
    }
    for error in &report.errors {
        println!("Error: {} ({})", error.title, error.message);
    }
    if report.directories_scanned > 0 {
        println!("Scanned {} directories.", report.directories_scanned);
    }

    info!("game-scout done!");
    Ok(())
}
