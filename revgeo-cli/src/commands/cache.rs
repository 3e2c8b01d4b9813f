//! Cache management CLI commands.

use std::path::Path;

use clap::Subcommand;
use revgeo::cache::{now_millis, CacheStore, StoreSummary};

use crate::error::CliError;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Delete the cache file, forgetting every resolved place
    Clear,
    /// Show cache file statistics
    Stats,
}

/// Run a cache subcommand.
pub async fn run(action: CacheAction, cache_file: &Path) -> Result<(), CliError> {
    let store = CacheStore::new(cache_file);

    match action {
        CacheAction::Clear => {
            println!("Clearing geocode cache at: {}", cache_file.display());
            let removed = store.clear().await.map_err(|source| CliError::CacheClear {
                path: cache_file.to_path_buf(),
                source,
            })?;
            println!("Removed {} entries", removed);
        }
        CacheAction::Stats => {
            println!("Geocode cache: {}", cache_file.display());
            for line in describe(&store.summary().await, now_millis()) {
                println!("  {}", line);
            }
        }
    }
    Ok(())
}

fn describe(summary: &StoreSummary, now_ms: i64) -> Vec<String> {
    let mut lines = vec![
        format!("Entries:  {}", summary.entries),
        format!("Negative: {}", summary.negative_entries),
    ];
    if let Some(oldest) = summary.oldest_timestamp_ms {
        lines.push(format!("Oldest:   {} days", (now_ms - oldest).max(0) / DAY_MS));
    }
    lines
}
