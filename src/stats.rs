//! Store statistics and health overview.
//!
//! Provides a quick summary of what's loaded: document counts for the raw
//! and aggregate collections. Used by `finl stats` to give confidence that
//! loads and rebuilds are working as expected.

use anyhow::Result;

use crate::config::Config;
use crate::store::DocumentStore;

/// Run the stats command: query both collections and print a summary.
pub async fn run_stats(config: &Config, store: &dyn DocumentStore) -> Result<()> {
    let raw_index = &config.store.raw_index;
    let agg_index = &config.store.agg_index;

    let raw_count = count_or_zero(store, raw_index).await;
    let agg_count = count_or_zero(store, agg_index).await;

    println!("Finishline — Store Stats");
    println!("========================");
    println!();
    println!("  Store:       {}", config.store.base_url());
    println!();
    println!("  {:<28} {:>10}", raw_index, raw_count);
    println!("  {:<28} {:>10}", agg_index, agg_count);
    println!();

    Ok(())
}

async fn count_or_zero(store: &dyn DocumentStore, index: &str) -> u64 {
    match store.count(index).await {
        Ok(n) => n,
        Err(err) => {
            eprintln!("Warning: could not count index {}: {}", index, err);
            0
        }
    }
}
