// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::path::Path;
use std::time::Duration;

use mams_kernel::ledger::LedgerEntry;

use crate::cache::LocalCache;
use crate::client::HttpSink;
use crate::sync::{sync_cache, Reconciler, SyncPolicy};

use super::table;

pub async fn run(cache_path: &Path, server: &str, timeout_secs: u64, retries: u32) -> anyhow::Result<()> {
    let mut cache = LocalCache::open(cache_path)?;
    let token = cache.token()?.to_string();

    let policy = SyncPolicy {
        timeout: Duration::from_secs(timeout_secs),
        retries,
        ..SyncPolicy::default()
    };
    let reconciler = Reconciler::new(HttpSink::new(server, Some(token)), policy);
    let report = sync_cache(&mut cache, &reconciler).await?;

    // pick up what other clients changed; the folded baseline stands if this fails
    match reconciler.sink().list_assets().await {
        Ok(rows) => cache.set_baseline(rows.into_iter().map(LedgerEntry::from).collect())?,
        Err(e) => tracing::warn!("Could not refresh the baseline: {}", e),
    }

    if report.is_empty() {
        println!("Nothing to sync ({:?})", cache.state());
        return Ok(());
    }

    let mut table = table(vec!["Kind", "Pushed"]);
    for (kind, count) in &report.by_kind {
        table.add_row(vec![kind.plural().to_string(), count.to_string()]);
    }
    table.add_row(vec!["failed".to_string(), report.failed.to_string()]);
    table.add_row(vec!["dead-lettered".to_string(), report.rejected.len().to_string()]);

    println!("\nSync Report ({})\n", reconciler.sink().base_url());
    println!("{table}\n");
    println!("State: {:?}, still pending: {}", cache.state(), cache.pending().len());
    if let Some(e) = &report.first_error {
        println!("First error: {}", e);
    }
    Ok(())
}
