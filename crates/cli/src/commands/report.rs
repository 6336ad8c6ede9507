// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::path::Path;

use chrono::NaiveDate;
use mams_kernel::filter::EventFilter;
use mams_kernel::ledger::LedgerEntry;
use mams_kernel::metrics::{compute_metrics, InventoryMetrics};
use mams_kernel::types::EquipmentType;

use crate::cache::LocalCache;
use crate::client::HttpSink;

use super::table;

/// Local view: sync state and the pending queue.
pub fn status(cache_path: &Path) -> anyhow::Result<()> {
    let cache = LocalCache::open(cache_path)?;

    println!("\nMAMS Cache Status ({})", cache.path().display());
    println!("------------------");
    match cache.session() {
        Some(s) => println!("Session:      {} ({})", s.username, s.role),
        None => println!("Session:      none"),
    }
    println!("State:        {:?}", cache.state());
    println!("Acknowledged: {}", cache.acknowledged());
    if let Some(at) = cache.last_sync() {
        println!("Last sync:    {}", at.to_rfc3339());
    }
    if let Some(e) = cache.last_error() {
        println!("Last error:   {}", e);
    }

    let mut table = table(vec!["Ref", "Kind", "Type", "Qty", "Date"]);
    for op in cache.pending() {
        table.add_row(vec![
            op.client_ref.to_string(),
            op.event.kind().to_string(),
            op.event.equipment_type().to_string(),
            op.event.quantity().to_string(),
            op.event.date().format("%Y-%m-%d").to_string(),
        ]);
    }
    println!("\nPending ({})\n", cache.pending().len());
    println!("{table}\n");

    if !cache.dead_letters().is_empty() {
        let mut dead = super::table(vec!["Ref", "Kind", "Qty", "Rejected", "Error"]);
        for d in cache.dead_letters() {
            dead.add_row(vec![
                d.op.client_ref.to_string(),
                d.op.event.kind().to_string(),
                d.op.event.quantity().to_string(),
                d.rejected_at.to_rfc3339(),
                d.error.clone(),
            ]);
        }
        println!("Rejected by the node ({}); `mams requeue` or `mams discard` them\n", cache.dead_letters().len());
        println!("{dead}\n");
    }
    Ok(())
}

/// Refreshes the baseline from the node, then prints the local projection.
pub async fn inventory(cache_path: &Path, server: &str, offline: bool) -> anyhow::Result<()> {
    let mut cache = LocalCache::open(cache_path)?;
    if !offline {
        let sink = HttpSink::new(server, Some(cache.token()?.to_string()));
        let rows = sink.list_assets().await?;
        cache.set_baseline(rows.into_iter().map(LedgerEntry::from).collect())?;
    }

    let mut table = table(vec!["Base", "Type", "On hand", "Assigned", "Expended"]);
    for e in cache.inventory().store().entries() {
        table.add_row(vec![
            e.base.clone(),
            e.equipment_type.to_string(),
            e.quantity.to_string(),
            e.assigned.to_string(),
            e.expended.to_string(),
        ]);
    }
    println!("\nInventory ({} pending operations applied)\n", cache.pending().len());
    println!("{table}\n");
    Ok(())
}

/// Dashboard metrics from the node, or from the local projection when
/// `offline` (baseline balances plus queued movements).
pub async fn metrics(
    cache_path: &Path,
    server: &str,
    base: Option<String>,
    equipment_type: Option<String>,
    date: Option<String>,
    offline: bool,
) -> anyhow::Result<()> {
    let cache = LocalCache::open(cache_path)?;
    let m = if offline {
        let mut filter = EventFilter::all();
        if let Some(base) = base {
            filter = filter.with_base(base);
        }
        if let Some(t) = equipment_type {
            filter = filter.with_equipment_type(EquipmentType::canonicalize(&t));
        }
        if let Some(date) = date {
            filter = filter.on_date(NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")?);
        }
        let inventory = cache.inventory();
        let events = inventory.log().list(&filter).map(|record| &record.event);
        compute_metrics(events, inventory.store().entries(), &filter)
    } else {
        let sink = HttpSink::new(server, Some(cache.token()?.to_string()));
        let mut query = Vec::new();
        if let Some(base) = base {
            query.push(("base", base));
        }
        if let Some(t) = equipment_type {
            query.push(("equipmentType", t));
        }
        if let Some(date) = date {
            query.push(("date", date));
        }
        sink.metrics(&query).await?
    };
    print_metrics(&m, offline);
    Ok(())
}

fn print_metrics(m: &InventoryMetrics, offline: bool) {
    let mut table = table(vec!["Metric", "Value"]);
    for (name, value) in [
        ("Opening balance", m.opening_balance.to_string()),
        ("Purchases", m.purchases.to_string()),
        ("Transfers in", m.transfers_in.to_string()),
        ("Transfers out", m.transfers_out.to_string()),
        ("Net movement", m.net_movement.to_string()),
        ("Assigned", m.assigned.to_string()),
        ("Expended", m.expended.to_string()),
        ("Closing balance", m.closing_balance.to_string()),
    ] {
        table.add_row(vec![name.to_string(), value]);
    }
    let source = if offline { "local" } else { "node" };
    println!("\nDashboard Metrics ({})\n", source);
    println!("{table}\n");
}
