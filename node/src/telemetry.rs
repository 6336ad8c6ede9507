// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Logs and Prometheus metrics for the node.
//!
//! Metric names live here so call sites and the `/metrics` output cannot
//! drift apart. Labels: `kind` is an [`EventKind`](mams_kernel::types::EventKind)
//! string, `mode` is the auth path that refused the request.

use std::sync::OnceLock;

use mams_kernel::engine::Inventory;
use metrics::Unit;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const EVENTS_COMMITTED: &str = "mams_events_committed_total";
pub const EVENTS_REJECTED: &str = "mams_events_rejected_total";
pub const COMMIT_DURATION: &str = "mams_event_commit_duration_seconds";
pub const REPLAY_DURATION: &str = "mams_replay_duration_seconds";
pub const AUTH_FAILURES: &str = "mams_auth_failures_total";
pub const LEDGER_EVENTS: &str = "mams_ledger_events";
pub const LEDGER_ENTRIES: &str = "mams_ledger_entries";

const DEFAULT_FILTER: &str = "mams_node=debug,tower_http=debug";

static RECORDER: OnceLock<PrometheusHandle> = OnceLock::new();

/// Logs, then metrics. Call once, before the engine opens, so replay time
/// is recorded.
pub fn init_telemetry() {
    init_tracing();
    install_metrics();
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn install_metrics() {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if RECORDER.set(handle).is_err() {
                tracing::warn!("Metrics recorder installed twice; keeping the first");
            }
        }
        Err(e) => {
            tracing::error!("Metrics disabled, recorder install failed: {}", e);
            return;
        }
    }

    metrics::describe_counter!(EVENTS_COMMITTED, Unit::Count, "Events durably appended and applied");
    metrics::describe_counter!(EVENTS_REJECTED, Unit::Count, "Events the Balance Engine refused");
    metrics::describe_histogram!(COMMIT_DURATION, Unit::Seconds, "Validate, append, fsync and apply");
    metrics::describe_histogram!(REPLAY_DURATION, Unit::Seconds, "Startup replay of the event log");
    metrics::describe_counter!(AUTH_FAILURES, Unit::Count, "Refused credentials and denied operations");
    metrics::describe_gauge!(LEDGER_EVENTS, Unit::Count, "Records in the event log, retracted included");
    metrics::describe_gauge!(LEDGER_ENTRIES, Unit::Count, "Ledger entries, retired included");
}

/// Publishes the size of the log and ledger.
pub fn observe_ledger(inventory: &Inventory) {
    metrics::gauge!(LEDGER_EVENTS, inventory.log().len() as f64);
    metrics::gauge!(LEDGER_ENTRIES, inventory.store().len() as f64);
}

/// Prometheus text exposition, or a comment line when metrics are off.
pub fn render() -> String {
    match RECORDER.get() {
        Some(handle) => handle.render(),
        None => "# metrics recorder not installed\n".to_string(),
    }
}
