// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event Replay - Authoritative Recovery
//!
//! **The event log always wins.** On startup the ledger is rebuilt by folding
//! the log from the first frame.
//!
//! # Invariants
//! - Truncated final frame → ignored (the writer cuts it off)
//! - Corrupted frame anywhere else → fail closed
//! - A record the Balance Engine refuses → fail closed
//! - replay(log) reproduces the live ledger digest

use std::path::Path;
use std::time::Instant;

use mams_kernel::engine::Inventory;
use mams_kernel::error::KernelError;
use mams_kernel::types::EventId;
use thiserror::Error;

use crate::events::event_log::{read_event_log, EventLogError, LogEntry};
use crate::telemetry;

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("Event log error: {0}")]
    Log(#[from] EventLogError),

    #[error("Event {id} failed to apply: {source}")]
    EventApplication { id: EventId, source: KernelError },
}

pub type Result<T> = std::result::Result<T, ReplayError>;

/// Folds `entries` into a fresh inventory.
pub fn replay_entries(entries: impl IntoIterator<Item = LogEntry>) -> Result<Inventory> {
    let mut inventory = Inventory::new();
    for entry in entries {
        match entry {
            LogEntry::Event(record) => {
                let id = record.id;
                inventory.restore(record).map_err(|source| {
                    tracing::error!("Event replay failed at {}: {}", id, source);
                    ReplayError::EventApplication { id, source }
                })?;
            }
            LogEntry::Retract { kind, at } => {
                let hidden = inventory.retract_kind(kind);
                tracing::debug!("Replayed retraction of {} {} events (at {})", hidden, kind, at);
            }
        }
    }
    Ok(inventory)
}

/// Full recovery from the event log at `log_path`.
pub fn recover_from_event_log(log_path: impl AsRef<Path>) -> Result<Inventory> {
    tracing::info!("Starting recovery from event log: {:?}", log_path.as_ref());
    let started = Instant::now();

    let scan = read_event_log(log_path)?;
    if scan.torn_tail {
        tracing::warn!("Ignoring incomplete entry at end of log (offset {})", scan.valid_len);
    }
    let entry_count = scan.entries.len();
    let inventory = replay_entries(scan.entries)?;

    metrics::histogram!(telemetry::REPLAY_DURATION, started.elapsed().as_secs_f64());
    telemetry::observe_ledger(&inventory);
    tracing::info!(
        "Replayed {} log entries. Ledger digest: {}",
        entry_count,
        hex::encode(&inventory.store().digest()[..8])
    );

    Ok(inventory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event_log::EventLogWriter;
    use chrono::Utc;
    use mams_kernel::event::{LedgerEvent, Purchase, Transfer};
    use mams_kernel::filter::EventFilter;
    use mams_kernel::types::{parse_business_date, EquipmentType, EventKind};
    use tempfile::tempdir;

    fn purchase(qty: u64) -> LedgerEvent {
        LedgerEvent::Purchase(Purchase {
            base: "Base Alpha".to_string(),
            equipment_type: EquipmentType::Weapons,
            quantity: qty,
            vendor: None,
            cost: None,
            date: parse_business_date("2025-01-10").unwrap(),
            notes: None,
        })
    }

    #[test]
    fn test_replay_from_log() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("events.log");

        let mut live = Inventory::new();
        {
            let mut writer = EventLogWriter::open(&log_path).unwrap();
            for event in [
                purchase(50),
                LedgerEvent::Transfer(Transfer {
                    from_base: "Base Alpha".to_string(),
                    to_base: "Base Beta".to_string(),
                    equipment_type: EquipmentType::Weapons,
                    quantity: 20,
                    date: parse_business_date("2025-01-11").unwrap(),
                    notes: None,
                }),
            ] {
                let (record, _) = live.record(event, None, None, Utc::now()).unwrap();
                writer.append(&LogEntry::Event(record)).unwrap();
            }
            live.retract_kind(EventKind::Purchase);
            writer
                .append(&LogEntry::Retract { kind: EventKind::Purchase, at: Utc::now() })
                .unwrap();
        }

        let recovered = recover_from_event_log(&log_path).unwrap();
        assert_eq!(recovered.store().digest(), live.store().digest());
        assert_eq!(recovered.log().len(), 2);
        assert_eq!(recovered.log().list(&EventFilter::all()).count(), 1);
    }

    #[test]
    fn test_missing_log_is_empty() {
        let dir = tempdir().unwrap();
        let recovered = recover_from_event_log(dir.path().join("absent.log")).unwrap();
        assert!(recovered.log().is_empty());
    }

    #[test]
    fn test_unappliable_record_fails_closed() {
        let mut live = Inventory::new();
        let (record, _) = live.record(purchase(5), None, None, Utc::now()).unwrap();
        // same id twice breaks contiguity
        let result = replay_entries(vec![LogEntry::Event(record.clone()), LogEntry::Event(record)]);
        assert!(matches!(result, Err(ReplayError::EventApplication { .. })));
    }
}
