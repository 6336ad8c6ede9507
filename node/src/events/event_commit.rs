// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event Commit - The Safety Wall
//!
//! 1. Balance Engine plans the event against the live ledger (no writes)
//! 2. Record persisted to disk (fsync)
//! 3. Plan applied to the live ledger
//!
//! If step 1 fails nothing is written anywhere. If step 2 fails the live
//! ledger is unchanged.

use std::time::Instant;

use chrono::{DateTime, Utc};
use mams_kernel::engine::{Inventory, Prepared};
use mams_kernel::error::KernelError;
use mams_kernel::event::{EventRecord, LedgerEvent};
use mams_kernel::types::{ActorId, EventKind};
use thiserror::Error;
use uuid::Uuid;

use crate::events::event_log::{EventLogError, EventLogWriter, LogEntry};
use crate::telemetry;

#[derive(Error, Debug)]
pub enum CommitError {
    #[error("Event log error: {0}")]
    EventLog(#[from] EventLogError),

    #[error("Event rejected: {0}")]
    Rejected(#[from] KernelError),
}

pub type Result<T> = std::result::Result<T, CommitError>;

#[derive(Debug, Clone, PartialEq)]
pub enum CommitResult {
    Committed(EventRecord),
    /// The client reference was already recorded; nothing was written.
    Duplicate(EventRecord),
}

impl CommitResult {
    pub fn record(&self) -> &EventRecord {
        match self {
            CommitResult::Committed(r) | CommitResult::Duplicate(r) => r,
        }
    }
}

/// Durable log writer plus the live inventory it feeds.
pub struct EventCommitter {
    event_log: EventLogWriter,
    inventory: Inventory,
}

impl EventCommitter {
    pub fn new(event_log: EventLogWriter, inventory: Inventory) -> Self {
        Self { event_log, inventory }
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn commit_event(
        &mut self,
        event: LedgerEvent,
        performed_by: Option<ActorId>,
        client_ref: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<CommitResult> {
        let started = Instant::now();
        let kind = event.kind();

        let pending = match self.inventory.prepare(event, performed_by, client_ref, now) {
            Ok(Prepared::Fresh(pending)) => pending,
            Ok(Prepared::Duplicate(existing)) => {
                tracing::debug!("Duplicate client reference; returning event {}", existing.id);
                return Ok(CommitResult::Duplicate(existing));
            }
            Err(e) => {
                metrics::increment_counter!(telemetry::EVENTS_REJECTED, "kind" => kind.as_str());
                tracing::debug!("Rejected {} event: {}", kind, e);
                return Err(e.into());
            }
        };

        // Durable first: the ledger only moves once the record is on disk.
        self.event_log.append(&LogEntry::Event(pending.record().clone()))?;
        let record = self.inventory.commit(pending)?.clone();

        metrics::increment_counter!(telemetry::EVENTS_COMMITTED, "kind" => kind.as_str());
        metrics::histogram!(telemetry::COMMIT_DURATION, started.elapsed().as_secs_f64());
        telemetry::observe_ledger(&self.inventory);
        tracing::info!("Committed {} event {}", kind, record.id);

        Ok(CommitResult::Committed(record))
    }

    /// Hides every visible event of `kind`. The marker is durable so replay
    /// reproduces the same listing.
    pub fn retract_kind(&mut self, kind: EventKind, now: DateTime<Utc>) -> Result<usize> {
        self.event_log.append(&LogEntry::Retract { kind, at: now })?;
        let hidden = self.inventory.retract_kind(kind);
        tracing::info!("Retracted {} {} events", hidden, kind);
        Ok(hidden)
    }

    pub fn entry_count(&self) -> u64 {
        self.event_log.entry_count()
    }
}
