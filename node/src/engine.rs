// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Node engine: the durable committer plus the read-side queries the HTTP
//! layer needs. Every method runs under the single engine lock.

use chrono::{DateTime, FixedOffset, Utc};
use mams_kernel::access::Actor;
use mams_kernel::event::{Adjustment, AdjustmentAction, EventRecord, LedgerEvent};
use mams_kernel::filter::EventFilter;
use mams_kernel::ledger::{LedgerEntry, LedgerKey};
use mams_kernel::metrics::{availability, breakdown_by_type, compute_metrics, Availability, InventoryMetrics, TypeShare};
use mams_kernel::types::{AssetId, EventKind};
use serde::Serialize;
use uuid::Uuid;

use crate::config::NodeConfig;
use crate::errors::EngineError;
use crate::events::event_log::EventLogError;
use crate::events::{recover_from_event_log, CommitResult, EventCommitter, EventLogWriter};

pub const SERVICE_NAME: &str = "mams-node";

/// Absolute values for an asset create or update. `None` keeps a field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AssetValues {
    pub quantity: Option<u64>,
    pub assigned: Option<u64>,
    pub expended: Option<u64>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub asset_count: usize,
    pub assigned_count: usize,
    pub purchases: usize,
    pub transfers: usize,
    pub assignments: usize,
    pub expenditures: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct Breakdown {
    pub types: Vec<TypeShare>,
    pub availability: Availability,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceOutcome {
    pub ok: bool,
    pub inserted: usize,
    pub skipped: usize,
    pub first_error: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub ok: bool,
    pub service: &'static str,
    pub events: usize,
    pub ledger_digest: String,
}

pub struct Engine {
    committer: EventCommitter,
    utc_offset: FixedOffset,
}

impl Engine {
    /// Replays the event log under `cfg.data_dir` and opens it for appends.
    pub fn open(cfg: &NodeConfig) -> Result<Self, EngineError> {
        std::fs::create_dir_all(&cfg.data_dir).map_err(EventLogError::from)?;
        let log_path = cfg.event_log_path();

        // Replay first: the writer truncates a torn tail on open.
        let inventory = recover_from_event_log(&log_path)?;
        let writer = EventLogWriter::open(&log_path)?;
        tracing::info!(
            "Event log ready at {:?}: {} events, {} assets",
            log_path,
            inventory.log().len(),
            inventory.store().len()
        );

        Ok(Self {
            committer: EventCommitter::new(writer, inventory),
            utc_offset: cfg.utc_offset,
        })
    }

    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }

    /// Records one event on behalf of `actor`.
    pub fn record(
        &mut self,
        event: LedgerEvent,
        actor: &Actor,
        client_ref: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<CommitResult, EngineError> {
        Ok(self.committer.commit_event(event, actor.id, client_ref, now)?)
    }

    pub fn list_assets(&self) -> Vec<LedgerEntry> {
        self.committer.inventory().store().entries().cloned().collect()
    }

    /// Retired entries read as absent.
    pub fn get_asset(&self, id: AssetId) -> Result<LedgerEntry, EngineError> {
        self.committer
            .inventory()
            .store()
            .by_id(id)
            .filter(|entry| !entry.retired)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("Asset {}", id)))
    }

    pub fn create_asset(
        &mut self,
        key: LedgerKey,
        values: AssetValues,
        notes: Option<String>,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<LedgerEntry, EngineError> {
        let store = self.committer.inventory().store();
        if store.get_existing(&key).is_some_and(|entry| !entry.retired) {
            return Err(EngineError::Conflict(format!(
                "Asset {} / {} already exists",
                key.base, key.equipment_type
            )));
        }

        let action = AdjustmentAction::Set {
            quantity: Some(values.quantity.unwrap_or(0)),
            assigned: Some(values.assigned.unwrap_or(0)),
            expended: Some(values.expended.unwrap_or(0)),
        };
        self.adjust(&key, action, notes, actor, now)?;
        self.entry_at(&key)
    }

    pub fn update_asset(
        &mut self,
        id: AssetId,
        values: AssetValues,
        notes: Option<String>,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<LedgerEntry, EngineError> {
        let key = self.get_asset(id)?.key();
        let action = AdjustmentAction::Set {
            quantity: values.quantity,
            assigned: values.assigned,
            expended: values.expended,
        };
        self.adjust(&key, action, notes, actor, now)?;
        self.entry_at(&key)
    }

    pub fn retire_asset(&mut self, id: AssetId, actor: &Actor, now: DateTime<Utc>) -> Result<(), EngineError> {
        let key = self.get_asset(id)?.key();
        self.adjust(&key, AdjustmentAction::Retire, None, actor, now)
    }

    fn adjust(
        &mut self,
        key: &LedgerKey,
        action: AdjustmentAction,
        notes: Option<String>,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let event = LedgerEvent::Adjustment(Adjustment {
            base: key.base.clone(),
            equipment_type: key.equipment_type.clone(),
            action,
            date: now,
            notes,
        });
        self.record(event, actor, None, now)?;
        Ok(())
    }

    fn entry_at(&self, key: &LedgerKey) -> Result<LedgerEntry, EngineError> {
        self.committer
            .inventory()
            .store()
            .get_existing(key)
            .cloned()
            .ok_or_else(|| EngineError::Internal(format!("entry {} / {} missing after commit", key.base, key.equipment_type)))
    }

    /// Visible events matching `filter`, newest business date first.
    pub fn list_events(&self, filter: &EventFilter) -> Vec<EventRecord> {
        self.committer.inventory().log().list(filter).cloned().collect()
    }

    pub fn summary(&self) -> Summary {
        let inventory = self.committer.inventory();
        let entries = || inventory.store().entries();
        let log = inventory.log();
        Summary {
            asset_count: entries().count(),
            assigned_count: entries().filter(|entry| entry.assigned > 0).count(),
            purchases: log.count_kind(EventKind::Purchase),
            transfers: log.count_kind(EventKind::Transfer),
            assignments: log.count_kind(EventKind::Assignment),
            expenditures: log.count_kind(EventKind::Expenditure),
        }
    }

    /// Metrics over visible events; retracted events do not count.
    pub fn metrics(&self, filter: &EventFilter) -> InventoryMetrics {
        let inventory = self.committer.inventory();
        let visible = EventFilter {
            kind: None,
            ..filter.clone()
        };
        let events = inventory.log().list(&visible).map(|record| &record.event);
        compute_metrics(events, inventory.store().entries(), filter)
    }

    pub fn breakdown(&self, filter: &EventFilter) -> Breakdown {
        let entries = self.committer.inventory().store().entries();
        Breakdown {
            types: breakdown_by_type(entries.clone(), filter),
            availability: availability(entries, filter.base.as_deref()),
        }
    }

    /// Hides the visible events of `kind` and records `items` in their place.
    ///
    /// Items are committed one by one; a refused item is skipped and the rest
    /// carry on. Stock effects of the hidden events stand.
    pub fn replace(
        &mut self,
        kind: EventKind,
        items: impl IntoIterator<Item = Result<LedgerEvent, EngineError>>,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<ReplaceOutcome, EngineError> {
        let hidden = self.committer.retract_kind(kind, now)?;
        tracing::info!("{} replacing {} ({} hidden)", actor.username, kind.plural(), hidden);

        let mut outcome = ReplaceOutcome {
            ok: true,
            inserted: 0,
            skipped: 0,
            first_error: None,
        };
        for item in items {
            let result = item.and_then(|event| {
                if event.kind() != kind {
                    return Err(EngineError::InvalidInput(format!(
                        "expected a {} item, got {}",
                        kind,
                        event.kind()
                    )));
                }
                self.record(event, actor, None, now)
            });
            match result {
                Ok(_) => outcome.inserted += 1,
                Err(e @ (EngineError::Storage(_) | EngineError::Internal(_))) => return Err(e),
                Err(e) => {
                    tracing::debug!("Skipping {} item: {}", kind, e);
                    outcome.skipped += 1;
                    outcome.first_error.get_or_insert_with(|| e.to_string());
                }
            }
        }
        Ok(outcome)
    }

    pub fn health(&self) -> Health {
        let inventory = self.committer.inventory();
        Health {
            ok: true,
            service: SERVICE_NAME,
            events: inventory.log().len(),
            ledger_digest: hex::encode(inventory.store().digest()),
        }
    }
}
