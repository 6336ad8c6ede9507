// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Balance Engine.
//!
//! Applies events to the Ledger Store. Every event is planned against the
//! current store first and only written once the whole plan is known to be
//! valid, so a rejected event never leaves a partial write behind.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{KernelError, KernelResult};
use crate::event::{AdjustmentAction, EventRecord, LedgerEvent};
use crate::event_log::EventLog;
use crate::ledger::{LedgerDelta, LedgerEntry, LedgerKey, LedgerStore};
use crate::types::id::ActorId;
use crate::types::EventKind;

/// Entry-level failure, before the key is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceError {
    Insufficient { available: u64, requested: u64 },
    Overflow,
}

impl BalanceError {
    fn at(self, key: &LedgerKey) -> KernelError {
        match self {
            BalanceError::Insufficient { available, requested } => KernelError::InsufficientStock {
                base: key.base.clone(),
                equipment_type: key.equipment_type.clone(),
                available,
                requested,
            },
            BalanceError::Overflow => KernelError::Overflow,
        }
    }
}

pub fn apply_purchase(entry: &mut LedgerEntry, qty: u64) -> Result<(), BalanceError> {
    entry.quantity = entry.quantity.checked_add(qty).ok_or(BalanceError::Overflow)?;
    Ok(())
}

pub fn apply_transfer(from: &mut LedgerEntry, to: &mut LedgerEntry, qty: u64) -> Result<(), BalanceError> {
    let remaining = take(from.quantity, qty)?;
    let arrived = to.quantity.checked_add(qty).ok_or(BalanceError::Overflow)?;
    from.quantity = remaining;
    to.quantity = arrived;
    Ok(())
}

pub fn apply_assignment(entry: &mut LedgerEntry, qty: u64) -> Result<(), BalanceError> {
    let remaining = take(entry.quantity, qty)?;
    let assigned = entry.assigned.checked_add(qty).ok_or(BalanceError::Overflow)?;
    entry.quantity = remaining;
    entry.assigned = assigned;
    Ok(())
}

pub fn apply_expenditure(entry: &mut LedgerEntry, qty: u64) -> Result<(), BalanceError> {
    let remaining = take(entry.quantity, qty)?;
    let expended = entry.expended.checked_add(qty).ok_or(BalanceError::Overflow)?;
    entry.quantity = remaining;
    entry.expended = expended;
    Ok(())
}

fn take(available: u64, requested: u64) -> Result<u64, BalanceError> {
    available
        .checked_sub(requested)
        .ok_or(BalanceError::Insufficient { available, requested })
}

/// Entries an event will write, computed against a store snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plan {
    writes: Vec<LedgerEntry>,
}

impl Plan {
    pub fn writes(&self) -> &[LedgerEntry] {
        &self.writes
    }
}

/// Dry run of `event` against `store`.
pub fn plan_event(store: &LedgerStore, event: &LedgerEvent) -> KernelResult<Plan> {
    event.validate()?;

    let writes = match event {
        LedgerEvent::Purchase(p) => {
            let key = LedgerKey::new(p.base.clone(), p.equipment_type.clone());
            let mut entry = store.get(&key);
            apply_purchase(&mut entry, p.quantity).map_err(|e| e.at(&key))?;
            entry.retired = false;
            vec![entry]
        }
        LedgerEvent::Transfer(t) => {
            let source = LedgerKey::new(t.from_base.clone(), t.equipment_type.clone());
            let target = LedgerKey::new(t.to_base.clone(), t.equipment_type.clone());
            let mut from = store
                .get_existing(&source)
                .cloned()
                .ok_or_else(|| KernelError::SourceNotFound {
                    base: source.base.clone(),
                    equipment_type: source.equipment_type.clone(),
                })?;
            let mut to = store.get(&target);
            apply_transfer(&mut from, &mut to, t.quantity).map_err(|e| e.at(&source))?;
            to.retired = false;
            vec![from, to]
        }
        LedgerEvent::Assignment(a) => {
            let key = LedgerKey::new(a.base.clone(), a.equipment_type.clone());
            let mut entry = existing(store, &key)?;
            apply_assignment(&mut entry, a.quantity).map_err(|e| e.at(&key))?;
            vec![entry]
        }
        LedgerEvent::Expenditure(e) => {
            let key = LedgerKey::new(e.base.clone(), e.equipment_type.clone());
            let mut entry = existing(store, &key)?;
            apply_expenditure(&mut entry, e.quantity).map_err(|err| err.at(&key))?;
            vec![entry]
        }
        LedgerEvent::Adjustment(adj) => {
            let key = LedgerKey::new(adj.base.clone(), adj.equipment_type.clone());
            match &adj.action {
                AdjustmentAction::Set { quantity, assigned, expended } => {
                    let current = store.get(&key);
                    let delta = LedgerDelta::towards(&current, *quantity, *assigned, *expended)?;
                    vec![store.preview(&key, &delta)?]
                }
                AdjustmentAction::Retire => {
                    let mut entry = existing(store, &key)?;
                    entry.quantity = 0;
                    entry.assigned = 0;
                    entry.expended = 0;
                    entry.retired = true;
                    vec![entry]
                }
            }
        }
    };

    Ok(Plan { writes })
}

fn existing(store: &LedgerStore, key: &LedgerKey) -> KernelResult<LedgerEntry> {
    store
        .get_existing(key)
        .cloned()
        .ok_or_else(|| KernelError::EntryNotFound {
            base: key.base.clone(),
            equipment_type: key.equipment_type.clone(),
        })
}

pub fn commit_plan(store: &mut LedgerStore, plan: Plan) {
    for entry in plan.writes {
        store.commit(entry);
    }
}

/// Validates and applies `event`. On error the store is untouched.
pub fn apply_event(store: &mut LedgerStore, event: &LedgerEvent) -> KernelResult<()> {
    let plan = plan_event(store, event)?;
    commit_plan(store, plan);
    Ok(())
}

/// Outcome of [`Inventory::prepare`].
#[derive(Debug)]
pub enum Prepared {
    Fresh(PendingCommit),
    /// The client reference was seen before; nothing to apply.
    Duplicate(EventRecord),
}

/// A validated record waiting for its durable write.
#[derive(Debug)]
pub struct PendingCommit {
    record: EventRecord,
    plan: Plan,
}

impl PendingCommit {
    pub fn record(&self) -> &EventRecord {
        &self.record
    }
}

/// Event Log plus the Ledger Store projected from it.
///
/// Writers call [`prepare`](Self::prepare), persist the record, then
/// [`commit`](Self::commit). A commit against a log that moved since the
/// prepare is refused with `OutOfOrder`.
#[derive(Clone, Debug, Default)]
pub struct Inventory {
    log: EventLog,
    store: LedgerStore,
}

impl Inventory {
    pub fn new() -> Self {
        Self {
            log: EventLog::new(),
            store: LedgerStore::new(),
        }
    }

    /// Starts from an existing ledger with an empty log.
    pub fn from_store(store: LedgerStore) -> Self {
        Self {
            log: EventLog::new(),
            store,
        }
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub fn prepare(
        &self,
        event: LedgerEvent,
        performed_by: Option<ActorId>,
        client_ref: Option<Uuid>,
        created_at: DateTime<Utc>,
    ) -> KernelResult<Prepared> {
        if let Some(existing) = client_ref.and_then(|r| self.log.find_by_client_ref(r)) {
            return Ok(Prepared::Duplicate(existing.clone()));
        }
        let plan = plan_event(&self.store, &event)?;
        let record = self.log.prepare(event, performed_by, client_ref, created_at);
        Ok(Prepared::Fresh(PendingCommit { record, plan }))
    }

    pub fn commit(&mut self, pending: PendingCommit) -> KernelResult<&EventRecord> {
        let PendingCommit { record, plan } = pending;
        let committed = self.log.push_record(record)?;
        commit_plan(&mut self.store, plan);
        Ok(committed)
    }

    /// Prepare and commit in one step, for callers without a durable log.
    /// Returns the record and whether it was newly appended.
    pub fn record(
        &mut self,
        event: LedgerEvent,
        performed_by: Option<ActorId>,
        client_ref: Option<Uuid>,
        created_at: DateTime<Utc>,
    ) -> KernelResult<(EventRecord, bool)> {
        match self.prepare(event, performed_by, client_ref, created_at)? {
            Prepared::Duplicate(record) => Ok((record, false)),
            Prepared::Fresh(pending) => Ok((self.commit(pending)?.clone(), true)),
        }
    }

    /// Re-applies a record read back from durable storage.
    pub fn restore(&mut self, record: EventRecord) -> KernelResult<()> {
        let plan = plan_event(&self.store, &record.event)?;
        self.log.push_record(record)?;
        commit_plan(&mut self.store, plan);
        Ok(())
    }

    /// Hides every visible event of `kind`. Ledger effects stand.
    pub fn retract_kind(&mut self, kind: EventKind) -> usize {
        self.log.retract_kind(kind)
    }
}
