// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Deterministic replay.
//!
//! The Ledger Store is a projection: folding the Event Log in append order
//! (retracted records included) must reproduce it exactly.

use crate::engine::{apply_event, Inventory};
use crate::error::KernelResult;
use crate::event::EventRecord;
use crate::event_log::EventLog;
use crate::ledger::LedgerStore;

pub fn fold_events<'a, I>(records: I) -> KernelResult<LedgerStore>
where
    I: IntoIterator<Item = &'a EventRecord>,
{
    let mut store = LedgerStore::new();
    for record in records {
        apply_event(&mut store, &record.event)?;
    }
    Ok(store)
}

pub fn rebuild_ledger(log: &EventLog) -> KernelResult<LedgerStore> {
    fold_events(log.all())
}

/// True when the live store matches a fresh fold of the log.
pub fn verify_projection(inventory: &Inventory) -> KernelResult<bool> {
    let rebuilt = rebuild_ledger(inventory.log())?;
    Ok(rebuilt.digest() == inventory.store().digest())
}
