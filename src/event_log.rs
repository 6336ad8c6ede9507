// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Append-only Event Log.
//!
//! Records are kept in append order; `EventId(n)` lives at position `n - 1`.
//! A secondary index orders visible records by business date, newest first,
//! so listings never sort.

use std::cmp::Reverse;
use std::collections::btree_map;
use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{KernelError, KernelResult};
use crate::event::{EventRecord, LedgerEvent};
use crate::filter::EventFilter;
use crate::types::id::{ActorId, EventId};
use crate::types::EventKind;

type DateKey = (Reverse<DateTime<Utc>>, Reverse<EventId>);

#[derive(Clone, Debug, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
    retracted: Vec<bool>,
    by_date: BTreeMap<DateKey, usize>,
    client_refs: HashMap<Uuid, usize>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn next_id(&self) -> EventId {
        EventId(self.records.len() as u64 + 1)
    }

    /// Builds the record `append` would store, without storing it.
    pub fn prepare(
        &self,
        event: LedgerEvent,
        performed_by: Option<ActorId>,
        client_ref: Option<Uuid>,
        created_at: DateTime<Utc>,
    ) -> EventRecord {
        EventRecord {
            id: self.next_id(),
            created_at,
            performed_by,
            client_ref,
            event,
        }
    }

    pub fn append(
        &mut self,
        event: LedgerEvent,
        performed_by: Option<ActorId>,
        client_ref: Option<Uuid>,
        created_at: DateTime<Utc>,
    ) -> KernelResult<&EventRecord> {
        let record = self.prepare(event, performed_by, client_ref, created_at);
        self.push_record(record)
    }

    /// Stores a prepared record. Its id must be the next one in sequence.
    pub fn push_record(&mut self, record: EventRecord) -> KernelResult<&EventRecord> {
        let expected = self.next_id();
        if record.id != expected {
            return Err(KernelError::OutOfOrder {
                expected: expected.0,
                found: record.id.0,
            });
        }
        if let Some(client_ref) = record.client_ref {
            if self.client_refs.contains_key(&client_ref) {
                return Err(KernelError::DuplicateClientRef(client_ref));
            }
        }

        let idx = self.records.len();
        if let Some(client_ref) = record.client_ref {
            self.client_refs.insert(client_ref, idx);
        }
        self.by_date
            .insert((Reverse(record.event.date()), Reverse(record.id)), idx);
        self.records.push(record);
        self.retracted.push(false);
        Ok(&self.records[idx])
    }

    pub fn find_by_client_ref(&self, client_ref: Uuid) -> Option<&EventRecord> {
        self.client_refs.get(&client_ref).map(|&idx| &self.records[idx])
    }

    pub fn get(&self, id: EventId) -> Option<&EventRecord> {
        let idx = usize::try_from(id.0).ok()?.checked_sub(1)?;
        self.records.get(idx)
    }

    pub fn is_visible(&self, id: EventId) -> bool {
        self.get(id)
            .map(|record| self.by_date.contains_key(&(Reverse(record.event.date()), Reverse(id))))
            .unwrap_or(false)
    }

    /// Visible records matching `filter`, business date descending.
    pub fn list(&self, filter: &EventFilter) -> EventIter<'_> {
        EventIter {
            inner: self.by_date.values(),
            records: &self.records,
            filter: filter.clone(),
        }
    }

    /// Every record in append order, retracted ones included.
    pub fn all(&self) -> std::slice::Iter<'_, EventRecord> {
        self.records.iter()
    }

    /// Hides all visible events of `kind` from listings. Returns how many.
    pub fn retract_kind(&mut self, kind: EventKind) -> usize {
        let mut hidden = 0;
        for (idx, record) in self.records.iter().enumerate() {
            if record.kind() != kind || self.retracted[idx] {
                continue;
            }
            self.retracted[idx] = true;
            self.by_date
                .remove(&(Reverse(record.event.date()), Reverse(record.id)));
            hidden += 1;
        }
        hidden
    }

    /// Visible events of `kind`.
    pub fn count_kind(&self, kind: EventKind) -> usize {
        self.records
            .iter()
            .zip(&self.retracted)
            .filter(|(record, retracted)| !**retracted && record.kind() == kind)
            .count()
    }
}

/// Lazy, restartable listing over the date index.
#[derive(Clone)]
pub struct EventIter<'a> {
    inner: btree_map::Values<'a, DateKey, usize>,
    records: &'a [EventRecord],
    filter: EventFilter,
}

impl<'a> Iterator for EventIter<'a> {
    type Item = &'a EventRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let records = self.records;
        for &idx in self.inner.by_ref() {
            let record = &records[idx];
            if self.filter.matches(record) {
                return Some(record);
            }
        }
        None
    }
}
