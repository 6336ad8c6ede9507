// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Slicing predicates shared by the event log listing and metrics.

use chrono::{FixedOffset, NaiveDate, Offset, Utc};

use crate::event::{EventRecord, LedgerEvent};
use crate::ledger::LedgerEntry;
use crate::types::{calendar_day, EquipmentType, EventKind};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventFilter {
    /// Exact base match. Transfers match on either side.
    pub base: Option<String>,
    pub equipment_type: Option<EquipmentType>,
    /// Calendar day of the business date, seen from `utc_offset`.
    pub date: Option<NaiveDate>,
    pub kind: Option<EventKind>,
    pub utc_offset: FixedOffset,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self {
            base: None,
            equipment_type: None,
            date: None,
            kind: None,
            utc_offset: Utc.fix(),
        }
    }
}

impl EventFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn with_equipment_type(mut self, equipment_type: EquipmentType) -> Self {
        self.equipment_type = Some(equipment_type);
        self
    }

    pub fn on_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn of_kind(mut self, kind: EventKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn in_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    pub fn matches_event(&self, event: &LedgerEvent) -> bool {
        if let Some(kind) = self.kind {
            if event.kind() != kind {
                return false;
            }
        }
        if let Some(base) = &self.base {
            if !event.touches_base(base) {
                return false;
            }
        }
        if let Some(wanted) = &self.equipment_type {
            if event.equipment_type() != wanted {
                return false;
            }
        }
        if let Some(day) = self.date {
            if calendar_day(event.date(), self.utc_offset) != day {
                return false;
            }
        }
        true
    }

    pub fn matches(&self, record: &EventRecord) -> bool {
        self.matches_event(&record.event)
    }

    /// Entries have no date; only base and type apply.
    pub fn matches_entry(&self, entry: &LedgerEntry) -> bool {
        if let Some(base) = &self.base {
            if &entry.base != base {
                return false;
            }
        }
        if let Some(wanted) = &self.equipment_type {
            if &entry.equipment_type != wanted {
                return false;
            }
        }
        true
    }
}
