// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event builders shared by the kernel tests.

use chrono::{DateTime, Utc};

use crate::event::{Assignment, Expenditure, LedgerEvent, Purchase, Transfer};
use crate::types::{parse_business_date, EquipmentType};

pub fn day(raw: &str) -> DateTime<Utc> {
    parse_business_date(raw).unwrap()
}

pub fn purchase(base: &str, ty: &str, quantity: u64, date: &str) -> LedgerEvent {
    LedgerEvent::Purchase(Purchase {
        base: base.to_string(),
        equipment_type: EquipmentType::canonicalize(ty),
        quantity,
        vendor: None,
        cost: None,
        date: day(date),
        notes: None,
    })
}

pub fn transfer(from: &str, to: &str, ty: &str, quantity: u64, date: &str) -> LedgerEvent {
    LedgerEvent::Transfer(Transfer {
        from_base: from.to_string(),
        to_base: to.to_string(),
        equipment_type: EquipmentType::canonicalize(ty),
        quantity,
        date: day(date),
        notes: None,
    })
}

pub fn assignment(base: &str, ty: &str, quantity: u64, assignee: &str) -> LedgerEvent {
    LedgerEvent::Assignment(Assignment {
        base: base.to_string(),
        equipment_type: EquipmentType::canonicalize(ty),
        quantity,
        assignee: assignee.to_string(),
        date: day("2025-01-15"),
        notes: None,
    })
}

pub fn expenditure(base: &str, ty: &str, quantity: u64, reason: &str) -> LedgerEvent {
    LedgerEvent::Expenditure(Expenditure {
        base: base.to_string(),
        equipment_type: EquipmentType::canonicalize(ty),
        quantity,
        reason: reason.to_string(),
        date: day("2025-01-16"),
    })
}
