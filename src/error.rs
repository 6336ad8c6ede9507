// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.

use crate::types::enums::EquipmentType;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    /// Missing or malformed field on an event or filter.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Transfer source does not exist.
    #[error("source entry not found for {base} / {equipment_type}")]
    SourceNotFound {
        base: String,
        equipment_type: EquipmentType,
    },

    /// Assignment, expenditure or retirement against an absent entry.
    #[error("no ledger entry for {base} / {equipment_type}")]
    EntryNotFound {
        base: String,
        equipment_type: EquipmentType,
    },

    /// The event would drive on-hand quantity below zero.
    #[error("insufficient stock at {base} / {equipment_type}: {available} on hand, {requested} requested")]
    InsufficientStock {
        base: String,
        equipment_type: EquipmentType,
        available: u64,
        requested: u64,
    },

    /// A delta would make a ledger field negative.
    #[error("{field} would become negative")]
    NegativeBalance { field: &'static str },

    /// Generic overflow error for arithmetic operations.
    #[error("arithmetic overflow")]
    Overflow,

    /// An event with this client reference was already recorded.
    #[error("event with client reference {0} already recorded")]
    DuplicateClientRef(uuid::Uuid),

    /// Record ids must be contiguous in log order.
    #[error("out-of-order event id {found}, expected {expected}")]
    OutOfOrder { expected: u64, found: u64 },
}

pub type KernelResult<T> = core::result::Result<T, KernelError>;
