// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Ledger events.
//!
//! Every stock movement is expressed as a `LedgerEvent`. Events are immutable
//! once appended; the ledger is whatever folding them produces.
//!
//! # Invariants
//! - Quantities are strictly positive and bounded by `MAX_EVENT_QUANTITY`
//! - A transfer never names the same base on both sides
//! - Base names are non-empty

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::MAX_EVENT_QUANTITY;
use crate::error::{KernelError, KernelResult};
use crate::types::enums::{EquipmentType, EventKind};
use crate::types::id::{ActorId, EventId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    pub base: String,
    pub equipment_type: EquipmentType,
    pub quantity: u64,
    pub vendor: Option<String>,
    pub cost: Option<f64>,
    pub date: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub from_base: String,
    pub to_base: String,
    pub equipment_type: EquipmentType,
    pub quantity: u64,
    pub date: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub base: String,
    pub equipment_type: EquipmentType,
    pub quantity: u64,
    /// Free-text personnel identifier.
    pub assignee: String,
    pub date: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expenditure {
    pub base: String,
    pub equipment_type: EquipmentType,
    pub quantity: u64,
    pub reason: String,
    pub date: DateTime<Utc>,
}

/// Administrative correction of a ledger entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    pub base: String,
    pub equipment_type: EquipmentType,
    pub action: AdjustmentAction,
    pub date: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustmentAction {
    /// Absolute values; `None` leaves the field as it is.
    Set {
        quantity: Option<u64>,
        assigned: Option<u64>,
        expended: Option<u64>,
    },
    /// Zero the entry and hide it from listings until the next event revives it.
    Retire,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LedgerEvent {
    Purchase(Purchase),
    Transfer(Transfer),
    Assignment(Assignment),
    Expenditure(Expenditure),
    Adjustment(Adjustment),
}

impl LedgerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            LedgerEvent::Purchase(_) => EventKind::Purchase,
            LedgerEvent::Transfer(_) => EventKind::Transfer,
            LedgerEvent::Assignment(_) => EventKind::Assignment,
            LedgerEvent::Expenditure(_) => EventKind::Expenditure,
            LedgerEvent::Adjustment(_) => EventKind::Adjustment,
        }
    }

    pub fn date(&self) -> DateTime<Utc> {
        match self {
            LedgerEvent::Purchase(p) => p.date,
            LedgerEvent::Transfer(t) => t.date,
            LedgerEvent::Assignment(a) => a.date,
            LedgerEvent::Expenditure(e) => e.date,
            LedgerEvent::Adjustment(a) => a.date,
        }
    }

    pub fn equipment_type(&self) -> &EquipmentType {
        match self {
            LedgerEvent::Purchase(p) => &p.equipment_type,
            LedgerEvent::Transfer(t) => &t.equipment_type,
            LedgerEvent::Assignment(a) => &a.equipment_type,
            LedgerEvent::Expenditure(e) => &e.equipment_type,
            LedgerEvent::Adjustment(a) => &a.equipment_type,
        }
    }

    /// Units moved by the event; adjustments carry none.
    pub fn quantity(&self) -> u64 {
        match self {
            LedgerEvent::Purchase(p) => p.quantity,
            LedgerEvent::Transfer(t) => t.quantity,
            LedgerEvent::Assignment(a) => a.quantity,
            LedgerEvent::Expenditure(e) => e.quantity,
            LedgerEvent::Adjustment(_) => 0,
        }
    }

    /// True when the event affects stock at `base` (either side of a transfer).
    pub fn touches_base(&self, base: &str) -> bool {
        match self {
            LedgerEvent::Transfer(t) => t.from_base == base || t.to_base == base,
            LedgerEvent::Purchase(p) => p.base == base,
            LedgerEvent::Assignment(a) => a.base == base,
            LedgerEvent::Expenditure(e) => e.base == base,
            LedgerEvent::Adjustment(a) => a.base == base,
        }
    }

    pub fn validate(&self) -> KernelResult<()> {
        match self {
            LedgerEvent::Purchase(p) => {
                require_base("base", &p.base)?;
                require_quantity(p.quantity)?;
                if let Some(cost) = p.cost {
                    if !cost.is_finite() || cost < 0.0 {
                        return Err(KernelError::Validation(
                            "cost must be a non-negative number".to_string(),
                        ));
                    }
                }
                Ok(())
            }
            LedgerEvent::Transfer(t) => {
                require_base("fromBase", &t.from_base)?;
                require_base("toBase", &t.to_base)?;
                require_quantity(t.quantity)?;
                if t.from_base == t.to_base {
                    return Err(KernelError::Validation(
                        "transfer source and destination must differ".to_string(),
                    ));
                }
                Ok(())
            }
            LedgerEvent::Assignment(a) => {
                require_base("base", &a.base)?;
                require_quantity(a.quantity)?;
                require_text("assignee", &a.assignee)
            }
            LedgerEvent::Expenditure(e) => {
                require_base("base", &e.base)?;
                require_quantity(e.quantity)?;
                require_text("reason", &e.reason)
            }
            LedgerEvent::Adjustment(a) => {
                require_base("base", &a.base)?;
                if let AdjustmentAction::Set { quantity, assigned, expended } = &a.action {
                    if quantity.is_none() && assigned.is_none() && expended.is_none() {
                        return Err(KernelError::Validation(
                            "adjustment sets no fields".to_string(),
                        ));
                    }
                    for value in [quantity, assigned, expended].into_iter().flatten() {
                        if *value > MAX_EVENT_QUANTITY {
                            return Err(KernelError::Validation(format!(
                                "value {} exceeds the limit of {}",
                                value, MAX_EVENT_QUANTITY
                            )));
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

fn require_base(field: &str, base: &str) -> KernelResult<()> {
    require_text(field, base)
}

fn require_text(field: &str, value: &str) -> KernelResult<()> {
    if value.trim().is_empty() {
        return Err(KernelError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

fn require_quantity(quantity: u64) -> KernelResult<()> {
    if quantity == 0 {
        return Err(KernelError::Validation("quantity must be positive".to_string()));
    }
    if quantity > MAX_EVENT_QUANTITY {
        return Err(KernelError::Validation(format!(
            "quantity {} exceeds the limit of {}",
            quantity, MAX_EVENT_QUANTITY
        )));
    }
    Ok(())
}

/// An event as stored in the log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: EventId,
    /// Server clock at append time; independent of the business date.
    pub created_at: DateTime<Utc>,
    pub performed_by: Option<ActorId>,
    /// Idempotency key chosen by the submitting client.
    pub client_ref: Option<Uuid>,
    pub event: LedgerEvent,
}

impl EventRecord {
    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> DateTime<Utc> {
        crate::types::parse_business_date("2025-01-10").unwrap()
    }

    fn purchase(quantity: u64) -> LedgerEvent {
        LedgerEvent::Purchase(Purchase {
            base: "Base Alpha".to_string(),
            equipment_type: EquipmentType::Weapons,
            quantity,
            vendor: None,
            cost: None,
            date: at(),
            notes: None,
        })
    }

    #[test]
    fn test_quantity_bounds() {
        assert!(purchase(1).validate().is_ok());
        assert!(purchase(0).validate().is_err());
        assert!(purchase(MAX_EVENT_QUANTITY + 1).validate().is_err());
    }

    #[test]
    fn test_transfer_to_self_rejected() {
        let event = LedgerEvent::Transfer(Transfer {
            from_base: "Base Alpha".to_string(),
            to_base: "Base Alpha".to_string(),
            equipment_type: EquipmentType::Vehicles,
            quantity: 3,
            date: at(),
            notes: None,
        });
        assert!(matches!(event.validate(), Err(KernelError::Validation(_))));
    }

    #[test]
    fn test_expenditure_requires_reason() {
        let event = LedgerEvent::Expenditure(Expenditure {
            base: "Base Beta".to_string(),
            equipment_type: EquipmentType::Ammunition,
            quantity: 100,
            reason: "  ".to_string(),
            date: at(),
        });
        assert!(event.validate().is_err());
    }

    #[test]
    fn test_negative_cost_rejected() {
        let mut event = purchase(5);
        if let LedgerEvent::Purchase(p) = &mut event {
            p.cost = Some(-1.0);
        }
        assert!(event.validate().is_err());
    }

    #[test]
    fn test_touches_base_covers_both_transfer_sides() {
        let event = LedgerEvent::Transfer(Transfer {
            from_base: "Base Alpha".to_string(),
            to_base: "Base Beta".to_string(),
            equipment_type: EquipmentType::Weapons,
            quantity: 1,
            date: at(),
            notes: None,
        });
        assert!(event.touches_base("Base Alpha"));
        assert!(event.touches_base("Base Beta"));
        assert!(!event.touches_base("Base Gamma"));
    }
}
