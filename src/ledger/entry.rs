// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Ledger entries and deltas.

use serde::{Deserialize, Serialize};

use crate::error::{KernelError, KernelResult};
use crate::types::enums::EquipmentType;
use crate::types::id::AssetId;

/// Ledger key. Ordering is base first, then canonical type.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LedgerKey {
    pub base: String,
    pub equipment_type: EquipmentType,
}

impl LedgerKey {
    pub fn new(base: impl Into<String>, equipment_type: EquipmentType) -> Self {
        Self {
            base: base.into(),
            equipment_type,
        }
    }
}

/// Stock level of one (base, equipment type) pair.
///
/// `quantity` is on hand, `assigned` and `expended` are cumulative and have
/// already left `quantity`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// `AssetId(0)` until the store first persists the entry.
    pub id: AssetId,
    pub base: String,
    pub equipment_type: EquipmentType,
    pub quantity: u64,
    pub assigned: u64,
    pub expended: u64,
    pub retired: bool,
}

impl LedgerEntry {
    pub fn empty(key: &LedgerKey) -> Self {
        Self {
            id: AssetId::default(),
            base: key.base.clone(),
            equipment_type: key.equipment_type.clone(),
            quantity: 0,
            assigned: 0,
            expended: 0,
            retired: false,
        }
    }

    pub fn key(&self) -> LedgerKey {
        LedgerKey::new(self.base.clone(), self.equipment_type.clone())
    }

    pub fn is_persisted(&self) -> bool {
        self.id != AssetId::default()
    }

    /// Applies a signed delta field by field. Nothing is written unless all
    /// three fields stay non-negative.
    pub fn apply_delta(&mut self, delta: &LedgerDelta) -> KernelResult<()> {
        let quantity = shift("quantity", self.quantity, delta.quantity)?;
        let assigned = shift("assigned", self.assigned, delta.assigned)?;
        let expended = shift("expended", self.expended, delta.expended)?;
        self.quantity = quantity;
        self.assigned = assigned;
        self.expended = expended;
        Ok(())
    }
}

fn shift(field: &'static str, value: u64, delta: i64) -> KernelResult<u64> {
    if delta < 0 && delta.unsigned_abs() > value {
        return Err(KernelError::NegativeBalance { field });
    }
    value.checked_add_signed(delta).ok_or(KernelError::Overflow)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LedgerDelta {
    pub quantity: i64,
    pub assigned: i64,
    pub expended: i64,
}

impl LedgerDelta {
    pub fn quantity(quantity: i64) -> Self {
        Self {
            quantity,
            ..Self::default()
        }
    }

    /// Delta that moves `entry` to the given absolute values. `None` keeps a field.
    pub fn towards(
        entry: &LedgerEntry,
        quantity: Option<u64>,
        assigned: Option<u64>,
        expended: Option<u64>,
    ) -> KernelResult<Self> {
        Ok(Self {
            quantity: difference(entry.quantity, quantity)?,
            assigned: difference(entry.assigned, assigned)?,
            expended: difference(entry.expended, expended)?,
        })
    }
}

fn difference(current: u64, target: Option<u64>) -> KernelResult<i64> {
    let Some(target) = target else {
        return Ok(0);
    };
    let current = i64::try_from(current).map_err(|_| KernelError::Overflow)?;
    let target = i64::try_from(target).map_err(|_| KernelError::Overflow)?;
    target.checked_sub(current).ok_or(KernelError::Overflow)
}
