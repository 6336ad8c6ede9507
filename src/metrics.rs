// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Dashboard metrics derived from events and ledger entries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::event::LedgerEvent;
use crate::filter::EventFilter;
use crate::ledger::LedgerEntry;
use crate::types::EquipmentType;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryMetrics {
    pub opening_balance: u64,
    pub closing_balance: u64,
    pub net_movement: i64,
    pub purchases: u64,
    pub transfers_in: u64,
    pub transfers_out: u64,
    pub assigned: u64,
    pub expended: u64,
}

/// Computes metrics over the slice selected by `filter`.
///
/// Purchases and transfers are filtered by base, type and business day;
/// entries only by base and type. The filter's `kind` is ignored.
///
/// `opening_balance` is back-derived as `closing - net`, floored at zero. It
/// is not a historical reconstruction.
pub fn compute_metrics<'a, E, L>(events: E, entries: L, filter: &EventFilter) -> InventoryMetrics
where
    E: IntoIterator<Item = &'a LedgerEvent>,
    L: IntoIterator<Item = &'a LedgerEntry>,
{
    let scope = EventFilter {
        kind: None,
        ..filter.clone()
    };
    let mut metrics = InventoryMetrics::default();

    for event in events.into_iter().filter(|e| scope.matches_event(e)) {
        match event {
            LedgerEvent::Purchase(p) => {
                metrics.purchases = metrics.purchases.saturating_add(p.quantity);
            }
            LedgerEvent::Transfer(t) => {
                let inbound = scope.base.as_ref().map_or(true, |base| &t.to_base == base);
                let outbound = scope.base.as_ref().map_or(true, |base| &t.from_base == base);
                if inbound {
                    metrics.transfers_in = metrics.transfers_in.saturating_add(t.quantity);
                }
                if outbound {
                    metrics.transfers_out = metrics.transfers_out.saturating_add(t.quantity);
                }
            }
            _ => {}
        }
    }

    for entry in entries.into_iter().filter(|e| scope.matches_entry(e)) {
        metrics.closing_balance = metrics.closing_balance.saturating_add(entry.quantity);
        metrics.assigned = metrics.assigned.saturating_add(entry.assigned);
        metrics.expended = metrics.expended.saturating_add(entry.expended);
    }

    let net = i128::from(metrics.purchases) + i128::from(metrics.transfers_in)
        - i128::from(metrics.transfers_out);
    metrics.net_movement = clamp_i64(net);
    let opening = (i128::from(metrics.closing_balance) - net).max(0);
    metrics.opening_balance = u64::try_from(opening).unwrap_or(u64::MAX);
    metrics
}

fn clamp_i64(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}

/// Share of on-hand stock held by one equipment type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeShare {
    pub label: String,
    pub value: u64,
    pub pct: f64,
}

/// On-hand quantity per canonical type, with percentages of the total.
pub fn breakdown_by_type<'a, L>(entries: L, filter: &EventFilter) -> Vec<TypeShare>
where
    L: IntoIterator<Item = &'a LedgerEntry>,
{
    let mut totals: BTreeMap<EquipmentType, u64> = BTreeMap::new();
    for entry in entries.into_iter().filter(|e| filter.matches_entry(e)) {
        let value = totals.entry(entry.equipment_type.clone()).or_insert(0);
        *value = value.saturating_add(entry.quantity);
    }

    let total = totals.values().fold(0u64, |acc, v| acc.saturating_add(*v));
    let denominator = if total == 0 { 1.0 } else { total as f64 };

    totals
        .into_iter()
        .map(|(equipment_type, value)| TypeShare {
            label: equipment_type.to_string(),
            value,
            pct: value as f64 / denominator * 100.0,
        })
        .collect()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub available: u64,
    pub assigned: u64,
}

/// On-hand versus assigned, optionally for one base.
pub fn availability<'a, L>(entries: L, base: Option<&str>) -> Availability
where
    L: IntoIterator<Item = &'a LedgerEntry>,
{
    entries
        .into_iter()
        .filter(|e| base.map_or(true, |b| e.base == b))
        .fold(Availability::default(), |acc, e| Availability {
            available: acc.available.saturating_add(e.quantity),
            assigned: acc.assigned.saturating_add(e.assigned),
        })
}
