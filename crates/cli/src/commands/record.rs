// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Offline recording and queue maintenance. Nothing here touches the network;
//! operations are validated locally and queued for `mams sync`.

use std::path::Path;

use chrono::{DateTime, Utc};
use clap::Args;
use mams_kernel::config::UNKNOWN_ASSIGNEE;
use mams_kernel::event::{Assignment, Expenditure, LedgerEvent, Purchase, Transfer};
use mams_kernel::types::{parse_business_date, EquipmentType};
use uuid::Uuid;

use crate::cache::LocalCache;

#[derive(Args, Debug, Clone)]
pub struct PurchaseArgs {
    #[arg(long)]
    pub base: String,
    #[arg(long = "type")]
    pub equipment_type: String,
    #[arg(long)]
    pub quantity: u64,
    #[arg(long)]
    pub vendor: Option<String>,
    #[arg(long)]
    pub cost: Option<f64>,
    /// RFC 3339 timestamp or YYYY-MM-DD; defaults to now
    #[arg(long)]
    pub date: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct TransferArgs {
    #[arg(long)]
    pub from: String,
    #[arg(long)]
    pub to: String,
    #[arg(long = "type")]
    pub equipment_type: String,
    #[arg(long)]
    pub quantity: u64,
    #[arg(long)]
    pub date: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct AssignArgs {
    #[arg(long)]
    pub base: String,
    #[arg(long = "type")]
    pub equipment_type: String,
    #[arg(long)]
    pub quantity: u64,
    #[arg(long)]
    pub assignee: Option<String>,
    #[arg(long)]
    pub date: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ExpendArgs {
    #[arg(long)]
    pub base: String,
    #[arg(long = "type")]
    pub equipment_type: String,
    #[arg(long)]
    pub quantity: u64,
    #[arg(long)]
    pub reason: String,
    #[arg(long)]
    pub date: Option<String>,
}

fn date_or(raw: Option<&str>, now: DateTime<Utc>) -> anyhow::Result<DateTime<Utc>> {
    match raw {
        Some(raw) => Ok(parse_business_date(raw)?),
        None => Ok(now),
    }
}

impl PurchaseArgs {
    pub fn into_event(self, now: DateTime<Utc>) -> anyhow::Result<LedgerEvent> {
        Ok(LedgerEvent::Purchase(Purchase {
            date: date_or(self.date.as_deref(), now)?,
            base: self.base,
            equipment_type: EquipmentType::canonicalize(&self.equipment_type),
            quantity: self.quantity,
            vendor: self.vendor,
            cost: self.cost,
            notes: self.notes,
        }))
    }
}

impl TransferArgs {
    pub fn into_event(self, now: DateTime<Utc>) -> anyhow::Result<LedgerEvent> {
        Ok(LedgerEvent::Transfer(Transfer {
            date: date_or(self.date.as_deref(), now)?,
            from_base: self.from,
            to_base: self.to,
            equipment_type: EquipmentType::canonicalize(&self.equipment_type),
            quantity: self.quantity,
            notes: self.notes,
        }))
    }
}

impl AssignArgs {
    pub fn into_event(self, now: DateTime<Utc>) -> anyhow::Result<LedgerEvent> {
        Ok(LedgerEvent::Assignment(Assignment {
            date: date_or(self.date.as_deref(), now)?,
            base: self.base,
            equipment_type: EquipmentType::canonicalize(&self.equipment_type),
            quantity: self.quantity,
            assignee: self.assignee.unwrap_or_else(|| UNKNOWN_ASSIGNEE.to_string()),
            notes: self.notes,
        }))
    }
}

impl ExpendArgs {
    pub fn into_event(self, now: DateTime<Utc>) -> anyhow::Result<LedgerEvent> {
        Ok(LedgerEvent::Expenditure(Expenditure {
            date: date_or(self.date.as_deref(), now)?,
            base: self.base,
            equipment_type: EquipmentType::canonicalize(&self.equipment_type),
            quantity: self.quantity,
            reason: self.reason,
        }))
    }
}

/// Validates `event` against the local projection and queues it.
pub fn run(cache_path: &Path, event: LedgerEvent) -> anyhow::Result<()> {
    let mut cache = LocalCache::open(cache_path)?;
    let op = cache.record(event, Utc::now())?;
    println!(
        "Queued {} of {} x {} ({} pending, state {:?})",
        op.event.kind(),
        op.event.quantity(),
        op.event.equipment_type(),
        cache.pending().len(),
        cache.state()
    );
    Ok(())
}

/// Drops a queued or dead operation.
pub fn discard(cache_path: &Path, client_ref: Uuid) -> anyhow::Result<()> {
    let mut cache = LocalCache::open(cache_path)?;
    let op = cache.discard(client_ref)?;
    println!("Discarded {} {} (state {:?})", op.event.kind(), op.client_ref, cache.state());
    Ok(())
}

/// Moves a dead operation back into the queue.
pub fn requeue(cache_path: &Path, client_ref: Uuid) -> anyhow::Result<()> {
    let mut cache = LocalCache::open(cache_path)?;
    let op = cache.requeue(client_ref)?;
    println!("Requeued {} {} ({} pending)", op.event.kind(), op.client_ref, cache.pending().len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_defaults_assignee() {
        let args = AssignArgs {
            base: "Base Alpha".to_string(),
            equipment_type: "weapon".to_string(),
            quantity: 2,
            assignee: None,
            date: Some("2025-03-01".to_string()),
            notes: None,
        };
        let LedgerEvent::Assignment(a) = args.into_event(Utc::now()).unwrap() else {
            panic!("expected an assignment");
        };
        assert_eq!(a.assignee, UNKNOWN_ASSIGNEE);
        assert_eq!(a.equipment_type, EquipmentType::Weapons);
        assert_eq!(a.date.to_rfc3339(), "2025-03-01T00:00:00+00:00");
    }

    #[test]
    fn test_bad_date_is_refused() {
        let args = ExpendArgs {
            base: "Base Alpha".to_string(),
            equipment_type: "Ammunition".to_string(),
            quantity: 1,
            reason: "training".to_string(),
            date: Some("yesterday-ish".to_string()),
        };
        assert!(args.into_event(Utc::now()).is_err());
    }
}
