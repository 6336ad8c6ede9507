// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Wire types for the HTTP API. Requests are camelCase JSON; every field is
//! optional at the serde level so a missing field becomes a 400 with a
//! readable message instead of a generic rejection.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use mams_kernel::config::UNKNOWN_ASSIGNEE;
use mams_kernel::event::{
    AdjustmentAction, Assignment, EventRecord, Expenditure, LedgerEvent, Purchase, Transfer,
};
use mams_kernel::filter::EventFilter;
use mams_kernel::ledger::{LedgerEntry, LedgerKey};
use mams_kernel::types::{calendar_day, parse_business_date, ActorId, AssetId, EquipmentType, EventId, EventKind, Role};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::UserRecord;
use crate::engine::AssetValues;
use crate::errors::EngineError;

type Result<T> = std::result::Result<T, EngineError>;

fn required(field: &str, value: Option<String>) -> Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(EngineError::InvalidInput(format!("{} is required", field))),
    }
}

fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn equipment_type(value: Option<String>) -> Result<EquipmentType> {
    required("equipmentType", value).map(|raw| EquipmentType::canonicalize(&raw))
}

fn positive_quantity(value: Option<i64>) -> Result<u64> {
    match value {
        Some(q) if q > 0 => Ok(q as u64),
        Some(_) => Err(EngineError::InvalidInput("quantity must be positive".to_string())),
        None => Err(EngineError::InvalidInput("quantity is required".to_string())),
    }
}

fn non_negative(field: &str, value: Option<i64>) -> Result<Option<u64>> {
    match value {
        Some(v) if v < 0 => Err(EngineError::InvalidInput(format!("{} must not be negative", field))),
        Some(v) => Ok(Some(v as u64)),
        None => Ok(None),
    }
}

fn business_date(value: Option<String>, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    match optional_text(value) {
        Some(raw) => Ok(parse_business_date(&raw)?),
        None => Ok(now),
    }
}

// ---- Auth ----

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

impl RegisterRequest {
    pub fn role(&self) -> Result<Role> {
        let raw = self
            .role
            .as_deref()
            .ok_or_else(|| EngineError::InvalidInput("role is required".to_string()))?;
        raw.parse::<Role>().map_err(EngineError::InvalidInput)
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserView {
    pub id: ActorId,
    pub username: String,
    pub role: Role,
}

impl From<&UserRecord> for UserView {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserView,
}

// ---- Events ----

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub base: Option<String>,
    pub equipment_type: Option<String>,
    pub quantity: Option<i64>,
    pub vendor: Option<String>,
    pub cost: Option<f64>,
    pub date: Option<String>,
    #[serde(alias = "description")]
    pub notes: Option<String>,
    pub client_ref: Option<Uuid>,
}

impl PurchaseRequest {
    pub fn into_event(self, now: DateTime<Utc>) -> Result<LedgerEvent> {
        Ok(LedgerEvent::Purchase(Purchase {
            base: required("base", self.base)?,
            equipment_type: equipment_type(self.equipment_type)?,
            quantity: positive_quantity(self.quantity)?,
            vendor: optional_text(self.vendor),
            cost: self.cost,
            date: business_date(self.date, now)?,
            notes: optional_text(self.notes),
        }))
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    #[serde(alias = "fromBase")]
    pub from_location: Option<String>,
    #[serde(alias = "toBase")]
    pub to_location: Option<String>,
    pub equipment_type: Option<String>,
    pub quantity: Option<i64>,
    pub date: Option<String>,
    #[serde(alias = "description")]
    pub notes: Option<String>,
    pub client_ref: Option<Uuid>,
}

impl TransferRequest {
    pub fn into_event(self, now: DateTime<Utc>) -> Result<LedgerEvent> {
        Ok(LedgerEvent::Transfer(Transfer {
            from_base: required("fromLocation", self.from_location)?,
            to_base: required("toLocation", self.to_location)?,
            equipment_type: equipment_type(self.equipment_type)?,
            quantity: positive_quantity(self.quantity)?,
            date: business_date(self.date, now)?,
            notes: optional_text(self.notes),
        }))
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRequest {
    pub base: Option<String>,
    pub equipment_type: Option<String>,
    #[serde(alias = "assignedTo", alias = "person")]
    pub assignee: Option<String>,
    pub quantity: Option<i64>,
    pub date: Option<String>,
    #[serde(alias = "description")]
    pub notes: Option<String>,
    pub client_ref: Option<Uuid>,
}

impl AssignmentRequest {
    pub fn into_event(self, now: DateTime<Utc>) -> Result<LedgerEvent> {
        Ok(LedgerEvent::Assignment(Assignment {
            base: required("base", self.base)?,
            equipment_type: equipment_type(self.equipment_type)?,
            quantity: positive_quantity(self.quantity)?,
            assignee: optional_text(self.assignee).unwrap_or_else(|| UNKNOWN_ASSIGNEE.to_string()),
            date: business_date(self.date, now)?,
            notes: optional_text(self.notes),
        }))
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExpenditureRequest {
    pub base: Option<String>,
    pub equipment_type: Option<String>,
    pub quantity: Option<i64>,
    pub reason: Option<String>,
    pub date: Option<String>,
    pub client_ref: Option<Uuid>,
}

impl ExpenditureRequest {
    pub fn into_event(self, now: DateTime<Utc>) -> Result<LedgerEvent> {
        Ok(LedgerEvent::Expenditure(Expenditure {
            base: required("base", self.base)?,
            equipment_type: equipment_type(self.equipment_type)?,
            quantity: positive_quantity(self.quantity)?,
            reason: required("reason", self.reason)?,
            date: business_date(self.date, now)?,
        }))
    }
}

/// Body of `/admin/{kind}/replace`. The list may also arrive under the
/// collection name (`{"transfers": [...]}`).
#[derive(Deserialize, Default)]
pub struct ReplaceRequest {
    #[serde(default, alias = "purchases", alias = "transfers", alias = "assignments", alias = "expenditures")]
    pub items: Vec<serde_json::Value>,
}

/// Decodes one replace item as an event of `kind`.
pub fn replace_item(kind: EventKind, item: serde_json::Value, now: DateTime<Utc>) -> Result<LedgerEvent> {
    let bad = |e: serde_json::Error| EngineError::InvalidInput(e.to_string());
    match kind {
        EventKind::Purchase => serde_json::from_value::<PurchaseRequest>(item).map_err(bad)?.into_event(now),
        EventKind::Transfer => serde_json::from_value::<TransferRequest>(item).map_err(bad)?.into_event(now),
        EventKind::Assignment => serde_json::from_value::<AssignmentRequest>(item).map_err(bad)?.into_event(now),
        EventKind::Expenditure => serde_json::from_value::<ExpenditureRequest>(item).map_err(bad)?.into_event(now),
        EventKind::Adjustment => Err(EngineError::InvalidInput("adjustments cannot be replaced".to_string())),
    }
}

/// Flat JSON view of a logged event.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    pub id: EventId,
    pub kind: EventKind,
    pub created_at: DateTime<Utc>,
    pub date: DateTime<Utc>,
    pub equipment_type: EquipmentType,
    pub quantity: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performed_by: Option<ActorId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ref: Option<Uuid>,
}

impl From<&EventRecord> for EventView {
    fn from(record: &EventRecord) -> Self {
        let event = &record.event;
        let mut view = EventView {
            id: record.id,
            kind: record.kind(),
            created_at: record.created_at,
            date: event.date(),
            equipment_type: event.equipment_type().clone(),
            quantity: event.quantity(),
            base: None,
            from_location: None,
            to_location: None,
            vendor: None,
            cost: None,
            assignee: None,
            reason: None,
            action: None,
            notes: None,
            performed_by: record.performed_by,
            client_ref: record.client_ref,
        };
        match event {
            LedgerEvent::Purchase(p) => {
                view.base = Some(p.base.clone());
                view.vendor = p.vendor.clone();
                view.cost = p.cost;
                view.notes = p.notes.clone();
            }
            LedgerEvent::Transfer(t) => {
                view.from_location = Some(t.from_base.clone());
                view.to_location = Some(t.to_base.clone());
                view.notes = t.notes.clone();
            }
            LedgerEvent::Assignment(a) => {
                view.base = Some(a.base.clone());
                view.assignee = Some(a.assignee.clone());
                view.notes = a.notes.clone();
            }
            LedgerEvent::Expenditure(e) => {
                view.base = Some(e.base.clone());
                view.reason = Some(e.reason.clone());
            }
            LedgerEvent::Adjustment(adj) => {
                view.base = Some(adj.base.clone());
                view.action = Some(match adj.action {
                    AdjustmentAction::Set { .. } => "set".to_string(),
                    AdjustmentAction::Retire => "retire".to_string(),
                });
                view.notes = adj.notes.clone();
            }
        }
        view
    }
}

// ---- Assets ----

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssetRequest {
    #[serde(alias = "location")]
    pub base: Option<String>,
    #[serde(alias = "name", alias = "category")]
    pub equipment_type: Option<String>,
    pub quantity: Option<i64>,
    pub assigned: Option<i64>,
    pub expended: Option<i64>,
    pub notes: Option<String>,
}

impl CreateAssetRequest {
    pub fn key(&self) -> Result<LedgerKey> {
        let base = required("base", self.base.clone())?;
        Ok(LedgerKey::new(base, equipment_type(self.equipment_type.clone())?))
    }

    pub fn values(&self) -> Result<AssetValues> {
        Ok(AssetValues {
            quantity: non_negative("quantity", self.quantity)?,
            assigned: non_negative("assigned", self.assigned)?,
            expended: non_negative("expended", self.expended)?,
        })
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAssetRequest {
    pub quantity: Option<i64>,
    pub assigned: Option<i64>,
    pub expended: Option<i64>,
    pub notes: Option<String>,
}

impl UpdateAssetRequest {
    pub fn values(&self) -> Result<AssetValues> {
        Ok(AssetValues {
            quantity: non_negative("quantity", self.quantity)?,
            assigned: non_negative("assigned", self.assigned)?,
            expended: non_negative("expended", self.expended)?,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssetView {
    pub id: AssetId,
    pub base: String,
    pub equipment_type: EquipmentType,
    pub quantity: u64,
    pub assigned: u64,
    pub expended: u64,
}

impl From<&LedgerEntry> for AssetView {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            id: entry.id,
            base: entry.base.clone(),
            equipment_type: entry.equipment_type.clone(),
            quantity: entry.quantity,
            assigned: entry.assigned,
            expended: entry.expended,
        }
    }
}

// ---- Queries ----

/// `?base=&equipmentType=&date=&kind=` on list and dashboard endpoints.
#[derive(Deserialize, Default, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FilterQuery {
    pub base: Option<String>,
    pub equipment_type: Option<String>,
    pub date: Option<String>,
    pub kind: Option<String>,
}

impl FilterQuery {
    pub fn to_filter(&self, offset: FixedOffset) -> Result<EventFilter> {
        let mut filter = EventFilter::all().in_offset(offset);
        if let Some(base) = optional_text(self.base.clone()) {
            filter = filter.with_base(base);
        }
        if let Some(raw) = optional_text(self.equipment_type.clone()) {
            filter = filter.with_equipment_type(EquipmentType::canonicalize(&raw));
        }
        if let Some(raw) = optional_text(self.date.clone()) {
            let day = match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
                Ok(day) => day,
                Err(_) => calendar_day(parse_business_date(&raw)?, offset),
            };
            filter = filter.on_date(day);
        }
        if let Some(raw) = optional_text(self.kind.clone()) {
            filter = filter.of_kind(raw.parse::<EventKind>().map_err(EngineError::InvalidInput)?);
        }
        Ok(filter)
    }
}
