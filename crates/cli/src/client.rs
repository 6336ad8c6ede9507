// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use mams_kernel::event::LedgerEvent;
use mams_kernel::ledger::LedgerEntry;
use mams_kernel::metrics::InventoryMetrics;
use mams_kernel::types::{AssetId, EquipmentType};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::cache::PendingOp;
use crate::sync::{EventSink, SyncError};

#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub username: String,
    pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginReply {
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRow {
    pub id: u64,
    pub base: String,
    pub equipment_type: String,
    pub quantity: u64,
    pub assigned: u64,
    pub expended: u64,
}

impl From<AssetRow> for LedgerEntry {
    fn from(row: AssetRow) -> Self {
        LedgerEntry {
            id: AssetId(row.id),
            equipment_type: EquipmentType::canonicalize(&row.equipment_type),
            base: row.base,
            quantity: row.quantity,
            assigned: row.assigned,
            expended: row.expended,
            retired: false,
        }
    }
}

/// HTTP client for a MAMS node. Also the reconciler's production sink.
#[derive(Debug, Clone)]
pub struct HttpSink {
    base_url: String,
    client: Client,
    token: Option<String>,
}

impl HttpSink {
    pub fn new(url: &str, token: Option<String>) -> Self {
        Self {
            base_url: url.trim_end_matches('/').to_string(),
            client: Client::new(),
            token,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn register(&self, username: &str, password: &str, role: &str) -> Result<UserInfo, SyncError> {
        let url = format!("{}/auth/register", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&json!({"username": username, "password": password, "role": role}))
            .send()
            .await
            .map_err(transport)?;
        decode(resp).await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginReply, SyncError> {
        let url = format!("{}/auth/login", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&json!({"username": username, "password": password}))
            .send()
            .await
            .map_err(transport)?;
        decode(resp).await
    }

    pub async fn list_assets(&self) -> Result<Vec<AssetRow>, SyncError> {
        let url = format!("{}/assets", self.base_url);
        let resp = self.authorized(self.client.get(&url)).send().await.map_err(transport)?;
        decode(resp).await
    }

    pub async fn metrics(&self, query: &[(&str, String)]) -> Result<InventoryMetrics, SyncError> {
        let url = format!("{}/dashboard/metrics", self.base_url);
        let resp = self
            .authorized(self.client.get(&url).query(query))
            .send()
            .await
            .map_err(transport)?;
        decode(resp).await
    }
}

impl EventSink for HttpSink {
    async fn push(&self, op: &PendingOp) -> Result<(), SyncError> {
        let (path, body) = request_for(op)?;
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .authorized(self.client.post(&url).json(&body))
            .send()
            .await
            .map_err(transport)?;
        check(resp).await.map(|_| ())
    }
}

fn transport(e: reqwest::Error) -> SyncError {
    SyncError::Transport(e.to_string())
}

async fn check(resp: Response) -> Result<Response, SyncError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = match resp.json::<Value>().await {
        Ok(body) => body["error"].as_str().unwrap_or("no detail").to_string(),
        Err(_) => status.canonical_reason().unwrap_or("unknown").to_string(),
    };
    if status.is_server_error() {
        Err(SyncError::Server { status: status.as_u16(), message })
    } else {
        Err(SyncError::Rejected { status: status.as_u16(), message })
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, SyncError> {
    check(resp).await?.json().await.map_err(transport)
}

/// Endpoint and camelCase body for a pending operation.
pub fn request_for(op: &PendingOp) -> Result<(&'static str, Value), SyncError> {
    let client_ref = op.client_ref.to_string();
    let request = match &op.event {
        LedgerEvent::Purchase(p) => (
            "/purchases",
            json!({
                "base": p.base,
                "equipmentType": p.equipment_type,
                "quantity": p.quantity,
                "vendor": p.vendor,
                "cost": p.cost,
                "date": p.date.to_rfc3339(),
                "notes": p.notes,
                "clientRef": client_ref,
            }),
        ),
        LedgerEvent::Transfer(t) => (
            "/transfers",
            json!({
                "fromLocation": t.from_base,
                "toLocation": t.to_base,
                "equipmentType": t.equipment_type,
                "quantity": t.quantity,
                "date": t.date.to_rfc3339(),
                "notes": t.notes,
                "clientRef": client_ref,
            }),
        ),
        LedgerEvent::Assignment(a) => (
            "/assignments",
            json!({
                "base": a.base,
                "equipmentType": a.equipment_type,
                "quantity": a.quantity,
                "assignee": a.assignee,
                "date": a.date.to_rfc3339(),
                "notes": a.notes,
                "clientRef": client_ref,
            }),
        ),
        LedgerEvent::Expenditure(e) => (
            "/expenditures",
            json!({
                "base": e.base,
                "equipmentType": e.equipment_type,
                "quantity": e.quantity,
                "reason": e.reason,
                "date": e.date.to_rfc3339(),
                "clientRef": client_ref,
            }),
        ),
        LedgerEvent::Adjustment(_) => return Err(SyncError::Unsupported(op.event.kind())),
    };
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mams_kernel::event::Transfer;
    use uuid::Uuid;

    #[test]
    fn test_transfer_body_uses_location_names() {
        let op = PendingOp {
            client_ref: Uuid::new_v4(),
            recorded_at: Utc::now(),
            event: LedgerEvent::Transfer(Transfer {
                from_base: "Base Alpha".to_string(),
                to_base: "Base Beta".to_string(),
                equipment_type: EquipmentType::Weapons,
                quantity: 20,
                date: Utc::now(),
                notes: None,
            }),
        };
        let (path, body) = request_for(&op).unwrap();
        assert_eq!(path, "/transfers");
        assert_eq!(body["fromLocation"], "Base Alpha");
        assert_eq!(body["equipmentType"], "Weapons");
        assert_eq!(body["clientRef"], op.client_ref.to_string());
    }
}
