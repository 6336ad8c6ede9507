// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Access Gate policy.
//!
//! One declarative allow-list per operation and one check. Transports decide
//! how an [`Actor`] is established; the kernel only decides what it may do.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::enums::Role;
use crate::types::id::ActorId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    ListAssets,
    ReadAsset,
    CreateAsset,
    UpdateAsset,
    RetireAsset,
    RecordPurchase,
    RecordTransfer,
    RecordAssignment,
    RecordExpenditure,
    ListEvents,
    ViewDashboard,
    ReplaceEvents,
    AuditLog,
}

const ANY: &[Role] = &[];
const ADMIN: &[Role] = &[Role::Admin];
const ADMIN_LOGISTICS: &[Role] = &[Role::Admin, Role::LogisticsOfficer];
const FIELD: &[Role] = &[Role::Admin, Role::BaseCommander, Role::LogisticsOfficer];

impl Operation {
    /// Roles allowed to perform the operation. Empty means any authenticated actor.
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Operation::ListAssets
            | Operation::ReadAsset
            | Operation::ListEvents
            | Operation::ViewDashboard => ANY,
            Operation::CreateAsset | Operation::UpdateAsset | Operation::RecordPurchase => {
                ADMIN_LOGISTICS
            }
            Operation::RetireAsset | Operation::ReplaceEvents | Operation::AuditLog => ADMIN,
            Operation::RecordTransfer
            | Operation::RecordAssignment
            | Operation::RecordExpenditure => FIELD,
        }
    }
}

/// How the actor was established.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grant {
    /// A verified session token.
    Session,
    /// The out-of-band admin tool key. Limited to event replacement.
    AdminTool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Option<ActorId>,
    pub username: String,
    pub role: Role,
    pub grant: Grant,
}

impl Actor {
    pub fn session(id: ActorId, username: impl Into<String>, role: Role) -> Self {
        Self {
            id: Some(id),
            username: username.into(),
            role,
            grant: Grant::Session,
        }
    }

    pub fn admin_tool() -> Self {
        Self {
            id: None,
            username: "admin-tool".to_string(),
            role: Role::Admin,
            grant: Grant::AdminTool,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("role {role} may not perform {operation:?}")]
pub struct AccessDenied {
    pub role: Role,
    pub operation: Operation,
}

pub fn authorize(actor: &Actor, operation: Operation) -> Result<(), AccessDenied> {
    let denied = AccessDenied {
        role: actor.role,
        operation,
    };
    if actor.grant == Grant::AdminTool && operation != Operation::ReplaceEvents {
        return Err(denied);
    }
    let allowed = operation.allowed_roles();
    if allowed.is_empty() || allowed.contains(&actor.role) {
        Ok(())
    } else {
        Err(denied)
    }
}
