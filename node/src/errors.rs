// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mams_kernel::access::AccessDenied;
use mams_kernel::error::KernelError;
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;
use crate::events::event_commit::CommitError;
use crate::events::event_log::EventLogError;
use crate::events::event_replay::ReplayError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Kernel(#[from] KernelError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Forbidden(#[from] AccessDenied),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Event log error: {0}")]
    Storage(#[from] EventLogError),
    #[error("Recovery failed: {0}")]
    Recovery(#[from] ReplayError),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<CommitError> for EngineError {
    fn from(e: CommitError) -> Self {
        match e {
            CommitError::Rejected(k) => EngineError::Kernel(k),
            CommitError::EventLog(io) => EngineError::Storage(io),
        }
    }
}

impl From<JsonRejection> for EngineError {
    fn from(rejection: JsonRejection) -> Self {
        EngineError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for EngineError {
    fn from(rejection: QueryRejection) -> Self {
        EngineError::InvalidInput(rejection.body_text())
    }
}

impl From<PathRejection> for EngineError {
    fn from(rejection: PathRejection) -> Self {
        EngineError::InvalidInput(rejection.body_text())
    }
}

impl EngineError {
    pub fn status(&self) -> StatusCode {
        match self {
            EngineError::Kernel(k) => match k {
                KernelError::InsufficientStock { .. } | KernelError::DuplicateClientRef(_) => {
                    StatusCode::CONFLICT
                }
                KernelError::OutOfOrder { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                // A referenced base/type that does not exist is a bad request, not a 404.
                KernelError::Validation(_)
                | KernelError::SourceNotFound { .. }
                | KernelError::EntryNotFound { .. }
                | KernelError::NegativeBalance { .. }
                | KernelError::Overflow => StatusCode::BAD_REQUEST,
            },
            EngineError::Auth(a) => a.status(),
            EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
            EngineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::Conflict(_) => StatusCode::CONFLICT,
            EngineError::Storage(_) | EngineError::Recovery(_) | EngineError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("request failed: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
