// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Sync Reconciler
//!
//! Pushes the pending queue of a [`LocalCache`] through an [`EventSink`], one
//! operation at a time, in local log order. Each call gets a fixed timeout and
//! a retry budget; a failed operation does not stop the batch. Failures that
//! retrying cannot fix are reported separately so the cache can dead-letter
//! them.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use mams_kernel::types::EventKind;
use thiserror::Error;
use uuid::Uuid;

use crate::cache::{CacheError, LocalCache, PendingOp};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("rejected by server ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("{0} operations cannot be pushed")]
    Unsupported(EventKind),
}

impl SyncError {
    /// Only failures that might succeed on a second attempt are retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Timeout(_) | SyncError::Transport(_) | SyncError::Server { .. })
    }
}

/// Where pending operations go.
pub trait EventSink {
    fn push(&self, op: &PendingOp) -> impl Future<Output = Result<(), SyncError>> + Send;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncPolicy {
    pub timeout: Duration,
    pub retries: u32,
    pub backoff: Duration,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retries: 2,
            backoff: Duration::from_millis(250),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Acknowledged operations per kind.
    pub by_kind: BTreeMap<EventKind, usize>,
    pub succeeded: usize,
    pub failed: usize,
    pub first_error: Option<String>,
    pub acknowledged: Vec<Uuid>,
    /// Permanent failures with their messages; a subset of `failed`.
    pub rejected: Vec<(Uuid, String)>,
}

impl SyncReport {
    pub fn is_empty(&self) -> bool {
        self.succeeded == 0 && self.failed == 0
    }
}

pub struct Reconciler<S> {
    sink: S,
    policy: SyncPolicy,
}

impl<S: EventSink> Reconciler<S> {
    pub fn new(sink: S, policy: SyncPolicy) -> Self {
        Self { sink, policy }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    async fn push_one(&self, op: &PendingOp) -> Result<(), SyncError> {
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(self.policy.timeout, self.sink.push(op)).await {
                Ok(result) => result,
                Err(_) => Err(SyncError::Timeout(self.policy.timeout)),
            };
            match result {
                Err(e) if e.is_retryable() && attempt < self.policy.retries => {
                    attempt += 1;
                    tracing::debug!("Retrying {} ({}/{}): {}", op.client_ref, attempt, self.policy.retries, e);
                    tokio::time::sleep(self.policy.backoff * attempt).await;
                }
                other => return other,
            }
        }
    }

    /// Pushes `ops` in order. Never fails as a whole; see the report.
    pub async fn reconcile(&self, ops: &[PendingOp]) -> SyncReport {
        let mut report = SyncReport::default();
        for op in ops {
            let kind = op.event.kind();
            match self.push_one(op).await {
                Ok(()) => {
                    report.succeeded += 1;
                    *report.by_kind.entry(kind).or_insert(0) += 1;
                    report.acknowledged.push(op.client_ref);
                }
                Err(e) => {
                    tracing::warn!("Failed to push {} {}: {}", kind, op.client_ref, e);
                    report.failed += 1;
                    report.first_error.get_or_insert_with(|| e.to_string());
                    if !e.is_retryable() {
                        report.rejected.push((op.client_ref, e.to_string()));
                    }
                }
            }
        }
        report
    }
}

/// Runs one full sync of `cache`: begin, push, settle.
pub async fn sync_cache<S: EventSink>(
    cache: &mut LocalCache,
    reconciler: &Reconciler<S>,
) -> Result<SyncReport, CacheError> {
    let queue = cache.begin_sync()?;
    if queue.is_empty() {
        tracing::info!("Nothing to sync");
        return Ok(SyncReport::default());
    }

    tracing::info!("Pushing {} pending operations", queue.len());
    let report = reconciler.reconcile(&queue).await;
    let state = cache.finish_sync(
        &report.acknowledged,
        &report.rejected,
        report.first_error.clone(),
        Utc::now(),
    )?;
    tracing::info!(
        "Sync finished: {} succeeded, {} failed ({} dead-lettered), state {:?}",
        report.succeeded,
        report.failed,
        report.rejected.len(),
        state
    );
    Ok(report)
}
