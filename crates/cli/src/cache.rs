// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Local Cache
//!
//! Operations recorded offline land here first. The cache keeps them in an
//! ordered pending queue, validates each one against a local projection built
//! with the kernel Balance Engine, and hands the queue to the reconciler.
//!
//! # Reconciliation policy
//! One-way, event-sourced push in local log order. Every operation carries a
//! `client_ref` the node deduplicates on, so pushing the same operation twice
//! never applies it twice. Acknowledged operations leave the queue; failed ones
//! stay for the next sync. Nothing is rolled back. Acknowledged operations
//! are folded into the baseline, so the projection keeps them.
//!
//! An operation the node refuses outright (validation, insufficient stock)
//! would fail on every retry. It moves to the dead letters instead, where it
//! can be inspected, requeued or discarded.
//!
//! # Sync state machine
//! ```text
//! Clean ──record──▶ Dirty ──begin──▶ Syncing ──all acked──▶ Synced
//!                     ▲                 │                      │
//!                     │                 └──any failed──▶ SyncFailed
//!                     └────────────record────────────────────┘
//! ```
//! Discarding the last queued or dead operation settles `Dirty` and
//! `SyncFailed` to `Synced` (or `Clean` if the cache never synced).

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use mams_kernel::engine::Inventory;
use mams_kernel::error::KernelError;
use mams_kernel::event::LedgerEvent;
use mams_kernel::ledger::{LedgerEntry, LedgerStore};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncState {
    #[default]
    Clean,
    Dirty,
    Syncing,
    Synced,
    SyncFailed,
}

impl SyncState {
    pub fn on_record(self) -> Result<Self, CacheError> {
        match self {
            SyncState::Clean | SyncState::Dirty | SyncState::Synced | SyncState::SyncFailed => {
                Ok(SyncState::Dirty)
            }
            SyncState::Syncing => Err(CacheError::IllegalTransition { from: self, action: "record" }),
        }
    }

    pub fn begin_sync(self) -> Result<Self, CacheError> {
        match self {
            SyncState::Dirty | SyncState::SyncFailed => Ok(SyncState::Syncing),
            _ => Err(CacheError::IllegalTransition { from: self, action: "begin sync" }),
        }
    }

    pub fn finish_sync(self, all_acknowledged: bool) -> Result<Self, CacheError> {
        match (self, all_acknowledged) {
            (SyncState::Syncing, true) => Ok(SyncState::Synced),
            (SyncState::Syncing, false) => Ok(SyncState::SyncFailed),
            _ => Err(CacheError::IllegalTransition { from: self, action: "finish sync" }),
        }
    }

    pub fn on_discard(self, nothing_left: bool, synced_before: bool) -> Result<Self, CacheError> {
        match self {
            SyncState::Syncing => Err(CacheError::IllegalTransition { from: self, action: "discard" }),
            SyncState::Dirty | SyncState::SyncFailed if nothing_left => {
                Ok(if synced_before { SyncState::Synced } else { SyncState::Clean })
            }
            other => Ok(other),
        }
    }
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Rejected locally: {0}")]
    Rejected(#[from] KernelError),

    #[error("Cannot {action} while {from:?}")]
    IllegalTransition { from: SyncState, action: &'static str },

    #[error("Not logged in; run `mams login` first")]
    NotLoggedIn,

    #[error("No queued or dead operation {0}")]
    UnknownOp(Uuid),
}

/// An operation waiting to be pushed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingOp {
    pub client_ref: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub event: LedgerEvent,
}

/// An operation the node refused; it is not retried.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeadLetter {
    pub op: PendingOp,
    pub error: String,
    pub rejected_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub role: String,
    pub token: String,
}

#[derive(Default, Serialize, Deserialize)]
struct CacheFile {
    state: SyncState,
    session: Option<Session>,
    /// Last server view of the ledger; the local projection starts here.
    baseline: Vec<LedgerEntry>,
    pending: Vec<PendingOp>,
    #[serde(default)]
    dead_letters: Vec<DeadLetter>,
    acknowledged: u64,
    last_sync: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

pub struct LocalCache {
    path: PathBuf,
    file: CacheFile,
    inventory: Inventory,
}

impl LocalCache {
    /// Opens the cache at `path`; a missing file is an empty, clean cache.
    ///
    /// A cache persisted mid-sync is reopened as `SyncFailed`: the run that
    /// wrote it never finished, so its outcome is unknown.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let path = path.as_ref().to_path_buf();
        let mut file: CacheFile = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CacheFile::default(),
            Err(e) => return Err(e.into()),
        };
        if file.state == SyncState::Syncing {
            tracing::warn!("Previous sync did not finish; marking cache as SyncFailed");
            file.state = SyncState::SyncFailed;
        }
        let inventory = project(&file.baseline, &file.pending)?;
        Ok(Self { path, file, inventory })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> SyncState {
        self.file.state
    }

    pub fn pending(&self) -> &[PendingOp] {
        &self.file.pending
    }

    pub fn dead_letters(&self) -> &[DeadLetter] {
        &self.file.dead_letters
    }

    pub fn acknowledged(&self) -> u64 {
        self.file.acknowledged
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.file.last_sync
    }

    pub fn last_error(&self) -> Option<&str> {
        self.file.last_error.as_deref()
    }

    /// Local projection: baseline plus pending operations.
    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn session(&self) -> Option<&Session> {
        self.file.session.as_ref()
    }

    pub fn token(&self) -> Result<&str, CacheError> {
        self.session().map(|s| s.token.as_str()).ok_or(CacheError::NotLoggedIn)
    }

    pub fn set_session(&mut self, session: Option<Session>) -> Result<(), CacheError> {
        self.file.session = session;
        self.save()
    }

    /// Replaces the baseline with a fresh server view and re-applies the queue on top.
    pub fn set_baseline(&mut self, entries: Vec<LedgerEntry>) -> Result<(), CacheError> {
        self.inventory = project(&entries, &self.file.pending)?;
        self.file.baseline = entries;
        self.save()
    }

    /// Validates `event` against the local projection and queues it.
    pub fn record(&mut self, event: LedgerEvent, now: DateTime<Utc>) -> Result<PendingOp, CacheError> {
        let next = self.file.state.on_record()?;
        let op = PendingOp {
            client_ref: Uuid::new_v4(),
            recorded_at: now,
            event,
        };
        self.inventory
            .record(op.event.clone(), None, Some(op.client_ref), now)?;

        self.file.pending.push(op.clone());
        self.file.state = next;
        self.save()?;
        tracing::debug!("Queued {} operation {}", op.event.kind(), op.client_ref);
        Ok(op)
    }

    /// Moves to `Syncing` and returns the queue to push. With nothing
    /// pending this is a no-op returning an empty queue.
    pub fn begin_sync(&mut self) -> Result<Vec<PendingOp>, CacheError> {
        if self.file.pending.is_empty() {
            return Ok(Vec::new());
        }
        self.file.state = self.file.state.begin_sync()?;
        self.save()?;
        Ok(self.file.pending.clone())
    }

    /// Settles a sync run. Acknowledged operations are folded into the
    /// baseline, `rejected` ones move to the dead letters, the rest stay queued.
    pub fn finish_sync(
        &mut self,
        acknowledged: &[Uuid],
        rejected: &[(Uuid, String)],
        first_error: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<SyncState, CacheError> {
        let next = self
            .file
            .state
            .finish_sync(rejected.is_empty() && self.file.pending.iter().all(|op| acknowledged.contains(&op.client_ref)))?;

        let acked: Vec<PendingOp> = self
            .file
            .pending
            .iter()
            .filter(|op| acknowledged.contains(&op.client_ref))
            .cloned()
            .collect();
        let folded = project(&self.file.baseline, &acked)?;
        self.file.baseline = folded.store().all_entries().cloned().collect();
        self.file.acknowledged += acked.len() as u64;

        let mut remaining = Vec::new();
        for op in std::mem::take(&mut self.file.pending) {
            if acknowledged.contains(&op.client_ref) {
                continue;
            }
            match rejected.iter().find(|(r, _)| *r == op.client_ref) {
                Some((_, error)) => {
                    tracing::warn!("Dead-lettering {} {}: {}", op.event.kind(), op.client_ref, error);
                    self.file.dead_letters.push(DeadLetter {
                        op,
                        error: error.clone(),
                        rejected_at: now,
                    });
                }
                None => remaining.push(op),
            }
        }
        self.file.pending = remaining;
        self.inventory = project(&self.file.baseline, &self.file.pending)?;

        self.file.state = next;
        self.file.last_sync = Some(now);
        self.file.last_error = first_error;
        self.save()?;
        Ok(self.file.state)
    }

    /// Drops a queued or dead operation for good.
    pub fn discard(&mut self, client_ref: Uuid) -> Result<PendingOp, CacheError> {
        if self.file.state == SyncState::Syncing {
            return Err(CacheError::IllegalTransition { from: self.file.state, action: "discard" });
        }
        let op = if let Some(i) = self.file.pending.iter().position(|op| op.client_ref == client_ref) {
            let op = self.file.pending.remove(i);
            self.inventory = project(&self.file.baseline, &self.file.pending)?;
            op
        } else if let Some(i) = self.file.dead_letters.iter().position(|d| d.op.client_ref == client_ref) {
            self.file.dead_letters.remove(i).op
        } else {
            return Err(CacheError::UnknownOp(client_ref));
        };

        let nothing_left = self.file.pending.is_empty() && self.file.dead_letters.is_empty();
        self.file.state = self.file.state.on_discard(nothing_left, self.file.last_sync.is_some())?;
        self.save()?;
        Ok(op)
    }

    /// Moves a dead operation back to the end of the queue, after checking it
    /// against the current projection. It keeps its `client_ref`.
    pub fn requeue(&mut self, client_ref: Uuid) -> Result<PendingOp, CacheError> {
        let i = self
            .file
            .dead_letters
            .iter()
            .position(|d| d.op.client_ref == client_ref)
            .ok_or(CacheError::UnknownOp(client_ref))?;
        let next = self.file.state.on_record()?;
        let op = self.file.dead_letters[i].op.clone();
        self.inventory
            .record(op.event.clone(), None, Some(op.client_ref), op.recorded_at)?;

        self.file.dead_letters.remove(i);
        self.file.pending.push(op.clone());
        self.file.state = next;
        self.save()?;
        Ok(op)
    }

    // tmp file + rename, same as the node's user registry
    fn save(&self) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec_pretty(&self.file)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Builds the local projection: the baseline as-is, then the queue through
/// the Balance Engine. Queued operations the baseline no longer supports are
/// kept; the node has the final say.
fn project(baseline: &[LedgerEntry], pending: &[PendingOp]) -> Result<Inventory, CacheError> {
    let store = LedgerStore::from_entries(baseline.iter().cloned())?;
    let mut inventory = Inventory::from_store(store);
    for op in pending {
        if let Err(e) = inventory.record(op.event.clone(), None, Some(op.client_ref), op.recorded_at) {
            tracing::warn!("Pending {} {} no longer applies locally: {}", op.event.kind(), op.client_ref, e);
        }
    }
    Ok(inventory)
}
