// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use mams_cli::cache::{LocalCache, PendingOp, SyncState};
use mams_cli::sync::{sync_cache, EventSink, Reconciler, SyncError, SyncPolicy};
use mams_kernel::event::{Assignment, LedgerEvent, Purchase, Transfer};
use mams_kernel::types::{EquipmentType, EventKind};
use uuid::Uuid;

/// Scripted sink: each quantity maps to the failures returned before success.
#[derive(Default)]
struct FakeSink {
    script: HashMap<u64, Vec<SyncError>>,
    calls: Mutex<Vec<(Uuid, u64)>>,
    stall: Option<Duration>,
}

impl FakeSink {
    fn failing(qty: u64, errors: Vec<SyncError>) -> Self {
        let mut sink = FakeSink::default();
        sink.script.insert(qty, errors);
        sink
    }

    fn attempts(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl EventSink for FakeSink {
    async fn push(&self, op: &PendingOp) -> Result<(), SyncError> {
        let qty = op.event.quantity();
        let attempt = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((op.client_ref, qty));
            calls.iter().filter(|(r, _)| *r == op.client_ref).count()
        };
        if let Some(stall) = self.stall {
            tokio::time::sleep(stall).await;
        }
        match self.script.get(&qty).and_then(|errs| errs.get(attempt - 1)) {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

fn policy(retries: u32) -> SyncPolicy {
    SyncPolicy {
        timeout: Duration::from_secs(5),
        retries,
        backoff: Duration::ZERO,
    }
}

fn purchase(qty: u64) -> LedgerEvent {
    LedgerEvent::Purchase(Purchase {
        base: "Base Alpha".to_string(),
        equipment_type: EquipmentType::Weapons,
        quantity: qty,
        vendor: None,
        cost: None,
        date: Utc::now(),
        notes: None,
    })
}

fn transfer(qty: u64) -> LedgerEvent {
    LedgerEvent::Transfer(Transfer {
        from_base: "Base Alpha".to_string(),
        to_base: "Base Beta".to_string(),
        equipment_type: EquipmentType::Weapons,
        quantity: qty,
        date: Utc::now(),
        notes: None,
    })
}

fn op(event: LedgerEvent) -> PendingOp {
    PendingOp {
        client_ref: Uuid::new_v4(),
        recorded_at: Utc::now(),
        event,
    }
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    // 1. Two transport errors, then success within a budget of 2 retries
    let sink = FakeSink::failing(
        5,
        vec![SyncError::Transport("reset".into()), SyncError::Transport("reset".into())],
    );
    let reconciler = Reconciler::new(sink, policy(2));

    let report = reconciler.reconcile(&[op(purchase(5))]).await;
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(reconciler.sink().attempts(), 3);
}

#[tokio::test]
async fn test_rejections_are_not_retried() {
    let rejected = SyncError::Rejected {
        status: 409,
        message: "insufficient stock".into(),
    };
    let sink = FakeSink::failing(7, vec![rejected.clone()]);
    let reconciler = Reconciler::new(sink, policy(3));

    // 1. The rejected op fails once; the batch carries on
    let ops = [op(purchase(7)), op(transfer(2)), op(purchase(1))];
    let report = reconciler.reconcile(&ops).await;

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.first_error, Some(rejected.to_string()));
    assert_eq!(report.by_kind.get(&EventKind::Purchase), Some(&1));
    assert_eq!(report.by_kind.get(&EventKind::Transfer), Some(&1));
    assert_eq!(report.acknowledged, vec![ops[1].client_ref, ops[2].client_ref]);
    assert_eq!(report.rejected, vec![(ops[0].client_ref, rejected.to_string())]);
    assert_eq!(reconciler.sink().attempts(), 3);
}

#[tokio::test]
async fn test_retry_budget_runs_out() {
    let down = SyncError::Server {
        status: 503,
        message: "unavailable".into(),
    };
    let sink = FakeSink::failing(4, vec![down.clone(), down.clone(), down.clone()]);
    let reconciler = Reconciler::new(sink, policy(1));

    let report = reconciler.reconcile(&[op(purchase(4))]).await;
    assert_eq!(report.failed, 1);
    assert!(report.rejected.is_empty(), "Server errors stay retryable");
    assert_eq!(reconciler.sink().attempts(), 2);
}

#[tokio::test]
async fn test_slow_sink_times_out() {
    let sink = FakeSink {
        stall: Some(Duration::from_millis(200)),
        ..FakeSink::default()
    };
    let reconciler = Reconciler::new(
        sink,
        SyncPolicy {
            timeout: Duration::from_millis(20),
            retries: 0,
            backoff: Duration::ZERO,
        },
    );

    let report = reconciler.reconcile(&[op(purchase(1))]).await;
    assert_eq!(report.failed, 1);
    assert!(report.first_error.unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_sync_cache_settles_state() {
    let dir = tempfile::tempdir().unwrap();
    let mut cache = LocalCache::open(dir.path().join("cache.json")).unwrap();

    // 1. Queue three ops; the node is briefly down for the transfer
    cache.record(purchase(10), Utc::now()).unwrap();
    cache.record(transfer(3), Utc::now()).unwrap();
    cache.record(purchase(2), Utc::now()).unwrap();
    assert_eq!(cache.state(), SyncState::Dirty);

    let down = SyncError::Server {
        status: 503,
        message: "unavailable".into(),
    };
    let reconciler = Reconciler::new(FakeSink::failing(3, vec![down]), policy(0));

    // 2. First sync: partial, the transfer stays queued
    let report = sync_cache(&mut cache, &reconciler).await.unwrap();
    assert_eq!(report.succeeded, 2);
    assert!(report.rejected.is_empty());
    assert_eq!(cache.state(), SyncState::SyncFailed);
    assert_eq!(cache.pending().len(), 1);
    assert_eq!(cache.pending()[0].event.kind(), EventKind::Transfer);
    assert_eq!(cache.acknowledged(), 2);
    assert!(cache.last_error().unwrap().contains("unavailable"));

    // 3. Second sync against a healthy node clears the queue
    let healthy = Reconciler::new(FakeSink::default(), policy(0));
    let report = sync_cache(&mut cache, &healthy).await.unwrap();
    assert_eq!(report.succeeded, 1);
    assert_eq!(cache.state(), SyncState::Synced);
    assert!(cache.pending().is_empty());
    assert!(cache.last_error().is_none());

    // 4. Nothing left: a third sync is a no-op
    let report = sync_cache(&mut cache, &healthy).await.unwrap();
    assert!(report.is_empty());
    assert_eq!(cache.state(), SyncState::Synced);
}

#[tokio::test]
async fn test_synced_ops_still_back_local_validation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");
    {
        let mut cache = LocalCache::open(&path).unwrap();
        cache.record(purchase(50), Utc::now()).unwrap();
        let healthy = Reconciler::new(FakeSink::default(), policy(0));
        sync_cache(&mut cache, &healthy).await.unwrap();
    }

    // 1. Reopen and record something that depends on the pushed purchase
    let mut cache = LocalCache::open(&path).unwrap();
    assert_eq!(cache.inventory().store().entries().count(), 1);
    let assignment = LedgerEvent::Assignment(Assignment {
        base: "Base Alpha".to_string(),
        equipment_type: EquipmentType::Weapons,
        quantity: 5,
        assignee: "Sgt. Reyes".to_string(),
        date: Utc::now(),
        notes: None,
    });
    cache.record(assignment, Utc::now()).unwrap();
    assert_eq!(cache.inventory().store().entries().next().unwrap().quantity, 45);
}

#[tokio::test]
async fn test_rejected_op_is_dead_lettered() {
    let dir = tempfile::tempdir().unwrap();
    let mut cache = LocalCache::open(dir.path().join("cache.json")).unwrap();
    cache.record(purchase(10), Utc::now()).unwrap();
    let doomed = cache.record(transfer(3), Utc::now()).unwrap();

    let rejected = SyncError::Rejected {
        status: 400,
        message: "source base has no entry".into(),
    };
    let reconciler = Reconciler::new(FakeSink::failing(3, vec![rejected]), policy(2));

    // 1. Refused once, not retried, moved out of the queue
    let report = sync_cache(&mut cache, &reconciler).await.unwrap();
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(reconciler.sink().attempts(), 2);
    assert_eq!(cache.state(), SyncState::SyncFailed);
    assert!(cache.pending().is_empty());
    assert_eq!(cache.dead_letters()[0].op.client_ref, doomed.client_ref);
    assert!(cache.dead_letters()[0].error.contains("no entry"));

    // 2. Discarding the dead op settles the cache
    cache.discard(doomed.client_ref).unwrap();
    assert_eq!(cache.state(), SyncState::Synced);
    assert!(cache.dead_letters().is_empty());
}
