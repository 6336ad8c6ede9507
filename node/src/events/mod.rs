// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event-Sourced Persistence Layer
//!
//! # Architecture
//! - Event Log file = primary truth (append-only, durable)
//! - Inventory (kernel Event Log + Ledger Store) = projection, rebuilt by replay
//!
//! # Guarantees
//! - Records are fsync'd before they reach the ledger
//! - Crash-symmetric recovery via replay
//! - No partial commits

pub mod event_commit;
pub mod event_log;
pub mod event_replay;

pub use event_commit::{CommitResult, EventCommitter};
pub use event_log::{EventLogWriter, LogEntry};
pub use event_replay::recover_from_event_log;
