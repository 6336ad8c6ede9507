// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! mams-kernel: a deterministic inventory ledger for military asset tracking.
//!
//! The kernel owns the domain and nothing else: no I/O, no clocks, no
//! transport. Callers hand it events and timestamps; it hands back ledger
//! state, metrics and access decisions.

pub mod config;
pub mod error;
pub mod types;
pub mod event;
pub mod filter;
pub mod ledger;
pub mod event_log;
pub mod engine;
pub mod metrics;
pub mod access;
pub mod replay;

#[cfg(test)]
pub mod tests;
