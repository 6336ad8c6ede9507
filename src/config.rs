// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Configuration constants.

/// Largest quantity a single event may carry. Anything above is treated as
/// a corrupted value (a timestamp pasted into a quantity field, typically).
pub const MAX_EVENT_QUANTITY: u64 = 10_000_000;

/// Validity window of a session token (7 days).
pub const SESSION_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Assignee recorded when a caller omits one.
pub const UNKNOWN_ASSIGNEE: &str = "Unknown";
