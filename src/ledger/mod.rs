// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Asset Ledger Store.

pub mod entry;
pub mod store;

pub use entry::{LedgerDelta, LedgerEntry, LedgerKey};
pub use store::LedgerStore;
