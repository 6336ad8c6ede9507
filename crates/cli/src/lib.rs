// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Offline client for a MAMS node: local cache, sync reconciler and commands.

pub mod cache;
pub mod client;
pub mod commands;
pub mod sync;
