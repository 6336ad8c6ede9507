// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod config;
pub mod errors;
pub mod telemetry;
pub mod auth;
pub mod events;
pub mod engine;
pub mod api;
pub mod server;
