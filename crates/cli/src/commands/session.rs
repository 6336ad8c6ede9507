// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::path::Path;

use mams_kernel::types::Role;

use crate::cache::{LocalCache, Session};
use crate::client::HttpSink;

pub async fn register(server: &str, username: &str, password: &str, role: &str) -> anyhow::Result<()> {
    // fail fast on a typo instead of a round trip
    let role: Role = role.parse().map_err(anyhow::Error::msg)?;
    let user = HttpSink::new(server, None)
        .register(username, password, role.as_str())
        .await?;
    println!("Registered {} ({}) with id {}", user.username, user.role, user.id);
    Ok(())
}

pub async fn login(cache_path: &Path, server: &str, username: &str, password: &str) -> anyhow::Result<()> {
    let mut cache = LocalCache::open(cache_path)?;
    let reply = HttpSink::new(server, None).login(username, password).await?;
    cache.set_session(Some(Session {
        username: reply.user.username.clone(),
        role: reply.user.role.clone(),
        token: reply.token,
    }))?;
    println!("Logged in as {} ({})", reply.user.username, reply.user.role);
    Ok(())
}

pub fn logout(cache_path: &Path) -> anyhow::Result<()> {
    let mut cache = LocalCache::open(cache_path)?;
    cache.set_session(None)?;
    if !cache.pending().is_empty() {
        println!("{} operations are still queued; they will sync after the next login", cache.pending().len());
    }
    println!("Logged out");
    Ok(())
}
