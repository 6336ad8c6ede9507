// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Registered users, persisted as `users.json`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use mams_kernel::types::{ActorId, Role};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::auth::AuthError;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: ActorId,
    pub username: String,
    pub role: Role,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

pub struct UserStore {
    path: PathBuf,
    users: BTreeMap<String, UserRecord>,
}

impl UserStore {
    /// Loads the registry at `path`; a missing file is an empty registry.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        let path = path.as_ref().to_path_buf();
        let users = match std::fs::read(&path) {
            Ok(bytes) => {
                let list: Vec<UserRecord> = serde_json::from_slice(&bytes)?;
                list.into_iter().map(|u| (u.username.clone(), u)).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, users })
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Fails if `username` is already registered.
    pub fn check_available(&self, username: &str) -> Result<(), AuthError> {
        if self.users.contains_key(username.trim()) {
            return Err(AuthError::UsernameTaken(username.trim().to_string()));
        }
        Ok(())
    }

    /// Adds a user whose password is already hashed and persists the registry.
    pub fn insert(
        &mut self,
        username: &str,
        password_hash: String,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<UserRecord, AuthError> {
        self.check_available(username)?;
        let user = UserRecord {
            id: ActorId::generate(),
            username: username.trim().to_string(),
            role,
            password_hash,
            created_at: now,
        };
        self.users.insert(user.username.clone(), user.clone());
        if let Err(e) = self.persist() {
            self.users.remove(&user.username);
            return Err(e);
        }
        Ok(user)
    }

    /// Unknown users are `BadCredentials`, same as a wrong password.
    pub fn find(&self, username: &str) -> Result<UserRecord, AuthError> {
        self.users
            .get(username.trim())
            .cloned()
            .ok_or(AuthError::BadCredentials)
    }

    // tmp file + rename
    fn persist(&self) -> Result<(), AuthError> {
        let list: Vec<&UserRecord> = self.users.values().collect();
        let bytes = serde_json::to_vec_pretty(&list)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn check_credentials(username: &str, password: &str) -> Result<(), AuthError> {
    if username.trim().is_empty() {
        return Err(AuthError::InvalidInput("username is required".to_string()));
    }
    if password.is_empty() {
        return Err(AuthError::InvalidInput("password is required".to_string()));
    }
    Ok(())
}

/// Registers a user. The registry lock is not held while hashing.
pub async fn register(
    users: &Mutex<UserStore>,
    username: &str,
    password: &str,
    role: Role,
    now: DateTime<Utc>,
) -> Result<UserRecord, AuthError> {
    check_credentials(username, password)?;
    users.lock().await.check_available(username)?;
    let password_hash = hash_password_blocking(password.to_string()).await?;
    // re-checked under the lock: a concurrent registration may have won
    users.lock().await.insert(username, password_hash, role, now)
}

/// Checks a username and password. The registry lock is not held while verifying.
pub async fn authenticate(users: &Mutex<UserStore>, username: &str, password: &str) -> Result<UserRecord, AuthError> {
    let user = users.lock().await.find(username)?;
    if !verify_password_blocking(password.to_string(), user.password_hash.clone()).await? {
        return Err(AuthError::BadCredentials);
    }
    Ok(user)
}
