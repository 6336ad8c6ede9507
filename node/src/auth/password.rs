// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Salted password hashes.
//!
//! Stored form: `hex(salt)$hex(hash)`, where the hash is Argon2id (default
//! parameters) over the password with a random 16-byte salt. Hashing is slow
//! on purpose, so handlers go through the `*_blocking` wrappers.

use argon2::Argon2;
use rand::RngCore;

use crate::auth::AuthError;

const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    let hash = derive(&salt, password)?;
    Ok(format!("{}${}", hex::encode(salt), hex::encode(hash)))
}

/// Constant-time check of `password` against a stored hash. Malformed
/// stored values never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, hash_hex)) = stored.split_once('$') else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (hex::decode(salt_hex), hex::decode(hash_hex)) else {
        return false;
    };
    let Ok(expected) = <[u8; HASH_LEN]>::try_from(expected.as_slice()) else {
        return false;
    };
    match derive(&salt, password) {
        // blake3::Hash equality is constant-time
        Ok(actual) => blake3::Hash::from(actual) == blake3::Hash::from(expected),
        Err(_) => false,
    }
}

fn derive(salt: &[u8], password: &str) -> Result<[u8; HASH_LEN], AuthError> {
    let mut out = [0u8; HASH_LEN];
    Argon2::default()
        .hash_password_into(password.as_bytes(), salt, &mut out)
        .map_err(|e| AuthError::Hashing(e.to_string()))?;
    Ok(out)
}

/// [`hash_password`] on the blocking pool.
pub async fn hash_password_blocking(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
}

/// [`verify_password`] on the blocking pool.
pub async fn verify_password_blocking(password: String, stored: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))
}
