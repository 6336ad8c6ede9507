// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Session tokens: `hex(json claims).hex(blake3 keyed mac)`.

use chrono::{DateTime, Utc};
use mams_kernel::types::{ActorId, Role};
use serde::{Deserialize, Serialize};

use crate::auth::AuthError;

const KEY_CONTEXT: &str = "mams-node 2025-01 session token";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: ActorId,
    pub username: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

pub struct TokenSigner {
    key: [u8; 32],
    ttl_secs: i64,
}

impl TokenSigner {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            key: blake3::derive_key(KEY_CONTEXT, secret.as_bytes()),
            ttl_secs,
        }
    }

    pub fn issue(&self, id: ActorId, username: &str, role: Role, now: DateTime<Utc>) -> Result<String, AuthError> {
        let iat = now.timestamp();
        let claims = Claims {
            id,
            username: username.to_string(),
            role,
            iat,
            exp: iat.saturating_add(self.ttl_secs),
        };
        let payload = serde_json::to_vec(&claims)?;
        let mac = blake3::keyed_hash(&self.key, &payload);
        Ok(format!("{}.{}", hex::encode(&payload), mac.to_hex()))
    }

    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let (payload_hex, mac_hex) = token.split_once('.').ok_or(AuthError::InvalidToken)?;
        let payload = hex::decode(payload_hex).map_err(|_| AuthError::InvalidToken)?;
        let provided = blake3::Hash::from_hex(mac_hex).map_err(|_| AuthError::InvalidToken)?;

        // constant-time comparison
        if blake3::keyed_hash(&self.key, &payload) != provided {
            return Err(AuthError::InvalidToken);
        }

        let claims: Claims = serde_json::from_slice(&payload).map_err(|_| AuthError::InvalidToken)?;
        if claims.exp <= now.timestamp() {
            return Err(AuthError::Expired);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn signer() -> TokenSigner {
        TokenSigner::new("test-secret", 60)
    }

    #[test]
    fn test_issue_and_verify() {
        let now = Utc::now();
        let id = ActorId::generate();
        let token = signer().issue(id, "alice", Role::LogisticsOfficer, now).unwrap();
        let claims = signer().verify(&token, now).unwrap();
        assert_eq!(claims.id, id);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, Role::LogisticsOfficer);
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let now = Utc::now();
        let token = signer().issue(ActorId::generate(), "alice", Role::BaseCommander, now).unwrap();
        let (_, mac) = token.split_once('.').unwrap();

        let forged = serde_json::json!({
            "id": ActorId::generate(),
            "username": "alice",
            "role": "Admin",
            "iat": now.timestamp(),
            "exp": now.timestamp() + 60,
        });
        let forged = format!("{}.{}", hex::encode(forged.to_string()), mac);
        assert!(matches!(signer().verify(&forged, now), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_other_secret_rejected() {
        let now = Utc::now();
        let token = signer().issue(ActorId::generate(), "bob", Role::Admin, now).unwrap();
        let other = TokenSigner::new("another-secret", 60);
        assert!(matches!(other.verify(&token, now), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_expired_rejected() {
        let now = Utc::now();
        let token = signer().issue(ActorId::generate(), "bob", Role::Admin, now).unwrap();
        let later = now + Duration::seconds(61);
        assert!(matches!(signer().verify(&token, later), Err(AuthError::Expired)));
    }

    #[test]
    fn test_garbage_rejected() {
        let now = Utc::now();
        assert!(signer().verify("", now).is_err());
        assert!(signer().verify("abc", now).is_err());
        assert!(signer().verify("zz.zz", now).is_err());
    }
}
