// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Credential resolution for the two gate modes.
//!
//! - Strict: a valid bearer token is required.
//! - Tool: a bearer token, or the configured admin tool key. Without a
//!   configured key the tool mode is exactly as strict as strict mode.

use chrono::{DateTime, Utc};
use mams_kernel::access::Actor;

use crate::auth::token::TokenSigner;
use crate::auth::AuthError;

pub const ADMIN_TOOL_HEADER: &str = "x-admin-tool-key";

pub struct AuthGate {
    signer: TokenSigner,
    tool_key: Option<blake3::Hash>,
}

impl AuthGate {
    pub fn new(signer: TokenSigner, tool_key: Option<&str>) -> Self {
        Self {
            signer,
            tool_key: tool_key.map(|key| blake3::hash(key.as_bytes())),
        }
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    pub fn strict(&self, bearer: Option<&str>, now: DateTime<Utc>) -> Result<Actor, AuthError> {
        let token = bearer.ok_or(AuthError::MissingCredentials)?;
        let claims = self.signer.verify(token, now)?;
        Ok(Actor::session(claims.id, claims.username, claims.role))
    }

    pub fn tool(
        &self,
        bearer: Option<&str>,
        tool_key: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Actor, AuthError> {
        if bearer.is_some() {
            return self.strict(bearer, now);
        }
        match (tool_key, &self.tool_key) {
            (None, _) => Err(AuthError::MissingCredentials),
            (Some(_), None) => Err(AuthError::InvalidToolKey),
            // hashed so the comparison is constant-time
            (Some(provided), Some(expected)) if blake3::hash(provided.as_bytes()) == *expected => {
                Ok(Actor::admin_tool())
            }
            (Some(_), Some(_)) => Err(AuthError::InvalidToolKey),
        }
    }
}
