// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Identity: user registry, password hashing, session tokens and the gate
//! that turns request credentials into an [`Actor`](mams_kernel::access::Actor).

use axum::http::StatusCode;
use thiserror::Error;

pub mod gate;
pub mod password;
pub mod token;
pub mod users;

pub use gate::AuthGate;
pub use token::{Claims, TokenSigner};
pub use users::{UserRecord, UserStore};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingCredentials,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    Expired,
    #[error("Invalid username or password")]
    BadCredentials,
    #[error("Invalid admin tool key")]
    InvalidToolKey,
    #[error("Username '{0}' is already taken")]
    UsernameTaken(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("User store error: {0}")]
    Io(#[from] std::io::Error),
    #[error("User store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingCredentials
            | AuthError::InvalidToken
            | AuthError::Expired
            | AuthError::BadCredentials
            | AuthError::InvalidToolKey => StatusCode::UNAUTHORIZED,
            AuthError::UsernameTaken(_) => StatusCode::CONFLICT,
            AuthError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AuthError::Io(_) | AuthError::Corrupt(_) | AuthError::Hashing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
