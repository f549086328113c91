// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tenant authentication.
//!
//! Bearer tokens are stored hashed; the extractor resolves the hash to a
//! `(tenant, project)` identity. Denials are logged as security events.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sha2::{Digest, Sha256};
use sc_store::TokenIdentity;

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub identity: TokenIdentity,
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(ApiError::unauthorized)?;
        let token = header.strip_prefix("Bearer ").ok_or_else(ApiError::unauthorized)?;
        if token.is_empty() {
            return Err(ApiError::unauthorized());
        }

        let identity = state
            .store
            .identity_for_token_hash(&hash_token(token))
            .await
            .map_err(ApiError::internal)?;
        match identity {
            Some(identity) => Ok(AuthContext { identity }),
            None => {
                state.audit.record(
                    "invalid_token",
                    None,
                    format!("unknown API token on {}", parts.uri.path()),
                );
                Err(ApiError::unauthorized())
            }
        }
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
