// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Secret variable encryption.
//!
//! AES-256-GCM under a per-project key derived from the master key
//! (`SC_SECRETS_KEY`, 32 bytes base64). Stored form is
//! `base64(nonce || ciphertext)`.

use crate::error::StoreError;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use sha2::{Digest, Sha256};
use uuid::Uuid;

const NONCE_LEN: usize = 12;

/// Project-scoped secret cipher.
#[derive(Clone)]
pub struct SecretCipher {
    master: [u8; 32],
}

impl SecretCipher {
    pub fn from_base64(key_b64: &str) -> Result<Self, StoreError> {
        let bytes = B64
            .decode(key_b64.trim())
            .map_err(|e| StoreError::SecretsKey(e.to_string()))?;
        let master: [u8; 32] = bytes
            .try_into()
            .map_err(|_| StoreError::SecretsKey("key must be 32 bytes".to_string()))?;
        Ok(Self { master })
    }

    /// Derive the per-project key. Project id is mixed in so a leaked
    /// ciphertext cannot be replayed under another project.
    fn project_key(&self, project_id: Uuid) -> Key<Aes256Gcm> {
        let mut hasher = Sha256::new();
        hasher.update(self.master);
        hasher.update(project_id.as_bytes());
        let digest = hasher.finalize();
        Key::<Aes256Gcm>::clone_from_slice(&digest)
    }

    pub fn encrypt(&self, project_id: Uuid, plaintext: &str) -> Result<String, StoreError> {
        let cipher = Aes256Gcm::new(&self.project_key(project_id));
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| StoreError::SecretDecrypt("encrypt".to_string()))?;
        let mut blob = nonce.to_vec();
        blob.extend_from_slice(&ciphertext);
        Ok(B64.encode(blob))
    }

    pub fn decrypt(&self, project_id: Uuid, stored: &str) -> Result<String, StoreError> {
        let blob = B64
            .decode(stored)
            .map_err(|_| StoreError::SecretDecrypt("base64".to_string()))?;
        if blob.len() <= NONCE_LEN {
            return Err(StoreError::SecretDecrypt("blob too short".to_string()));
        }
        let (nonce, ciphertext) = blob.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new(&self.project_key(project_id));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| StoreError::SecretDecrypt("auth".to_string()))?;
        String::from_utf8(plaintext).map_err(|_| StoreError::SecretDecrypt("utf8".to_string()))
    }
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretCipher(<redacted>)")
    }
}

#[cfg(test)]
#[path = "secrets_tests.rs"]
mod tests;
