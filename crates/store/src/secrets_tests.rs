// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;

fn cipher() -> SecretCipher {
    SecretCipher::from_base64(&B64.encode([7u8; 32])).unwrap()
}

#[test]
fn roundtrip() {
    let c = cipher();
    let project = Uuid::new_v4();
    let stored = c.encrypt(project, "hunter2").unwrap();
    assert_ne!(stored, "hunter2");
    assert_eq!(c.decrypt(project, &stored).unwrap(), "hunter2");
}

#[test]
fn nonces_differ_per_encryption() {
    let c = cipher();
    let project = Uuid::new_v4();
    let a = c.encrypt(project, "same").unwrap();
    let b = c.encrypt(project, "same").unwrap();
    assert_ne!(a, b);
}

#[test]
fn ciphertext_is_project_scoped() {
    let c = cipher();
    let stored = c.encrypt(Uuid::new_v4(), "scoped").unwrap();
    let err = c.decrypt(Uuid::new_v4(), &stored);
    assert!(err.is_err(), "decrypting under another project must fail");
}

#[test]
fn rejects_malformed_blobs() {
    let c = cipher();
    let project = Uuid::new_v4();
    assert!(c.decrypt(project, "not-base64!!!").is_err());
    assert!(c.decrypt(project, &B64.encode([0u8; 4])).is_err());
}

#[test]
fn rejects_bad_master_keys() {
    assert!(SecretCipher::from_base64("short").is_err());
    assert!(SecretCipher::from_base64(&B64.encode([1u8; 16])).is_err());
}

#[test]
fn debug_is_redacted() {
    assert_eq!(format!("{:?}", cipher()), "SecretCipher(<redacted>)");
}
