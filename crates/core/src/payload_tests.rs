// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::run::RunId;

fn payload_with_secrets() -> RunPayload {
    let mut p = RunPayload::new(RunId::generate(), TestType::Browser, "console.log('hi')");
    p.vars.insert("BASE_URL".to_string(), "https://example.com".to_string());
    p.secrets.insert("API_KEY".to_string(), "sk-very-secret".to_string());
    p
}

#[test]
fn debug_never_prints_secret_values() {
    let p = payload_with_secrets();
    let dbg = format!("{p:?}");
    assert!(!dbg.contains("sk-very-secret"), "secret leaked into Debug: {dbg}");
    assert!(!dbg.contains("console.log"), "script body leaked into Debug");
    assert!(dbg.contains("redacted"));
}

#[test]
fn child_env_merges_vars_and_secrets() {
    let p = payload_with_secrets();
    let env = p.child_env();
    assert!(env.contains(&("BASE_URL".to_string(), "https://example.com".to_string())));
    assert!(env.contains(&("API_KEY".to_string(), "sk-very-secret".to_string())));
}

#[test]
fn secrets_override_vars_on_collision() {
    let mut p = payload_with_secrets();
    p.vars.insert("API_KEY".to_string(), "plaintext-shadow".to_string());
    let env = p.child_env();
    let value = env.iter().find(|(k, _)| k == "API_KEY").map(|(_, v)| v.as_str());
    assert_eq!(value, Some("sk-very-secret"));
}

#[test]
fn payload_roundtrips_through_json() {
    let p = payload_with_secrets();
    let wire = serde_json::to_string(&p).unwrap();
    let back: RunPayload = serde_json::from_str(&wire).unwrap();
    assert_eq!(back.run_id, p.run_id);
    assert_eq!(back.script, p.script);
    assert_eq!(back.secrets, p.secrets);
}
