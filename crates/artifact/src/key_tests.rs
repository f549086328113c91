// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn object_key_layout() {
    let key = ArtifactKey::new(
        EntityKind::Run,
        Uuid::nil(),
        Uuid::nil(),
        Uuid::nil(),
        "trace.zip",
    );
    assert_eq!(
        key.object_key(),
        format!("run/{0}/{0}/{0}/trace.zip", Uuid::nil())
    );
}

#[test]
fn filenames_are_sanitized() {
    let key = ArtifactKey::new(
        EntityKind::Report,
        Uuid::nil(),
        Uuid::nil(),
        Uuid::nil(),
        "../../etc/passwd",
    );
    assert!(!key.filename.contains(".."));
    assert!(!key.filename.contains('/'));
}

#[test]
fn empty_filename_gets_a_default() {
    let key = ArtifactKey::new(EntityKind::Run, Uuid::nil(), Uuid::nil(), Uuid::nil(), "");
    assert_eq!(key.filename, "artifact");
}
