// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::key::EntityKind;
use std::io::Write as _;

fn key_for_run(run: Uuid, filename: &str) -> ArtifactKey {
    ArtifactKey::new(EntityKind::Run, Uuid::new_v4(), Uuid::new_v4(), run, filename)
}

#[tokio::test]
async fn put_and_signed_read() {
    let sink = MemorySink::new();
    let key = key_for_run(Uuid::new_v4(), "report.json");
    let url = sink.put(&key, Bytes::from_static(b"{}")).await.unwrap();
    assert!(url.starts_with("memory://run/"));

    let signed = sink.signed_read(&key, Duration::from_secs(600)).await.unwrap();
    assert!(signed.contains("ttl=600"));
}

#[tokio::test]
async fn signed_read_of_missing_object_fails() {
    let sink = MemorySink::new();
    let key = key_for_run(Uuid::new_v4(), "nope.txt");
    assert!(sink.signed_read(&key, Duration::from_secs(1)).await.is_err());
}

#[tokio::test]
async fn per_file_ceiling_is_enforced() {
    let sink = MemorySink::with_limits(SinkLimits {
        max_file_bytes: 4,
        max_run_total_bytes: 1024,
    });
    let key = key_for_run(Uuid::new_v4(), "big.bin");
    let err = sink.put(&key, Bytes::from_static(b"12345")).await.unwrap_err();
    assert!(matches!(err, ArtifactError::FileTooLarge { .. }));
}

#[tokio::test]
async fn per_run_total_is_enforced() {
    let sink = MemorySink::with_limits(SinkLimits {
        max_file_bytes: 64,
        max_run_total_bytes: 10,
    });
    let run = Uuid::new_v4();
    sink.put(&key_for_run(run, "a.txt"), Bytes::from_static(b"123456")).await.unwrap();
    let err = sink
        .put(&key_for_run(run, "b.txt"), Bytes::from_static(b"123456"))
        .await
        .unwrap_err();
    assert!(matches!(err, ArtifactError::RunTotalExceeded { .. }));

    // A different run has its own budget.
    sink.put(&key_for_run(Uuid::new_v4(), "c.txt"), Bytes::from_static(b"123456"))
        .await
        .unwrap();
}

#[tokio::test]
async fn put_file_reads_from_disk() {
    let sink = MemorySink::new();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("screenshot.png");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(b"png-bytes").unwrap();

    let key = key_for_run(Uuid::new_v4(), "screenshot.png");
    sink.put_file(&key, &path).await.unwrap();
    assert_eq!(sink.object(&key).unwrap(), Bytes::from_static(b"png-bytes"));
}
