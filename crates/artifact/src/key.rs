// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic object keys.

use uuid::Uuid;

/// Which bucket family an object belongs to. Retention is policy-driven
/// per bucket, which is why entity types do not share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Run,
    Report,
}

sc_core::simple_display! {
    EntityKind {
        Run => "run",
        Report => "report",
    }
}

/// Fully-qualified artifact location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    pub entity: EntityKind,
    pub tenant_id: Uuid,
    pub project_id: Uuid,
    pub entity_id: Uuid,
    pub filename: String,
}

impl ArtifactKey {
    pub fn new(
        entity: EntityKind,
        tenant_id: Uuid,
        project_id: Uuid,
        entity_id: Uuid,
        filename: impl Into<String>,
    ) -> Self {
        Self { entity, tenant_id, project_id, entity_id, filename: sanitize(filename.into()) }
    }

    /// `<entity-type>/<tenant>/<project>/<entity>/<filename>`
    pub fn object_key(&self) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.entity, self.tenant_id, self.project_id, self.entity_id, self.filename
        )
    }
}

impl std::fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.object_key())
    }
}

/// Strip path separators and parent references from user-influenced names.
fn sanitize(name: String) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    let cleaned = cleaned.replace("..", "_");
    if cleaned.is_empty() {
        "artifact".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
#[path = "key_tests.rs"]
mod tests;
