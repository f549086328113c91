// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Open-shape run metadata.
//!
//! Readers validate only the known fields and treat everything else as
//! opaque JSON that round-trips untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Metadata attached to a run at submission time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Where the run came from (e.g. "playground", "editor", "api").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Saved test this run executes, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Unknown fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RunMetadata {
    /// Parse from an arbitrary JSON value. Non-objects are rejected; known
    /// fields with the wrong shape are rejected; unknown fields pass through.
    pub fn from_value(value: Value) -> Result<RunMetadata, String> {
        if !value.is_object() {
            return Err("metadata must be a JSON object".to_string());
        }
        serde_json::from_value(value).map_err(|e| format!("invalid metadata: {e}"))
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_test_id(mut self, test_id: Uuid) -> Self {
        self.test_id = Some(test_id);
        self
    }
}

#[cfg(test)]
#[path = "metadata_tests.rs"]
mod tests;
