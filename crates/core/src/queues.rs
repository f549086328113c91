// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue naming scheme.
//!
//! Each execution kind owns its own queue, further parameterized by region:
//! `{playwright|k6|monitor}-exec-{region}`. Scheduler queues, the template
//! render queue, and the data-lifecycle cleanup queue are region-less.

use crate::event::EventCategory;
use crate::location::Location;
use serde::{Deserialize, Serialize};

/// Status-page template render queue (consumed by an external collaborator).
pub const TEMPLATE_RENDER_QUEUE: &str = "template-render";

/// Retention sweep queue.
pub const DATA_LIFECYCLE_QUEUE: &str = "data-lifecycle";

/// Execution kind — selects the runner and the queue family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecKind {
    Playwright,
    K6,
    Monitor,
}

crate::simple_display! {
    ExecKind {
        Playwright => "playwright",
        K6 => "k6",
        Monitor => "monitor",
    }
}

impl ExecKind {
    pub const ALL: [ExecKind; 3] = [ExecKind::Playwright, ExecKind::K6, ExecKind::Monitor];

    pub fn parse(s: &str) -> Option<ExecKind> {
        match s {
            "playwright" => Some(ExecKind::Playwright),
            "k6" => Some(ExecKind::K6),
            "monitor" => Some(ExecKind::Monitor),
            _ => None,
        }
    }
}

/// A parsed queue name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueueName {
    /// `{kind}-exec-{region}` — the region-routed execution queues.
    Exec { kind: ExecKind, region: Location },
    /// `{kind}-scheduler` — cron-driven enqueue sources.
    Scheduler { kind: ExecKind },
    /// `template-render`
    TemplateRender,
    /// `data-lifecycle`
    DataLifecycle,
}

impl QueueName {
    pub fn exec(kind: ExecKind, region: Location) -> QueueName {
        QueueName::Exec { kind, region }
    }

    pub fn scheduler(kind: ExecKind) -> QueueName {
        QueueName::Scheduler { kind }
    }

    /// All execution queues for a given kind, one per concrete region.
    pub fn exec_all_regions(kind: ExecKind) -> Vec<QueueName> {
        Location::REGIONS.iter().map(|r| QueueName::exec(kind, *r)).collect()
    }

    /// Parse a queue name string back into its structured form.
    pub fn parse(name: &str) -> Option<QueueName> {
        match name {
            TEMPLATE_RENDER_QUEUE => return Some(QueueName::TemplateRender),
            DATA_LIFECYCLE_QUEUE => return Some(QueueName::DataLifecycle),
            _ => {}
        }
        if let Some(kind) = name.strip_suffix("-scheduler").and_then(ExecKind::parse) {
            return Some(QueueName::Scheduler { kind });
        }
        let (kind_str, rest) = name.split_once("-exec-")?;
        let kind = ExecKind::parse(kind_str)?;
        let region = Location::parse(rest)?;
        Some(QueueName::Exec { kind, region })
    }

    /// Event category surfaced to SSE subscribers: execution queues carry
    /// test events, everything else is job plumbing.
    pub fn category(&self) -> EventCategory {
        match self {
            QueueName::Exec { .. } => EventCategory::Test,
            _ => EventCategory::Job,
        }
    }

    pub fn as_string(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueName::Exec { kind, region } => write!(f, "{kind}-exec-{region}"),
            QueueName::Scheduler { kind } => write!(f, "{kind}-scheduler"),
            QueueName::TemplateRender => f.write_str(TEMPLATE_RENDER_QUEUE),
            QueueName::DataLifecycle => f.write_str(DATA_LIFECYCLE_QUEUE),
        }
    }
}

#[cfg(test)]
#[path = "queues_tests.rs"]
mod tests;
