//! In-process usage counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A started session, as seen by the usage counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionLogEntry {
    pub root: String,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate usage since process start. Nothing is persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageMetrics {
    pub total_sessions: u64,
    pub total_feedback: u64,
    pub total_nodes: u64,
    pub session_logs: Vec<SessionLogEntry>,
}

impl UsageMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a new session for `root`
    pub fn new_session(&mut self, root: impl Into<String>) {
        self.total_sessions += 1;
        self.session_logs.push(SessionLogEntry {
            root: root.into(),
            timestamp: Utc::now(),
        });
    }

    pub fn add_feedback(&mut self) {
        self.total_feedback += 1;
    }

    /// Count nodes of a generated tree
    pub fn add_nodes(&mut self, count: usize) {
        self.total_nodes += count as u64;
    }
}
