//! Per-operation success/failure tallies

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Operations run by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Backup,
    ManualBackup,
    Restore,
    Save,
    StateRestore,
    Autostop,
    Autostart,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backup => "backup",
            Self::ManualBackup => "manual_backup",
            Self::Restore => "restore",
            Self::Save => "save",
            Self::StateRestore => "state_restore",
            Self::Autostop => "autostop",
            Self::Autostart => "autostart",
        }
    }

    /// Event sent before the operation starts work
    pub fn pre_event(&self) -> String {
        format!("pre_{}", self.as_str())
    }

    /// Event sent after the operation completes
    pub fn post_event(&self) -> String {
        format!("post_{}", self.as_str())
    }

    /// Event sent when an item or the whole operation fails
    pub fn failed_event(&self) -> String {
        format!("{}_failed", self.as_str())
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result for one volume, archive or container
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemOutcome {
    pub item: String,
    pub error: Option<String>,
}

impl ItemOutcome {
    pub fn success(item: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            error: None,
        }
    }

    pub fn failure(item: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Tally of a completed operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationReport {
    pub operation: Operation,
    pub succeeded: usize,
    pub failed: usize,
    /// Archives removed by rotation
    pub evicted: Vec<PathBuf>,
    pub outcomes: Vec<ItemOutcome>,
}

impl OperationReport {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            succeeded: 0,
            failed: 0,
            evicted: Vec::new(),
            outcomes: Vec::new(),
        }
    }

    pub fn record_success(&mut self, item: impl Into<String>) {
        self.succeeded += 1;
        self.outcomes.push(ItemOutcome::success(item));
    }

    pub fn record_failure(&mut self, item: impl Into<String>, error: impl ToString) {
        self.failed += 1;
        self.outcomes.push(ItemOutcome::failure(item, error.to_string()));
    }

    pub fn record_outcome(&mut self, outcome: ItemOutcome) {
        if outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.outcomes.push(outcome);
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// One-line summary, e.g. `backup: 3 succeeded, 1 failed, 2 evicted`
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{}: {} succeeded, {} failed",
            self.operation, self.succeeded, self.failed
        );
        if !self.evicted.is_empty() {
            line.push_str(&format!(", {} evicted", self.evicted.len()));
        }
        line
    }
}
