//! Core data types shared by the scheduler, the state store, and config
//! normalization.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

/// Control flag carried in a task's requirement list. It is consumed by the
/// due policy (retry immediately after a failure) and is never evaluated as
/// an environmental requirement.
pub const RERUN_ONFAIL: &str = "rerun_onfail";

/// How often a task re-runs. Each cadence maps to a fixed minimum interval
/// (see [`Cadence::interval`](crate::due)); there are no calendar semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Cadence {
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

impl Cadence {
    pub const ALL: [Cadence; 4] = [
        Cadence::Hourly,
        Cadence::Daily,
        Cadence::Weekly,
        Cadence::Monthly,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Cadence::Hourly => "hourly",
            Cadence::Daily => "daily",
            Cadence::Weekly => "weekly",
            Cadence::Monthly => "monthly",
        }
    }

    /// Case-insensitive lookup. Unknown names yield `None` so config
    /// normalization can drop them.
    #[must_use]
    pub fn parse(name: &str) -> Option<Cadence> {
        Cadence::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One configured task: a shell command plus the requirement names gating
/// it. Immutable once loaded for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub cadence: Cadence,
    pub command: String,
    pub requires: Vec<String>,
}

impl TaskSpec {
    /// Stable identity: cadence joined with the exact command text. This is
    /// the primary key into the state file.
    #[must_use]
    pub fn task_id(&self) -> String {
        format!("{}::{}", self.cadence, self.command)
    }

    #[must_use]
    pub fn rerun_onfail(&self) -> bool {
        self.requires.iter().any(|r| r == RERUN_ONFAIL)
    }
}

/// Persisted per-task record. Timestamps are RFC 3339 text rather than
/// parsed instants: a value that fails to parse later degrades to "no
/// reference, task is due" instead of poisoning the whole snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub frequency: String,
    pub cmd: String,
    pub last_success: Option<String>,
    pub last_attempt: Option<String>,
    pub last_status: Option<i32>,
    pub last_note: Option<String>,
}

/// The unit of persistence: every known task record under one container
/// key. `BTreeMap` keeps serialized keys sorted so the file diffs cleanly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateFile {
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskRecord>,
}

/// What a worker hands back to the controller. Workers never touch shared
/// state; these tuples are the only channel out of the parallel phase.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub task_id: String,
    pub status: i32,
    pub started: String,
    pub finished: String,
}

/// Summary of one scheduling pass.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// First non-zero task status seen, or 0. Becomes the process exit code.
    pub exit_code: i32,
    pub executed: usize,
    pub skipped_not_due: usize,
    pub skipped_requirements: usize,
    pub dry_run: bool,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cadence_parse_case_insensitive() {
        assert_eq!(Cadence::parse("daily"), Some(Cadence::Daily));
        assert_eq!(Cadence::parse("Weekly"), Some(Cadence::Weekly));
        assert_eq!(Cadence::parse("HOURLY"), Some(Cadence::Hourly));
        assert_eq!(Cadence::parse("fortnightly"), None);
    }

    #[test]
    fn test_task_id_is_cadence_and_exact_command() {
        let spec = TaskSpec {
            cadence: Cadence::Daily,
            command: "echo Task1".into(),
            requires: vec![],
        };
        assert_eq!(spec.task_id(), "daily::echo Task1");
    }

    #[test]
    fn test_rerun_onfail_flag_detection() {
        let spec = TaskSpec {
            cadence: Cadence::Daily,
            command: "x".into(),
            requires: vec!["internet".into(), RERUN_ONFAIL.into()],
        };
        assert!(spec.rerun_onfail());

        let spec = TaskSpec {
            cadence: Cadence::Daily,
            command: "x".into(),
            requires: vec!["internet".into()],
        };
        assert!(!spec.rerun_onfail());
    }

    #[test]
    fn test_record_roundtrip_preserves_nulls() {
        let record = TaskRecord {
            frequency: "daily".into(),
            cmd: "echo hi".into(),
            ..TaskRecord::default()
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"last_success\":null"));
        let back: TaskRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }

    #[test]
    fn test_state_file_missing_tasks_key_defaults_empty() {
        let state: StateFile = serde_json::from_str("{}").unwrap();
        assert!(state.tasks.is_empty());
    }
}
