//! Reading and normalizing the YAML task list.

use std::path::Path;

use {
    anyhow::{Context, Result},
    serde_yaml::Value,
    tracing::debug,
};

use napcron_runner::types::{Cadence, TaskSpec};

/// Read and normalize a config file into the flat task list the runner
/// consumes, cadence-major in document order.
pub fn load_tasks(path: &Path) -> Result<Vec<TaskSpec>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_tasks(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

/// Normalize a YAML document. A document that is not valid YAML at all is
/// an error; anything merely malformed inside it is dropped.
pub fn parse_tasks(raw: &str) -> Result<Vec<TaskSpec>> {
    let doc: Value = serde_yaml::from_str(raw).context("invalid YAML")?;
    Ok(normalize(&doc))
}

fn normalize(doc: &Value) -> Vec<TaskSpec> {
    let mut tasks = Vec::new();
    let Value::Mapping(sections) = doc else {
        // Empty file or a non-mapping document: nothing to run.
        return tasks;
    };

    for (key, value) in sections {
        let Some(cadence) = key.as_str().and_then(Cadence::parse) else {
            debug!(?key, "dropping unknown cadence key");
            continue;
        };
        let Value::Sequence(entries) = value else {
            debug!(%cadence, "dropping non-list cadence section");
            continue;
        };
        for entry in entries {
            normalize_entry(cadence, entry, &mut tasks);
        }
    }
    tasks
}

/// One list entry: either a bare command string or a mapping whose keys
/// are commands and whose values are requirement declarations.
fn normalize_entry(cadence: Cadence, entry: &Value, out: &mut Vec<TaskSpec>) {
    match entry {
        Value::String(command) => out.push(TaskSpec {
            cadence,
            command: command.clone(),
            requires: Vec::new(),
        }),
        Value::Mapping(pairs) => {
            for (command, declared) in pairs {
                let Some(command) = command.as_str() else {
                    debug!(%cadence, "dropping entry with non-string command");
                    continue;
                };
                let Some(requires) = requirement_names(declared) else {
                    debug!(%cadence, command, "dropping entry with bad requirement shape");
                    continue;
                };
                out.push(TaskSpec {
                    cadence,
                    command: command.to_string(),
                    requires,
                });
            }
        }
        _ => debug!(%cadence, "dropping malformed entry"),
    }
}

/// Requirement declarations: null, a single name, or a list of names.
/// Names are lowercased; any other shape is malformed.
fn requirement_names(declared: &Value) -> Option<Vec<String>> {
    match declared {
        Value::Null => Some(Vec::new()),
        Value::String(one) => Some(vec![one.to_ascii_lowercase()]),
        Value::Sequence(list) => list
            .iter()
            .map(|item| Some(item.as_str()?.to_ascii_lowercase()))
            .collect(),
        _ => None,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_four_entry_forms() {
        let tasks = parse_tasks(
            "daily:\n\
             \x20 - bash a.sh:\n\
             \x20     - internet\n\
             \x20 - python a.py: internet\n\
             \x20 - ./just_run_me.sh\n\
             \x20 - ./also_okay:\n",
        )
        .unwrap();

        assert_eq!(tasks.len(), 4);
        assert_eq!(tasks[0].command, "bash a.sh");
        assert_eq!(tasks[0].requires, vec!["internet".to_string()]);
        assert_eq!(tasks[1].requires, vec!["internet".to_string()]);
        assert!(tasks[2].requires.is_empty());
        assert!(tasks[3].requires.is_empty());
        assert!(tasks.iter().all(|t| t.cadence == Cadence::Daily));
    }

    #[test]
    fn test_requirement_list_form() {
        let tasks = parse_tasks("weekly:\n  - ./cleanup_logs.sh: [internet, AC_POWER]\n").unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].cadence, Cadence::Weekly);
        assert_eq!(
            tasks[0].requires,
            vec!["internet".to_string(), "ac_power".to_string()]
        );
    }

    #[test]
    fn test_unknown_cadence_is_dropped() {
        let tasks = parse_tasks("fortnightly:\n  - echo nope\ndaily:\n  - echo yes\n").unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].command, "echo yes");
    }

    #[test]
    fn test_cadence_keys_are_case_insensitive() {
        let tasks = parse_tasks("Daily:\n  - echo hi\n").unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].cadence, Cadence::Daily);
    }

    #[test]
    fn test_non_list_section_is_dropped() {
        let tasks = parse_tasks("daily: not a list\nweekly:\n  - echo ok\n").unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].cadence, Cadence::Weekly);
    }

    #[test]
    fn test_bad_requirement_shape_is_dropped() {
        let tasks = parse_tasks("daily:\n  - echo hi: {nested: wrong}\n  - echo ok\n").unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].command, "echo ok");
    }

    #[test]
    fn test_multi_key_mapping_yields_one_task_per_command() {
        let tasks = parse_tasks("daily:\n  - echo one: internet\n    echo two:\n").unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].command, "echo one");
        assert_eq!(tasks[1].command, "echo two");
    }

    #[test]
    fn test_empty_document_is_empty_task_list() {
        assert!(parse_tasks("").unwrap().is_empty());
        assert!(parse_tasks("daily:\n").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        assert!(parse_tasks("daily: [unclosed").is_err());
    }
}
