//! Loading and schema-checking the source task document.
//!
//! The document is either `{ "tasks": [...] }` or a single-tag wrapper such
//! as `{ "master": { "tasks": [...] } }`. Schema checking walks the raw JSON
//! value so that every field violation is reported at once; only a document
//! that passes is deserialized into [`TaskDocument`].

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{Result, SyncError};
use crate::model::{Priority, Status, TaskDocument};

pub fn load_document(path: &Path) -> Result<TaskDocument> {
    let raw = fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => SyncError::InputNotFound(path.to_path_buf()),
        _ => SyncError::InputRead {
            path: path.to_path_buf(),
            source,
        },
    })?;
    parse_document(path, &raw)
}

pub fn parse_document(path: &Path, raw: &str) -> Result<TaskDocument> {
    let value: Value = serde_json::from_str(raw).map_err(|err| SyncError::InputMalformed {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;

    let value = unwrap_tagged(value);
    let violations = schema_violations(&value);
    if !violations.is_empty() {
        return Err(SyncError::InputSchema {
            path: path.to_path_buf(),
            violations,
        });
    }

    serde_json::from_value(value).map_err(|err| SyncError::InputSchema {
        path: path.to_path_buf(),
        violations: vec![err.to_string()],
    })
}

/// Apply the unwrap rule: top-level `tasks` wins, then a lone key whose value
/// holds `tasks`. Anything else is passed through untouched.
pub fn unwrap_tagged(value: Value) -> Value {
    let Value::Object(mut map) = value else {
        return value;
    };
    if map.contains_key("tasks") || map.len() != 1 {
        return Value::Object(map);
    }

    let nested_has_tasks = map
        .values()
        .next()
        .and_then(Value::as_object)
        .is_some_and(|inner| inner.contains_key("tasks"));
    if !nested_has_tasks {
        return Value::Object(map);
    }

    let key = map.keys().next().cloned().unwrap_or_default();
    map.remove(&key).unwrap_or(Value::Object(Map::new()))
}

fn schema_violations(value: &Value) -> Vec<String> {
    let mut violations = Vec::new();

    let Some(root) = value.as_object() else {
        violations.push("document: expected a JSON object".to_string());
        return violations;
    };
    let Some(tasks) = root.get("tasks") else {
        violations.push("tasks: required field is missing".to_string());
        return violations;
    };
    let Some(tasks) = tasks.as_array() else {
        violations.push("tasks: expected an array".to_string());
        return violations;
    };

    let mut seen_ids = HashSet::new();
    for (index, task) in tasks.iter().enumerate() {
        let at = format!("tasks[{index}]");
        let Some(task) = task.as_object() else {
            violations.push(format!("{at}: expected an object"));
            continue;
        };

        if let Some(id) = check_id(task, &at, &mut violations)
            && !seen_ids.insert(id)
        {
            violations.push(format!("{at}.id: duplicate task id {id}"));
        }
        check_title(task, &at, &mut violations);
        check_defaulted_string(task, "description", &at, &mut violations);
        check_status(task, &at, &mut violations);
        check_priority(task, &at, &mut violations);
        check_id_list(task, "dependencies", &at, &mut violations);
        check_complexity(task, &at, &mut violations);
        check_optional_string(task, "details", &at, &mut violations);
        check_optional_string(task, "testStrategy", &at, &mut violations);
        check_subtasks(task, &at, &mut violations);
    }

    violations
}

fn check_id(obj: &Map<String, Value>, at: &str, out: &mut Vec<String>) -> Option<u64> {
    match obj.get("id") {
        None => {
            out.push(format!("{at}.id: required field is missing"));
            None
        }
        Some(value) => {
            let id = value.as_u64();
            if id.is_none() {
                out.push(format!("{at}.id: expected a non-negative integer, got {value}"));
            }
            id
        }
    }
}

fn check_title(obj: &Map<String, Value>, at: &str, out: &mut Vec<String>) {
    match obj.get("title") {
        None => out.push(format!("{at}.title: required field is missing")),
        Some(Value::String(title)) if title.trim().is_empty() => {
            out.push(format!("{at}.title: must not be empty"));
        }
        Some(Value::String(_)) => {}
        Some(other) => out.push(format!("{at}.title: expected a string, got {other}")),
    }
}

fn check_optional_string(obj: &Map<String, Value>, field: &str, at: &str, out: &mut Vec<String>) {
    match obj.get(field) {
        None | Some(Value::Null) | Some(Value::String(_)) => {}
        Some(other) => out.push(format!("{at}.{field}: expected a string, got {other}")),
    }
}

/// Fields that default when absent but have no null form in the model.
fn check_defaulted_string(obj: &Map<String, Value>, field: &str, at: &str, out: &mut Vec<String>) {
    match obj.get(field) {
        None | Some(Value::String(_)) => {}
        Some(other) => out.push(format!("{at}.{field}: expected a string, got {other}")),
    }
}

fn check_status(obj: &Map<String, Value>, at: &str, out: &mut Vec<String>) {
    match obj.get("status") {
        None => out.push(format!("{at}.status: required field is missing")),
        Some(Value::String(raw)) if Status::parse(raw).is_some() => {}
        Some(other) => out.push(format!(
            "{at}.status: expected one of {}, got {other}",
            Status::ALL.map(Status::as_str).join(", ")
        )),
    }
}

fn check_priority(obj: &Map<String, Value>, at: &str, out: &mut Vec<String>) {
    match obj.get("priority") {
        None => {}
        Some(Value::String(raw)) if Priority::parse(raw).is_some() => {}
        Some(other) => out.push(format!(
            "{at}.priority: expected one of {}, got {other}",
            Priority::ALL.map(Priority::as_str).join(", ")
        )),
    }
}

fn check_id_list(obj: &Map<String, Value>, field: &str, at: &str, out: &mut Vec<String>) {
    match obj.get(field) {
        None => {}
        Some(Value::Array(items)) => {
            for (index, item) in items.iter().enumerate() {
                if item.as_u64().is_none() {
                    out.push(format!(
                        "{at}.{field}[{index}]: expected a non-negative integer, got {item}"
                    ));
                }
            }
        }
        Some(other) => out.push(format!("{at}.{field}: expected an array, got {other}")),
    }
}

fn check_complexity(obj: &Map<String, Value>, at: &str, out: &mut Vec<String>) {
    match obj.get("complexity") {
        None | Some(Value::Null) => {}
        Some(value) => match value.as_u64() {
            Some(1..=10) => {}
            _ => out.push(format!(
                "{at}.complexity: expected an integer between 1 and 10, got {value}"
            )),
        },
    }
}

fn check_subtasks(obj: &Map<String, Value>, at: &str, out: &mut Vec<String>) {
    let subtasks = match obj.get("subtasks") {
        None => return,
        Some(Value::Array(items)) => items,
        Some(other) => {
            out.push(format!("{at}.subtasks: expected an array, got {other}"));
            return;
        }
    };

    let mut seen_ids = HashSet::new();
    for (index, subtask) in subtasks.iter().enumerate() {
        let sub_at = format!("{at}.subtasks[{index}]");
        let Some(subtask) = subtask.as_object() else {
            out.push(format!("{sub_at}: expected an object"));
            continue;
        };

        if let Some(id) = check_id(subtask, &sub_at, out)
            && !seen_ids.insert(id)
        {
            out.push(format!("{sub_at}.id: duplicate subtask id {id}"));
        }
        check_title(subtask, &sub_at, out);
        check_defaulted_string(subtask, "description", &sub_at, out);
        check_status(subtask, &sub_at, out);
        check_id_list(subtask, "dependencies", &sub_at, out);
        check_optional_string(subtask, "details", &sub_at, out);
    }
}
