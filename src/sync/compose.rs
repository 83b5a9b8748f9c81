use crate::model::{Subtask, Task};

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|text| !text.is_empty())
}

/// Epic body: description, details, test strategy, then a metadata footer
/// recording where the issue came from.
pub fn parent_description(task: &Task) -> String {
    let mut sections: Vec<String> = Vec::new();

    if let Some(description) = non_blank(Some(&task.description)) {
        sections.push(description.to_string());
    }
    if let Some(details) = non_blank(task.details.as_deref()) {
        sections.push(format!("## Implementation Details\n\n{details}"));
    }
    if let Some(strategy) = non_blank(task.test_strategy.as_deref()) {
        sections.push(format!("## Test Strategy\n\n{strategy}"));
    }

    let mut metadata = vec![
        "---".to_string(),
        "_Migrated from Task Master_".to_string(),
        format!("- Task Master ID: {}", task.id),
    ];
    if let Some(complexity) = task.complexity {
        metadata.push(format!("- Complexity: {complexity}/10"));
    }
    metadata.push(format!("- Original status: {}", task.status));
    sections.push(metadata.join("\n"));

    sections.join("\n\n")
}

pub fn child_description(subtask: &Subtask) -> String {
    let mut sections: Vec<String> = Vec::new();
    if let Some(description) = non_blank(Some(&subtask.description)) {
        sections.push(description.to_string());
    }
    if let Some(details) = non_blank(subtask.details.as_deref()) {
        sections.push(format!("## Implementation Details\n\n{details}"));
    }
    sections.join("\n\n")
}
