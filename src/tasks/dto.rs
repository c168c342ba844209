use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tasks::repo::Task;
use crate::validate::{
    string_field, validate_object, Check, FieldKind, FieldRule, ValidationErrors, DATE_SHAPE_RE,
};

fn task_rules(title_required: bool) -> Vec<FieldRule> {
    vec![
        FieldRule {
            name: "title",
            kind: FieldKind::Str,
            required: title_required,
            nullable: false,
            checks: vec![Check::Length {
                min: 1,
                max: 200,
                message: "Title must be between 1 and 200 characters",
            }],
        },
        FieldRule {
            name: "description",
            kind: FieldKind::Str,
            required: false,
            nullable: false,
            checks: vec![Check::Length {
                min: 0,
                max: 1000,
                message: "Description must be less than 1000 characters",
            }],
        },
        FieldRule {
            name: "due_date",
            kind: FieldKind::Str,
            required: false,
            nullable: true,
            checks: vec![Check::Pattern {
                re: &DATE_SHAPE_RE,
                message: "Due date must be in YYYY-MM-DD format",
            }],
        },
        FieldRule {
            name: "completed",
            kind: FieldKind::Bool,
            required: false,
            nullable: false,
            checks: vec![],
        },
    ]
}

lazy_static! {
    static ref TASK_CREATE_RULES: Vec<FieldRule> = task_rules(true);
    static ref TASK_UPDATE_RULES: Vec<FieldRule> = task_rules(false);
}

/// Presence-aware patch value: `Absent` leaves the field untouched, an
/// explicit `null` clears it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    Absent,
    Null,
    Value(T),
}

#[derive(Debug)]
pub struct TaskCreateInput {
    pub title: String,
    pub description: String,
    pub due_date: Option<String>,
    pub completed: bool,
}

impl TaskCreateInput {
    pub fn from_json(body: &Map<String, Value>) -> Result<Self, ValidationErrors> {
        validate_object(&TASK_CREATE_RULES, body)?;
        Ok(Self {
            title: string_field(body, "title"),
            description: string_field(body, "description"),
            due_date: body
                .get("due_date")
                .and_then(Value::as_str)
                .map(str::to_string),
            completed: body
                .get("completed")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        })
    }
}

#[derive(Debug)]
pub struct TaskUpdateInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Patch<String>,
    pub completed: Option<bool>,
}

impl TaskUpdateInput {
    pub fn from_json(body: &Map<String, Value>) -> Result<Self, ValidationErrors> {
        validate_object(&TASK_UPDATE_RULES, body)?;
        let due_date = match body.get("due_date") {
            None => Patch::Absent,
            Some(Value::Null) => Patch::Null,
            Some(value) => Patch::Value(value.as_str().unwrap_or_default().to_string()),
        };
        Ok(Self {
            title: body.get("title").and_then(Value::as_str).map(str::to_string),
            description: body
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
            due_date,
            completed: body.get("completed").and_then(Value::as_bool),
        })
    }
}

/// Raw query params; numeric fields stay strings so malformed values can
/// fall back to defaults instead of rejecting the request.
#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    pub page: Option<String>,
    pub per_page: Option<String>,
    pub completed: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationMeta {
    pub page: i64,
    pub pages: i64,
    pub per_page: i64,
    pub total: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<Task>,
    pub pagination: PaginationMeta,
}

#[derive(Debug, Serialize)]
pub struct TaskBody {
    pub task: Task,
}

#[derive(Debug, Serialize)]
pub struct TaskWithMessage {
    pub message: &'static str,
    pub task: Task,
}

#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct TaskStats {
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub pending_tasks: i64,
    pub overdue_tasks: i64,
    pub completion_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub stats: TaskStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object literal")
    }

    #[test]
    fn create_applies_defaults() {
        let input =
            TaskCreateInput::from_json(&as_map(json!({ "title": "buy milk" }))).expect("valid");
        assert_eq!(input.title, "buy milk");
        assert_eq!(input.description, "");
        assert_eq!(input.due_date, None);
        assert!(!input.completed);
    }

    #[test]
    fn create_requires_title() {
        let err = TaskCreateInput::from_json(&as_map(json!({ "completed": true }))).unwrap_err();
        assert_eq!(err.0["title"], vec!["Missing data for required field."]);
    }

    #[test]
    fn create_rejects_malformed_due_date_shape() {
        let err = TaskCreateInput::from_json(&as_map(json!({
            "title": "x",
            "due_date": "03/01/2024"
        })))
        .unwrap_err();
        assert_eq!(err.0["due_date"], vec!["Due date must be in YYYY-MM-DD format"]);
    }

    #[test]
    fn create_accepts_explicit_null_due_date() {
        let input = TaskCreateInput::from_json(&as_map(json!({
            "title": "x",
            "due_date": null
        })))
        .expect("valid");
        assert_eq!(input.due_date, None);
    }

    #[test]
    fn update_distinguishes_absent_null_and_value() {
        let input = TaskUpdateInput::from_json(&as_map(json!({ "completed": true })))
            .expect("valid");
        assert_eq!(input.due_date, Patch::Absent);
        assert_eq!(input.title, None);
        assert_eq!(input.completed, Some(true));

        let input = TaskUpdateInput::from_json(&as_map(json!({ "due_date": null })))
            .expect("valid");
        assert_eq!(input.due_date, Patch::Null);

        let input = TaskUpdateInput::from_json(&as_map(json!({ "due_date": "2024-03-01" })))
            .expect("valid");
        assert_eq!(input.due_date, Patch::Value("2024-03-01".into()));
    }

    #[test]
    fn update_title_still_bounded() {
        let err = TaskUpdateInput::from_json(&as_map(json!({ "title": "" }))).unwrap_err();
        assert_eq!(err.0["title"], vec!["Title must be between 1 and 200 characters"]);
    }
}
