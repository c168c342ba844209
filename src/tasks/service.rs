use sqlx::PgPool;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::error::ApiError;
use crate::tasks::dto::{
    ListTasksQuery, PaginationMeta, Patch, TaskCreateInput, TaskStats, TaskUpdateInput,
};
use crate::tasks::repo::Task;

pub const DEFAULT_PER_PAGE: i64 = 10;
pub const MAX_PER_PAGE: i64 = 100;

static DUE_DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Strict calendar parse. The schema has already checked the `YYYY-MM-DD`
/// shape; this rejects dates like 2024-02-30 that are shaped right but do
/// not exist.
pub fn parse_due_date(raw: &str) -> Result<Date, ApiError> {
    Date::parse(raw, DUE_DATE_FORMAT).map_err(|_| ApiError::InvalidDueDate)
}

/// Query params arrive as raw strings; anything non-numeric falls back to
/// the default instead of failing the request.
fn int_param(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.parse().ok())
}

pub fn clamp_pagination(page: Option<i64>, per_page: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    (page, per_page)
}

/// Row offset for a page; saturates so an absurd page number cannot
/// overflow, it just lands past the end of the set.
fn page_offset(page: i64, per_page: i64) -> i64 {
    (page - 1).saturating_mul(per_page)
}

/// `?completed=true|false` (case-insensitive); anything else is ignored.
pub fn parse_completed_filter(raw: Option<&str>) -> Option<bool> {
    match raw?.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

pub fn pagination_meta(page: i64, per_page: i64, total: i64) -> PaginationMeta {
    let pages = if total == 0 {
        0
    } else {
        (total + per_page - 1) / per_page
    };
    PaginationMeta {
        page,
        pages,
        per_page,
        total,
        has_next: page < pages,
        has_prev: page > 1,
    }
}

/// completed/total as a percentage, rounded to 2 decimals; 0 for no tasks.
pub fn completion_rate(completed: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (completed as f64 / total as f64 * 100.0 * 100.0).round() / 100.0
}

pub async fn list_tasks(
    db: &PgPool,
    owner: Uuid,
    query: &ListTasksQuery,
) -> Result<(Vec<Task>, PaginationMeta), ApiError> {
    let (page, per_page) = clamp_pagination(
        int_param(query.page.as_deref()),
        int_param(query.per_page.as_deref()),
    );
    let completed = parse_completed_filter(query.completed.as_deref());

    let total = Task::count_by_owner(db, owner, completed).await?;
    let tasks =
        Task::list_by_owner(db, owner, completed, per_page, page_offset(page, per_page)).await?;

    Ok((tasks, pagination_meta(page, per_page, total)))
}

pub async fn create_task(
    db: &PgPool,
    owner: Uuid,
    input: TaskCreateInput,
) -> Result<Task, ApiError> {
    let due_date = match &input.due_date {
        Some(raw) => Some(parse_due_date(raw)?),
        None => None,
    };
    let task = Task::insert(
        db,
        owner,
        &input.title,
        &input.description,
        due_date,
        input.completed,
    )
    .await?;
    Ok(task)
}

pub async fn get_task(db: &PgPool, owner: Uuid, task_id: Uuid) -> Result<Task, ApiError> {
    Task::find_by_owner(db, owner, task_id)
        .await?
        .ok_or(ApiError::NotFound("Task"))
}

/// Read-modify-write: only fields present in the submission are applied, and
/// concurrent updates to the same task are last-writer-wins.
pub async fn update_task(
    db: &PgPool,
    owner: Uuid,
    task_id: Uuid,
    input: TaskUpdateInput,
) -> Result<Task, ApiError> {
    let Some(mut task) = Task::find_by_owner(db, owner, task_id).await? else {
        return Err(ApiError::NotFound("Task"));
    };

    if let Some(title) = input.title {
        task.title = title;
    }
    if let Some(description) = input.description {
        task.description = description;
    }
    match input.due_date {
        Patch::Absent => {}
        Patch::Null => task.due_date = None,
        Patch::Value(raw) => task.due_date = Some(parse_due_date(&raw)?),
    }
    if let Some(completed) = input.completed {
        task.completed = completed;
    }

    task.save(db).await?.ok_or(ApiError::NotFound("Task"))
}

pub async fn delete_task(db: &PgPool, owner: Uuid, task_id: Uuid) -> Result<(), ApiError> {
    if Task::delete_by_owner(db, owner, task_id).await? {
        Ok(())
    } else {
        Err(ApiError::NotFound("Task"))
    }
}

pub async fn task_stats(db: &PgPool, owner: Uuid) -> Result<TaskStats, ApiError> {
    // Server UTC calendar date at call time; deliberately timezone-naive.
    let today = OffsetDateTime::now_utc().date();
    let counts = Task::counts_by_owner(db, owner, today).await?;
    Ok(TaskStats {
        total_tasks: counts.total,
        completed_tasks: counts.completed,
        pending_tasks: counts.total - counts.completed,
        overdue_tasks: counts.overdue,
        completion_rate: completion_rate(counts.completed, counts.total),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_date_calendar_validity() {
        assert!(parse_due_date("2024-02-29").is_ok());
        assert!(parse_due_date("2023-02-29").is_err());
        assert!(parse_due_date("2024-02-30").is_err());
        assert!(parse_due_date("2024-13-01").is_err());
        assert!(parse_due_date("2024-00-10").is_err());
    }

    #[test]
    fn pagination_is_clamped() {
        assert_eq!(clamp_pagination(None, None), (1, DEFAULT_PER_PAGE));
        assert_eq!(clamp_pagination(Some(0), Some(1000)), (1, MAX_PER_PAGE));
        assert_eq!(clamp_pagination(Some(-5), Some(0)), (1, 1));
        assert_eq!(clamp_pagination(Some(3), Some(25)), (3, 25));
    }

    #[test]
    fn numeric_params_parse_leniently() {
        assert_eq!(int_param(Some("7")), Some(7));
        assert_eq!(int_param(Some("abc")), None);
        assert_eq!(int_param(Some("")), None);
        assert_eq!(int_param(None), None);
        // Malformed input degrades to the defaults.
        assert_eq!(
            clamp_pagination(int_param(Some("abc")), int_param(Some("xyz"))),
            (1, DEFAULT_PER_PAGE)
        );
    }

    #[test]
    fn offset_saturates_instead_of_overflowing() {
        assert_eq!(page_offset(1, 10), 0);
        assert_eq!(page_offset(3, 10), 20);

        let (page, per_page) = clamp_pagination(Some(i64::MAX), Some(10));
        assert_eq!(page_offset(page, per_page), i64::MAX);
        assert_eq!(page_offset(i64::MAX, MAX_PER_PAGE), i64::MAX);
    }

    #[test]
    fn completed_filter_parsing() {
        assert_eq!(parse_completed_filter(Some("true")), Some(true));
        assert_eq!(parse_completed_filter(Some("False")), Some(false));
        assert_eq!(parse_completed_filter(Some("TRUE")), Some(true));
        assert_eq!(parse_completed_filter(Some("yes")), None);
        assert_eq!(parse_completed_filter(None), None);
    }

    #[test]
    fn pagination_meta_for_empty_set() {
        let meta = pagination_meta(1, 10, 0);
        assert_eq!(meta.pages, 0);
        assert!(!meta.has_next);
        assert!(!meta.has_prev);
    }

    #[test]
    fn pagination_meta_counts_pages() {
        let meta = pagination_meta(2, 10, 25);
        assert_eq!(meta.pages, 3);
        assert!(meta.has_next);
        assert!(meta.has_prev);

        let last = pagination_meta(3, 10, 25);
        assert!(!last.has_next);
        assert!(last.has_prev);
    }

    #[test]
    fn completion_rate_rounds_to_two_decimals() {
        assert_eq!(completion_rate(0, 0), 0.0);
        assert_eq!(completion_rate(1, 2), 50.0);
        assert_eq!(completion_rate(1, 3), 33.33);
        assert_eq!(completion_rate(2, 3), 66.67);
        assert_eq!(completion_rate(3, 3), 100.0);
    }
}
