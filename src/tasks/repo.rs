use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

time::serde::format_description!(due_date_format, Date, "[year]-[month]-[day]");

/// Task record in the database, owned by exactly one user.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(with = "due_date_format::option")]
    pub due_date: Option<Date>,
    pub completed: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub user_id: Uuid,
}

/// Aggregate counters for one owner.
#[derive(Debug, FromRow)]
pub struct TaskCounts {
    pub total: i64,
    pub completed: i64,
    pub overdue: i64,
}

impl Task {
    /// Owner-scoped page, newest first with id as the tie-breaker so the
    /// order is stable.
    pub async fn list_by_owner(
        db: &PgPool,
        user_id: Uuid,
        completed: Option<bool>,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Task>> {
        let rows = match completed {
            Some(flag) => {
                sqlx::query_as::<_, Task>(
                    r#"
                    SELECT id, title, description, due_date, completed,
                           created_at, updated_at, user_id
                    FROM tasks
                    WHERE user_id = $1 AND completed = $2
                    ORDER BY created_at DESC, id DESC
                    LIMIT $3 OFFSET $4
                    "#,
                )
                .bind(user_id)
                .bind(flag)
                .bind(limit)
                .bind(offset)
                .fetch_all(db)
                .await?
            }
            None => {
                sqlx::query_as::<_, Task>(
                    r#"
                    SELECT id, title, description, due_date, completed,
                           created_at, updated_at, user_id
                    FROM tasks
                    WHERE user_id = $1
                    ORDER BY created_at DESC, id DESC
                    LIMIT $2 OFFSET $3
                    "#,
                )
                .bind(user_id)
                .bind(limit)
                .bind(offset)
                .fetch_all(db)
                .await?
            }
        };
        Ok(rows)
    }

    pub async fn count_by_owner(
        db: &PgPool,
        user_id: Uuid,
        completed: Option<bool>,
    ) -> anyhow::Result<i64> {
        let total = match completed {
            Some(flag) => {
                sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM tasks WHERE user_id = $1 AND completed = $2",
                )
                .bind(user_id)
                .bind(flag)
                .fetch_one(db)
                .await?
            }
            None => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tasks WHERE user_id = $1")
                    .bind(user_id)
                    .fetch_one(db)
                    .await?
            }
        };
        Ok(total)
    }

    /// The owner filter is part of the lookup, so a foreign-owned task is
    /// indistinguishable from an absent one.
    pub async fn find_by_owner(
        db: &PgPool,
        user_id: Uuid,
        task_id: Uuid,
    ) -> anyhow::Result<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, description, due_date, completed,
                   created_at, updated_at, user_id
            FROM tasks
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(task_id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(task)
    }

    pub async fn insert(
        db: &PgPool,
        user_id: Uuid,
        title: &str,
        description: &str,
        due_date: Option<Date>,
        completed: bool,
    ) -> anyhow::Result<Task> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (id, user_id, title, description, due_date, completed)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, title, description, due_date, completed,
                      created_at, updated_at, user_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(title)
        .bind(description)
        .bind(due_date)
        .bind(completed)
        .fetch_one(db)
        .await?;
        Ok(task)
    }

    /// Writes the full row back and bumps `updated_at`. Returns `None` when
    /// the task vanished between read and write.
    pub async fn save(&self, db: &PgPool) -> anyhow::Result<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET title = $1, description = $2, due_date = $3, completed = $4,
                updated_at = now()
            WHERE id = $5 AND user_id = $6
            RETURNING id, title, description, due_date, completed,
                      created_at, updated_at, user_id
            "#,
        )
        .bind(&self.title)
        .bind(&self.description)
        .bind(self.due_date)
        .bind(self.completed)
        .bind(self.id)
        .bind(self.user_id)
        .fetch_optional(db)
        .await?;
        Ok(task)
    }

    pub async fn delete_by_owner(
        db: &PgPool,
        user_id: Uuid,
        task_id: Uuid,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(task_id)
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn counts_by_owner(
        db: &PgPool,
        user_id: Uuid,
        today: Date,
    ) -> anyhow::Result<TaskCounts> {
        let counts = sqlx::query_as::<_, TaskCounts>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE completed) AS completed,
                   COUNT(*) FILTER (WHERE NOT completed AND due_date < $2) AS overdue
            FROM tasks
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(today)
        .fetch_one(db)
        .await?;
        Ok(counts)
    }
}
