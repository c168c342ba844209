use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::jwt::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;
use crate::tasks::dto::{
    ListTasksQuery, MessageBody, StatsResponse, TaskBody, TaskCreateInput, TaskListResponse,
    TaskUpdateInput, TaskWithMessage,
};
use crate::tasks::service;
use crate::validate::require_object;

pub fn task_routes() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/stats", get(task_stats))
        .route(
            "/tasks/:id",
            get(get_task).put(update_task).delete(delete_task),
        )
}

#[instrument(skip(state))]
pub async fn list_tasks(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<TaskListResponse>, ApiError> {
    let (tasks, pagination) = service::list_tasks(&state.db, user_id, &query).await?;
    Ok(Json(TaskListResponse { tasks, pagination }))
}

#[instrument(skip(state, body))]
pub async fn create_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<TaskWithMessage>), ApiError> {
    let input = TaskCreateInput::from_json(require_object(&body)?)?;
    let task = service::create_task(&state.db, user_id, input).await?;
    info!(task_id = %task.id, user_id = %user_id, title = %task.title, "task created");
    Ok((
        StatusCode::CREATED,
        Json(TaskWithMessage {
            message: "Task created successfully",
            task,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn get_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(task_id): Path<Uuid>,
) -> Result<Json<TaskBody>, ApiError> {
    let task = service::get_task(&state.db, user_id, task_id).await?;
    Ok(Json(TaskBody { task }))
}

#[instrument(skip(state, body))]
pub async fn update_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(task_id): Path<Uuid>,
    Json(body): Json<Value>,
) -> Result<Json<TaskWithMessage>, ApiError> {
    let input = TaskUpdateInput::from_json(require_object(&body)?)?;
    let task = service::update_task(&state.db, user_id, task_id, input).await?;
    info!(task_id = %task.id, user_id = %user_id, "task updated");
    Ok(Json(TaskWithMessage {
        message: "Task updated successfully",
        task,
    }))
}

#[instrument(skip(state))]
pub async fn delete_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(task_id): Path<Uuid>,
) -> Result<Json<MessageBody>, ApiError> {
    service::delete_task(&state.db, user_id, task_id).await?;
    info!(task_id = %task_id, user_id = %user_id, "task deleted");
    Ok(Json(MessageBody {
        message: "Task deleted successfully",
    }))
}

#[instrument(skip(state))]
pub async fn task_stats(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<StatsResponse>, ApiError> {
    let stats = service::task_stats(&state.db, user_id).await?;
    Ok(Json(StatsResponse { stats }))
}
