//! Task API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::api::state::SharedState;
use crate::error::TaskFlowError;
use crate::model::{Column, NewTask, Task, TaskPatch, COLUMNS};

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Task list response
#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<Task>,
}

/// Board columns response
#[derive(Debug, Serialize)]
pub struct ColumnsResponse {
    pub columns: Vec<Column>,
}

// ============================================================================
// Helper functions
// ============================================================================

/// Map a store error to an HTTP status
fn error_status(e: &TaskFlowError) -> StatusCode {
    match e {
        TaskFlowError::InvalidData(_) => StatusCode::BAD_REQUEST,
        TaskFlowError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/v1/columns
/// The fixed board columns (1:1 with task status)
pub async fn list_columns() -> Json<ColumnsResponse> {
    Json(ColumnsResponse {
        columns: COLUMNS.to_vec(),
    })
}

/// GET /api/v1/tasks
/// List all tasks, ordered by sort_order
pub async fn list_tasks(
    State(state): State<SharedState>,
) -> Result<Json<TaskListResponse>, StatusCode> {
    let tasks = state.store.list().await.map_err(|e| {
        eprintln!("[api] list tasks failed: {e}");
        error_status(&e)
    })?;

    Ok(Json(TaskListResponse { tasks }))
}

/// POST /api/v1/tasks
/// Create a new task
pub async fn create_task(
    State(state): State<SharedState>,
    Json(req): Json<NewTask>,
) -> Result<(StatusCode, Json<Task>), StatusCode> {
    let task = state.store.create(req).await.map_err(|e| {
        eprintln!("[api] create task failed: {e}");
        error_status(&e)
    })?;

    Ok((StatusCode::CREATED, Json(task)))
}

/// PATCH /api/v1/tasks/{id}
/// Partially update a task
pub async fn update_task(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<Task>, StatusCode> {
    let task = state.store.update(&id, patch).await.map_err(|e| {
        eprintln!("[api] update task {id} failed: {e}");
        error_status(&e)
    })?;

    Ok(Json(task))
}

/// DELETE /api/v1/tasks/{id}
/// Delete a task
pub async fn delete_task(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    state.store.delete(&id).await.map_err(|e| {
        eprintln!("[api] delete task {id} failed: {e}");
        error_status(&e)
    })?;

    Ok(StatusCode::NO_CONTENT)
}
