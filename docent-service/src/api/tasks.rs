//! Task API handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use std::sync::Arc;

use crate::error::ServiceError;
use crate::tasks::Task;

use super::{ActionResponse, AppState};

#[derive(Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<Task>,
}

pub async fn list_tasks_handler(State(state): State<Arc<AppState>>) -> Json<TaskListResponse> {
    Json(TaskListResponse {
        tasks: state.service.list_tasks(),
    })
}

pub async fn task_status_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Task>, ServiceError> {
    Ok(Json(state.service.get_task(&id)?))
}

pub async fn cancel_task_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ActionResponse>, ServiceError> {
    state.service.cancel_task(&id)?;
    Ok(Json(ActionResponse {
        success: true,
        message: format!("Task {} cancelled", id),
    }))
}

pub async fn delete_task_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ActionResponse>, ServiceError> {
    state.service.delete_task(&id)?;
    Ok(Json(ActionResponse {
        success: true,
        message: format!("Task {} deleted", id),
    }))
}
