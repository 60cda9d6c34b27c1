//! Item API handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;

use crate::error::ServiceError;
use crate::items::Item;

use super::{ActionResponse, AppState};

pub async fn list_items_handler(State(state): State<Arc<AppState>>) -> Json<Vec<Item>> {
    Json(state.service.items.list())
}

pub async fn create_item_handler(
    State(state): State<Arc<AppState>>,
    Json(item): Json<Item>,
) -> Json<Item> {
    Json(state.service.items.create(item))
}

pub async fn get_item_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Item>, ServiceError> {
    Ok(Json(state.service.items.get(id)?))
}

pub async fn update_item_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(item): Json<Item>,
) -> Result<Json<Item>, ServiceError> {
    Ok(Json(state.service.items.update(id, item)?))
}

pub async fn delete_item_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<ActionResponse>, ServiceError> {
    state.service.items.delete(id)?;
    Ok(Json(ActionResponse {
        success: true,
        message: format!("Item {} deleted", id),
    }))
}
