use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use tracing::instrument;

use crate::{
    gateway::Gateway,
    models::{Item, ItemChanges},
};

use super::{
    extract::{Path, Payload},
    ApiError, AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/items/{id}",
        get(get_item).patch(update_item).delete(destroy_item),
    )
}

#[instrument(skip(state))]
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Item>, ApiError> {
    let mut conn = state.store.connection().await;
    let item = Gateway::new(&mut conn).find_item(id).await?;
    Ok(Json(item))
}

#[instrument(skip(state))]
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Payload(changes): Payload<ItemChanges>,
) -> Result<Json<Item>, ApiError> {
    let mut conn = state.store.connection().await;
    let item = Gateway::new(&mut conn).update_item(id, &changes).await?;
    Ok(Json(item))
}

#[instrument(skip(state))]
pub async fn destroy_item(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let mut conn = state.store.connection().await;
    Gateway::new(&mut conn).destroy_item(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
