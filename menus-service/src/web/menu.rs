use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tracing::instrument;

use crate::{
    gateway::Gateway,
    models::{Item, Menu, MenuChanges, NewItem},
};

use super::{
    extract::{Path, Payload},
    ApiError, AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/menus/{id}",
            get(get_menu).patch(update_menu).delete(destroy_menu),
        )
        .route(
            "/menus/{id}/items",
            get(list_items).post(create_item).put(set_items),
        )
        .route("/menus/{id}/items/{item_id}", post(add_item))
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct CreateItemRequest {
    pub name: String,
    pub price: f64,
}

#[instrument(skip(state))]
pub async fn get_menu(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Menu>, ApiError> {
    let mut conn = state.store.connection().await;
    let menu = Gateway::new(&mut conn).find_menu(id).await?;
    Ok(Json(menu))
}

#[instrument(skip(state))]
pub async fn update_menu(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Payload(changes): Payload<MenuChanges>,
) -> Result<Json<Menu>, ApiError> {
    let mut conn = state.store.connection().await;
    let menu = Gateway::new(&mut conn).update_menu(id, &changes).await?;
    Ok(Json(menu))
}

#[instrument(skip(state))]
pub async fn destroy_menu(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let mut conn = state.store.connection().await;
    Gateway::new(&mut conn).destroy_menu(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn list_items(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<Item>>, ApiError> {
    let mut conn = state.store.connection().await;
    let items = Gateway::new(&mut conn).items_for_menu(id).await?;
    Ok(Json(items))
}

#[instrument(skip(state))]
pub async fn create_item(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Payload(payload): Payload<CreateItemRequest>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    let mut conn = state.store.connection().await;
    let item = Gateway::new(&mut conn)
        .create_item(&NewItem {
            name: payload.name,
            price: payload.price,
            menu_id: Some(id),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

#[instrument(skip(state))]
pub async fn set_items(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Payload(item_ids): Payload<Vec<i32>>,
) -> Result<Json<Vec<Item>>, ApiError> {
    let mut conn = state.store.connection().await;
    let items = Gateway::new(&mut conn).set_items(id, &item_ids).await?;
    Ok(Json(items))
}

#[instrument(skip(state))]
pub async fn add_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(i32, i32)>,
) -> Result<Json<Item>, ApiError> {
    let mut conn = state.store.connection().await;
    let item = Gateway::new(&mut conn).add_item(id, item_id).await?;
    Ok(Json(item))
}
