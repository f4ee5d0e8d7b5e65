use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    gateway::Gateway,
    models::{
        Menu, MenuDetails, NewMenu, NewRestaurant, Restaurant, RestaurantChanges,
        RestaurantDetails,
    },
};

use super::{
    extract::{Path, Payload},
    ApiError, AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/{name}", get(restaurant_page))
        .route("/{name}/{id}/add", post(add_menu))
        .route("/restaurants", get(list_restaurants).post(create_restaurant))
        .route(
            "/restaurants/{id}",
            get(get_restaurant)
                .patch(update_restaurant)
                .delete(destroy_restaurant),
        )
        .route(
            "/restaurants/{id}/menus",
            get(list_menus).post(create_menu).put(set_menus),
        )
}

/// A restaurant with its menus, each carrying its items.
#[derive(Serialize, Debug)]
pub struct RestaurantPage {
    pub restaurant: Restaurant,
    pub menus: Vec<MenuDetails>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct CreateMenuRequest {
    pub title: String,
}

#[instrument(skip(state))]
pub async fn home(
    State(state): State<AppState>,
) -> Result<Json<Vec<RestaurantDetails>>, ApiError> {
    let mut conn = state.store.connection().await;
    let restaurants = Gateway::new(&mut conn).find_all_restaurants(true).await?;
    Ok(Json(restaurants))
}

#[instrument(skip(state))]
pub async fn restaurant_page(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<RestaurantPage>, ApiError> {
    let mut conn = state.store.connection().await;
    let mut gateway = Gateway::new(&mut conn);

    let restaurant = gateway.find_restaurant_by_name(&name).await?;
    let menus = gateway.menus_for_restaurant(restaurant.id, true).await?;
    Ok(Json(RestaurantPage { restaurant, menus }))
}

#[instrument(skip(state))]
pub async fn add_menu(
    State(state): State<AppState>,
    Path((name, menu_id)): Path<(String, i32)>,
) -> Result<Json<RestaurantPage>, ApiError> {
    let mut conn = state.store.connection().await;
    let mut gateway = Gateway::new(&mut conn);

    let restaurant = gateway.find_restaurant_by_name(&name).await?;
    gateway.add_menu(restaurant.id, menu_id).await?;
    let menus = gateway.menus_for_restaurant(restaurant.id, true).await?;
    Ok(Json(RestaurantPage { restaurant, menus }))
}

#[instrument(skip(state))]
pub async fn list_restaurants(
    State(state): State<AppState>,
) -> Result<Json<Vec<RestaurantDetails>>, ApiError> {
    let mut conn = state.store.connection().await;
    let restaurants = Gateway::new(&mut conn).find_all_restaurants(false).await?;
    Ok(Json(restaurants))
}

#[instrument(skip(state))]
pub async fn create_restaurant(
    State(state): State<AppState>,
    Payload(payload): Payload<NewRestaurant>,
) -> Result<(StatusCode, Json<Restaurant>), ApiError> {
    let mut conn = state.store.connection().await;
    let restaurant = Gateway::new(&mut conn).create_restaurant(&payload).await?;
    Ok((StatusCode::CREATED, Json(restaurant)))
}

#[instrument(skip(state))]
pub async fn get_restaurant(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Restaurant>, ApiError> {
    let mut conn = state.store.connection().await;
    let restaurant = Gateway::new(&mut conn).find_restaurant(id).await?;
    Ok(Json(restaurant))
}

#[instrument(skip(state))]
pub async fn update_restaurant(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Payload(changes): Payload<RestaurantChanges>,
) -> Result<Json<Restaurant>, ApiError> {
    let mut conn = state.store.connection().await;
    let restaurant = Gateway::new(&mut conn)
        .update_restaurant(id, &changes)
        .await?;
    Ok(Json(restaurant))
}

#[instrument(skip(state))]
pub async fn destroy_restaurant(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let mut conn = state.store.connection().await;
    Gateway::new(&mut conn).destroy_restaurant(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn list_menus(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<MenuDetails>>, ApiError> {
    let mut conn = state.store.connection().await;
    let menus = Gateway::new(&mut conn).menus_for_restaurant(id, true).await?;
    Ok(Json(menus))
}

#[instrument(skip(state))]
pub async fn create_menu(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Payload(payload): Payload<CreateMenuRequest>,
) -> Result<(StatusCode, Json<Menu>), ApiError> {
    let mut conn = state.store.connection().await;
    let menu = Gateway::new(&mut conn)
        .create_menu(&NewMenu {
            title: payload.title,
            restaurant_id: Some(id),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(menu)))
}

#[instrument(skip(state))]
pub async fn set_menus(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Payload(menu_ids): Payload<Vec<i32>>,
) -> Result<Json<Vec<Menu>>, ApiError> {
    let mut conn = state.store.connection().await;
    let menus = Gateway::new(&mut conn).set_menus(id, &menu_ids).await?;
    Ok(Json(menus))
}
