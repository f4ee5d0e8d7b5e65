//! JSON surface over the gateway. Every handler resolves to one gateway
//! operation, or a short fixed sequence of them.

use axum::Router;

use crate::store::Store;

mod error;
mod extract;
mod item;
mod menu;
mod restaurant;

pub use error::ApiError;
pub use restaurant::RestaurantPage;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(restaurant::router())
        .merge(menu::router())
        .merge(item::router())
        .with_state(state)
}
