pub mod config;
pub mod gateway;
pub mod models;
pub mod schema;
pub mod seed;
pub mod store;
pub mod web;

use config::Config;
use store::{Store, StoreError};

pub fn establish_store(config: &Config) -> Result<Store, StoreError> {
    Store::open(&config.database_url)
}
