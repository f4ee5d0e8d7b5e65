use std::path::{Path, PathBuf};

use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection};
use futures::future::join_all;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

use crate::{
    gateway::Gateway,
    models::{NewItem, NewMenu, NewRestaurant, Restaurant},
    store::{Store, StoreError},
};

const BUNDLED_DATASET: &str = include_str!("../data/restaurants.json");

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct SeedRestaurant {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub menus: Vec<SeedMenu>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct SeedMenu {
    pub title: String,
    #[serde(default)]
    pub items: Vec<SeedItem>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct SeedItem {
    pub name: String,
    pub price: f64,
}

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("cannot read seed dataset {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed seed dataset")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The store already held restaurants; nothing was written.
    Skipped,
    Seeded { restaurants: usize },
}

pub fn parse_dataset(json: &str) -> Result<Vec<SeedRestaurant>, SeedError> {
    Ok(serde_json::from_str(json)?)
}

/// Reads the dataset at `path`, or the one compiled into the binary.
pub fn load_dataset(path: Option<&Path>) -> Result<Vec<SeedRestaurant>, SeedError> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path).map_err(|source| SeedError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            parse_dataset(&json)
        }
        None => parse_dataset(BUNDLED_DATASET),
    }
}

/// Populates an empty store from `dataset`.
///
/// Each restaurant is written in its own transaction, so a failure never
/// leaves a partially seeded restaurant behind. Restaurants that were
/// written before the failure stay committed.
pub async fn seed(store: &Store, dataset: &[SeedRestaurant]) -> Result<SeedOutcome, StoreError> {
    let mut conn = store.connection().await;
    let existing = Gateway::new(&mut conn).count_restaurants().await?;
    drop(conn);
    if existing > 0 {
        info!(existing, "store already holds restaurants, skipping seed");
        return Ok(SeedOutcome::Skipped);
    }

    let results = join_all(dataset.iter().map(|record| seed_restaurant(store, record))).await;

    let mut seeded = 0;
    let mut first_error = None;
    for result in results {
        match result {
            Ok(_) => seeded += 1,
            Err(err) if first_error.is_none() => first_error = Some(err),
            Err(_) => {}
        }
    }

    if let Some(err) = first_error {
        error!(error = %err, seeded, "seeding failed");
        return Err(err);
    }
    info!(restaurants = seeded, "seeding finished");
    Ok(SeedOutcome::Seeded {
        restaurants: seeded,
    })
}

async fn seed_restaurant(store: &Store, record: &SeedRestaurant) -> Result<Restaurant, StoreError> {
    let mut conn = store.connection().await;
    let restaurant = conn
        .transaction::<_, StoreError, _>(|conn| {
            async move {
                let mut gateway = Gateway::new(conn);
                let restaurant = gateway
                    .create_restaurant(&NewRestaurant {
                        name: record.name.clone(),
                        image: record.image.clone(),
                    })
                    .await?;

                let mut menu_ids = Vec::with_capacity(record.menus.len());
                for seed_menu in &record.menus {
                    let mut item_ids = Vec::with_capacity(seed_menu.items.len());
                    for seed_item in &seed_menu.items {
                        let item = gateway
                            .create_item(&NewItem {
                                name: seed_item.name.clone(),
                                price: seed_item.price,
                                menu_id: None,
                            })
                            .await?;
                        item_ids.push(item.id);
                    }

                    let menu = gateway
                        .create_menu(&NewMenu {
                            title: seed_menu.title.clone(),
                            restaurant_id: None,
                        })
                        .await?;
                    gateway.set_items(menu.id, &item_ids).await?;
                    menu_ids.push(menu.id);
                }

                gateway.set_menus(restaurant.id, &menu_ids).await?;
                Ok(restaurant)
            }
            .scope_boxed()
        })
        .await?;

    info!(
        restaurant = %restaurant.name,
        menus = record.menus.len(),
        "seeded restaurant"
    );
    Ok(restaurant)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_restaurants() -> Vec<SeedRestaurant> {
        parse_dataset(
            r#"[
                {"name": "Pasta Place", "image": "p.jpg", "menus": [
                    {"title": "Dinner", "items": [
                        {"name": "Spaghetti", "price": 12.5},
                        {"name": "Lasagne", "price": 14}
                    ]}
                ]},
                {"name": "Taco Town", "image": "t.jpg", "menus": [
                    {"title": "Lunch", "items": [
                        {"name": "Taco", "price": 3},
                        {"name": "Burrito", "price": 8.25}
                    ]}
                ]}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_bundled_dataset_parses() {
        let dataset = load_dataset(None).unwrap();
        assert!(!dataset.is_empty());
        assert!(dataset.iter().all(|r| !r.menus.is_empty()));
    }

    #[test]
    fn test_missing_dataset_file() {
        let result = load_dataset(Some(Path::new("/nonexistent/restaurants.json")));
        assert!(matches!(result, Err(SeedError::Read { .. })));
    }

    #[test]
    fn test_non_numeric_price_is_malformed() {
        let result = parse_dataset(
            r#"[{"name": "A", "image": "a.jpg", "menus": [
                {"title": "M", "items": [{"name": "I", "price": "free"}]}
            ]}]"#,
        );
        assert!(matches!(result, Err(SeedError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_seed_nests_menus_and_items() {
        let store = Store::in_memory().unwrap();

        let outcome = seed(&store, &two_restaurants()).await.unwrap();
        assert_eq!(outcome, SeedOutcome::Seeded { restaurants: 2 });

        let mut conn = store.connection().await;
        let mut gateway = Gateway::new(&mut conn);
        let restaurants = gateway.find_all_restaurants(true).await.unwrap();
        assert_eq!(restaurants.len(), 2);
        for details in &restaurants {
            assert_eq!(details.menus.as_ref().map(Vec::len), Some(1));
        }

        let pasta = gateway.find_restaurant_by_name("Pasta Place").await.unwrap();
        let menus = gateway.menus_for_restaurant(pasta.id, true).await.unwrap();
        assert_eq!(menus[0].menu.title, "Dinner");
        let names = menus[0]
            .items
            .as_ref()
            .unwrap()
            .iter()
            .map(|i| i.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Spaghetti", "Lasagne"]);
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let store = Store::in_memory().unwrap();

        seed(&store, &two_restaurants()).await.unwrap();
        let outcome = seed(&store, &two_restaurants()).await.unwrap();
        assert_eq!(outcome, SeedOutcome::Skipped);

        let mut conn = store.connection().await;
        let count = Gateway::new(&mut conn).count_restaurants().await.unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_failed_restaurant_leaves_no_partial_rows() {
        let store = Store::in_memory().unwrap();
        let mut dataset = two_restaurants();
        dataset[1].menus[0].items[1].price = -1.0;

        let result = seed(&store, &dataset).await;
        assert!(matches!(result, Err(StoreError::Validation(_))));

        let mut conn = store.connection().await;
        let mut gateway = Gateway::new(&mut conn);
        let restaurants = gateway.find_all_restaurants(true).await.unwrap();
        assert_eq!(restaurants.len(), 1);
        assert_eq!(restaurants[0].restaurant.name, "Pasta Place");
        assert!(matches!(
            gateway.find_restaurant_by_name("Taco Town").await,
            Err(StoreError::NotFound { .. })
        ));
    }
}
