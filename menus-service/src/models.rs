use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{items, menus, restaurants};

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, PartialEq)]
#[diesel(table_name = restaurants)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Restaurant {
    pub id: i32,
    pub name: String,
    pub image: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = restaurants)]
#[serde(deny_unknown_fields)]
pub struct NewRestaurant {
    pub name: String,
    pub image: String,
}

/// Fields of a restaurant that may be changed after creation.
#[derive(AsChangeset, Deserialize, Default, Debug, Clone, PartialEq)]
#[diesel(table_name = restaurants)]
#[serde(deny_unknown_fields)]
pub struct RestaurantChanges {
    pub name: Option<String>,
    pub image: Option<String>,
}

#[derive(
    Queryable, Selectable, Identifiable, Associations, Serialize, Debug, Clone, PartialEq,
)]
#[diesel(belongs_to(Restaurant))]
#[diesel(table_name = menus)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Menu {
    pub id: i32,
    pub title: String,
    pub restaurant_id: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = menus)]
#[serde(deny_unknown_fields)]
pub struct NewMenu {
    pub title: String,
    #[serde(default)]
    pub restaurant_id: Option<i32>,
}

#[derive(AsChangeset, Deserialize, Default, Debug, Clone, PartialEq)]
#[diesel(table_name = menus)]
#[serde(deny_unknown_fields)]
pub struct MenuChanges {
    pub title: Option<String>,
}

#[derive(
    Queryable, Selectable, Identifiable, Associations, Serialize, Debug, Clone, PartialEq,
)]
#[diesel(belongs_to(Menu))]
#[diesel(table_name = items)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Item {
    pub id: i32,
    pub name: String,
    pub price: f64,
    pub menu_id: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = items)]
#[serde(deny_unknown_fields)]
pub struct NewItem {
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub menu_id: Option<i32>,
}

#[derive(AsChangeset, Deserialize, Default, Debug, Clone, PartialEq)]
#[diesel(table_name = items)]
#[serde(deny_unknown_fields)]
pub struct ItemChanges {
    pub name: Option<String>,
    pub price: Option<f64>,
}

/// A restaurant with its menus eager-loaded when they were asked for.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RestaurantDetails {
    #[serde(flatten)]
    pub restaurant: Restaurant,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menus: Option<Vec<Menu>>,
}

/// A menu with its items eager-loaded when they were asked for.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MenuDetails {
    #[serde(flatten)]
    pub menu: Menu,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Item>>,
}

impl NewRestaurant {
    pub fn validate(&self) -> Result<(), String> {
        require_text("name", &self.name)?;
        require_text("image", &self.image)
    }
}

impl RestaurantChanges {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            require_text("name", name)?;
        }
        if let Some(image) = &self.image {
            require_text("image", image)?;
        }
        Ok(())
    }
}

impl NewMenu {
    pub fn validate(&self) -> Result<(), String> {
        require_text("title", &self.title)
    }
}

impl MenuChanges {
    pub fn validate(&self) -> Result<(), String> {
        match &self.title {
            Some(title) => require_text("title", title),
            None => Ok(()),
        }
    }
}

impl NewItem {
    pub fn validate(&self) -> Result<(), String> {
        require_text("name", &self.name)?;
        require_price(self.price)
    }
}

impl ItemChanges {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            require_text("name", name)?;
        }
        if let Some(price) = self.price {
            require_price(price)?;
        }
        Ok(())
    }
}

fn require_text(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} must not be blank"));
    }
    Ok(())
}

fn require_price(price: f64) -> Result<(), String> {
    if !price.is_finite() || price < 0.0 {
        return Err(format!("price must be a non-negative number, got {price}"));
    }
    Ok(())
}
