use diesel::{delete, dsl::now, insert_into, prelude::*, update};
use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection, RunQueryDsl};

use crate::{
    models::{
        Item, ItemChanges, Menu, MenuChanges, MenuDetails, NewItem, NewMenu, NewRestaurant,
        Restaurant, RestaurantChanges, RestaurantDetails,
    },
    schema::{items, menus, restaurants},
    store::{DbConnection, StoreError},
};

/// CRUD and relationship traversal over restaurants, menus and items.
///
/// Lookups that miss return [`StoreError::NotFound`]; callers never get an
/// empty row to traverse from.
pub struct Gateway<'a> {
    conn: &'a mut DbConnection,
}

impl<'a> Gateway<'a> {
    pub fn new(conn: &'a mut DbConnection) -> Self {
        Self { conn }
    }

    pub async fn count_restaurants(&mut self) -> Result<i64, StoreError> {
        let count = restaurants::table
            .count()
            .get_result::<i64>(self.conn)
            .await?;
        Ok(count)
    }

    pub async fn create_restaurant(
        &mut self,
        restaurant: &NewRestaurant,
    ) -> Result<Restaurant, StoreError> {
        restaurant.validate().map_err(StoreError::Validation)?;

        let created = insert_into(restaurants::table)
            .values(restaurant)
            .returning(Restaurant::as_returning())
            .get_result(self.conn)
            .await?;
        Ok(created)
    }

    pub async fn find_all_restaurants(
        &mut self,
        with_menus: bool,
    ) -> Result<Vec<RestaurantDetails>, StoreError> {
        let results = restaurants::table
            .select(Restaurant::as_select())
            .order_by(restaurants::id.asc())
            .load(self.conn)
            .await?;

        if !with_menus {
            return Ok(results
                .into_iter()
                .map(|restaurant| RestaurantDetails {
                    restaurant,
                    menus: None,
                })
                .collect());
        }

        let menus = Menu::belonging_to(&results)
            .select(Menu::as_select())
            .order_by(menus::id.asc())
            .load(self.conn)
            .await?
            .grouped_by(&results);

        Ok(results
            .into_iter()
            .zip(menus)
            .map(|(restaurant, menus)| RestaurantDetails {
                restaurant,
                menus: Some(menus),
            })
            .collect())
    }

    pub async fn find_restaurant(&mut self, id: i32) -> Result<Restaurant, StoreError> {
        restaurants::table
            .find(id)
            .select(Restaurant::as_select())
            .first(self.conn)
            .await
            .optional()?
            .ok_or_else(|| StoreError::not_found("restaurant", id))
    }

    pub async fn find_restaurant_by_name(&mut self, name: &str) -> Result<Restaurant, StoreError> {
        restaurants::table
            .filter(restaurants::name.eq(name))
            .order_by(restaurants::id.asc())
            .select(Restaurant::as_select())
            .first(self.conn)
            .await
            .optional()?
            .ok_or_else(|| StoreError::not_found("restaurant", name))
    }

    pub async fn update_restaurant(
        &mut self,
        id: i32,
        changes: &RestaurantChanges,
    ) -> Result<Restaurant, StoreError> {
        changes.validate().map_err(StoreError::Validation)?;

        update(restaurants::table.find(id))
            .set((changes, restaurants::updated_at.eq(now)))
            .returning(Restaurant::as_returning())
            .get_result(self.conn)
            .await
            .optional()?
            .ok_or_else(|| StoreError::not_found("restaurant", id))
    }

    /// Deletes the restaurant together with its menus and their items.
    pub async fn destroy_restaurant(&mut self, id: i32) -> Result<(), StoreError> {
        self.conn
            .transaction::<_, StoreError, _>(|conn| {
                async move {
                    let menu_ids = menus::table
                        .filter(menus::restaurant_id.eq(id))
                        .select(menus::id)
                        .load::<i32>(conn)
                        .await?;
                    delete(items::table.filter(items::menu_id.eq_any(&menu_ids)))
                        .execute(conn)
                        .await?;
                    delete(menus::table.filter(menus::restaurant_id.eq(id)))
                        .execute(conn)
                        .await?;

                    match delete(restaurants::table.find(id)).execute(conn).await? {
                        0 => Err(StoreError::not_found("restaurant", id)),
                        _ => Ok(()),
                    }
                }
                .scope_boxed()
            })
            .await
    }

    pub async fn menus_for_restaurant(
        &mut self,
        restaurant_id: i32,
        with_items: bool,
    ) -> Result<Vec<MenuDetails>, StoreError> {
        let restaurant = self.find_restaurant(restaurant_id).await?;
        let menus = Menu::belonging_to(&restaurant)
            .select(Menu::as_select())
            .order_by(menus::id.asc())
            .load(self.conn)
            .await?;

        if !with_items {
            return Ok(menus
                .into_iter()
                .map(|menu| MenuDetails { menu, items: None })
                .collect());
        }

        let items = Item::belonging_to(&menus)
            .select(Item::as_select())
            .order_by(items::id.asc())
            .load(self.conn)
            .await?
            .grouped_by(&menus);

        Ok(menus
            .into_iter()
            .zip(items)
            .map(|(menu, items)| MenuDetails {
                menu,
                items: Some(items),
            })
            .collect())
    }

    pub async fn create_menu(&mut self, menu: &NewMenu) -> Result<Menu, StoreError> {
        menu.validate().map_err(StoreError::Validation)?;
        if let Some(restaurant_id) = menu.restaurant_id {
            self.find_restaurant(restaurant_id).await?;
        }

        let created = insert_into(menus::table)
            .values(menu)
            .returning(Menu::as_returning())
            .get_result(self.conn)
            .await?;
        Ok(created)
    }

    pub async fn find_menu(&mut self, id: i32) -> Result<Menu, StoreError> {
        menus::table
            .find(id)
            .select(Menu::as_select())
            .first(self.conn)
            .await
            .optional()?
            .ok_or_else(|| StoreError::not_found("menu", id))
    }

    pub async fn update_menu(
        &mut self,
        id: i32,
        changes: &MenuChanges,
    ) -> Result<Menu, StoreError> {
        changes.validate().map_err(StoreError::Validation)?;

        update(menus::table.find(id))
            .set((changes, menus::updated_at.eq(now)))
            .returning(Menu::as_returning())
            .get_result(self.conn)
            .await
            .optional()?
            .ok_or_else(|| StoreError::not_found("menu", id))
    }

    /// Deletes the menu and its items. The owning restaurant is left alone.
    pub async fn destroy_menu(&mut self, id: i32) -> Result<(), StoreError> {
        self.conn
            .transaction::<_, StoreError, _>(|conn| {
                async move {
                    delete(items::table.filter(items::menu_id.eq(id)))
                        .execute(conn)
                        .await?;

                    match delete(menus::table.find(id)).execute(conn).await? {
                        0 => Err(StoreError::not_found("menu", id)),
                        _ => Ok(()),
                    }
                }
                .scope_boxed()
            })
            .await
    }

    /// Links one existing menu to the restaurant, leaving its other menus linked.
    pub async fn add_menu(&mut self, restaurant_id: i32, menu_id: i32) -> Result<Menu, StoreError> {
        self.find_restaurant(restaurant_id).await?;

        update(menus::table.find(menu_id))
            .set((
                menus::restaurant_id.eq(restaurant_id),
                menus::updated_at.eq(now),
            ))
            .returning(Menu::as_returning())
            .get_result(self.conn)
            .await
            .optional()?
            .ok_or_else(|| StoreError::not_found("menu", menu_id))
    }

    /// Replaces the restaurant's menus with exactly `menu_ids`.
    ///
    /// Menus that lose the link keep their rows with no owning restaurant.
    pub async fn set_menus(
        &mut self,
        restaurant_id: i32,
        menu_ids: &[i32],
    ) -> Result<Vec<Menu>, StoreError> {
        self.conn
            .transaction::<_, StoreError, _>(|conn| {
                async move {
                    let mut gateway = Gateway::new(conn);
                    gateway.find_restaurant(restaurant_id).await?;
                    for &menu_id in menu_ids {
                        gateway.find_menu(menu_id).await?;
                    }

                    update(
                        menus::table
                            .filter(menus::restaurant_id.eq(restaurant_id))
                            .filter(menus::id.ne_all(menu_ids)),
                    )
                    .set((
                        menus::restaurant_id.eq(None::<i32>),
                        menus::updated_at.eq(now),
                    ))
                    .execute(gateway.conn)
                    .await?;

                    let linked = update(menus::table.filter(menus::id.eq_any(menu_ids)))
                        .set((
                            menus::restaurant_id.eq(restaurant_id),
                            menus::updated_at.eq(now),
                        ))
                        .returning(Menu::as_returning())
                        .get_results(gateway.conn)
                        .await?;
                    Ok(linked)
                }
                .scope_boxed()
            })
            .await
    }

    pub async fn create_item(&mut self, item: &NewItem) -> Result<Item, StoreError> {
        item.validate().map_err(StoreError::Validation)?;
        if let Some(menu_id) = item.menu_id {
            self.find_menu(menu_id).await?;
        }

        let created = insert_into(items::table)
            .values(item)
            .returning(Item::as_returning())
            .get_result(self.conn)
            .await?;
        Ok(created)
    }

    pub async fn find_item(&mut self, id: i32) -> Result<Item, StoreError> {
        items::table
            .find(id)
            .select(Item::as_select())
            .first(self.conn)
            .await
            .optional()?
            .ok_or_else(|| StoreError::not_found("item", id))
    }

    pub async fn items_for_menu(&mut self, menu_id: i32) -> Result<Vec<Item>, StoreError> {
        let menu = self.find_menu(menu_id).await?;
        let items = Item::belonging_to(&menu)
            .select(Item::as_select())
            .order_by(items::id.asc())
            .load(self.conn)
            .await?;
        Ok(items)
    }

    pub async fn update_item(
        &mut self,
        id: i32,
        changes: &ItemChanges,
    ) -> Result<Item, StoreError> {
        changes.validate().map_err(StoreError::Validation)?;

        update(items::table.find(id))
            .set((changes, items::updated_at.eq(now)))
            .returning(Item::as_returning())
            .get_result(self.conn)
            .await
            .optional()?
            .ok_or_else(|| StoreError::not_found("item", id))
    }

    pub async fn destroy_item(&mut self, id: i32) -> Result<(), StoreError> {
        match delete(items::table.find(id)).execute(self.conn).await? {
            0 => Err(StoreError::not_found("item", id)),
            _ => Ok(()),
        }
    }

    pub async fn add_item(&mut self, menu_id: i32, item_id: i32) -> Result<Item, StoreError> {
        self.find_menu(menu_id).await?;

        update(items::table.find(item_id))
            .set((items::menu_id.eq(menu_id), items::updated_at.eq(now)))
            .returning(Item::as_returning())
            .get_result(self.conn)
            .await
            .optional()?
            .ok_or_else(|| StoreError::not_found("item", item_id))
    }

    /// Replaces the menu's items with exactly `item_ids`.
    pub async fn set_items(
        &mut self,
        menu_id: i32,
        item_ids: &[i32],
    ) -> Result<Vec<Item>, StoreError> {
        self.conn
            .transaction::<_, StoreError, _>(|conn| {
                async move {
                    let mut gateway = Gateway::new(conn);
                    gateway.find_menu(menu_id).await?;
                    for &item_id in item_ids {
                        gateway.find_item(item_id).await?;
                    }

                    update(
                        items::table
                            .filter(items::menu_id.eq(menu_id))
                            .filter(items::id.ne_all(item_ids)),
                    )
                    .set((items::menu_id.eq(None::<i32>), items::updated_at.eq(now)))
                    .execute(gateway.conn)
                    .await?;

                    let linked = update(items::table.filter(items::id.eq_any(item_ids)))
                        .set((items::menu_id.eq(menu_id), items::updated_at.eq(now)))
                        .returning(Item::as_returning())
                        .get_results(gateway.conn)
                        .await?;
                    Ok(linked)
                }
                .scope_boxed()
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    async fn pasta_place(gateway: &mut Gateway<'_>) -> Restaurant {
        gateway
            .create_restaurant(&NewRestaurant {
                name: "Pasta Place".to_string(),
                image: "p.jpg".to_string(),
            })
            .await
            .unwrap()
    }

    async fn menu(gateway: &mut Gateway<'_>, title: &str, restaurant_id: Option<i32>) -> Menu {
        gateway
            .create_menu(&NewMenu {
                title: title.to_string(),
                restaurant_id,
            })
            .await
            .unwrap()
    }

    async fn item(gateway: &mut Gateway<'_>, name: &str, price: f64) -> Item {
        gateway
            .create_item(&NewItem {
                name: name.to_string(),
                price,
                menu_id: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_then_find_restaurant() {
        let store = Store::in_memory().unwrap();
        let mut conn = store.connection().await;
        let mut gateway = Gateway::new(&mut conn);

        let created = pasta_place(&mut gateway).await;
        let found = gateway.find_restaurant(created.id).await.unwrap();
        assert_eq!(found, created);
        assert_eq!(found.name, "Pasta Place");
        assert_eq!(found.image, "p.jpg");

        let by_name = gateway.find_restaurant_by_name("Pasta Place").await.unwrap();
        assert_eq!(by_name.id, created.id);
    }

    #[tokio::test]
    async fn test_missing_rows_are_not_found() {
        let store = Store::in_memory().unwrap();
        let mut conn = store.connection().await;
        let mut gateway = Gateway::new(&mut conn);

        assert!(matches!(
            gateway.find_restaurant(42).await,
            Err(StoreError::NotFound { entity: "restaurant", .. })
        ));
        assert!(matches!(
            gateway.find_restaurant_by_name("Nowhere").await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            gateway.menus_for_restaurant(42, true).await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            gateway.update_menu(7, &MenuChanges::default()).await,
            Err(StoreError::NotFound { entity: "menu", .. })
        ));
        assert!(matches!(
            gateway.destroy_item(9).await,
            Err(StoreError::NotFound { entity: "item", .. })
        ));

        let restaurant = pasta_place(&mut gateway).await;
        assert!(matches!(
            gateway.add_menu(restaurant.id, 99).await,
            Err(StoreError::NotFound { entity: "menu", .. })
        ));
        assert!(matches!(
            gateway
                .create_menu(&NewMenu {
                    title: "Orphan".to_string(),
                    restaurant_id: Some(1234),
                })
                .await,
            Err(StoreError::NotFound { entity: "restaurant", .. })
        ));
    }

    #[tokio::test]
    async fn test_nested_menus_and_items() {
        let store = Store::in_memory().unwrap();
        let mut conn = store.connection().await;
        let mut gateway = Gateway::new(&mut conn);

        let restaurant = pasta_place(&mut gateway).await;
        let dinner = menu(&mut gateway, "Dinner", None).await;
        gateway.add_menu(restaurant.id, dinner.id).await.unwrap();
        let spaghetti = item(&mut gateway, "Spaghetti", 12.5).await;
        gateway.add_item(dinner.id, spaghetti.id).await.unwrap();

        let menus = gateway
            .menus_for_restaurant(restaurant.id, true)
            .await
            .unwrap();
        assert_eq!(menus.len(), 1);
        assert_eq!(menus[0].menu.title, "Dinner");
        let items = menus[0].items.as_ref().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Spaghetti");
        assert_eq!(items[0].price, 12.5);

        let bare = gateway
            .menus_for_restaurant(restaurant.id, false)
            .await
            .unwrap();
        assert_eq!(bare[0].items, None);
    }

    #[tokio::test]
    async fn test_add_menu_links_exactly_once() {
        let store = Store::in_memory().unwrap();
        let mut conn = store.connection().await;
        let mut gateway = Gateway::new(&mut conn);

        let restaurant = pasta_place(&mut gateway).await;
        let lunch = menu(&mut gateway, "Lunch", Some(restaurant.id)).await;
        let dinner = menu(&mut gateway, "Dinner", None).await;
        gateway.add_menu(restaurant.id, dinner.id).await.unwrap();
        gateway.add_menu(restaurant.id, dinner.id).await.unwrap();

        let menus = gateway
            .menus_for_restaurant(restaurant.id, false)
            .await
            .unwrap();
        let ids = menus.iter().map(|m| m.menu.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![lunch.id, dinner.id]);
    }

    #[tokio::test]
    async fn test_set_menus_relinks_without_deleting() {
        let store = Store::in_memory().unwrap();
        let mut conn = store.connection().await;
        let mut gateway = Gateway::new(&mut conn);

        let restaurant = pasta_place(&mut gateway).await;
        let lunch = menu(&mut gateway, "Lunch", Some(restaurant.id)).await;
        let dinner = menu(&mut gateway, "Dinner", Some(restaurant.id)).await;
        let brunch = menu(&mut gateway, "Brunch", None).await;

        let linked = gateway
            .set_menus(restaurant.id, &[dinner.id, brunch.id])
            .await
            .unwrap();
        assert_eq!(linked.len(), 2);
        assert_eq!(gateway.find_menu(lunch.id).await.unwrap().restaurant_id, None);

        let linked = gateway.set_menus(restaurant.id, &[]).await.unwrap();
        assert!(linked.is_empty());
        assert!(gateway
            .menus_for_restaurant(restaurant.id, false)
            .await
            .unwrap()
            .is_empty());
        for id in [lunch.id, dinner.id, brunch.id] {
            assert_eq!(gateway.find_menu(id).await.unwrap().restaurant_id, None);
        }
    }

    #[tokio::test]
    async fn test_set_menus_with_unknown_menu_changes_nothing() {
        let store = Store::in_memory().unwrap();
        let mut conn = store.connection().await;
        let mut gateway = Gateway::new(&mut conn);

        let restaurant = pasta_place(&mut gateway).await;
        let lunch = menu(&mut gateway, "Lunch", Some(restaurant.id)).await;

        let result = gateway.set_menus(restaurant.id, &[404]).await;
        assert!(matches!(result, Err(StoreError::NotFound { entity: "menu", .. })));
        assert_eq!(
            gateway.find_menu(lunch.id).await.unwrap().restaurant_id,
            Some(restaurant.id)
        );
    }

    #[tokio::test]
    async fn test_set_items_replaces_links() {
        let store = Store::in_memory().unwrap();
        let mut conn = store.connection().await;
        let mut gateway = Gateway::new(&mut conn);

        let dinner = menu(&mut gateway, "Dinner", None).await;
        let soup = item(&mut gateway, "Soup", 4.0).await;
        let salad = item(&mut gateway, "Salad", 6.5).await;

        gateway.set_items(dinner.id, &[soup.id, salad.id]).await.unwrap();
        assert_eq!(gateway.items_for_menu(dinner.id).await.unwrap().len(), 2);

        gateway.set_items(dinner.id, &[salad.id]).await.unwrap();
        let items = gateway.items_for_menu(dinner.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Salad");
        assert_eq!(gateway.find_item(soup.id).await.unwrap().menu_id, None);
    }

    #[tokio::test]
    async fn test_update_uses_allowed_fields() {
        let store = Store::in_memory().unwrap();
        let mut conn = store.connection().await;
        let mut gateway = Gateway::new(&mut conn);

        let restaurant = pasta_place(&mut gateway).await;
        let updated = gateway
            .update_restaurant(
                restaurant.id,
                &RestaurantChanges {
                    name: Some("Pasta Palace".to_string()),
                    image: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Pasta Palace");
        assert_eq!(updated.image, "p.jpg");

        let soup = item(&mut gateway, "Soup", 4.0).await;
        let updated = gateway
            .update_item(
                soup.id,
                &ItemChanges {
                    price: Some(4.5),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price, 4.5);
        assert_eq!(updated.name, "Soup");

        let unchanged = gateway
            .update_item(soup.id, &ItemChanges::default())
            .await
            .unwrap();
        assert_eq!(unchanged.price, 4.5);

        let rejected = gateway
            .update_item(
                soup.id,
                &ItemChanges {
                    price: Some(-3.0),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(rejected, Err(StoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_destroy_menu_keeps_restaurant() {
        let store = Store::in_memory().unwrap();
        let mut conn = store.connection().await;
        let mut gateway = Gateway::new(&mut conn);

        let restaurant = pasta_place(&mut gateway).await;
        let dinner = menu(&mut gateway, "Dinner", Some(restaurant.id)).await;
        let soup = item(&mut gateway, "Soup", 4.0).await;
        gateway.add_item(dinner.id, soup.id).await.unwrap();

        gateway.destroy_menu(dinner.id).await.unwrap();

        assert_eq!(gateway.find_restaurant(restaurant.id).await.unwrap(), restaurant);
        assert!(gateway
            .menus_for_restaurant(restaurant.id, false)
            .await
            .unwrap()
            .is_empty());
        assert!(matches!(
            gateway.find_item(soup.id).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_destroy_restaurant_cascades() {
        let store = Store::in_memory().unwrap();
        let mut conn = store.connection().await;
        let mut gateway = Gateway::new(&mut conn);

        let restaurant = pasta_place(&mut gateway).await;
        let dinner = menu(&mut gateway, "Dinner", Some(restaurant.id)).await;
        let soup = item(&mut gateway, "Soup", 4.0).await;
        gateway.add_item(dinner.id, soup.id).await.unwrap();
        let spare = menu(&mut gateway, "Spare", None).await;

        gateway.destroy_restaurant(restaurant.id).await.unwrap();

        assert!(gateway.find_restaurant(restaurant.id).await.is_err());
        assert!(gateway.find_menu(dinner.id).await.is_err());
        assert!(gateway.find_item(soup.id).await.is_err());
        assert_eq!(gateway.find_menu(spare.id).await.unwrap().title, "Spare");
        assert_eq!(gateway.count_restaurants().await.unwrap(), 0);
        assert!(matches!(
            gateway.destroy_restaurant(restaurant.id).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_find_all_restaurants() {
        let store = Store::in_memory().unwrap();
        let mut conn = store.connection().await;
        let mut gateway = Gateway::new(&mut conn);

        let first = pasta_place(&mut gateway).await;
        let second = gateway
            .create_restaurant(&NewRestaurant {
                name: "Taco Town".to_string(),
                image: "t.jpg".to_string(),
            })
            .await
            .unwrap();
        menu(&mut gateway, "Dinner", Some(first.id)).await;
        menu(&mut gateway, "Lunch", Some(first.id)).await;

        let bare = gateway.find_all_restaurants(false).await.unwrap();
        assert_eq!(bare.len(), 2);
        assert!(bare.iter().all(|r| r.menus.is_none()));

        let nested = gateway.find_all_restaurants(true).await.unwrap();
        assert_eq!(nested[0].restaurant.id, first.id);
        assert_eq!(nested[0].menus.as_ref().map(Vec::len), Some(2));
        assert_eq!(nested[1].restaurant.id, second.id);
        assert_eq!(nested[1].menus.as_ref().map(Vec::len), Some(0));
    }
}
