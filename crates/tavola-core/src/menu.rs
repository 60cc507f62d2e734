use std::sync::Arc;

use chrono::Utc;
use tavola_db::Database;
use tavola_remote::RestaurantClient;
use tavola_types::api::RemoteMenuItem;
use tavola_types::events::ChangeEvent;
use tavola_types::models::{MenuItem, NewMenuItem};
use tracing::{debug, info, warn};

use crate::feed::ChangeFeed;
use crate::{RepoError, RepoResult, blocking};

#[derive(Clone)]
pub struct MenuRepository {
    db: Arc<Database>,
    remote: Option<RestaurantClient>,
    feed: ChangeFeed,
}

impl MenuRepository {
    pub fn new(db: Arc<Database>, remote: Option<RestaurantClient>, feed: ChangeFeed) -> Self {
        Self { db, remote, feed }
    }

    pub async fn all_items(&self) -> RepoResult<Vec<MenuItem>> {
        blocking(&self.db, |db| db.get_all_menu_items()).await
    }

    pub async fn available_items(&self) -> RepoResult<Vec<MenuItem>> {
        blocking(&self.db, |db| db.get_available_menu_items()).await
    }

    pub async fn items_by_category(&self, category: &str) -> RepoResult<Vec<MenuItem>> {
        let category = category.to_string();
        blocking(&self.db, move |db| db.get_menu_items_by_category(&category)).await
    }

    pub async fn categories(&self) -> RepoResult<Vec<String>> {
        blocking(&self.db, |db| db.get_menu_categories()).await
    }

    pub async fn get_item(&self, id: i64) -> RepoResult<Option<MenuItem>> {
        blocking(&self.db, move |db| db.get_menu_item(id)).await
    }

    pub async fn insert_item(&self, item: NewMenuItem) -> RepoResult<MenuItem> {
        validate(&item.name, &item.category, item.price)?;

        let stored = blocking(&self.db, move |db| db.insert_menu_item(&item, Utc::now())).await?;
        info!(id = stored.id, name = %stored.name, "menu item added");
        self.feed.publish(ChangeEvent::Menu);

        if let Some(remote) = &self.remote {
            // The server picks its own id; remember it for later mirrors.
            let outgoing = RemoteMenuItem {
                id: 0,
                ..RemoteMenuItem::from(&stored)
            };
            match remote.create_menu_item(&outgoing).await {
                Ok(created) => {
                    let (id, remote_id) = (stored.id, created.id);
                    blocking(&self.db, move |db| db.set_menu_item_remote_id(id, remote_id)).await?;
                }
                Err(e) => warn!(id = stored.id, error = %e, "menu item not mirrored to server"),
            }
        }
        Ok(stored)
    }

    /// `created_at` is kept from the stored row; `updated_at` is bumped.
    pub async fn update_item(&self, item: MenuItem) -> RepoResult<MenuItem> {
        validate(&item.name, &item.category, item.price)?;

        let id = item.id;
        let stored = blocking(&self.db, move |db| {
            let Some(existing) = db.get_menu_item(item.id)? else {
                return Ok(None);
            };
            let updated = MenuItem {
                created_at: existing.created_at,
                updated_at: Utc::now(),
                ..item
            };
            db.update_menu_item(&updated)?;
            Ok(Some(updated))
        })
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("menu item {id}")))?;

        self.feed.publish(ChangeEvent::Menu);

        if let Some(remote) = &self.remote {
            match self.remote_id(id).await? {
                Some(remote_id) => {
                    let outgoing = RemoteMenuItem {
                        id: remote_id,
                        ..RemoteMenuItem::from(&stored)
                    };
                    if let Err(e) = remote.update_menu_item(remote_id, &outgoing).await {
                        warn!(id, remote_id, error = %e, "menu update not mirrored to server");
                    }
                }
                None => debug!(id, "menu item was never mirrored, update kept local"),
            }
        }
        Ok(stored)
    }

    pub async fn delete_item(&self, id: i64) -> RepoResult<()> {
        let remote_id = self.remote_id(id).await?;
        let removed = blocking(&self.db, move |db| db.delete_menu_item(id)).await?;
        if !removed {
            return Err(RepoError::NotFound(format!("menu item {id}")));
        }
        info!(id, "menu item deleted");
        self.feed.publish(ChangeEvent::Menu);

        if let (Some(remote), Some(remote_id)) = (&self.remote, remote_id) {
            if let Err(e) = remote.delete_menu_item(remote_id).await {
                warn!(id, remote_id, error = %e, "menu delete not mirrored to server");
            }
        }
        Ok(())
    }

    /// Apply the server's menu, matched on server ids. Local-only items are
    /// left alone.
    pub async fn sync_with_server(&self) -> RepoResult<usize> {
        let remote = self
            .remote
            .as_ref()
            .ok_or(RepoError::Unsupported("menu sync needs a restaurant REST backend"))?;

        let items: Vec<MenuItem> = remote.list_menu().await?.into_iter().map(MenuItem::from).collect();
        let count = blocking(&self.db, move |db| db.merge_server_menu_items(&items)).await?;

        info!(count, "menu synced from server");
        self.feed.publish(ChangeEvent::Menu);
        Ok(count)
    }

    async fn remote_id(&self, id: i64) -> RepoResult<Option<i64>> {
        blocking(&self.db, move |db| db.menu_item_remote_id(id)).await
    }
}

fn validate(name: &str, category: &str, price: f64) -> RepoResult<()> {
    if name.trim().is_empty() {
        return Err(RepoError::Validation("menu item name must not be blank".into()));
    }
    if category.trim().is_empty() {
        return Err(RepoError::Validation("menu item category must not be blank".into()));
    }
    if !price.is_finite() || price < 0.0 {
        return Err(RepoError::Validation(format!("invalid price: {price}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TestBackend, memory_db, remote_config, unreachable_url};

    fn soup() -> NewMenuItem {
        NewMenuItem {
            name: "Soup".into(),
            description: "Of the day".into(),
            price: 5.5,
            image_url: String::new(),
            category: "Appetizers".into(),
            available: true,
        }
    }

    fn repo(rest_url: Option<&str>) -> MenuRepository {
        let remote = remote_config("http://unused/", rest_url).restaurant_client().unwrap();
        MenuRepository::new(memory_db(), remote, ChangeFeed::default())
    }

    fn server_item(id: i64, name: &str) -> RemoteMenuItem {
        RemoteMenuItem {
            id,
            name: name.into(),
            description: String::new(),
            price: 9.0,
            image_url: String::new(),
            category: "Mains".into(),
            available: true,
            created_at: 1,
            updated_at: 1,
        }
    }

    #[tokio::test]
    async fn writes_are_mirrored_to_the_server() {
        let backend = TestBackend::spawn().await;
        let menu = repo(Some(&backend.url));

        let item = menu.insert_item(soup()).await.unwrap();
        let remote_id = menu.remote_id(item.id).await.unwrap().unwrap();
        assert_eq!(backend.state.catalog.read().await.menu[&remote_id].name, "Soup");

        let renamed = menu
            .update_item(MenuItem {
                name: "Broth".into(),
                ..item.clone()
            })
            .await
            .unwrap();
        assert_eq!(renamed.created_at, item.created_at);
        assert!(renamed.updated_at >= item.updated_at);
        assert_eq!(backend.state.catalog.read().await.menu[&remote_id].name, "Broth");

        menu.delete_item(item.id).await.unwrap();
        assert!(backend.state.catalog.read().await.menu.is_empty());
        assert!(menu.get_item(item.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn mirrors_follow_the_server_id_when_local_ids_collide() {
        let backend = TestBackend::spawn().await;
        backend.state.catalog.write().await.menu.insert(1, server_item(1, "Lasagna"));
        let menu = repo(Some(&backend.url));

        let item = menu.insert_item(soup()).await.unwrap();
        assert_eq!(item.id, 1);
        let remote_id = menu.remote_id(item.id).await.unwrap().unwrap();
        assert_ne!(remote_id, 1);

        menu.update_item(MenuItem {
            price: 6.0,
            ..item.clone()
        })
        .await
        .unwrap();
        {
            let catalog = backend.state.catalog.read().await;
            assert_eq!(catalog.menu[&1].name, "Lasagna");
            assert_eq!(catalog.menu[&1].price, 9.0);
            assert_eq!(catalog.menu[&remote_id].price, 6.0);
        }

        menu.delete_item(item.id).await.unwrap();
        let catalog = backend.state.catalog.read().await;
        assert_eq!(catalog.menu.len(), 1);
        assert_eq!(catalog.menu[&1].name, "Lasagna");
    }

    #[tokio::test]
    async fn sync_merges_mirrored_items_instead_of_duplicating() {
        let backend = TestBackend::spawn().await;
        backend.state.catalog.write().await.menu.insert(1, server_item(1, "Lasagna"));
        let menu = repo(Some(&backend.url));
        let soup = menu.insert_item(soup()).await.unwrap();

        assert_eq!(menu.sync_with_server().await.unwrap(), 2);
        let names: Vec<String> = menu.all_items().await.unwrap().into_iter().map(|i| i.name).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"Lasagna".to_string()));
        assert_eq!(menu.get_item(soup.id).await.unwrap().unwrap().name, "Soup");
    }

    #[tokio::test]
    async fn unreachable_server_does_not_fail_local_writes() {
        let menu = repo(Some(&unreachable_url()));
        let item = menu.insert_item(soup()).await.unwrap();
        let stored = menu.all_items().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, item.id);
        assert!(menu.sync_with_server().await.is_err());
    }

    #[tokio::test]
    async fn sync_pulls_server_items_and_publishes() {
        let backend = TestBackend::spawn().await;
        let seeded = repo(Some(&backend.url));
        seeded.insert_item(soup()).await.unwrap();
        seeded
            .insert_item(NewMenuItem {
                name: "Tiramisu".into(),
                category: "Desserts".into(),
                available: false,
                ..soup()
            })
            .await
            .unwrap();

        let fresh = repo(Some(&backend.url));
        let mut changes = fresh.feed.subscribe();
        assert_eq!(fresh.sync_with_server().await.unwrap(), 2);
        assert!(matches!(changes.recv().await.unwrap(), ChangeEvent::Menu));

        assert_eq!(fresh.categories().await.unwrap(), vec!["Appetizers", "Desserts"]);
        assert_eq!(fresh.available_items().await.unwrap().len(), 1);
        assert_eq!(fresh.items_by_category("Desserts").await.unwrap()[0].name, "Tiramisu");
    }

    #[tokio::test]
    async fn sync_without_rest_backend_is_unsupported() {
        let menu = repo(None);
        assert!(matches!(menu.sync_with_server().await, Err(RepoError::Unsupported(_))));
    }

    #[tokio::test]
    async fn invalid_items_are_rejected() {
        let menu = repo(None);
        let bad_price = NewMenuItem { price: -1.0, ..soup() };
        assert!(matches!(menu.insert_item(bad_price).await, Err(RepoError::Validation(_))));
        let no_category = NewMenuItem { category: " ".into(), ..soup() };
        assert!(matches!(menu.insert_item(no_category).await, Err(RepoError::Validation(_))));
        assert!(matches!(menu.delete_item(42).await, Err(RepoError::NotFound(_))));
    }
}
