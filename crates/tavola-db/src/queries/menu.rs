use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};
use tavola_types::models::{MenuItem, NewMenuItem};

use crate::Database;

const MENU_COLUMNS: &str =
    "id, name, description, price, image_url, category, available, created_at, updated_at";

impl Database {
    pub fn get_all_menu_items(&self) -> Result<Vec<MenuItem>> {
        self.query_menu("1 = 1 ORDER BY category, name", params![])
    }

    pub fn get_available_menu_items(&self) -> Result<Vec<MenuItem>> {
        self.query_menu("available = 1 ORDER BY category, name", params![])
    }

    pub fn get_menu_items_by_category(&self, category: &str) -> Result<Vec<MenuItem>> {
        self.query_menu("category = ?1 ORDER BY name", params![category])
    }

    pub fn get_menu_categories(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT DISTINCT category FROM menu_items ORDER BY category")?;
            let rows = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_menu_item(&self, id: i64) -> Result<Option<MenuItem>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {MENU_COLUMNS} FROM menu_items WHERE id = ?1");
            Ok(conn.query_row(&sql, [id], map_menu_item).optional()?)
        })
    }

    pub fn count_menu_items(&self) -> Result<i64> {
        self.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM menu_items", [], |r| r.get(0))?))
    }

    /// Insert with both timestamps set to `now`; returns the stored item.
    pub fn insert_menu_item(&self, item: &NewMenuItem, now: chrono::DateTime<chrono::Utc>) -> Result<MenuItem> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO menu_items
                     (name, description, price, image_url, category, available, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    item.name,
                    item.description,
                    item.price,
                    item.image_url,
                    item.category,
                    item.available,
                    now,
                ],
            )?;
            Ok(MenuItem {
                id: conn.last_insert_rowid(),
                name: item.name.clone(),
                description: item.description.clone(),
                price: item.price,
                image_url: item.image_url.clone(),
                category: item.category.clone(),
                available: item.available,
                created_at: now,
                updated_at: now,
            })
        })
    }

    /// Apply the server's copy of the menu. `id` of each item is the
    /// server id: rows already linked to it are overwritten in place, the
    /// rest are inserted and linked. Local-only rows are left alone.
    pub fn merge_server_menu_items(&self, items: &[MenuItem]) -> Result<usize> {
        self.with_conn_mut(|conn| {
            for item in items {
                let local: Option<i64> = conn
                    .query_row("SELECT id FROM menu_items WHERE remote_id = ?1", [item.id], |r| r.get(0))
                    .optional()?;
                match local {
                    Some(id) => {
                        conn.execute(
                            "UPDATE menu_items SET
                                 name = ?2, description = ?3, price = ?4, image_url = ?5, category = ?6,
                                 available = ?7, created_at = ?8, updated_at = ?9
                             WHERE id = ?1",
                            params![
                                id,
                                item.name,
                                item.description,
                                item.price,
                                item.image_url,
                                item.category,
                                item.available,
                                item.created_at,
                                item.updated_at,
                            ],
                        )?;
                    }
                    None => {
                        conn.execute(
                            "INSERT INTO menu_items
                                 (name, description, price, image_url, category, available,
                                  created_at, updated_at, remote_id)
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                            params![
                                item.name,
                                item.description,
                                item.price,
                                item.image_url,
                                item.category,
                                item.available,
                                item.created_at,
                                item.updated_at,
                                item.id,
                            ],
                        )?;
                    }
                }
            }
            Ok(items.len())
        })
    }

    /// Server id a local row was mirrored under, if any.
    pub fn menu_item_remote_id(&self, id: i64) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row("SELECT remote_id FROM menu_items WHERE id = ?1", [id], |r| r.get::<_, Option<i64>>(0))
                .optional()?
                .flatten())
        })
    }

    pub fn set_menu_item_remote_id(&self, id: i64, remote_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE menu_items SET remote_id = ?2 WHERE id = ?1",
                params![id, remote_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn update_menu_item(&self, item: &MenuItem) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE menu_items SET
                     name = ?2, description = ?3, price = ?4, image_url = ?5, category = ?6,
                     available = ?7, updated_at = ?8
                 WHERE id = ?1",
                params![
                    item.id,
                    item.name,
                    item.description,
                    item.price,
                    item.image_url,
                    item.category,
                    item.available,
                    item.updated_at,
                ],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_menu_item(&self, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| Ok(conn.execute("DELETE FROM menu_items WHERE id = ?1", [id])? > 0))
    }

    fn query_menu(&self, clause: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<MenuItem>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {MENU_COLUMNS} FROM menu_items WHERE {clause}");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params, map_menu_item)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_menu_item(row: &Row<'_>) -> rusqlite::Result<MenuItem> {
    Ok(MenuItem {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        price: row.get(3)?,
        image_url: row.get(4)?,
        category: row.get(5)?,
        available: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn dish(name: &str, category: &str, available: bool) -> NewMenuItem {
        NewMenuItem {
            name: name.into(),
            description: String::new(),
            price: 9.5,
            image_url: String::new(),
            category: category.into(),
            available,
        }
    }

    #[test]
    fn listings_are_ordered_and_filtered() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        db.insert_menu_item(&dish("Tiramisu", "Desserts", true), now).unwrap();
        db.insert_menu_item(&dish("Bruschetta", "Appetizers", false), now).unwrap();
        db.insert_menu_item(&dish("Affogato", "Desserts", true), now).unwrap();

        let names: Vec<_> = db.get_all_menu_items().unwrap().into_iter().map(|i| i.name).collect();
        assert_eq!(names, ["Bruschetta", "Affogato", "Tiramisu"]);

        assert_eq!(db.get_available_menu_items().unwrap().len(), 2);
        assert_eq!(db.get_menu_items_by_category("Desserts").unwrap()[0].name, "Affogato");
        assert_eq!(db.get_menu_categories().unwrap(), ["Appetizers", "Desserts"]);
        assert_eq!(db.count_menu_items().unwrap(), 3);
    }

    #[test]
    fn server_items_merge_by_server_id() {
        let db = Database::open_in_memory().unwrap();
        let local = db.insert_menu_item(&dish("Soup", "Starters", true), Utc::now()).unwrap();
        assert_eq!(db.menu_item_remote_id(local.id).unwrap(), None);
        assert!(db.set_menu_item_remote_id(local.id, 40).unwrap());

        let mut linked = local.clone();
        linked.id = 40;
        linked.price = 4.0;
        let mut fresh = local.clone();
        fresh.id = local.id;
        fresh.name = "Bread".into();

        assert_eq!(db.merge_server_menu_items(&[linked, fresh]).unwrap(), 2);
        assert_eq!(db.get_menu_item(local.id).unwrap().unwrap().price, 4.0);
        assert_eq!(db.get_menu_item(local.id).unwrap().unwrap().name, "Soup");

        let all = db.get_all_menu_items().unwrap();
        assert_eq!(all.len(), 2);
        let bread = all.iter().find(|i| i.name == "Bread").unwrap();
        assert_ne!(bread.id, local.id);
        assert_eq!(db.menu_item_remote_id(bread.id).unwrap(), Some(local.id));

        assert_eq!(db.merge_server_menu_items(&[]).unwrap(), 0);
        assert_eq!(db.count_menu_items().unwrap(), 2);
    }

    #[test]
    fn update_and_delete_report_misses() {
        let db = Database::open_in_memory().unwrap();
        let mut item = db.insert_menu_item(&dish("Soup", "Starters", true), Utc::now()).unwrap();
        item.available = false;
        assert!(db.update_menu_item(&item).unwrap());
        assert!(!db.get_menu_item(item.id).unwrap().unwrap().available);

        assert!(db.delete_menu_item(item.id).unwrap());
        assert!(!db.delete_menu_item(item.id).unwrap());
        item.id = 77;
        assert!(!db.update_menu_item(&item).unwrap());
    }
}
