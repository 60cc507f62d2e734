use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tavola_types::models::{NotificationSettingsUpdate, User, UserRole};

use super::enum_column;
use crate::Database;
use crate::models::UserRow;

const USER_COLUMNS: &str = "id, remote_id, email, password, name, role, notifications_enabled, \
     notify_new_reservations, notify_reservation_changes, created_at";

impl Database {
    /// Insert a user; fails on a duplicate email (compared case-insensitively).
    /// The `id` of `user` is ignored. Returns the new row id.
    pub fn insert_user(&self, user: &User, password_hash: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (remote_id, email, password, name, role, notifications_enabled,
                     notify_new_reservations, notify_reservation_changes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    user.remote_id,
                    user.email,
                    password_hash,
                    user.name,
                    user.role.as_str(),
                    user.notifications.enabled,
                    user.notifications.new_reservations,
                    user.notifications.reservation_changes,
                    user.created_at,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", params![id]))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email = ?1", params![email.trim()]))
    }

    pub fn get_user_by_remote_id(&self, remote_id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "remote_id = ?1", params![remote_id]))
    }

    pub fn user_exists(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row("SELECT 1 FROM users WHERE id = ?1", [id], |r| r.get(0))
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Overwrite every mutable column of `user`. The password hash is only
    /// replaced when one is given. Returns whether a row matched.
    pub fn update_user(&self, user: &User, password_hash: Option<&str>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET
                     remote_id = ?2, email = ?3, password = COALESCE(?4, password), name = ?5,
                     role = ?6, notifications_enabled = ?7, notify_new_reservations = ?8,
                     notify_reservation_changes = ?9
                 WHERE id = ?1",
                params![
                    user.id,
                    user.remote_id,
                    user.email,
                    password_hash,
                    user.name,
                    user.role.as_str(),
                    user.notifications.enabled,
                    user.notifications.new_reservations,
                    user.notifications.reservation_changes,
                ],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn set_user_remote_id(&self, id: i64, remote_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET remote_id = ?2 WHERE id = ?1",
                params![id, remote_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn update_notification_settings(&self, id: i64, update: &NotificationSettingsUpdate) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET
                     notifications_enabled = COALESCE(?2, notifications_enabled),
                     notify_new_reservations = COALESCE(?3, notify_new_reservations),
                     notify_reservation_changes = COALESCE(?4, notify_reservation_changes)
                 WHERE id = ?1",
                params![id, update.enabled, update.new_reservations, update.reservation_changes],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn get_users_by_role(&self, role: UserRole) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE role = ?1 ORDER BY id");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([role.as_str()], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns the number of rows removed (their reservations cascade).
    pub fn delete_user_by_remote_id(&self, remote_id: &str) -> Result<usize> {
        self.with_conn_mut(|conn| Ok(conn.execute("DELETE FROM users WHERE remote_id = ?1", [remote_id])?))
    }
}

fn query_user(conn: &Connection, predicate: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {predicate} LIMIT 1");
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row(params, map_user).optional()?;
    Ok(row)
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        remote_id: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        name: row.get(4)?,
        role: enum_column(row, 5)?,
        notifications_enabled: row.get(6)?,
        notify_new_reservations: row.get(7)?,
        notify_reservation_changes: row.get(8)?,
        created_at: row.get(9)?,
    })
}
