use anyhow::Result;
use rusqlite::{OptionalExtension, params};

use crate::Database;

// -- Key/value preferences (session, device-level notification switches) --

impl Database {
    pub fn get_preference(&self, key: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row("SELECT value FROM preferences WHERE key = ?1", [key], |r| r.get(0))
                .optional()?)
        })
    }

    /// Write several keys atomically.
    pub fn set_preferences(&self, entries: &[(&str, String)]) -> Result<()> {
        self.with_conn_mut(|conn| {
            let mut stmt = conn.prepare(
                "INSERT INTO preferences (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            )?;
            for (key, value) in entries {
                stmt.execute(params![key, value])?;
            }
            Ok(())
        })
    }

    pub fn remove_preferences(&self, keys: &[&str]) -> Result<()> {
        self.with_conn_mut(|conn| {
            let mut stmt = conn.prepare("DELETE FROM preferences WHERE key = ?1")?;
            for key in keys {
                stmt.execute([key])?;
            }
            Ok(())
        })
    }

    pub fn clear_preferences(&self) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM preferences", [])?;
            Ok(())
        })
    }
}
