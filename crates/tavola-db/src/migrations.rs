use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

const CURRENT_VERSION: i64 = 2;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id                          INTEGER PRIMARY KEY AUTOINCREMENT,
                remote_id                   TEXT,
                email                       TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password                    TEXT NOT NULL,
                name                        TEXT NOT NULL,
                role                        TEXT NOT NULL,
                notifications_enabled       INTEGER NOT NULL DEFAULT 1,
                notify_new_reservations     INTEGER NOT NULL DEFAULT 1,
                notify_reservation_changes  INTEGER NOT NULL DEFAULT 1,
                created_at                  TEXT NOT NULL
            );

            CREATE INDEX idx_users_remote_id ON users(remote_id);

            CREATE TABLE menu_items (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL,
                description TEXT NOT NULL,
                price       REAL NOT NULL,
                image_url   TEXT NOT NULL,
                category    TEXT NOT NULL,
                available   INTEGER NOT NULL DEFAULT 1,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX idx_menu_items_category ON menu_items(category, name);

            CREATE TABLE reservations (
                id                INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id           INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                user_name         TEXT NOT NULL,
                user_email        TEXT NOT NULL,
                table_number      INTEGER NOT NULL,
                number_of_guests  INTEGER NOT NULL,
                reservation_date  TEXT NOT NULL,
                reservation_time  TEXT NOT NULL,
                status            TEXT NOT NULL DEFAULT 'CONFIRMED',
                special_requests  TEXT,
                created_at        TEXT NOT NULL,
                updated_at        TEXT NOT NULL
            );

            CREATE INDEX idx_reservations_user ON reservations(user_id);
            CREATE INDEX idx_reservations_slot
                ON reservations(reservation_date, reservation_time);

            CREATE TABLE preferences (
                key     TEXT PRIMARY KEY,
                value   TEXT NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (server ids for menu items and reservations)");
        conn.execute_batch(
            "
            ALTER TABLE menu_items ADD COLUMN remote_id INTEGER;
            ALTER TABLE reservations ADD COLUMN remote_id INTEGER;

            CREATE UNIQUE INDEX idx_menu_items_remote_id ON menu_items(remote_id);
            CREATE UNIQUE INDEX idx_reservations_remote_id ON reservations(remote_id);

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete (schema v{})", CURRENT_VERSION);
    Ok(())
}
