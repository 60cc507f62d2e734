use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use tavola_types::models::{NewReservation, Reservation, ReservationStatus};

use super::enum_column;
use crate::Database;

const RESERVATION_COLUMNS: &str = "id, user_id, user_name, user_email, table_number, number_of_guests, \
     reservation_date, reservation_time, status, special_requests, created_at, updated_at";

const NEWEST_FIRST: &str = "ORDER BY reservation_date DESC, reservation_time DESC";

impl Database {
    pub fn get_all_reservations(&self) -> Result<Vec<Reservation>> {
        self.query_reservations(&format!("1 = 1 {NEWEST_FIRST}"), params![])
    }

    pub fn get_reservations_by_user(&self, user_id: i64) -> Result<Vec<Reservation>> {
        self.query_reservations(&format!("user_id = ?1 {NEWEST_FIRST}"), params![user_id])
    }

    pub fn get_reservations_by_status(&self, status: ReservationStatus) -> Result<Vec<Reservation>> {
        self.query_reservations(&format!("status = ?1 {NEWEST_FIRST}"), params![status.as_str()])
    }

    /// Bookings on one day, earliest slot first.
    pub fn get_reservations_by_date(&self, date: &str) -> Result<Vec<Reservation>> {
        self.query_reservations("reservation_date = ?1 ORDER BY reservation_time", params![date])
    }

    pub fn get_reservation(&self, id: i64) -> Result<Option<Reservation>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = ?1");
            Ok(conn.query_row(&sql, [id], map_reservation).optional()?)
        })
    }

    /// New bookings always start out confirmed.
    pub fn insert_reservation(&self, new: &NewReservation, now: DateTime<Utc>) -> Result<Reservation> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO reservations
                     (user_id, user_name, user_email, table_number, number_of_guests,
                      reservation_date, reservation_time, status, special_requests, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
                params![
                    new.user_id,
                    new.user_name,
                    new.user_email,
                    new.table_number,
                    new.number_of_guests,
                    new.reservation_date,
                    new.reservation_time,
                    ReservationStatus::Confirmed.as_str(),
                    new.special_requests,
                    now,
                ],
            )?;
            Ok(Reservation {
                id: conn.last_insert_rowid(),
                user_id: new.user_id,
                user_name: new.user_name.clone(),
                user_email: new.user_email.clone(),
                table_number: new.table_number,
                number_of_guests: new.number_of_guests,
                reservation_date: new.reservation_date.clone(),
                reservation_time: new.reservation_time.clone(),
                status: ReservationStatus::Confirmed,
                special_requests: new.special_requests.clone(),
                created_at: now,
                updated_at: now,
            })
        })
    }

    /// Local row mirrored under `remote_id` on the server.
    pub fn get_reservation_by_remote_id(&self, remote_id: i64) -> Result<Option<Reservation>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE remote_id = ?1");
            Ok(conn.query_row(&sql, [remote_id], map_reservation).optional()?)
        })
    }

    /// Store a booking first seen on the server. `r.id` is the server id;
    /// the returned row carries the new local id. Fails when the owner is
    /// unknown locally.
    pub fn insert_server_reservation(&self, r: &Reservation) -> Result<Reservation> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO reservations
                     (user_id, user_name, user_email, table_number, number_of_guests, reservation_date,
                      reservation_time, status, special_requests, created_at, updated_at, remote_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    r.user_id,
                    r.user_name,
                    r.user_email,
                    r.table_number,
                    r.number_of_guests,
                    r.reservation_date,
                    r.reservation_time,
                    r.status.as_str(),
                    r.special_requests,
                    r.created_at,
                    r.updated_at,
                    r.id,
                ],
            )?;
            Ok(Reservation {
                id: conn.last_insert_rowid(),
                ..r.clone()
            })
        })
    }

    pub fn reservation_remote_id(&self, id: i64) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row("SELECT remote_id FROM reservations WHERE id = ?1", [id], |r| {
                    r.get::<_, Option<i64>>(0)
                })
                .optional()?
                .flatten())
        })
    }

    pub fn set_reservation_remote_id(&self, id: i64, remote_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE reservations SET remote_id = ?2 WHERE id = ?1",
                params![id, remote_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn update_reservation(&self, r: &Reservation) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE reservations SET
                     user_id = ?2, user_name = ?3, user_email = ?4, table_number = ?5,
                     number_of_guests = ?6, reservation_date = ?7, reservation_time = ?8,
                     status = ?9, special_requests = ?10, updated_at = ?11
                 WHERE id = ?1",
                params![
                    r.id,
                    r.user_id,
                    r.user_name,
                    r.user_email,
                    r.table_number,
                    r.number_of_guests,
                    r.reservation_date,
                    r.reservation_time,
                    r.status.as_str(),
                    r.special_requests,
                    r.updated_at,
                ],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn update_reservation_status(
        &self,
        id: i64,
        status: ReservationStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE reservations SET status = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, status.as_str(), updated_at],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_reservation(&self, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| Ok(conn.execute("DELETE FROM reservations WHERE id = ?1", [id])? > 0))
    }

    fn query_reservations(&self, clause: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<Reservation>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE {clause}");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params, map_reservation)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_reservation(row: &Row<'_>) -> rusqlite::Result<Reservation> {
    Ok(Reservation {
        id: row.get(0)?,
        user_id: row.get(1)?,
        user_name: row.get(2)?,
        user_email: row.get(3)?,
        table_number: row.get(4)?,
        number_of_guests: row.get(5)?,
        reservation_date: row.get(6)?,
        reservation_time: row.get(7)?,
        status: enum_column(row, 8)?,
        special_requests: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}
