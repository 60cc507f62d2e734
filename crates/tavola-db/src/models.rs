//! Database row types. Menu items and reservations map one-to-one onto the
//! shared models; users carry the password hash, which the shared `User`
//! deliberately omits.

use chrono::{DateTime, Utc};
use tavola_types::models::{NotificationPrefs, User, UserRole};

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub remote_id: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: UserRole,
    pub notifications_enabled: bool,
    pub notify_new_reservations: bool,
    pub notify_reservation_changes: bool,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            remote_id: self.remote_id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            notifications: NotificationPrefs {
                enabled: self.notifications_enabled,
                new_reservations: self.notify_new_reservations,
                reservation_changes: self.notify_reservation_changes,
            },
            created_at: self.created_at,
        }
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        row.to_user()
    }
}
