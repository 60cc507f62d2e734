use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// -- Users --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Staff,
    Guest,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Staff => "STAFF",
            Self::Guest => "GUEST",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STAFF" => Ok(Self::Staff),
            "GUEST" => Ok(Self::Guest),
            other => Err(format!("unknown user role: {other}")),
        }
    }
}

/// Per-channel notification switches. `enabled` gates the other two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPrefs {
    pub enabled: bool,
    pub new_reservations: bool,
    pub reservation_changes: bool,
}

impl Default for NotificationPrefs {
    fn default() -> Self {
        Self {
            enabled: true,
            new_reservations: true,
            reservation_changes: true,
        }
    }
}

/// Partial update of [`NotificationPrefs`]; `None` leaves a flag untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotificationSettingsUpdate {
    pub enabled: Option<bool>,
    pub new_reservations: Option<bool>,
    pub reservation_changes: Option<bool>,
}

impl NotificationSettingsUpdate {
    pub fn apply(&self, prefs: &mut NotificationPrefs) {
        if let Some(enabled) = self.enabled {
            prefs.enabled = enabled;
        }
        if let Some(v) = self.new_reservations {
            prefs.new_reservations = v;
        }
        if let Some(v) = self.reservation_changes {
            prefs.reservation_changes = v;
        }
    }
}

/// A locally known account. The password hash never leaves the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub remote_id: Option<String>,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub notifications: NotificationPrefs,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: UserRole,
}

/// A user as reported by the coursework backend, already mapped to local
/// vocabulary but not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteUser {
    pub remote_id: Option<String>,
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: UserRole,
}

// -- Menu --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub image_url: String,
    pub category: String,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMenuItem {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub image_url: String,
    pub category: String,
    pub available: bool,
}

// -- Reservations --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Confirmed,
    Modified,
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "CONFIRMED",
            Self::Modified => "MODIFIED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Bookings only move forward: confirmed, then modified any number of
    /// times, then cancelled. Nothing re-enters `Confirmed` or leaves
    /// `Cancelled`.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Confirmed, Self::Modified)
                | (Self::Confirmed, Self::Cancelled)
                | (Self::Modified, Self::Modified)
                | (Self::Modified, Self::Cancelled)
        )
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONFIRMED" => Ok(Self::Confirmed),
            "MODIFIED" => Ok(Self::Modified),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(format!("unknown reservation status: {other}")),
        }
    }
}

/// One row per booking. Name and email are a snapshot of the owner at
/// booking time and are not refreshed when the user changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub user_email: String,
    pub table_number: u32,
    pub number_of_guests: u32,
    /// `YYYY-MM-DD`
    pub reservation_date: String,
    /// `HH:MM`
    pub reservation_time: String,
    pub status: ReservationStatus,
    pub special_requests: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn summary(&self) -> String {
        format!(
            "{} at {}, table {} for {}",
            self.reservation_date, self.reservation_time, self.table_number, self.number_of_guests
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewReservation {
    pub user_id: i64,
    pub user_name: String,
    pub user_email: String,
    pub table_number: u32,
    pub number_of_guests: u32,
    pub reservation_date: String,
    pub reservation_time: String,
    pub special_requests: Option<String>,
}

impl NewReservation {
    pub fn for_user(user: &User, table_number: u32, number_of_guests: u32, date: &str, time: &str) -> Self {
        Self {
            user_id: user.id,
            user_name: user.name.clone(),
            user_email: user.email.clone(),
            table_number,
            number_of_guests,
            reservation_date: date.to_string(),
            reservation_time: time.to_string(),
            special_requests: None,
        }
    }
}
