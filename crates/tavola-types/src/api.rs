//! Wire shapes of the two backends the client mirrors against.
//!
//! The coursework service only knows users, scoped by a student id, and uses
//! its own vocabulary (`firstname`/`lastname`/`usertype`). The restaurant REST
//! service speaks camelCase with epoch-millisecond timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{MenuItem, NewUser, RemoteUser, Reservation, ReservationStatus, User, UserRole};

// -- Coursework user API --

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ApiMessage {
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            message: Some(text.into()),
            detail: None,
        }
    }

    pub fn detail(text: impl Into<String>) -> Self {
        Self {
            message: None,
            detail: Some(text.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourseworkUserPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub username: String,
    pub password: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub contact: String,
    pub usertype: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseworkUserList {
    #[serde(default)]
    pub users: Vec<CourseworkUserPayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseworkUserEnvelope {
    #[serde(default)]
    pub user: Option<CourseworkUserPayload>,
}

impl CourseworkUserPayload {
    pub fn from_new_user(user: &NewUser) -> Self {
        Self::build(&user.email, &user.name, &user.password, user.role, None)
    }

    pub fn from_user(user: &User, password: &str, remote_id: Option<String>) -> Self {
        Self::build(&user.email, &user.name, password, user.role, remote_id)
    }

    fn build(email: &str, name: &str, password: &str, role: UserRole, user_id: Option<String>) -> Self {
        let mut parts = name.split_whitespace();
        let firstname = parts.next().unwrap_or_default().to_string();
        let lastname = parts.collect::<Vec<_>>().join(" ");
        let username = email.split('@').next().unwrap_or_default().to_string();
        let usertype = match role {
            UserRole::Staff => "staff",
            UserRole::Guest => "guest",
        };

        Self {
            user_id,
            username,
            password: password.to_string(),
            firstname,
            lastname,
            email: email.to_string(),
            contact: String::new(),
            usertype: usertype.to_string(),
        }
    }

    pub fn into_remote_user(self) -> RemoteUser {
        let name = [self.firstname.trim(), self.lastname.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let name = if name.is_empty() { self.username } else { name };
        let role = match self.usertype.to_lowercase().as_str() {
            "staff" | "admin" => UserRole::Staff,
            _ => UserRole::Guest,
        };

        RemoteUser {
            remote_id: self.user_id,
            email: self.email,
            password: self.password,
            name,
            role,
        }
    }
}

// -- Restaurant REST API --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteMenuItem {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub image_url: String,
    pub category: String,
    #[serde(default = "default_true")]
    pub available: bool,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteReservation {
    #[serde(default)]
    pub id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub user_email: String,
    pub table_number: u32,
    pub number_of_guests: u32,
    pub reservation_date: String,
    pub reservation_time: String,
    #[serde(default = "default_status")]
    pub status: ReservationStatus,
    #[serde(default)]
    pub special_requests: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

fn default_true() -> bool {
    true
}

fn default_status() -> ReservationStatus {
    ReservationStatus::Confirmed
}

/// Missing or out-of-range timestamps from the wire become "now".
fn from_millis(ms: i64) -> DateTime<Utc> {
    if ms <= 0 {
        return Utc::now();
    }
    DateTime::from_timestamp_millis(ms).unwrap_or_else(Utc::now)
}

impl From<&MenuItem> for RemoteMenuItem {
    fn from(item: &MenuItem) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            description: item.description.clone(),
            price: item.price,
            image_url: item.image_url.clone(),
            category: item.category.clone(),
            available: item.available,
            created_at: item.created_at.timestamp_millis(),
            updated_at: item.updated_at.timestamp_millis(),
        }
    }
}

impl From<RemoteMenuItem> for MenuItem {
    fn from(item: RemoteMenuItem) -> Self {
        Self {
            id: item.id,
            name: item.name,
            description: item.description,
            price: item.price,
            image_url: item.image_url,
            category: item.category,
            available: item.available,
            created_at: from_millis(item.created_at),
            updated_at: from_millis(item.updated_at),
        }
    }
}

impl From<&Reservation> for RemoteReservation {
    fn from(r: &Reservation) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            user_name: r.user_name.clone(),
            user_email: r.user_email.clone(),
            table_number: r.table_number,
            number_of_guests: r.number_of_guests,
            reservation_date: r.reservation_date.clone(),
            reservation_time: r.reservation_time.clone(),
            status: r.status,
            special_requests: r.special_requests.clone().unwrap_or_default(),
            created_at: r.created_at.timestamp_millis(),
            updated_at: r.updated_at.timestamp_millis(),
        }
    }
}

impl From<RemoteReservation> for Reservation {
    fn from(r: RemoteReservation) -> Self {
        let special_requests = Some(r.special_requests).filter(|s| !s.trim().is_empty());
        Self {
            id: r.id,
            user_id: r.user_id,
            user_name: r.user_name,
            user_email: r.user_email,
            table_number: r.table_number,
            number_of_guests: r.number_of_guests,
            reservation_date: r.reservation_date,
            reservation_time: r.reservation_time,
            status: r.status,
            special_requests,
            created_at: from_millis(r.created_at),
            updated_at: from_millis(r.updated_at),
        }
    }
}
