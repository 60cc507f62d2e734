use serde::{Deserialize, Serialize};

use crate::models::Reservation;

/// Published after every successful local write so readers can refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ChangeEvent {
    /// Any row of the users table changed
    Users,

    /// Menu items were inserted, updated, deleted or synced
    Menu,

    /// A single booking changed
    Reservation(ReservationEvent),

    /// Reservations were bulk-replaced from the server
    ReservationsSynced { count: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reservation")]
pub enum ReservationEvent {
    Created(Reservation),
    Modified(Reservation),
    Cancelled(Reservation),
    Deleted(Reservation),
}

impl ReservationEvent {
    pub fn reservation(&self) -> &Reservation {
        match self {
            Self::Created(r) | Self::Modified(r) | Self::Cancelled(r) | Self::Deleted(r) => r,
        }
    }
}
