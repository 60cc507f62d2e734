use std::sync::Arc;

use tavola_types::events::ReservationEvent;
use tavola_types::models::NotificationPrefs;
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    NewReservation,
    ReservationModified,
    ReservationCancelled,
}

impl NotificationKind {
    /// Stable id per kind, so a newer notification of the same kind
    /// replaces the previous one on the host.
    pub fn id(self) -> u32 {
        match self {
            Self::NewReservation => 1,
            Self::ReservationModified => 2,
            Self::ReservationCancelled => 3,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::NewReservation => "New Reservation",
            Self::ReservationModified => "Reservation Modified",
            Self::ReservationCancelled => "Reservation Cancelled",
        }
    }

    fn allowed_by(self, prefs: &NotificationPrefs) -> bool {
        prefs.enabled
            && match self {
                Self::NewReservation => prefs.new_reservations,
                Self::ReservationModified | Self::ReservationCancelled => prefs.reservation_changes,
            }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
}

impl Notification {
    /// Deletions are silent.
    pub fn for_event(event: &ReservationEvent) -> Option<Self> {
        let (kind, body) = match event {
            ReservationEvent::Created(r) => (
                NotificationKind::NewReservation,
                format!(
                    "{} made a reservation for {} at {}",
                    r.user_name, r.reservation_date, r.reservation_time
                ),
            ),
            ReservationEvent::Modified(r) => (
                NotificationKind::ReservationModified,
                format!("Your reservation has been updated: {}", r.summary()),
            ),
            ReservationEvent::Cancelled(r) => (
                NotificationKind::ReservationCancelled,
                format!("Your reservation has been cancelled: {}", r.summary()),
            ),
            ReservationEvent::Deleted(_) => return None,
        };
        Some(Self {
            kind,
            title: kind.title().to_string(),
            body,
        })
    }
}

/// Turns reservation events into user-facing notifications and hands them
/// to whoever displays them.
#[derive(Clone)]
pub struct Notifier {
    tx: Arc<broadcast::Sender<Notification>>,
}

impl Default for Notifier {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx: Arc::new(tx) }
    }
}

impl Notifier {
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    /// Returns the notification that was emitted, if any.
    pub fn notify(&self, event: &ReservationEvent, prefs: &NotificationPrefs) -> Option<Notification> {
        let notification = Notification::for_event(event)?;
        if !notification.kind.allowed_by(prefs) {
            debug!(kind = ?notification.kind, "notification suppressed by preferences");
            return None;
        }
        let _ = self.tx.send(notification.clone());
        Some(notification)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tavola_types::models::{Reservation, ReservationStatus};

    use super::*;

    fn booking() -> Reservation {
        let now = Utc::now();
        Reservation {
            id: 7,
            user_id: 2,
            user_name: "Jane Customer".into(),
            user_email: "guest@restaurant.com".into(),
            table_number: 4,
            number_of_guests: 2,
            reservation_date: "2026-06-01".into(),
            reservation_time: "19:30".into(),
            status: ReservationStatus::Confirmed,
            special_requests: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn texts_follow_the_event() {
        let created = Notification::for_event(&ReservationEvent::Created(booking())).unwrap();
        assert_eq!(created.title, "New Reservation");
        assert_eq!(created.body, "Jane Customer made a reservation for 2026-06-01 at 19:30");
        assert_eq!(created.kind.id(), 1);

        let cancelled = Notification::for_event(&ReservationEvent::Cancelled(booking())).unwrap();
        assert_eq!(cancelled.title, "Reservation Cancelled");
        assert!(cancelled.body.contains("table 4 for 2"));

        assert!(Notification::for_event(&ReservationEvent::Deleted(booking())).is_none());
    }

    #[tokio::test]
    async fn preferences_gate_delivery() {
        let notifier = Notifier::default();
        let mut rx = notifier.subscribe();

        let mut prefs = NotificationPrefs::default();
        prefs.reservation_changes = false;
        assert!(notifier.notify(&ReservationEvent::Modified(booking()), &prefs).is_none());
        assert!(notifier.notify(&ReservationEvent::Created(booking()), &prefs).is_some());
        assert_eq!(rx.recv().await.unwrap().kind, NotificationKind::NewReservation);

        prefs.enabled = false;
        assert!(notifier.notify(&ReservationEvent::Created(booking()), &prefs).is_none());
        assert!(rx.try_recv().is_err());
    }
}
