use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use tavola_db::Database;
use tavola_remote::RestaurantClient;
use tavola_types::api::RemoteReservation;
use tavola_types::events::{ChangeEvent, ReservationEvent};
use tavola_types::models::{NewReservation, Reservation, ReservationStatus, User, UserRole};
use tracing::{debug, info, warn};

use crate::feed::ChangeFeed;
use crate::{RepoError, RepoResult, blocking};

#[derive(Clone)]
pub struct ReservationRepository {
    db: Arc<Database>,
    remote: Option<RestaurantClient>,
    feed: ChangeFeed,
}

impl ReservationRepository {
    pub fn new(db: Arc<Database>, remote: Option<RestaurantClient>, feed: ChangeFeed) -> Self {
        Self { db, remote, feed }
    }

    pub async fn all(&self) -> RepoResult<Vec<Reservation>> {
        blocking(&self.db, |db| db.get_all_reservations()).await
    }

    pub async fn for_user(&self, user_id: i64) -> RepoResult<Vec<Reservation>> {
        blocking(&self.db, move |db| db.get_reservations_by_user(user_id)).await
    }

    pub async fn with_status(&self, status: ReservationStatus) -> RepoResult<Vec<Reservation>> {
        blocking(&self.db, move |db| db.get_reservations_by_status(status)).await
    }

    pub async fn on_date(&self, date: &str) -> RepoResult<Vec<Reservation>> {
        let date = date.to_string();
        blocking(&self.db, move |db| db.get_reservations_by_date(&date)).await
    }

    pub async fn get(&self, id: i64) -> RepoResult<Option<Reservation>> {
        blocking(&self.db, move |db| db.get_reservation(id)).await
    }

    pub async fn create(&self, new: NewReservation) -> RepoResult<Reservation> {
        validate(new.table_number, new.number_of_guests, &new.reservation_date, &new.reservation_time)?;

        let user_id = new.user_id;
        let stored = blocking(&self.db, move |db| {
            if !db.user_exists(new.user_id)? {
                return Ok(None);
            }
            db.insert_reservation(&new, Utc::now()).map(Some)
        })
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("user {user_id}")))?;

        info!(id = stored.id, user_id, "reservation created");
        self.feed.publish(ChangeEvent::Reservation(ReservationEvent::Created(stored.clone())));

        if let Some(remote) = &self.remote {
            // The server assigns its own id; later mirrors and syncs go through it.
            let outgoing = RemoteReservation {
                id: 0,
                ..RemoteReservation::from(&stored)
            };
            match remote.create_reservation(&outgoing).await {
                Ok(created) => {
                    let (id, remote_id) = (stored.id, created.id);
                    blocking(&self.db, move |db| db.set_reservation_remote_id(id, remote_id)).await?;
                }
                Err(e) => warn!(id = stored.id, error = %e, "reservation not mirrored to server"),
            }
        }
        Ok(stored)
    }

    /// Edits table, party size, slot and requests; the owner snapshot and
    /// creation time stay as stored. The result is always `Modified`.
    pub async fn update(&self, reservation: Reservation) -> RepoResult<Reservation> {
        validate(
            reservation.table_number,
            reservation.number_of_guests,
            &reservation.reservation_date,
            &reservation.reservation_time,
        )?;

        let existing = self.require(reservation.id).await?;
        if !existing.status.can_transition_to(ReservationStatus::Modified) {
            return Err(RepoError::InvalidTransition {
                id: existing.id,
                from: existing.status,
                to: ReservationStatus::Modified,
            });
        }

        let updated = Reservation {
            user_id: existing.user_id,
            user_name: existing.user_name,
            user_email: existing.user_email,
            status: ReservationStatus::Modified,
            created_at: existing.created_at,
            updated_at: Utc::now(),
            ..reservation
        };
        {
            let updated = updated.clone();
            blocking(&self.db, move |db| db.update_reservation(&updated)).await?;
        }

        info!(id = updated.id, "reservation modified");
        self.feed.publish(ChangeEvent::Reservation(ReservationEvent::Modified(updated.clone())));

        if let Some(remote) = &self.remote {
            match self.remote_id(updated.id).await? {
                Some(remote_id) => {
                    let outgoing = RemoteReservation {
                        id: remote_id,
                        ..RemoteReservation::from(&updated)
                    };
                    if let Err(e) = remote.update_reservation(remote_id, &outgoing).await {
                        warn!(id = updated.id, remote_id, error = %e, "reservation update not mirrored to server");
                    }
                }
                None => debug!(id = updated.id, "reservation was never mirrored, update kept local"),
            }
        }
        Ok(updated)
    }

    /// Cancelling twice is a no-op that returns the stored row.
    pub async fn cancel(&self, id: i64) -> RepoResult<Reservation> {
        let existing = self.require(id).await?;
        if existing.status == ReservationStatus::Cancelled {
            debug!(id, "reservation already cancelled");
            return Ok(existing);
        }

        let now = Utc::now();
        blocking(&self.db, move |db| db.update_reservation_status(id, ReservationStatus::Cancelled, now)).await?;
        let cancelled = Reservation {
            status: ReservationStatus::Cancelled,
            updated_at: now,
            ..existing
        };

        info!(id, "reservation cancelled");
        self.feed.publish(ChangeEvent::Reservation(ReservationEvent::Cancelled(cancelled.clone())));
        let remote_id = self.remote_id(id).await?;
        self.mirror_cancel(id, remote_id).await;
        Ok(cancelled)
    }

    /// Removes the local row. The server only knows cancellation, so that is
    /// what gets mirrored.
    pub async fn delete(&self, id: i64) -> RepoResult<()> {
        let existing = self.require(id).await?;
        let remote_id = self.remote_id(id).await?;
        blocking(&self.db, move |db| db.delete_reservation(id)).await?;

        info!(id, "reservation deleted");
        self.feed.publish(ChangeEvent::Reservation(ReservationEvent::Deleted(existing)));
        self.mirror_cancel(id, remote_id).await;
        Ok(())
    }

    pub async fn update_as(&self, actor: &User, reservation: Reservation) -> RepoResult<Reservation> {
        let existing = self.require(reservation.id).await?;
        authorize(actor, &existing)?;
        self.update(reservation).await
    }

    pub async fn cancel_as(&self, actor: &User, id: i64) -> RepoResult<Reservation> {
        let existing = self.require(id).await?;
        authorize(actor, &existing)?;
        self.cancel(id).await
    }

    /// Pull bookings from the server, all of them or one user's, matched on
    /// server ids. A server row only lands on a linked local row when the
    /// local status may move to it; otherwise the local row wins and a local
    /// cancellation is sent again. Rows whose owner is unknown locally are
    /// skipped.
    pub async fn sync_with_server(&self, user_id: Option<i64>) -> RepoResult<usize> {
        let remote = self
            .remote
            .as_ref()
            .ok_or(RepoError::Unsupported("reservation sync needs a restaurant REST backend"))?;

        let fetched = match user_id {
            Some(user_id) => remote.list_reservations_for_user(user_id).await?,
            None => remote.list_reservations().await?,
        };

        let (count, unsent_cancels) = blocking(&self.db, move |db| {
            let mut count = 0;
            let mut unsent_cancels = Vec::new();
            for incoming in fetched.into_iter().map(Reservation::from) {
                let remote_id = incoming.id;
                if !db.user_exists(incoming.user_id)? {
                    warn!(remote_id, user_id = incoming.user_id, "skipping reservation of unknown user");
                    continue;
                }
                match db.get_reservation_by_remote_id(remote_id)? {
                    Some(local)
                        if local.status == incoming.status || local.status.can_transition_to(incoming.status) =>
                    {
                        db.update_reservation(&Reservation {
                            id: local.id,
                            created_at: local.created_at,
                            ..incoming
                        })?;
                    }
                    Some(local) => {
                        debug!(id = local.id, remote_id, local = %local.status, server = %incoming.status, "keeping local reservation");
                        if local.status == ReservationStatus::Cancelled {
                            unsent_cancels.push((local.id, remote_id));
                        }
                        continue;
                    }
                    None => {
                        db.insert_server_reservation(&incoming)?;
                    }
                }
                count += 1;
            }
            Ok((count, unsent_cancels))
        })
        .await?;

        for (id, remote_id) in unsent_cancels {
            self.mirror_cancel(id, Some(remote_id)).await;
        }

        info!(count, "reservations synced from server");
        self.feed.publish(ChangeEvent::ReservationsSynced { count });
        Ok(count)
    }

    async fn require(&self, id: i64) -> RepoResult<Reservation> {
        self.get(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("reservation {id}")))
    }

    async fn remote_id(&self, id: i64) -> RepoResult<Option<i64>> {
        blocking(&self.db, move |db| db.reservation_remote_id(id)).await
    }

    async fn mirror_cancel(&self, id: i64, remote_id: Option<i64>) {
        let Some(remote) = &self.remote else {
            return;
        };
        let Some(remote_id) = remote_id else {
            debug!(id, "reservation was never mirrored, cancellation kept local");
            return;
        };
        if let Err(e) = remote.cancel_reservation(remote_id).await {
            warn!(id, remote_id, error = %e, "cancellation not mirrored to server");
        }
    }
}

/// Staff may act on any booking, guests only on their own.
fn authorize(actor: &User, reservation: &Reservation) -> RepoResult<()> {
    match actor.role {
        UserRole::Staff => Ok(()),
        UserRole::Guest if reservation.user_id == actor.id => Ok(()),
        UserRole::Guest => Err(RepoError::Forbidden(format!(
            "reservation {} belongs to another guest",
            reservation.id
        ))),
    }
}

fn validate(table: u32, guests: u32, date: &str, time: &str) -> RepoResult<()> {
    if table < 1 {
        return Err(RepoError::Validation("table number must be at least 1".into()));
    }
    if guests < 1 {
        return Err(RepoError::Validation("number of guests must be at least 1".into()));
    }
    if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
        return Err(RepoError::Validation(format!("date must be YYYY-MM-DD, got {date:?}")));
    }
    if time.len() != 5 || NaiveTime::parse_from_str(time, "%H:%M").is_err() {
        return Err(RepoError::Validation(format!("time must be HH:MM, got {time:?}")));
    }
    Ok(())
}
