use std::sync::Arc;

use anyhow::Result;
use tavola_db::Database;
use tavola_remote::RemoteConfig;
use tavola_types::events::ChangeEvent;
use tavola_types::models::User;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::feed::ChangeFeed;
use crate::menu::MenuRepository;
use crate::notify::Notifier;
use crate::reservations::ReservationRepository;
use crate::seed::seed_database;
use crate::session::SessionStore;
use crate::users::UserRepository;
use crate::{RepoError, RepoResult};

/// Everything a host needs, wired to one database and one change feed.
#[derive(Clone)]
pub struct App {
    pub db: Arc<Database>,
    pub feed: ChangeFeed,
    pub notifier: Notifier,
    pub session: SessionStore,
    pub users: UserRepository,
    pub menu: MenuRepository,
    pub reservations: ReservationRepository,
}

impl App {
    pub async fn open(config: &AppConfig) -> Result<Self> {
        let path = config.db_path.clone();
        let db = tokio::task::spawn_blocking(move || Database::open(&path)).await??;
        Self::with_database(db, &config.remote, config.seed).await
    }

    pub async fn with_database(db: Database, remote: &RemoteConfig, seed: bool) -> Result<Self> {
        let db = Arc::new(db);
        if seed {
            seed_database(&db).await?;
        }

        let feed = ChangeFeed::default();
        let rest = remote.restaurant_client()?;
        if rest.is_none() {
            info!("no restaurant REST backend configured, menu and reservations stay local");
        }

        Ok(Self {
            users: UserRepository::new(Arc::clone(&db), remote.coursework_client()?, feed.clone()),
            menu: MenuRepository::new(Arc::clone(&db), rest.clone(), feed.clone()),
            reservations: ReservationRepository::new(Arc::clone(&db), rest, feed.clone()),
            session: SessionStore::new(Arc::clone(&db)),
            notifier: Notifier::default(),
            feed,
            db,
        })
    }

    /// Log in and remember the user on this device.
    pub async fn sign_in(&self, email: &str, password: &str) -> RepoResult<User> {
        let user = self.users.login(email, password).await?;
        self.session.save_user_session(&user).await?;
        Ok(user)
    }

    pub async fn sign_out(&self) -> RepoResult<()> {
        self.session.clear().await
    }

    /// The remembered user, re-read from the store.
    pub async fn current_user(&self) -> RepoResult<Option<User>> {
        match self.session.current().await? {
            Some(session) => self.users.get_user_by_id(session.user_id).await,
            None => Ok(None),
        }
    }

    pub async fn require_user(&self) -> RepoResult<User> {
        self.current_user()
            .await?
            .ok_or_else(|| RepoError::Forbidden("no user is signed in".into()))
    }

    /// Relay reservation changes to the notifier, gated by this device's
    /// notification switches. Runs until the feed is dropped.
    pub fn spawn_notifications(&self) -> JoinHandle<()> {
        let mut rx = self.feed.subscribe();
        let session = self.session.clone();
        let notifier = self.notifier.clone();

        tokio::spawn(async move {
            loop {
                let event = match rx.recv().await {
                    Ok(ChangeEvent::Reservation(event)) => event,
                    Ok(_) => continue,
                    Err(RecvError::Lagged(n)) => {
                        warn!(skipped = n, "notification relay lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                let prefs = match session.notification_prefs().await {
                    Ok(prefs) => prefs,
                    Err(e) => {
                        warn!(error = %e, "could not read notification preferences");
                        continue;
                    }
                };
                notifier.notify(&event, &prefs);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tavola_types::models::{NewReservation, NotificationSettingsUpdate, UserRole};
    use tokio::time::timeout;

    use super::*;
    use crate::notify::NotificationKind;
    use crate::test_support::{TestBackend, remote_config, unreachable_url};

    async fn offline_app() -> App {
        let remote = remote_config(&unreachable_url(), None);
        App::with_database(Database::open_in_memory().unwrap(), &remote, true)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn seeded_accounts_sign_in_offline() {
        let app = offline_app().await;
        assert_eq!(app.menu.all_items().await.unwrap().len(), 19);

        let staff = app.sign_in("staff@restaurant.com", "staff123").await.unwrap();
        assert_eq!(staff.role, UserRole::Staff);
        assert_eq!(app.current_user().await.unwrap().unwrap().id, staff.id);

        app.sign_out().await.unwrap();
        assert!(app.current_user().await.unwrap().is_none());
        assert!(matches!(app.require_user().await, Err(RepoError::Forbidden(_))));
        assert!(matches!(
            app.sign_in("staff@restaurant.com", "guest123").await,
            Err(RepoError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn reservation_changes_become_notifications() {
        let app = offline_app().await;
        let mut notifications = app.notifier.subscribe();
        let relay = app.spawn_notifications();

        let guest = app.sign_in("guest@restaurant.com", "guest123").await.unwrap();
        let booking = app
            .reservations
            .create(NewReservation::for_user(&guest, 2, 2, "2026-07-01", "20:00"))
            .await
            .unwrap();

        let first = timeout(Duration::from_secs(5), notifications.recv()).await.unwrap().unwrap();
        assert_eq!(first.kind, NotificationKind::NewReservation);
        assert!(first.body.contains("Jane Customer"));

        app.session
            .update_notification_settings(NotificationSettingsUpdate {
                reservation_changes: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();
        app.reservations.cancel(booking.id).await.unwrap();
        app.reservations
            .create(NewReservation::for_user(&guest, 3, 2, "2026-07-02", "20:00"))
            .await
            .unwrap();

        let next = timeout(Duration::from_secs(5), notifications.recv()).await.unwrap().unwrap();
        assert_eq!(next.kind, NotificationKind::NewReservation);

        relay.abort();
    }

    #[tokio::test]
    async fn online_app_mirrors_everything() {
        let backend = TestBackend::spawn().await;
        let remote = remote_config(&backend.url, Some(&backend.url));
        let app = App::with_database(Database::open_in_memory().unwrap(), &remote, false)
            .await
            .unwrap();

        let user = app
            .users
            .register(tavola_types::models::NewUser {
                email: "walk-in@example.com".into(),
                password: "pw".into(),
                name: "Walk In".into(),
                role: UserRole::Guest,
            })
            .await
            .unwrap();
        app.reservations
            .create(NewReservation::for_user(&user, 1, 2, "2026-07-01", "12:00"))
            .await
            .unwrap();

        assert_eq!(backend.state.catalog.read().await.reservations.len(), 1);
        assert_eq!(backend.state.students.read().await["test-student"].len(), 1);
        assert!(app.menu.all_items().await.unwrap().is_empty());
    }
}
