use std::sync::Arc;

use tavola_db::Database;
use tavola_types::models::{NotificationPrefs, NotificationSettingsUpdate, User, UserRole};
use tracing::{debug, info};

use crate::{RepoResult, blocking};

const USER_ID: &str = "user_id";
const USER_EMAIL: &str = "user_email";
const USER_NAME: &str = "user_name";
const USER_ROLE: &str = "user_role";
const IS_LOGGED_IN: &str = "is_logged_in";
const NOTIFICATIONS_ENABLED: &str = "notifications_enabled";
const NOTIFY_NEW_RESERVATIONS: &str = "notify_new_reservations";
const NOTIFY_RESERVATION_CHANGES: &str = "notify_reservation_changes";

/// The signed-in user as remembered across restarts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: i64,
    pub email: String,
    pub name: String,
    pub role: UserRole,
}

impl Session {
    pub fn is_staff(&self) -> bool {
        self.role == UserRole::Staff
    }
}

/// Device-level session state kept in the `preferences` table.
#[derive(Clone)]
pub struct SessionStore {
    db: Arc<Database>,
}

impl SessionStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn save_user_session(&self, user: &User) -> RepoResult<()> {
        let entries = vec![
            (USER_ID, user.id.to_string()),
            (USER_EMAIL, user.email.clone()),
            (USER_NAME, user.name.clone()),
            (USER_ROLE, user.role.as_str().to_string()),
            (IS_LOGGED_IN, "true".to_string()),
        ];
        blocking(&self.db, move |db| db.set_preferences(&entries)).await?;
        info!(user_id = user.id, "session saved");
        Ok(())
    }

    /// Sign out. Notification switches are reset along with the session.
    pub async fn clear(&self) -> RepoResult<()> {
        blocking(&self.db, |db| db.clear_preferences()).await?;
        info!("session cleared");
        Ok(())
    }

    /// `None` unless a complete, well-formed session is stored.
    pub async fn current(&self) -> RepoResult<Option<Session>> {
        blocking(&self.db, |db| {
            if db.get_preference(IS_LOGGED_IN)?.as_deref() != Some("true") {
                return Ok(None);
            }
            let user_id = db.get_preference(USER_ID)?.and_then(|v| v.parse().ok());
            let role = db.get_preference(USER_ROLE)?.and_then(|v| v.parse().ok());
            let email = db.get_preference(USER_EMAIL)?;
            let name = db.get_preference(USER_NAME)?;

            match (user_id, email, name, role) {
                (Some(user_id), Some(email), Some(name), Some(role)) => Ok(Some(Session {
                    user_id,
                    email,
                    name,
                    role,
                })),
                _ => {
                    debug!("stored session is incomplete, treating as signed out");
                    Ok(None)
                }
            }
        })
        .await
    }

    pub async fn notification_prefs(&self) -> RepoResult<NotificationPrefs> {
        blocking(&self.db, |db| {
            let flag = |key: &str| -> anyhow::Result<bool> {
                Ok(db.get_preference(key)?.map(|v| v == "true").unwrap_or(true))
            };
            Ok(NotificationPrefs {
                enabled: flag(NOTIFICATIONS_ENABLED)?,
                new_reservations: flag(NOTIFY_NEW_RESERVATIONS)?,
                reservation_changes: flag(NOTIFY_RESERVATION_CHANGES)?,
            })
        })
        .await
    }

    /// Only the flags present in `update` are written.
    pub async fn update_notification_settings(&self, update: NotificationSettingsUpdate) -> RepoResult<()> {
        let entries: Vec<(&'static str, String)> = [
            (NOTIFICATIONS_ENABLED, update.enabled),
            (NOTIFY_NEW_RESERVATIONS, update.new_reservations),
            (NOTIFY_RESERVATION_CHANGES, update.reservation_changes),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v.to_string())))
        .collect();

        if entries.is_empty() {
            return Ok(());
        }
        blocking(&self.db, move |db| db.set_preferences(&entries)).await
    }
}
