use std::sync::Arc;

use chrono::Utc;
use tavola_db::Database;
use tavola_remote::CourseworkClient;
use tavola_types::api::CourseworkUserPayload;
use tavola_types::events::ChangeEvent;
use tavola_types::models::{NewUser, NotificationPrefs, NotificationSettingsUpdate, RemoteUser, User, UserRole};
use tracing::{debug, info, warn};

use crate::feed::ChangeFeed;
use crate::password::{hash_password, verify_password};
use crate::{RepoError, RepoResult, blocking};

/// Accounts. The coursework service is the source of truth for credentials;
/// the local table is a cache that keeps login working offline.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<Database>,
    remote: CourseworkClient,
    feed: ChangeFeed,
}

impl UserRepository {
    pub fn new(db: Arc<Database>, remote: CourseworkClient, feed: ChangeFeed) -> Self {
        Self { db, remote, feed }
    }

    pub fn remote(&self) -> &CourseworkClient {
        &self.remote
    }

    /// Remote credentials win; the local hash is only consulted when the
    /// remote has no match or cannot be reached.
    pub async fn login(&self, email: &str, password: &str) -> RepoResult<User> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(RepoError::InvalidCredentials);
        }

        match self.fetch_remote_users().await {
            Ok(remote_users) => {
                let matched = remote_users
                    .into_iter()
                    .find(|u| u.email.trim().eq_ignore_ascii_case(email) && u.password == password);
                if let Some(remote_user) = matched {
                    let user = self.persist_or_update_local(remote_user).await?;
                    info!(user_id = user.id, "login via remote");
                    return Ok(user);
                }
            }
            Err(e) => debug!(error = %e, "remote users unavailable, trying local login"),
        }

        let (email, password) = (email.to_string(), password.to_string());
        let user = blocking(&self.db, move |db| {
            Ok(db
                .get_user_by_email(&email)?
                .filter(|row| verify_password(&password, &row.password_hash))
                .map(User::from))
        })
        .await?;

        match user {
            Some(user) => {
                info!(user_id = user.id, "login via local store");
                Ok(user)
            }
            None => Err(RepoError::InvalidCredentials),
        }
    }

    /// Registration needs the remote: the account is created there first,
    /// then cached locally with whatever the remote assigned.
    pub async fn register(&self, new_user: NewUser) -> RepoResult<User> {
        validate_new_user(&new_user)?;

        let email = new_user.email.trim().to_string();
        let exists = {
            let email = email.clone();
            blocking(&self.db, move |db| Ok(db.get_user_by_email(&email)?.is_some())).await?
        };
        if exists {
            return Err(RepoError::AlreadyExists(format!("user {email}")));
        }

        self.ensure_student_database().await;
        let payload = CourseworkUserPayload::from_new_user(&NewUser {
            email: email.clone(),
            ..new_user.clone()
        });
        self.remote.create_user(&payload).await?;

        let created = match self.fetch_remote_users().await {
            Ok(users) => users.into_iter().find(|u| u.email.trim().eq_ignore_ascii_case(&email)),
            Err(e) => {
                warn!(error = %e, "could not re-read remote users after registration");
                None
            }
        };

        let mut user = User {
            id: 0,
            remote_id: None,
            email,
            name: new_user.name.trim().to_string(),
            role: new_user.role,
            notifications: NotificationPrefs::default(),
            created_at: Utc::now(),
        };
        let mut password = new_user.password;
        if let Some(remote_user) = created {
            user.remote_id = remote_user.remote_id;
            user.role = remote_user.role;
            if !remote_user.name.trim().is_empty() {
                user.name = remote_user.name;
            }
            if !remote_user.password.is_empty() {
                password = remote_user.password;
            }
        }

        let user = blocking(&self.db, move |db| {
            let hash = hash_password(&password)?;
            user.id = db.insert_user(&user, &hash)?;
            Ok(user)
        })
        .await?;

        info!(user_id = user.id, remote_id = ?user.remote_id, "user registered");
        self.feed.publish(ChangeEvent::Users);
        Ok(user)
    }

    pub async fn get_user_by_id(&self, id: i64) -> RepoResult<Option<User>> {
        blocking(&self.db, move |db| Ok(db.get_user_by_id(id)?.map(User::from))).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let email = email.to_string();
        blocking(&self.db, move |db| Ok(db.get_user_by_email(&email)?.map(User::from))).await
    }

    pub async fn users_by_role(&self, role: UserRole) -> RepoResult<Vec<User>> {
        blocking(&self.db, move |db| {
            Ok(db.get_users_by_role(role)?.into_iter().map(User::from).collect())
        })
        .await
    }

    /// Local write first. The remote copy is refreshed best effort: a missing
    /// remote id is looked up by email (and remembered), and without a new
    /// password the remote's current one is sent back unchanged.
    pub async fn update_user(&self, user: &User, new_password: Option<&str>) -> RepoResult<User> {
        if new_password.is_some_and(str::is_empty) {
            return Err(RepoError::Validation("password must not be empty".into()));
        }
        if user.name.trim().is_empty() {
            return Err(RepoError::Validation("name must not be blank".into()));
        }

        let mut user = user.clone();
        let found = {
            let user = user.clone();
            let new_password = new_password.map(str::to_string);
            blocking(&self.db, move |db| {
                let hash = new_password.as_deref().map(hash_password).transpose()?;
                db.update_user(&user, hash.as_deref())
            })
            .await?
        };
        if !found {
            return Err(RepoError::NotFound(format!("user {}", user.id)));
        }

        if user.remote_id.is_none() {
            user.remote_id = self.find_remote_id(&user.email).await;
            if let Some(remote_id) = user.remote_id.clone() {
                let id = user.id;
                blocking(&self.db, move |db| db.set_user_remote_id(id, &remote_id)).await?;
            }
        }

        self.feed.publish(ChangeEvent::Users);

        let Some(remote_id) = user.remote_id.clone() else {
            warn!(user_id = user.id, "user has no remote counterpart, update kept local");
            return Ok(user);
        };

        let password = match new_password {
            Some(p) => Some(p.to_string()),
            None => match self.remote.read_user(&remote_id).await {
                Ok(current) => Some(current.password),
                Err(e) => {
                    warn!(%remote_id, error = %e, "could not read remote password");
                    None
                }
            },
        };

        if let Some(password) = password {
            let payload = CourseworkUserPayload::from_user(&user, &password, Some(remote_id.clone()));
            if let Err(e) = self.remote.update_user(&remote_id, &payload).await {
                warn!(%remote_id, error = %e, "remote user update failed, kept local change");
            }
        }

        Ok(user)
    }

    pub async fn delete_remote_user(&self, remote_id: &str) -> RepoResult<()> {
        self.remote.delete_user(remote_id).await?;
        info!(%remote_id, "remote user deleted");
        Ok(())
    }

    /// The local row is only removed once the remote delete went through.
    pub async fn delete_remote_and_local(&self, remote_id: &str) -> RepoResult<()> {
        self.delete_remote_user(remote_id).await?;

        let rid = remote_id.to_string();
        let removed = blocking(&self.db, move |db| db.delete_user_by_remote_id(&rid)).await?;
        if removed == 0 {
            debug!(%remote_id, "no local row for deleted remote user");
        }
        self.feed.publish(ChangeEvent::Users);
        Ok(())
    }

    pub async fn fetch_remote_users(&self) -> RepoResult<Vec<RemoteUser>> {
        self.ensure_student_database().await;
        let users = self.remote.read_all_users().await?;
        Ok(users.into_iter().map(CourseworkUserPayload::into_remote_user).collect())
    }

    pub async fn fetch_remote_user(&self, remote_id: &str) -> RepoResult<RemoteUser> {
        self.ensure_student_database().await;
        Ok(self.remote.read_user(remote_id).await?.into_remote_user())
    }

    pub async fn sync_remote_users_to_local(&self) -> RepoResult<Vec<User>> {
        let remote_users = self.fetch_remote_users().await?;
        let users: Vec<User> = blocking(&self.db, move |db| {
            remote_users.iter().map(|remote| merge_remote(db, remote)).collect()
        })
        .await?;

        info!(count = users.len(), "synced remote users");
        self.feed.publish(ChangeEvent::Users);
        Ok(users)
    }

    pub async fn persist_or_update_local(&self, remote: RemoteUser) -> RepoResult<User> {
        let user = blocking(&self.db, move |db| merge_remote(db, &remote)).await?;
        self.feed.publish(ChangeEvent::Users);
        Ok(user)
    }

    pub async fn update_notification_settings(
        &self,
        user_id: i64,
        update: NotificationSettingsUpdate,
    ) -> RepoResult<()> {
        let found = blocking(&self.db, move |db| db.update_notification_settings(user_id, &update)).await?;
        if !found {
            return Err(RepoError::NotFound(format!("user {user_id}")));
        }
        self.feed.publish(ChangeEvent::Users);
        Ok(())
    }

    /// The service rejects a second create for the same student, so any
    /// failure here is only logged.
    async fn ensure_student_database(&self) {
        if let Err(e) = self.remote.create_student_database().await {
            debug!(error = %e, "create_student skipped");
        }
    }

    async fn find_remote_id(&self, email: &str) -> Option<String> {
        match self.fetch_remote_users().await {
            Ok(users) => users
                .into_iter()
                .find(|u| u.email.trim().eq_ignore_ascii_case(email.trim()))
                .and_then(|u| u.remote_id),
            Err(e) => {
                warn!(error = %e, "could not resolve remote id");
                None
            }
        }
    }
}

/// Match by email. Name, role and password come from the remote; the local
/// remote id survives when the remote record carries none.
fn merge_remote(db: &Database, remote: &RemoteUser) -> anyhow::Result<User> {
    let Some(row) = db.get_user_by_email(&remote.email)? else {
        let mut user = User {
            id: 0,
            remote_id: remote.remote_id.clone(),
            email: remote.email.trim().to_string(),
            name: remote.name.clone(),
            role: remote.role,
            notifications: NotificationPrefs::default(),
            created_at: Utc::now(),
        };
        user.id = db.insert_user(&user, &hash_password(&remote.password)?)?;
        return Ok(user);
    };

    let hash = if verify_password(&remote.password, &row.password_hash) {
        None
    } else {
        Some(hash_password(&remote.password)?)
    };

    let mut user = row.to_user();
    if remote.remote_id.is_some() {
        user.remote_id = remote.remote_id.clone();
    }
    user.name = remote.name.clone();
    user.role = remote.role;
    db.update_user(&user, hash.as_deref())?;
    Ok(user)
}

fn validate_new_user(user: &NewUser) -> RepoResult<()> {
    let email = user.email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
        _ => return Err(RepoError::Validation(format!("invalid email: {email}"))),
    }
    if user.password.is_empty() {
        return Err(RepoError::Validation("password must not be empty".into()));
    }
    if user.name.trim().is_empty() {
        return Err(RepoError::Validation("name must not be blank".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TestBackend, memory_db, unreachable_url};

    fn repo(backend_url: &str) -> UserRepository {
        let remote = crate::test_support::remote_config(backend_url, None).coursework_client().unwrap();
        UserRepository::new(memory_db(), remote, ChangeFeed::default())
    }

    fn guest(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            password: "secret".into(),
            name: "Jane Customer".into(),
            role: UserRole::Guest,
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let backend = TestBackend::spawn().await;
        let users = repo(&backend.url);

        let user = users.register(guest("jane@example.com")).await.unwrap();
        assert!(user.remote_id.is_some());
        assert_eq!(user.role, UserRole::Guest);

        let logged_in = users.login("JANE@example.com", "secret").await.unwrap();
        assert_eq!(logged_in.id, user.id);

        let err = users.login("jane@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, RepoError::InvalidCredentials));
    }

    #[tokio::test]
    async fn duplicate_local_email_is_rejected() {
        let backend = TestBackend::spawn().await;
        let users = repo(&backend.url);
        users.register(guest("jane@example.com")).await.unwrap();

        let err = users.register(guest("Jane@Example.com")).await.unwrap_err();
        assert!(matches!(err, RepoError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn registration_needs_the_remote() {
        let users = repo(&unreachable_url());
        let err = users.register(guest("jane@example.com")).await.unwrap_err();
        assert!(matches!(err, RepoError::Remote(_)));
        assert!(users.get_user_by_email("jane@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn offline_login_uses_local_hash() {
        let users = repo(&unreachable_url());
        let user = User {
            id: 0,
            remote_id: None,
            email: "staff@restaurant.com".into(),
            name: "John Staff".into(),
            role: UserRole::Staff,
            notifications: NotificationPrefs::default(),
            created_at: Utc::now(),
        };
        let hash = hash_password("staff123").unwrap();
        users.db.insert_user(&user, &hash).unwrap();

        let logged_in = users.login("staff@restaurant.com", "staff123").await.unwrap();
        assert_eq!(logged_in.role, UserRole::Staff);
        assert!(users.login("staff@restaurant.com", "nope").await.is_err());
    }

    #[tokio::test]
    async fn remote_only_account_is_cached_on_login() {
        let backend = TestBackend::spawn().await;
        let users = repo(&backend.url);
        let direct = users.remote().clone();
        direct.create_student_database().await.unwrap();
        let new = NewUser {
            role: UserRole::Staff,
            ..guest("chef@example.com")
        };
        direct.create_user(&CourseworkUserPayload::from_new_user(&new)).await.unwrap();

        let user = users.login("chef@example.com", "secret").await.unwrap();
        assert_eq!(user.role, UserRole::Staff);
        assert!(user.remote_id.is_some());
        assert_eq!(users.users_by_role(UserRole::Staff).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_pushes_name_and_keeps_remote_password() {
        let backend = TestBackend::spawn().await;
        let users = repo(&backend.url);
        let mut user = users.register(guest("jane@example.com")).await.unwrap();
        user.name = "Janet Q Customer".into();

        let updated = users.update_user(&user, None).await.unwrap();
        assert_eq!(updated.name, "Janet Q Customer");

        let remote = users.fetch_remote_user(updated.remote_id.as_deref().unwrap()).await.unwrap();
        assert_eq!(remote.name, "Janet Q Customer");
        assert_eq!(remote.password, "secret");

        let changed = users.update_user(&updated, Some("fresh")).await.unwrap();
        assert!(users.login(&changed.email, "fresh").await.is_ok());
    }

    #[tokio::test]
    async fn update_without_remote_stays_local() {
        let users = repo(&unreachable_url());
        let mut user = User {
            id: 0,
            remote_id: None,
            email: "local@example.com".into(),
            name: "Local".into(),
            role: UserRole::Guest,
            notifications: NotificationPrefs::default(),
            created_at: Utc::now(),
        };
        user.id = users.db.insert_user(&user, &hash_password("pw").unwrap()).unwrap();
        user.name = "Renamed".into();

        users.update_user(&user, None).await.unwrap();
        let stored = users.get_user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Renamed");

        user.id = 999;
        assert!(matches!(users.update_user(&user, None).await, Err(RepoError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_remote_and_local_removes_both() {
        let backend = TestBackend::spawn().await;
        let users = repo(&backend.url);
        let user = users.register(guest("jane@example.com")).await.unwrap();
        let remote_id = user.remote_id.clone().unwrap();

        users.delete_remote_and_local(&remote_id).await.unwrap();
        assert!(users.get_user_by_id(user.id).await.unwrap().is_none());
        assert!(users.fetch_remote_users().await.unwrap().is_empty());

        let err = users.delete_remote_user(&remote_id).await.unwrap_err();
        assert!(matches!(err, RepoError::Remote(ref e) if e.is_not_found()));
    }

    #[tokio::test]
    async fn sync_merges_by_email() {
        let backend = TestBackend::spawn().await;
        let users = repo(&backend.url);
        let direct = users.remote().clone();
        direct.create_student_database().await.unwrap();
        for email in ["a@example.com", "b@example.com"] {
            direct
                .create_user(&CourseworkUserPayload::from_new_user(&guest(email)))
                .await
                .unwrap();
        }

        let first = users.sync_remote_users_to_local().await.unwrap();
        let second = users.sync_remote_users_to_local().await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(
            first.iter().map(|u| u.id).collect::<Vec<_>>(),
            second.iter().map(|u| u.id).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn notification_settings_are_partial() {
        let backend = TestBackend::spawn().await;
        let users = repo(&backend.url);
        let user = users.register(guest("jane@example.com")).await.unwrap();

        users
            .update_notification_settings(
                user.id,
                NotificationSettingsUpdate {
                    reservation_changes: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let stored = users.get_user_by_id(user.id).await.unwrap().unwrap();
        assert!(stored.notifications.enabled);
        assert!(!stored.notifications.reservation_changes);

        let err = users
            .update_notification_settings(404, NotificationSettingsUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::NotFound(_)));
    }

    #[test]
    fn new_user_validation() {
        assert!(validate_new_user(&guest("jane@example.com")).is_ok());
        assert!(validate_new_user(&guest("no-at-sign")).is_err());
        assert!(validate_new_user(&NewUser { name: "  ".into(), ..guest("a@b.c") }).is_err());
    }
}
