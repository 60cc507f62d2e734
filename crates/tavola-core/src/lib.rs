//! Local-first repositories for users, menu items and reservations.
//!
//! Reads always come from the local store. Writes land locally first and are
//! then mirrored to the remote backends on a best-effort basis; a failed
//! mirror is logged and otherwise ignored.

pub mod app;
pub mod config;
pub mod error;
pub mod feed;
pub mod menu;
pub mod notify;
pub mod password;
pub mod reservations;
pub mod seed;
pub mod session;
pub mod users;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use tavola_db::Database;

pub use app::App;
pub use config::AppConfig;
pub use error::{RepoError, RepoResult};
pub use feed::ChangeFeed;
pub use menu::MenuRepository;
pub use notify::{Notification, NotificationKind, Notifier};
pub use reservations::ReservationRepository;
pub use session::{Session, SessionStore};
pub use users::UserRepository;

/// Run a store operation on the blocking pool.
pub(crate) async fn blocking<F, T>(db: &Arc<Database>, f: F) -> RepoResult<T>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = Arc::clone(db);
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| RepoError::Storage(anyhow::anyhow!("spawn_blocking join error: {e}")))?
        .map_err(RepoError::Storage)
}
