use std::sync::Arc;
use std::time::Duration;

use tavola_backend::state::{AppState, AppStateInner};
use tavola_db::Database;
use tavola_remote::RemoteConfig;
use tokio::net::TcpListener;

pub const STUDENT_ID: &str = "test-student";

/// The reference backend served on an ephemeral local port.
pub struct TestBackend {
    pub url: String,
    pub state: AppState,
}

impl TestBackend {
    pub async fn spawn() -> Self {
        let state = AppStateInner::new();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = tavola_backend::router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            url: format!("http://{addr}/"),
            state,
        }
    }
}

/// A port nothing listens on.
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    format!("http://127.0.0.1:{port}/")
}

pub fn remote_config(coursework_url: &str, rest_url: Option<&str>) -> RemoteConfig {
    RemoteConfig {
        coursework_url: coursework_url.to_string(),
        rest_url: rest_url.map(str::to_string),
        student_id: STUDENT_ID.to_string(),
        timeout: Duration::from_secs(5),
    }
}

pub fn memory_db() -> Arc<Database> {
    Arc::new(Database::open_in_memory().unwrap())
}
