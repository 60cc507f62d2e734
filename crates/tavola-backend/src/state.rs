use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tavola_types::api::{CourseworkUserPayload, RemoteMenuItem, RemoteReservation};
use tokio::sync::RwLock;

pub type AppState = Arc<AppStateInner>;

/// In-memory backing store. Coursework users are partitioned by student id;
/// menu and reservations form one shared catalog.
#[derive(Default)]
pub struct AppStateInner {
    pub students: RwLock<HashMap<String, Vec<CourseworkUserPayload>>>,
    pub catalog: RwLock<Catalog>,
}

impl AppStateInner {
    pub fn new() -> AppState {
        Arc::new(Self::default())
    }
}

#[derive(Default)]
pub struct Catalog {
    pub menu: BTreeMap<i64, RemoteMenuItem>,
    pub reservations: BTreeMap<i64, RemoteReservation>,
}

/// Keep the id a client proposes when it is free so local and remote ids line
/// up; otherwise allocate past the highest id in use.
pub(crate) fn assign_id<T>(rows: &BTreeMap<i64, T>, requested: i64) -> i64 {
    if requested > 0 && !rows.contains_key(&requested) {
        return requested;
    }
    rows.keys().next_back().copied().unwrap_or(0) + 1
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
