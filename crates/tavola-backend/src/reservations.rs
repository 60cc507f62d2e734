use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tavola_types::api::RemoteReservation;
use tavola_types::models::ReservationStatus;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, assign_id, now_millis};

fn missing(id: i64) -> ApiError {
    ApiError::NotFound(format!("Reservation {id} not found"))
}

fn validate(r: &RemoteReservation) -> ApiResult<()> {
    if r.table_number == 0 {
        return Err(ApiError::BadRequest("tableNumber must be at least 1".into()));
    }
    if r.number_of_guests == 0 {
        return Err(ApiError::BadRequest("numberOfGuests must be at least 1".into()));
    }
    Ok(())
}

/// GET /api/reservations
pub async fn list(State(state): State<AppState>) -> Json<Vec<RemoteReservation>> {
    let catalog = state.catalog.read().await;
    Json(catalog.reservations.values().cloned().collect())
}

/// GET /api/reservations/user/{user_id}
pub async fn list_for_user(State(state): State<AppState>, Path(user_id): Path<i64>) -> Json<Vec<RemoteReservation>> {
    let catalog = state.catalog.read().await;
    Json(
        catalog
            .reservations
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect(),
    )
}

/// GET /api/reservations/{id}
pub async fn get_one(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<RemoteReservation>> {
    let catalog = state.catalog.read().await;
    catalog.reservations.get(&id).cloned().map(Json).ok_or_else(|| missing(id))
}

/// POST /api/reservations
pub async fn create(
    State(state): State<AppState>,
    Json(mut reservation): Json<RemoteReservation>,
) -> ApiResult<impl IntoResponse> {
    validate(&reservation)?;

    let mut catalog = state.catalog.write().await;
    reservation.id = assign_id(&catalog.reservations, reservation.id);
    reservation.status = ReservationStatus::Confirmed;
    let now = now_millis();
    if reservation.created_at <= 0 {
        reservation.created_at = now;
    }
    reservation.updated_at = now;
    catalog.reservations.insert(reservation.id, reservation.clone());

    info!(id = reservation.id, user_id = reservation.user_id, "reservation created");
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// PUT /api/reservations/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(mut reservation): Json<RemoteReservation>,
) -> ApiResult<Json<RemoteReservation>> {
    validate(&reservation)?;

    let mut catalog = state.catalog.write().await;
    let slot = catalog.reservations.get_mut(&id).ok_or_else(|| missing(id))?;
    if !slot.status.can_transition_to(reservation.status) && slot.status != reservation.status {
        return Err(ApiError::Conflict(format!(
            "Reservation {id} cannot move from {} to {}",
            slot.status, reservation.status
        )));
    }

    reservation.id = id;
    reservation.created_at = slot.created_at;
    reservation.updated_at = now_millis();
    *slot = reservation.clone();

    Ok(Json(reservation))
}

/// DELETE /api/reservations/{id}. Cancels; the row is kept.
pub async fn cancel(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    let mut catalog = state.catalog.write().await;
    let slot = catalog.reservations.get_mut(&id).ok_or_else(|| missing(id))?;
    slot.status = ReservationStatus::Cancelled;
    slot.updated_at = now_millis();

    info!(id, "reservation cancelled");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::{Value, json};

    use crate::state::AppStateInner;
    use crate::test_support::call;

    fn booking(user_id: i64) -> Value {
        json!({
            "userId": user_id, "userName": "Jane", "userEmail": "jane@x.io",
            "tableNumber": 2, "numberOfGuests": 4,
            "reservationDate": "2026-06-01", "reservationTime": "19:00"
        })
    }

    #[tokio::test]
    async fn create_filter_and_cancel() {
        let app = crate::router(AppStateInner::new());

        let (status, first) = call(&app, Method::POST, "/api/reservations", Some(booking(1))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(first["status"], "CONFIRMED");
        call(&app, Method::POST, "/api/reservations", Some(booking(2))).await;

        let (_, mine) = call(&app, Method::GET, "/api/reservations/user/1", None).await;
        assert_eq!(mine.as_array().unwrap().len(), 1);

        let id = first["id"].as_i64().unwrap();
        let (status, _) = call(&app, Method::DELETE, &format!("/api/reservations/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, stored) = call(&app, Method::GET, &format!("/api/reservations/{id}"), None).await;
        assert_eq!(stored["status"], "CANCELLED");
    }

    #[tokio::test]
    async fn cancelled_booking_cannot_be_modified() {
        let app = crate::router(AppStateInner::new());
        let (_, created) = call(&app, Method::POST, "/api/reservations", Some(booking(1))).await;
        let id = created["id"].as_i64().unwrap();
        call(&app, Method::DELETE, &format!("/api/reservations/{id}"), None).await;

        let mut change = booking(1);
        change["status"] = json!("MODIFIED");
        let (status, _) = call(&app, Method::PUT, &format!("/api/reservations/{id}"), Some(change)).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn zero_guests_is_rejected() {
        let app = crate::router(AppStateInner::new());
        let mut bad = booking(1);
        bad["numberOfGuests"] = json!(0);
        let (status, _) = call(&app, Method::POST, "/api/reservations", Some(bad)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
