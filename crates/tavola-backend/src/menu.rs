use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tavola_types::api::RemoteMenuItem;

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, assign_id, now_millis};

fn missing(id: i64) -> ApiError {
    ApiError::NotFound(format!("Menu item {id} not found"))
}

fn validate(item: &RemoteMenuItem) -> ApiResult<()> {
    if item.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name is required".into()));
    }
    if !item.price.is_finite() || item.price < 0.0 {
        return Err(ApiError::BadRequest("price must be a non-negative number".into()));
    }
    Ok(())
}

/// GET /api/menu
pub async fn list(State(state): State<AppState>) -> Json<Vec<RemoteMenuItem>> {
    let catalog = state.catalog.read().await;
    Json(catalog.menu.values().cloned().collect())
}

/// GET /api/menu/{id}
pub async fn get_one(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<RemoteMenuItem>> {
    let catalog = state.catalog.read().await;
    catalog.menu.get(&id).cloned().map(Json).ok_or_else(|| missing(id))
}

/// POST /api/menu
pub async fn create(
    State(state): State<AppState>,
    Json(mut item): Json<RemoteMenuItem>,
) -> ApiResult<impl IntoResponse> {
    validate(&item)?;

    let mut catalog = state.catalog.write().await;
    item.id = assign_id(&catalog.menu, item.id);
    let now = now_millis();
    if item.created_at <= 0 {
        item.created_at = now;
    }
    item.updated_at = now;
    catalog.menu.insert(item.id, item.clone());

    Ok((StatusCode::CREATED, Json(item)))
}

/// PUT /api/menu/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(mut item): Json<RemoteMenuItem>,
) -> ApiResult<Json<RemoteMenuItem>> {
    validate(&item)?;

    let mut catalog = state.catalog.write().await;
    let slot = catalog.menu.get_mut(&id).ok_or_else(|| missing(id))?;
    item.id = id;
    item.created_at = slot.created_at;
    item.updated_at = now_millis();
    *slot = item.clone();

    Ok(Json(item))
}

/// DELETE /api/menu/{id}
pub async fn remove(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    let mut catalog = state.catalog.write().await;
    catalog.menu.remove(&id).ok_or_else(|| missing(id))?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::state::AppStateInner;
    use crate::test_support::call;

    #[tokio::test]
    async fn crud_keeps_client_ids() {
        let app = crate::router(AppStateInner::new());
        let item = json!({"id": 12, "name": "Soup", "price": 5.5, "category": "Starters"});

        let (status, created) = call(&app, Method::POST, "/api/menu", Some(item)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["id"], 12);
        assert_eq!(created["available"], true);

        let update = json!({"name": "Soup of the day", "price": 6.0, "category": "Starters", "available": false});
        let (status, updated) = call(&app, Method::PUT, "/api/menu/12", Some(update)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["id"], 12);
        assert_eq!(updated["createdAt"], created["createdAt"]);

        let (_, list) = call(&app, Method::GET, "/api/menu", None).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["name"], "Soup of the day");

        let (status, _) = call(&app, Method::DELETE, "/api/menu/12", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, Method::GET, "/api/menu/12", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn negative_price_is_rejected() {
        let app = crate::router(AppStateInner::new());
        let item = json!({"name": "Soup", "price": -1.0, "category": "Starters"});
        let (status, body) = call(&app, Method::POST, "/api/menu", Some(item)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());
    }
}
