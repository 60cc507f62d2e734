use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tavola_types::api::{ApiMessage, CourseworkUserEnvelope, CourseworkUserList, CourseworkUserPayload};
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

fn no_student(student_id: &str) -> ApiError {
    ApiError::NotFound(format!("Student database '{student_id}' not found"))
}

fn no_user(user_id: &str) -> ApiError {
    ApiError::NotFound(format!("User '{user_id}' not found"))
}

/// POST /create_student/{student_id}. Idempotent.
pub async fn create_student(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let mut students = state.students.write().await;
    if students.contains_key(&student_id) {
        return Ok((
            StatusCode::OK,
            Json(ApiMessage::message(format!("Student database '{student_id}' already exists"))),
        ));
    }

    students.insert(student_id.clone(), Vec::new());
    info!(%student_id, "created student database");
    Ok((
        StatusCode::CREATED,
        Json(ApiMessage::message(format!("Student database '{student_id}' created"))),
    ))
}

/// POST /create_user/{student_id}
pub async fn create_user(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
    Json(mut payload): Json<CourseworkUserPayload>,
) -> ApiResult<impl IntoResponse> {
    if payload.email.trim().is_empty() {
        return Err(ApiError::BadRequest("email is required".into()));
    }

    let mut students = state.students.write().await;
    let users = students.get_mut(&student_id).ok_or_else(|| no_student(&student_id))?;

    if users.iter().any(|u| u.email.eq_ignore_ascii_case(&payload.email)) {
        return Err(ApiError::Conflict(format!("User with email '{}' already exists", payload.email)));
    }

    let user_id = Uuid::new_v4().to_string();
    payload.user_id = Some(user_id.clone());
    users.push(payload);

    info!(%student_id, %user_id, "created user");
    Ok((StatusCode::CREATED, Json(ApiMessage::message("User created"))))
}

/// GET /read_all_users/{student_id}
pub async fn read_all_users(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> ApiResult<Json<CourseworkUserList>> {
    let students = state.students.read().await;
    let users = students.get(&student_id).ok_or_else(|| no_student(&student_id))?;
    Ok(Json(CourseworkUserList { users: users.clone() }))
}

/// GET /read_user/{student_id}/{user_id}
pub async fn read_user(
    State(state): State<AppState>,
    Path((student_id, user_id)): Path<(String, String)>,
) -> ApiResult<Json<CourseworkUserEnvelope>> {
    let students = state.students.read().await;
    let users = students.get(&student_id).ok_or_else(|| no_student(&student_id))?;
    let user = users
        .iter()
        .find(|u| u.user_id.as_deref() == Some(user_id.as_str()))
        .ok_or_else(|| no_user(&user_id))?;
    Ok(Json(CourseworkUserEnvelope { user: Some(user.clone()) }))
}

/// PUT /update_user/{student_id}/{user_id}
pub async fn update_user(
    State(state): State<AppState>,
    Path((student_id, user_id)): Path<(String, String)>,
    Json(mut payload): Json<CourseworkUserPayload>,
) -> ApiResult<Json<ApiMessage>> {
    let mut students = state.students.write().await;
    let users = students.get_mut(&student_id).ok_or_else(|| no_student(&student_id))?;

    let clash = users.iter().any(|u| {
        u.user_id.as_deref() != Some(user_id.as_str()) && u.email.eq_ignore_ascii_case(&payload.email)
    });
    if clash {
        return Err(ApiError::Conflict(format!("User with email '{}' already exists", payload.email)));
    }

    let slot = users
        .iter_mut()
        .find(|u| u.user_id.as_deref() == Some(user_id.as_str()))
        .ok_or_else(|| no_user(&user_id))?;
    payload.user_id = Some(user_id);
    *slot = payload;

    Ok(Json(ApiMessage::message("User updated")))
}

/// DELETE /delete_user/{student_id}/{user_id}
pub async fn delete_user(
    State(state): State<AppState>,
    Path((student_id, user_id)): Path<(String, String)>,
) -> ApiResult<Json<ApiMessage>> {
    let mut students = state.students.write().await;
    let users = students.get_mut(&student_id).ok_or_else(|| no_student(&student_id))?;

    let before = users.len();
    users.retain(|u| u.user_id.as_deref() != Some(user_id.as_str()));
    if users.len() == before {
        return Err(no_user(&user_id));
    }

    info!(%student_id, %user_id, "deleted user");
    Ok(Json(ApiMessage::message("User deleted")))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::state::AppStateInner;
    use crate::test_support::call;

    fn user_json(email: &str) -> serde_json::Value {
        json!({
            "username": "jane", "password": "pw", "firstname": "Jane", "lastname": "Doe",
            "email": email, "contact": "", "usertype": "guest"
        })
    }

    #[tokio::test]
    async fn user_lifecycle() {
        let app = crate::router(AppStateInner::new());

        let (status, _) = call(&app, Method::POST, "/create_student/s1", None).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = call(&app, Method::POST, "/create_student/s1", None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(&app, Method::POST, "/create_user/s1", Some(user_json("jane@x.io"))).await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, list) = call(&app, Method::GET, "/read_all_users/s1", None).await;
        let user_id = list["users"][0]["user_id"].as_str().unwrap().to_string();

        let mut updated = user_json("jane@x.io");
        updated["firstname"] = json!("Janet");
        let (status, _) = call(&app, Method::PUT, &format!("/update_user/s1/{user_id}"), Some(updated)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&app, Method::GET, &format!("/read_user/s1/{user_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["firstname"], "Janet");
        assert_eq!(body["user"]["user_id"], user_id.as_str());

        let (status, _) = call(&app, Method::DELETE, &format!("/delete_user/s1/{user_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = call(&app, Method::GET, &format!("/read_user/s1/{user_id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["detail"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_case_insensitively() {
        let app = crate::router(AppStateInner::new());
        call(&app, Method::POST, "/create_student/s1", None).await;
        call(&app, Method::POST, "/create_user/s1", Some(user_json("jane@x.io"))).await;

        let (status, body) = call(&app, Method::POST, "/create_user/s1", Some(user_json("JANE@x.io"))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["detail"].as_str().unwrap().contains("already exists"));
    }

    #[tokio::test]
    async fn unknown_student_is_not_found() {
        let app = crate::router(AppStateInner::new());
        let (status, _) = call(&app, Method::GET, "/read_all_users/nobody", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, Method::POST, "/create_user/nobody", Some(user_json("a@b.c"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
