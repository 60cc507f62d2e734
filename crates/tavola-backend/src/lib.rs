//! Reference implementation of the two REST shapes the client syncs with:
//! the student-scoped coursework user service and the restaurant
//! menu/reservation service.

pub mod coursework;
pub mod error;
pub mod menu;
pub mod reservations;
pub mod state;

use axum::Router;
use axum::routing::{delete, get, post, put};

pub use state::{AppState, AppStateInner};

pub fn router(state: AppState) -> Router {
    let coursework = Router::new()
        .route("/create_student/{student_id}", post(coursework::create_student))
        .route("/create_user/{student_id}", post(coursework::create_user))
        .route("/read_all_users/{student_id}", get(coursework::read_all_users))
        .route("/read_user/{student_id}/{user_id}", get(coursework::read_user))
        .route("/update_user/{student_id}/{user_id}", put(coursework::update_user))
        .route("/delete_user/{student_id}/{user_id}", delete(coursework::delete_user));

    let rest = Router::new()
        .route("/api/menu", get(menu::list).post(menu::create))
        .route("/api/menu/{id}", get(menu::get_one).put(menu::update).delete(menu::remove))
        .route("/api/reservations", get(reservations::list).post(reservations::create))
        .route("/api/reservations/user/{user_id}", get(reservations::list_for_user))
        .route(
            "/api/reservations/{id}",
            get(reservations::get_one).put(reservations::update).delete(reservations::cancel),
        );

    Router::new().merge(coursework).merge(rest).with_state(state)
}
