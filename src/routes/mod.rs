pub mod health;
pub mod lessons;
pub mod members;
pub mod schools;
pub mod terms;
pub mod transfers;
pub mod users;

use axum::{
    routing::{get, post, put},
    Extension, Router,
};
use tower_http::trace::TraceLayer;

use crate::{middleware::auth::JwtSecret, AppState};

/// Every endpoint of the API. CORS is layered on by the binary.
pub fn router(state: AppState) -> Router {
    let jwt_secret = JwtSecret(state.config.jwt_secret.clone());

    Router::new()
        .route("/health", get(health::health_check))
        // Schools
        .route("/schools", get(schools::list_schools).post(schools::create_school))
        .route(
            "/schools/{school_id}",
            get(schools::get_school).put(schools::update_school).delete(schools::delete_school),
        )
        .route("/schools/{school_id}/join", post(schools::join_school))
        .route("/schools/{school_id}/leave", post(schools::leave_school))
        // Terms
        .route("/schools/{school_id}/terms", get(terms::list_terms).post(terms::create_term))
        .route("/schools/{school_id}/terms/current", get(terms::current_term))
        .route(
            "/schools/{school_id}/terms/{term_id}",
            put(terms::update_term).delete(terms::delete_term),
        )
        // Members
        .route("/schools/{school_id}/members", get(members::list_members))
        .route(
            "/schools/{school_id}/members/{user_id}/roles",
            post(members::promote_member).put(members::reassign_member),
        )
        .route("/schools/{school_id}/members/{user_id}/ban", post(members::ban_member))
        .route("/schools/{school_id}/members/{user_id}/unban", post(members::unban_member))
        // Lessons
        .route("/schools/{school_id}/lessons", post(lessons::request_lesson))
        .route(
            "/schools/{school_id}/students/{student_id}/bookings",
            get(lessons::student_bookings),
        )
        .route("/schools/{school_id}/timetable", get(lessons::timetable))
        .route("/schools/{school_id}/teacher-timetable", get(lessons::teacher_timetable))
        .route("/lessons/{lesson_id}", put(lessons::modify_lesson))
        .route("/lessons/{lesson_id}/fulfill", post(lessons::fulfill_lesson))
        .route("/lessons/{lesson_id}/invoice", get(lessons::lesson_invoice))
        .route("/lessons/{lesson_id}/occurrences", get(lessons::lesson_occurrences))
        // Transfers
        .route(
            "/schools/{school_id}/transfers",
            get(transfers::list_transfers).post(transfers::record_transfer),
        )
        // Users
        .route("/users/me", get(users::me))
        .route("/users/me/children", get(users::list_children).post(users::create_child))
        .route("/users/{user_id}/director", post(users::promote_to_director))
        .layer(Extension(jwt_secret))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
