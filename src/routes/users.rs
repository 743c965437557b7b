use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        auth::AuthenticatedUser,
        user::{CreateChildRequest, User},
    },
    services::{
        audit::{self, AuditEntry},
        users::UserService,
    },
    AppState,
};

pub async fn me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<User>> {
    Ok(Json(UserService::get(&state.db, user.user_id).await?))
}

pub async fn list_children(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<User>>> {
    Ok(Json(UserService::list_children(&state.db, user.user_id).await?))
}

pub async fn create_child(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateChildRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let child = UserService::create_child(&state.db, user.user_id, &body).await?;
    Ok((StatusCode::CREATED, Json(child)))
}

/// System administrators only.
pub async fn promote_to_director(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<User>> {
    let promoted = UserService::promote_to_director(&state.db, user.user_id, user_id).await?;
    audit::log(
        state.db.clone(),
        AuditEntry {
            school_id: None,
            user_id: user.user_id,
            action: "user.promoted_to_director",
            resource_type: "user",
            resource_id: promoted.id,
        },
    );
    Ok(Json(promoted))
}
