use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        admission::SchoolRole,
        auth::AuthenticatedUser,
        term::{Term, TermRequest},
    },
    services::{calendar::TermService, rbac::AccessIndex, schools::SchoolService},
    AppState,
};

pub async fn list_terms(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(school_id): Path<Uuid>,
) -> AppResult<Json<Vec<Term>>> {
    SchoolService::get(&state.db, school_id).await?;
    Ok(Json(TermService::list(&state.db, school_id).await?))
}

/// `null` when the school has no term covering today or later.
pub async fn current_term(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(school_id): Path<Uuid>,
) -> AppResult<Json<Option<Term>>> {
    let term = TermService::current_term(&state.db, school_id, state.today()).await?;
    Ok(Json(term))
}

pub async fn create_term(
    State(state): State<AppState>,
    actor: AccessIndex,
    Path(school_id): Path<Uuid>,
    Json(body): Json<TermRequest>,
) -> AppResult<(StatusCode, Json<Term>)> {
    actor.require(school_id, SchoolRole::Administrator)?;
    let term = TermService::create(&state.db, school_id, &body).await?;
    Ok((StatusCode::CREATED, Json(term)))
}

pub async fn update_term(
    State(state): State<AppState>,
    actor: AccessIndex,
    Path((school_id, term_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<TermRequest>,
) -> AppResult<Json<Term>> {
    actor.require(school_id, SchoolRole::Administrator)?;
    Ok(Json(TermService::update(&state.db, school_id, term_id, &body).await?))
}

pub async fn delete_term(
    State(state): State<AppState>,
    actor: AccessIndex,
    Path((school_id, term_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    actor.require(school_id, SchoolRole::Administrator)?;
    TermService::delete(&state.db, school_id, term_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
