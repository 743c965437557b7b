use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        admission::Admission,
        auth::AuthenticatedUser,
        school::{CreateSchoolRequest, School, SchoolSearchQuery, UpdateSchoolRequest},
    },
    services::{rbac::AccessIndex, schools::SchoolService},
    AppState,
};

pub async fn list_schools(
    State(state): State<AppState>,
    actor: AccessIndex,
    Query(query): Query<SchoolSearchQuery>,
) -> AppResult<Json<Vec<School>>> {
    Ok(Json(SchoolService::list(&state.db, &actor, &query).await?))
}

pub async fn create_school(
    State(state): State<AppState>,
    actor: AccessIndex,
    Json(body): Json<CreateSchoolRequest>,
) -> AppResult<(StatusCode, Json<School>)> {
    let school = SchoolService::create(&state.db, &actor, &body).await?;
    Ok((StatusCode::CREATED, Json(school)))
}

pub async fn get_school(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(school_id): Path<Uuid>,
) -> AppResult<Json<School>> {
    Ok(Json(SchoolService::get(&state.db, school_id).await?))
}

pub async fn update_school(
    State(state): State<AppState>,
    actor: AccessIndex,
    Path(school_id): Path<Uuid>,
    Json(body): Json<UpdateSchoolRequest>,
) -> AppResult<Json<School>> {
    Ok(Json(SchoolService::update(&state.db, &actor, school_id, &body).await?))
}

pub async fn delete_school(
    State(state): State<AppState>,
    actor: AccessIndex,
    Path(school_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    SchoolService::delete(&state.db, &actor, school_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn join_school(
    State(state): State<AppState>,
    actor: AccessIndex,
    Path(school_id): Path<Uuid>,
) -> AppResult<Json<Admission>> {
    Ok(Json(SchoolService::join(&state.db, &actor, school_id).await?))
}

pub async fn leave_school(
    State(state): State<AppState>,
    actor: AccessIndex,
    Path(school_id): Path<Uuid>,
) -> AppResult<Json<Admission>> {
    Ok(Json(SchoolService::leave(&state.db, &actor, school_id).await?))
}
