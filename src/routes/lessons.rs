use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::lesson::{
        FulfillLessonRequest, Invoice, Lesson, ModifyLessonRequest, RequestLessonRequest,
        ScheduledLesson, TimetableEntry,
    },
    services::{
        audit::{self, AuditEntry},
        lessons::LessonService,
        rbac::AccessIndex,
    },
    AppState,
};

pub async fn request_lesson(
    State(state): State<AppState>,
    actor: AccessIndex,
    Path(school_id): Path<Uuid>,
    Json(body): Json<RequestLessonRequest>,
) -> AppResult<(StatusCode, Json<Lesson>)> {
    let lesson =
        LessonService::request(&state.db, &actor, school_id, &body, &state.schedule()).await?;
    Ok((StatusCode::CREATED, Json(lesson)))
}

pub async fn modify_lesson(
    State(state): State<AppState>,
    actor: AccessIndex,
    Path(lesson_id): Path<Uuid>,
    Json(body): Json<ModifyLessonRequest>,
) -> AppResult<Json<Lesson>> {
    let lesson =
        LessonService::modify(&state.db, &actor, lesson_id, &body, &state.schedule()).await?;
    Ok(Json(lesson))
}

pub async fn fulfill_lesson(
    State(state): State<AppState>,
    actor: AccessIndex,
    Path(lesson_id): Path<Uuid>,
    body: Option<Json<FulfillLessonRequest>>,
) -> AppResult<Json<Lesson>> {
    let overrides = body.map(|Json(b)| b).unwrap_or_default();
    let lesson = LessonService::fulfill(
        &state.db,
        &actor,
        lesson_id,
        &overrides,
        &state.schedule(),
        state.today(),
    )
    .await?;

    audit::log(
        state.db.clone(),
        AuditEntry {
            school_id: Some(lesson.school_id),
            user_id: actor.user_id(),
            action: "lesson.fulfilled",
            resource_type: "lesson",
            resource_id: lesson.id,
        },
    );
    Ok(Json(lesson))
}

pub async fn lesson_invoice(
    State(state): State<AppState>,
    actor: AccessIndex,
    Path(lesson_id): Path<Uuid>,
) -> AppResult<Json<Invoice>> {
    Ok(Json(LessonService::invoice(&state.db, &actor, lesson_id).await?))
}

pub async fn lesson_occurrences(
    State(state): State<AppState>,
    actor: AccessIndex,
    Path(lesson_id): Path<Uuid>,
) -> AppResult<Json<Vec<ScheduledLesson>>> {
    Ok(Json(LessonService::occurrences(&state.db, &actor, lesson_id).await?))
}

pub async fn student_bookings(
    State(state): State<AppState>,
    actor: AccessIndex,
    Path((school_id, student_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Vec<Lesson>>> {
    Ok(Json(LessonService::list_bookings(&state.db, &actor, school_id, student_id).await?))
}

pub async fn timetable(
    State(state): State<AppState>,
    actor: AccessIndex,
    Path(school_id): Path<Uuid>,
) -> AppResult<Json<Vec<TimetableEntry>>> {
    let entries = LessonService::timetable(&state.db, &actor, school_id, state.today()).await?;
    Ok(Json(entries))
}

pub async fn teacher_timetable(
    State(state): State<AppState>,
    actor: AccessIndex,
    Path(school_id): Path<Uuid>,
) -> AppResult<Json<Vec<TimetableEntry>>> {
    Ok(Json(LessonService::teacher_timetable(&state.db, &actor, school_id).await?))
}
