use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::admission::{Admission, Member, RoleRequest},
    services::{
        admissions::AdmissionService,
        audit::{self, AuditEntry},
        rbac::AccessIndex,
    },
    AppState,
};

fn audit_membership(
    state: &AppState,
    actor: &AccessIndex,
    school_id: Uuid,
    user_id: Uuid,
    action: &'static str,
) {
    audit::log(
        state.db.clone(),
        AuditEntry {
            school_id: Some(school_id),
            user_id: actor.user_id(),
            action,
            resource_type: "admission",
            resource_id: user_id,
        },
    );
}

pub async fn list_members(
    State(state): State<AppState>,
    actor: AccessIndex,
    Path(school_id): Path<Uuid>,
) -> AppResult<Json<Vec<Member>>> {
    Ok(Json(AdmissionService::list_members(&state.db, &actor, school_id).await?))
}

/// Add a role (and everything it implies) to a member.
pub async fn promote_member(
    State(state): State<AppState>,
    actor: AccessIndex,
    Path((school_id, user_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<RoleRequest>,
) -> AppResult<Json<Admission>> {
    let admission =
        AdmissionService::promote(&state.db, &actor, school_id, user_id, body.role).await?;
    audit_membership(&state, &actor, school_id, user_id, "member.role_granted");
    Ok(Json(admission))
}

/// Replace a member's roles with the closure of one role.
pub async fn reassign_member(
    State(state): State<AppState>,
    actor: AccessIndex,
    Path((school_id, user_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<RoleRequest>,
) -> AppResult<Json<Admission>> {
    let admission =
        AdmissionService::reassign(&state.db, &actor, school_id, user_id, body.role).await?;
    audit_membership(&state, &actor, school_id, user_id, "member.role_reassigned");
    Ok(Json(admission))
}

pub async fn ban_member(
    State(state): State<AppState>,
    actor: AccessIndex,
    Path((school_id, user_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Admission>> {
    let admission = AdmissionService::ban(&state.db, &actor, school_id, user_id).await?;
    audit_membership(&state, &actor, school_id, user_id, "member.banned");
    Ok(Json(admission))
}

pub async fn unban_member(
    State(state): State<AppState>,
    actor: AccessIndex,
    Path((school_id, user_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Admission>> {
    let admission = AdmissionService::unban(&state.db, &actor, school_id, user_id).await?;
    audit_membership(&state, &actor, school_id, user_id, "member.unbanned");
    Ok(Json(admission))
}
