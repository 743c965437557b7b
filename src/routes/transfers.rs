use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::transfer::{RecordTransferRequest, Transfer},
    services::{
        audit::{self, AuditEntry},
        rbac::AccessIndex,
        transfers::TransferService,
    },
    AppState,
};

pub async fn list_transfers(
    State(state): State<AppState>,
    actor: AccessIndex,
    Path(school_id): Path<Uuid>,
) -> AppResult<Json<Vec<Transfer>>> {
    Ok(Json(TransferService::list(&state.db, &actor, school_id).await?))
}

pub async fn record_transfer(
    State(state): State<AppState>,
    actor: AccessIndex,
    Path(school_id): Path<Uuid>,
    Json(body): Json<RecordTransferRequest>,
) -> AppResult<(StatusCode, Json<Transfer>)> {
    let transfer = TransferService::record(&state.db, &actor, school_id, &body).await?;
    audit::log(
        state.db.clone(),
        AuditEntry {
            school_id: Some(school_id),
            user_id: actor.user_id(),
            action: "transfer.recorded",
            resource_type: "transfer",
            resource_id: transfer.id,
        },
    );
    Ok((StatusCode::CREATED, Json(transfer)))
}
