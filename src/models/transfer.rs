use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A payment recorded against a lesson.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transfer {
    pub id: Uuid,
    pub user_id: Uuid,
    pub lesson_id: Uuid,
    pub school_id: Uuid,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RecordTransferRequest {
    pub user_id: Uuid,
    pub lesson_id: Uuid,
    pub amount: Decimal,
}
