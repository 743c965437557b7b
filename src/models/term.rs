use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Term {
    pub id: Uuid,
    pub school_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Body for POST/PUT on a school's terms.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TermRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}
