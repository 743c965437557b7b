use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct School {
    pub id: Uuid,
    pub name: String,
    pub director_id: Uuid,
    pub current_term_id: Option<Uuid>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl School {
    pub fn is_director(&self, user_id: Uuid) -> bool {
        self.director_id == user_id
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateSchoolRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSchoolRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Query params for GET /schools.
#[derive(Debug, Default, Deserialize)]
pub struct SchoolSearchQuery {
    pub search: Option<String>,
    /// Only schools where the caller holds an admission.
    #[serde(default)]
    pub enrolled: bool,
}
