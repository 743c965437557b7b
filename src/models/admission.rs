use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Roles a user can hold inside one school.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SchoolRole {
    Director,
    SuperAdministrator,
    Administrator,
    Teacher,
    Client,
}

impl std::fmt::Display for SchoolRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SchoolRole::Director => "director",
            SchoolRole::SuperAdministrator => "super_administrator",
            SchoolRole::Administrator => "administrator",
            SchoolRole::Teacher => "teacher",
            SchoolRole::Client => "client",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for SchoolRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "director" => Ok(SchoolRole::Director),
            "super_administrator" => Ok(SchoolRole::SuperAdministrator),
            "administrator" => Ok(SchoolRole::Administrator),
            "teacher" => Ok(SchoolRole::Teacher),
            "client" => Ok(SchoolRole::Client),
            _ => Err(anyhow::anyhow!("Unknown school role: {s}")),
        }
    }
}

/// DB row struct. Roles are stored as TEXT[] of snake_case role names.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Admission {
    pub id: Uuid,
    pub school_id: Uuid,
    pub client_id: Uuid,
    pub roles: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Member listing row: admission joined with the user's name and email.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Member {
    pub client_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub roles: Vec<String>,
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: SchoolRole,
}
