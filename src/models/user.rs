use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Platform-wide roles, independent of any school.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum GlobalRole {
    SystemAdministrator,
    Director,
    AdultUser,
    User,
}

impl std::fmt::Display for GlobalRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GlobalRole::SystemAdministrator => "system_administrator",
            GlobalRole::Director => "director",
            GlobalRole::AdultUser => "adult_user",
            GlobalRole::User => "user",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for GlobalRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system_administrator" => Ok(GlobalRole::SystemAdministrator),
            "director" => Ok(GlobalRole::Director),
            "adult_user" => Ok(GlobalRole::AdultUser),
            "user" => Ok(GlobalRole::User),
            _ => Err(anyhow::anyhow!("Unknown global role: {s}")),
        }
    }
}

/// DB row struct. `global_roles` and `instruments` are TEXT[] columns.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub parent_id: Option<Uuid>,
    pub instruments: Vec<String>,
    pub global_roles: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Unknown role names in storage are ignored rather than failing the load.
    pub fn roles(&self) -> Vec<GlobalRole> {
        self.global_roles.iter().filter_map(|r| r.parse().ok()).collect()
    }

    pub fn has_global_role(&self, role: GlobalRole) -> bool {
        self.roles().contains(&role)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub instruments: Vec<crate::models::lesson::Instrument>,
}

#[derive(Debug, Deserialize)]
pub struct CreateChildRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}
