use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::user::{CreateChildRequest, CreateUserRequest, GlobalRole, User},
    services::rbac::{global_closure, role_names},
};

/// Emails are stored trimmed and lowercased.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct UserService;

impl UserService {
    pub async fn get(pool: &PgPool, user_id: Uuid) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?
            .ok_or(AppError::NotFound("User"))
    }

    async fn email_taken(pool: &PgPool, email: &str) -> AppResult<bool> {
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE lower(email) = lower($1))")
                .bind(email)
                .fetch_one(pool)
                .await?;
        Ok(taken)
    }

    async fn insert(
        pool: &PgPool,
        email: &str,
        first_name: &str,
        last_name: &str,
        parent_id: Option<Uuid>,
        instruments: Vec<String>,
        role: GlobalRole,
    ) -> AppResult<User> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AppError::validation("The email cannot be blank."));
        }
        if Self::email_taken(pool, &email).await? {
            return Err(AppError::validation("A user with this email already exists."));
        }
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (email, first_name, last_name, parent_id, instruments, global_roles)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(&email)
        .bind(first_name)
        .bind(last_name)
        .bind(parent_id)
        .bind(instruments)
        .bind(role_names(global_closure(role)))
        .fetch_one(pool)
        .await
        .map_err(|e| match e {
            // Lost a race with a concurrent registration of the same email.
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::validation("A user with this email already exists.")
            }
            e => AppError::from(e),
        })?;
        Ok(user)
    }

    /// Register an adult account. Credentials live in the login layer.
    pub async fn create(pool: &PgPool, req: &CreateUserRequest) -> AppResult<User> {
        let instruments = req.instruments.iter().map(|i| i.to_string()).collect();
        let user = Self::insert(
            pool,
            &req.email,
            &req.first_name,
            &req.last_name,
            None,
            instruments,
            GlobalRole::AdultUser,
        )
        .await?;
        tracing::info!("Registered user {}", user.id);
        Ok(user)
    }

    /// Create a child account managed by `parent_id`.
    pub async fn create_child(
        pool: &PgPool,
        parent_id: Uuid,
        req: &CreateChildRequest,
    ) -> AppResult<User> {
        let parent = Self::get(pool, parent_id).await?;
        if !parent.has_global_role(GlobalRole::AdultUser) {
            return Err(AppError::Forbidden);
        }
        Self::insert(
            pool,
            &req.email,
            &req.first_name,
            &req.last_name,
            Some(parent.id),
            Vec::new(),
            GlobalRole::User,
        )
        .await
    }

    pub async fn list_children(pool: &PgPool, parent_id: Uuid) -> AppResult<Vec<User>> {
        let children = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE parent_id = $1 ORDER BY first_name",
        )
        .bind(parent_id)
        .fetch_all(pool)
        .await?;
        Ok(children)
    }

    /// Add a global role and its closure.
    pub async fn grant_global(pool: &PgPool, user_id: Uuid, role: GlobalRole) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users
             SET global_roles = ARRAY(SELECT DISTINCT unnest(global_roles || $1::TEXT[]))
             WHERE id = $2
             RETURNING *",
        )
        .bind(role_names(global_closure(role)))
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("User"))?;
        tracing::info!("Granted global role {role} to user {user_id}");
        Ok(user)
    }

    /// Only system administrators may create directors.
    pub async fn promote_to_director(
        pool: &PgPool,
        actor_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<User> {
        let actor = Self::get(pool, actor_id).await?;
        if !actor.has_global_role(GlobalRole::SystemAdministrator) {
            return Err(AppError::Forbidden);
        }
        Self::grant_global(pool, user_id, GlobalRole::Director).await
    }

    /// `user_id` itself or one of its children.
    pub async fn is_self_or_child(
        pool: &PgPool,
        user_id: Uuid,
        candidate: Uuid,
    ) -> AppResult<bool> {
        if user_id == candidate {
            return Ok(true);
        }
        let is_child: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1 AND parent_id = $2)",
        )
        .bind(candidate)
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        Ok(is_child)
    }
}
