use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::admission::{Admission, Member, SchoolRole},
    services::{
        rbac::{admission_grants, parse_roles, role_names, school_closure, AccessIndex},
        users::UserService,
    },
};

pub struct AdmissionService;

impl AdmissionService {
    async fn director_of(pool: &PgPool, school_id: Uuid) -> AppResult<Uuid> {
        let row: Option<(Uuid,)> = sqlx::query_as("SELECT director_id FROM schools WHERE id = $1")
            .bind(school_id)
            .fetch_optional(pool)
            .await?;
        row.map(|(id,)| id).ok_or(AppError::NotFound("School"))
    }

    /// The director's membership cannot be changed through this authority.
    async fn ensure_not_director(pool: &PgPool, school_id: Uuid, user_id: Uuid) -> AppResult<()> {
        if Self::director_of(pool, school_id).await? == user_id {
            return Err(AppError::Forbidden);
        }
        Ok(())
    }

    async fn lock_admission(
        tx: &mut Transaction<'_, Postgres>,
        school_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<Admission>> {
        let admission = sqlx::query_as::<_, Admission>(
            "SELECT * FROM admissions WHERE school_id = $1 AND client_id = $2 FOR UPDATE",
        )
        .bind(school_id)
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(admission)
    }

    pub async fn get(
        pool: &PgPool,
        school_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<Admission>> {
        let admission = sqlx::query_as::<_, Admission>(
            "SELECT * FROM admissions WHERE school_id = $1 AND client_id = $2",
        )
        .bind(school_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(admission)
    }

    /// Add `role` and every role it implies, creating the admission if needed.
    /// Idempotent; never removes a role.
    pub async fn grant(
        pool: &PgPool,
        school_id: Uuid,
        user_id: Uuid,
        role: SchoolRole,
    ) -> AppResult<Admission> {
        let mut tx = pool.begin().await?;
        let admission = Self::grant_in(&mut tx, school_id, user_id, role).await?;
        tx.commit().await?;
        Ok(admission)
    }

    /// Same as [`grant`](Self::grant) inside a caller-owned transaction.
    pub async fn grant_in(
        tx: &mut Transaction<'_, Postgres>,
        school_id: Uuid,
        user_id: Uuid,
        role: SchoolRole,
    ) -> AppResult<Admission> {
        sqlx::query(
            "INSERT INTO admissions (school_id, client_id)
             VALUES ($1, $2)
             ON CONFLICT (school_id, client_id) DO NOTHING",
        )
        .bind(school_id)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

        let current = Self::lock_admission(tx, school_id, user_id)
            .await?
            .ok_or(AppError::NotFound("Admission"))?;

        let mut roles = parse_roles(&current.roles);
        roles.extend(school_closure(role));

        let admission = sqlx::query_as::<_, Admission>(
            "UPDATE admissions SET roles = $1 WHERE id = $2 RETURNING *",
        )
        .bind(role_names(roles))
        .bind(current.id)
        .fetch_one(&mut **tx)
        .await?;

        tracing::info!("Granted {role} to user {user_id} in school {school_id}");
        Ok(admission)
    }

    /// Stored membership only: a banned user still "has" their roles.
    pub async fn has_role(
        pool: &PgPool,
        school_id: Uuid,
        user_id: Uuid,
        role: SchoolRole,
    ) -> AppResult<bool> {
        Ok(Self::get(pool, school_id, user_id)
            .await?
            .map(|a| parse_roles(&a.roles).contains(&role))
            .unwrap_or(false))
    }

    /// Like [`has_role`](Self::has_role), but a banned admission grants nothing.
    pub async fn is_active_with_role(
        pool: &PgPool,
        school_id: Uuid,
        user_id: Uuid,
        role: SchoolRole,
    ) -> AppResult<bool> {
        let admission = Self::get(pool, school_id, user_id).await?;
        Ok(admission_grants(admission.as_ref(), role))
    }

    /// Grant a role on behalf of `actor`. Director is only assigned when the
    /// school is created.
    pub async fn promote(
        pool: &PgPool,
        actor: &AccessIndex,
        school_id: Uuid,
        user_id: Uuid,
        role: SchoolRole,
    ) -> AppResult<Admission> {
        actor.require(school_id, SchoolRole::SuperAdministrator)?;
        if role == SchoolRole::Director {
            return Err(AppError::Forbidden);
        }
        UserService::get(pool, user_id).await?;
        Self::grant(pool, school_id, user_id, role).await
    }

    /// Replace the user's roles with the closure of `role`.
    pub async fn reassign(
        pool: &PgPool,
        actor: &AccessIndex,
        school_id: Uuid,
        user_id: Uuid,
        role: SchoolRole,
    ) -> AppResult<Admission> {
        actor.require(school_id, SchoolRole::SuperAdministrator)?;
        if role == SchoolRole::Director {
            return Err(AppError::Forbidden);
        }
        Self::ensure_not_director(pool, school_id, user_id).await?;

        let mut tx = pool.begin().await?;
        let current = Self::lock_admission(&mut tx, school_id, user_id)
            .await?
            .ok_or(AppError::NotFound("Admission"))?;
        let admission = sqlx::query_as::<_, Admission>(
            "UPDATE admissions SET roles = $1 WHERE id = $2 RETURNING *",
        )
        .bind(role_names(school_closure(role)))
        .bind(current.id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!("Reassigned user {user_id} in school {school_id} to {role}");
        Ok(admission)
    }

    async fn set_active(
        pool: &PgPool,
        actor: &AccessIndex,
        school_id: Uuid,
        user_id: Uuid,
        active: bool,
    ) -> AppResult<Admission> {
        actor.require(school_id, SchoolRole::SuperAdministrator)?;
        Self::ensure_not_director(pool, school_id, user_id).await?;

        let mut tx = pool.begin().await?;
        let current = Self::lock_admission(&mut tx, school_id, user_id)
            .await?
            .ok_or(AppError::NotFound("Admission"))?;
        let admission = sqlx::query_as::<_, Admission>(
            "UPDATE admissions SET is_active = $1 WHERE id = $2 RETURNING *",
        )
        .bind(active)
        .bind(current.id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(admission)
    }

    pub async fn ban(
        pool: &PgPool,
        actor: &AccessIndex,
        school_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Admission> {
        let admission = Self::set_active(pool, actor, school_id, user_id, false).await?;
        tracing::info!("User {user_id} banned from school {school_id}");
        Ok(admission)
    }

    pub async fn unban(
        pool: &PgPool,
        actor: &AccessIndex,
        school_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Admission> {
        let admission = Self::set_active(pool, actor, school_id, user_id, true).await?;
        tracing::info!("User {user_id} unbanned in school {school_id}");
        Ok(admission)
    }

    /// Clear the user's roles in the school. The row and its ban state remain.
    pub async fn leave(pool: &PgPool, school_id: Uuid, user_id: Uuid) -> AppResult<Admission> {
        Self::ensure_not_director(pool, school_id, user_id).await?;

        let mut tx = pool.begin().await?;
        let current = Self::lock_admission(&mut tx, school_id, user_id)
            .await?
            .ok_or(AppError::NotFound("Admission"))?;
        let admission = sqlx::query_as::<_, Admission>(
            "UPDATE admissions SET roles = '{}' WHERE id = $1 RETURNING *",
        )
        .bind(current.id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(admission)
    }

    pub async fn list_members(
        pool: &PgPool,
        actor: &AccessIndex,
        school_id: Uuid,
    ) -> AppResult<Vec<Member>> {
        actor.require(school_id, SchoolRole::Administrator)?;
        let members = sqlx::query_as::<_, Member>(
            "SELECT a.client_id, u.email, u.first_name, u.last_name, a.roles, a.is_active
             FROM admissions a
             JOIN users u ON u.id = a.client_id
             WHERE a.school_id = $1
             ORDER BY u.last_name, u.first_name",
        )
        .bind(school_id)
        .fetch_all(pool)
        .await?;
        Ok(members)
    }
}
