use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        admission::{Admission, SchoolRole},
        school::{CreateSchoolRequest, School, SchoolSearchQuery, UpdateSchoolRequest},
        user::GlobalRole,
    },
    services::{admissions::AdmissionService, rbac::AccessIndex, users::UserService},
};

pub struct SchoolService;

impl SchoolService {
    pub async fn get(pool: &PgPool, school_id: Uuid) -> AppResult<School> {
        sqlx::query_as::<_, School>("SELECT * FROM schools WHERE id = $1")
            .bind(school_id)
            .fetch_optional(pool)
            .await?
            .ok_or(AppError::NotFound("School"))
    }

    /// Name search; with `enrolled` only schools where the caller has an admission.
    pub async fn list(
        pool: &PgPool,
        actor: &AccessIndex,
        query: &SchoolSearchQuery,
    ) -> AppResult<Vec<School>> {
        let pattern = format!("%{}%", query.search.as_deref().unwrap_or(""));
        let schools = if query.enrolled {
            sqlx::query_as::<_, School>(
                "SELECT s.* FROM schools s
                 JOIN admissions a ON a.school_id = s.id
                 WHERE a.client_id = $1 AND s.name ILIKE $2
                 ORDER BY s.name",
            )
            .bind(actor.user_id())
            .bind(&pattern)
            .fetch_all(pool)
            .await?
        } else {
            sqlx::query_as::<_, School>("SELECT * FROM schools WHERE name ILIKE $1 ORDER BY name")
                .bind(&pattern)
                .fetch_all(pool)
                .await?
        };
        Ok(schools)
    }

    /// Only global directors create schools; the creator becomes the school's
    /// director with the full administrative chain.
    pub async fn create(
        pool: &PgPool,
        actor: &AccessIndex,
        req: &CreateSchoolRequest,
    ) -> AppResult<School> {
        let creator = UserService::get(pool, actor.user_id()).await?;
        if !creator.has_global_role(GlobalRole::Director) {
            return Err(AppError::Forbidden);
        }
        if req.name.trim().is_empty() {
            return Err(AppError::validation("The school name cannot be blank."));
        }

        let mut tx = pool.begin().await?;
        let school = sqlx::query_as::<_, School>(
            "INSERT INTO schools (name, director_id, description)
             VALUES ($1, $2, $3)
             RETURNING *",
        )
        .bind(req.name.trim())
        .bind(creator.id)
        .bind(&req.description)
        .fetch_one(&mut *tx)
        .await?;
        AdmissionService::grant_in(&mut tx, school.id, creator.id, SchoolRole::Director).await?;
        tx.commit().await?;

        tracing::info!("School {} created by director {}", school.id, creator.id);
        Ok(school)
    }

    pub async fn update(
        pool: &PgPool,
        actor: &AccessIndex,
        school_id: Uuid,
        req: &UpdateSchoolRequest,
    ) -> AppResult<School> {
        actor.require(school_id, SchoolRole::Director)?;
        let school = sqlx::query_as::<_, School>(
            "UPDATE schools
             SET name = COALESCE($1, name),
                 description = COALESCE($2, description)
             WHERE id = $3
             RETURNING *",
        )
        .bind(&req.name)
        .bind(&req.description)
        .bind(school_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("School"))?;
        Ok(school)
    }

    /// Cascades to terms, admissions, lessons, occurrences and transfers.
    pub async fn delete(pool: &PgPool, actor: &AccessIndex, school_id: Uuid) -> AppResult<()> {
        actor.require(school_id, SchoolRole::Director)?;
        let res = sqlx::query("DELETE FROM schools WHERE id = $1")
            .bind(school_id)
            .execute(pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(AppError::NotFound("School"));
        }
        tracing::info!("School {school_id} deleted");
        Ok(())
    }

    /// Follow a school as a client. The director cannot join their own school
    /// as a client, and a banned user stays banned.
    pub async fn join(pool: &PgPool, actor: &AccessIndex, school_id: Uuid) -> AppResult<Admission> {
        let school = Self::get(pool, school_id).await?;
        if school.is_director(actor.user_id()) {
            return Err(AppError::Forbidden);
        }
        if matches!(actor.membership(school_id), Some(m) if !m.is_active) {
            return Err(AppError::Forbidden);
        }
        AdmissionService::grant(pool, school_id, actor.user_id(), SchoolRole::Client).await
    }

    pub async fn leave(
        pool: &PgPool,
        actor: &AccessIndex,
        school_id: Uuid,
    ) -> AppResult<Admission> {
        AdmissionService::leave(pool, school_id, actor.user_id()).await
    }
}
