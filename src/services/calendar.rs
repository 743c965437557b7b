use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::term::{Term, TermRequest},
};

/// Inclusive-bounds overlap test between two date ranges.
pub fn ranges_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start <= b_end && a_end >= b_start
}

/// Validate a candidate term against the other terms of the same school.
/// `editing` is excluded from the overlap check.
pub fn validate_term(req: &TermRequest, existing: &[Term], editing: Option<Uuid>) -> AppResult<()> {
    if req.end_date <= req.start_date {
        return Err(AppError::validation("The end date must be after the start date."));
    }
    let clash = existing
        .iter()
        .filter(|t| Some(t.id) != editing)
        .any(|t| ranges_overlap(req.start_date, req.end_date, t.start_date, t.end_date));
    if clash {
        return Err(AppError::validation("This term overlaps with an existing term."));
    }
    Ok(())
}

/// The chronologically next term after `term`, by start date.
pub fn next_term<'a>(term: &Term, terms: &'a [Term]) -> Option<&'a Term> {
    terms
        .iter()
        .filter(|t| t.start_date > term.start_date)
        .min_by_key(|t| t.start_date)
}

/// Resolve the active term for `today`.
///
/// Starts from the stored pointer (or the earliest term when none is stored)
/// and walks forward while the candidate's end date has already passed. A
/// pointer sitting after a term that has not ended yet moves back to the
/// earliest such term.
pub fn resolve_current_term<'a>(
    stored: Option<Uuid>,
    terms: &'a [Term],
    today: NaiveDate,
) -> Option<&'a Term> {
    let mut current = stored
        .and_then(|id| terms.iter().find(|t| t.id == id))
        .or_else(|| terms.iter().min_by_key(|t| t.start_date))?;

    if let Some(earlier) = terms
        .iter()
        .filter(|t| t.start_date < current.start_date && t.end_date >= today)
        .min_by_key(|t| t.start_date)
    {
        current = earlier;
    }

    while current.end_date < today {
        current = next_term(current, terms)?;
    }
    Some(current)
}

/// Default start term offered when fulfilling a by-term lesson.
///
/// Near the end of the current term (fewer than `rollover_days` left) the
/// successor is offered instead, when there is one.
pub fn suggest_start_term<'a>(
    current: Option<&'a Term>,
    terms: &'a [Term],
    today: NaiveDate,
    rollover_days: i64,
) -> Option<&'a Term> {
    let current = current?;
    let days_left = (current.end_date - today).num_days();
    if days_left < rollover_days {
        if let Some(next) = next_term(current, terms) {
            return Some(next);
        }
    }
    Some(current)
}

pub struct TermService;

impl TermService {
    pub async fn list(pool: &PgPool, school_id: Uuid) -> AppResult<Vec<Term>> {
        let terms = sqlx::query_as::<_, Term>(
            "SELECT * FROM terms WHERE school_id = $1 ORDER BY start_date",
        )
        .bind(school_id)
        .fetch_all(pool)
        .await?;
        Ok(terms)
    }

    /// Lock the school row so concurrent term writes for one school serialize,
    /// and return the stored current term pointer.
    async fn lock_school(
        tx: &mut Transaction<'_, Postgres>,
        school_id: Uuid,
    ) -> AppResult<Option<Uuid>> {
        let row: Option<(Option<Uuid>,)> =
            sqlx::query_as("SELECT current_term_id FROM schools WHERE id = $1 FOR UPDATE")
                .bind(school_id)
                .fetch_optional(&mut **tx)
                .await?;
        row.map(|(current,)| current).ok_or(AppError::NotFound("School"))
    }

    pub async fn create(pool: &PgPool, school_id: Uuid, req: &TermRequest) -> AppResult<Term> {
        let mut tx = pool.begin().await?;
        let stored_current = Self::lock_school(&mut tx, school_id).await?;

        let existing = sqlx::query_as::<_, Term>("SELECT * FROM terms WHERE school_id = $1")
            .bind(school_id)
            .fetch_all(&mut *tx)
            .await?;
        validate_term(req, &existing, None)?;

        let term = sqlx::query_as::<_, Term>(
            "INSERT INTO terms (school_id, start_date, end_date)
             VALUES ($1, $2, $3)
             RETURNING *",
        )
        .bind(school_id)
        .bind(req.start_date)
        .bind(req.end_date)
        .fetch_one(&mut *tx)
        .await?;

        if existing.is_empty() && stored_current.is_none() {
            sqlx::query("UPDATE schools SET current_term_id = $1 WHERE id = $2")
                .bind(term.id)
                .bind(school_id)
                .execute(&mut *tx)
                .await?;
            tracing::info!("School {school_id}: first term {} installed as current", term.id);
        }

        tx.commit().await?;
        Ok(term)
    }

    pub async fn update(
        pool: &PgPool,
        school_id: Uuid,
        term_id: Uuid,
        req: &TermRequest,
    ) -> AppResult<Term> {
        let mut tx = pool.begin().await?;
        Self::lock_school(&mut tx, school_id).await?;

        let existing = sqlx::query_as::<_, Term>("SELECT * FROM terms WHERE school_id = $1")
            .bind(school_id)
            .fetch_all(&mut *tx)
            .await?;
        if !existing.iter().any(|t| t.id == term_id) {
            return Err(AppError::NotFound("Term"));
        }
        validate_term(req, &existing, Some(term_id))?;

        let term = sqlx::query_as::<_, Term>(
            "UPDATE terms SET start_date = $1, end_date = $2
             WHERE id = $3 AND school_id = $4
             RETURNING *",
        )
        .bind(req.start_date)
        .bind(req.end_date)
        .bind(term_id)
        .bind(school_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(term)
    }

    /// The school's current-term pointer is cleared by the FK (ON DELETE SET NULL).
    pub async fn delete(pool: &PgPool, school_id: Uuid, term_id: Uuid) -> AppResult<()> {
        let res = sqlx::query("DELETE FROM terms WHERE id = $1 AND school_id = $2")
            .bind(term_id)
            .bind(school_id)
            .execute(pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(AppError::NotFound("Term"));
        }
        Ok(())
    }

    /// Resolve the school's current term for `today`, persisting the pointer
    /// when it moved.
    pub async fn current_term(
        pool: &PgPool,
        school_id: Uuid,
        today: NaiveDate,
    ) -> AppResult<Option<Term>> {
        let (stored,): (Option<Uuid>,) =
            sqlx::query_as("SELECT current_term_id FROM schools WHERE id = $1")
                .bind(school_id)
                .fetch_optional(pool)
                .await?
                .ok_or(AppError::NotFound("School"))?;

        let terms = Self::list(pool, school_id).await?;
        let resolved = resolve_current_term(stored, &terms, today).cloned();
        let resolved_id = resolved.as_ref().map(|t| t.id);

        if resolved_id != stored {
            sqlx::query("UPDATE schools SET current_term_id = $1 WHERE id = $2")
                .bind(resolved_id)
                .bind(school_id)
                .execute(pool)
                .await?;
            tracing::debug!("School {school_id}: current term advanced to {resolved_id:?}");
        }
        Ok(resolved)
    }
}
