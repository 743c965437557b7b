use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        admission::SchoolRole,
        transfer::{RecordTransferRequest, Transfer},
    },
    services::{lessons::LessonService, rbac::AccessIndex, users::UserService},
};

pub struct TransferService;

impl TransferService {
    /// Record a payment against a lesson of this school.
    pub async fn record(
        pool: &PgPool,
        actor: &AccessIndex,
        school_id: Uuid,
        req: &RecordTransferRequest,
    ) -> AppResult<Transfer> {
        actor.require(school_id, SchoolRole::Administrator)?;
        if req.amount <= Decimal::ZERO {
            return Err(AppError::validation("The amount must be positive."));
        }
        let lesson = LessonService::get(pool, req.lesson_id).await?;
        if lesson.school_id != school_id {
            return Err(AppError::NotFound("Lesson"));
        }
        UserService::get(pool, req.user_id).await?;

        let transfer = sqlx::query_as::<_, Transfer>(
            "INSERT INTO transfers (user_id, lesson_id, school_id, amount)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(req.user_id)
        .bind(lesson.id)
        .bind(school_id)
        .bind(req.amount.round_dp(2))
        .fetch_one(pool)
        .await?;

        tracing::info!("Transfer of {} recorded for lesson {}", transfer.amount, lesson.id);
        Ok(transfer)
    }

    pub async fn list(
        pool: &PgPool,
        actor: &AccessIndex,
        school_id: Uuid,
    ) -> AppResult<Vec<Transfer>> {
        actor.require(school_id, SchoolRole::Administrator)?;
        let transfers = sqlx::query_as::<_, Transfer>(
            "SELECT * FROM transfers WHERE school_id = $1 ORDER BY created_at DESC",
        )
        .bind(school_id)
        .fetch_all(pool)
        .await?;
        Ok(transfers)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::services::test_support::{index, member, monday_lesson, pool, school, settings};

    #[tokio::test]
    async fn payments_need_a_known_payer_and_a_positive_amount() {
        let Some(pool) = pool().await else { return };
        let (school, director) = school(&pool).await;
        let student = member(&pool, &school, SchoolRole::Client).await;
        let teacher = member(&pool, &school, SchoolRole::Teacher).await;
        let lesson = LessonService::request(
            &pool,
            &index(&pool, &student).await,
            school.id,
            &monday_lesson(&student, &teacher),
            &settings(),
        )
        .await
        .unwrap();
        let admin = index(&pool, &director).await;

        let payment = |user_id: Uuid, amount| RecordTransferRequest {
            user_id,
            lesson_id: lesson.id,
            amount,
        };

        let stranger = payment(Uuid::new_v4(), dec!(5));
        let res = TransferService::record(&pool, &admin, school.id, &stranger).await;
        assert!(matches!(res, Err(AppError::NotFound("User"))));

        let zero = payment(student.id, dec!(0));
        let res = TransferService::record(&pool, &admin, school.id, &zero).await;
        assert!(matches!(res, Err(AppError::Validation(_))));

        let paid = payment(student.id, dec!(5));
        let transfer = TransferService::record(&pool, &admin, school.id, &paid).await.unwrap();
        assert_eq!(transfer.amount, dec!(5));
        let listed = TransferService::list(&pool, &admin, school.id).await.unwrap();
        assert_eq!(listed.len(), 1);

        let client = index(&pool, &student).await;
        let res = TransferService::list(&pool, &client, school.id).await;
        assert!(matches!(res, Err(AppError::Forbidden)));
    }
}
