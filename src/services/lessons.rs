//! Lesson requests and the requested → fulfilled workflow.

use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{
        admission::SchoolRole,
        lesson::{
            FulfillLessonRequest, Invoice, Lesson, LessonDay, ModifyLessonRequest, PaymentStatus,
            RequestLessonRequest, ScheduledLesson, StartType, TimetableEntry,
        },
        term::Term,
    },
    services::{
        admissions::AdmissionService,
        calendar::{suggest_start_term, TermService},
        rbac::AccessIndex,
        recurrence::{self, Occurrence, RecurrenceSpec},
        users::UserService,
    },
};

/// Scheduling knobs shared by every school.
#[derive(Debug, Clone)]
pub struct ScheduleSettings {
    pub timezone: Tz,
    pub hourly_rate: Decimal,
    pub rollover_days: i64,
}

impl From<&Config> for ScheduleSettings {
    fn from(config: &Config) -> Self {
        ScheduleSettings {
            timezone: config.school_timezone,
            hourly_rate: config.lesson_hourly_rate,
            rollover_days: config.term_rollover_days,
        }
    }
}

/// Everything a fulfillment writes, computed before any write happens.
#[derive(Debug, Clone)]
pub struct FulfillmentPlan {
    pub day: LessonDay,
    pub time: NaiveTime,
    pub duration_minutes: i32,
    pub interval_weeks: i32,
    pub start_type: StartType,
    pub start_term_id: Option<Uuid>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub occurrences: Vec<Occurrence>,
    pub number_of_lessons: i32,
    pub price: Decimal,
}

fn validate_recurrence(duration_minutes: i32, interval_weeks: i32) -> AppResult<()> {
    if duration_minutes <= 0 {
        return Err(AppError::validation("The duration must be positive."));
    }
    if interval_weeks < 1 {
        return Err(AppError::validation("The interval must be at least one week."));
    }
    Ok(())
}

fn validate_information(information: Option<&str>) -> AppResult<()> {
    match information {
        Some(i) if i.chars().count() > 280 => {
            Err(AppError::validation("The information cannot be longer than 280 characters."))
        }
        _ => Ok(()),
    }
}

fn validate_title(title: Option<&str>) -> AppResult<()> {
    match title {
        Some(t) if t.trim().is_empty() => Err(AppError::validation("The title cannot be blank.")),
        Some(t) if t.chars().count() > 25 => {
            Err(AppError::validation("The title cannot be longer than 25 characters."))
        }
        _ => Ok(()),
    }
}

/// Resolve dates, expand the recurrence and price the lesson.
///
/// `terms` are the school's terms and `current` the resolved current term.
pub fn plan_fulfillment(
    lesson: &Lesson,
    req: &FulfillLessonRequest,
    terms: &[Term],
    current: Option<&Term>,
    today: NaiveDate,
    settings: &ScheduleSettings,
) -> AppResult<FulfillmentPlan> {
    if lesson.fulfilled {
        return Err(AppError::Conflict("This lesson has already been fulfilled.".into()));
    }

    let day = req.day.unwrap_or(lesson.day);
    let time = req.time.unwrap_or(lesson.time);
    let duration_minutes = req.duration_minutes.unwrap_or(lesson.duration_minutes);
    let interval_weeks = req.interval_weeks.unwrap_or(lesson.interval_weeks);
    let start_type = req.start_type.unwrap_or(lesson.start_type);
    let requested_end = req.end_date.or(lesson.end_date);
    validate_recurrence(duration_minutes, interval_weeks)?;

    let (start_term_id, start_date, end_date) = match start_type {
        StartType::Term => {
            let term = match req.start_term_id.or(lesson.start_term_id) {
                Some(id) => terms.iter().find(|t| t.id == id).ok_or(AppError::NotFound("Term"))?,
                None => suggest_start_term(current, terms, today, settings.rollover_days)
                    .ok_or_else(|| {
                        AppError::validation(
                            "A start term is required but the school has no current term.",
                        )
                    })?,
            };
            (Some(term.id), term.start_date, requested_end.unwrap_or(term.end_date))
        }
        StartType::Date => {
            let start = req
                .start_date
                .or(lesson.start_date)
                .ok_or_else(|| AppError::validation("Start date cannot be blank."))?;
            let end = requested_end.or(current.map(|t| t.end_date)).ok_or_else(|| {
                AppError::validation("End date cannot be blank if a term does not exist.")
            })?;
            (None, start, end)
        }
    };

    if end_date < start_date {
        return Err(AppError::validation("The end date cannot be before the start date."));
    }

    let spec = RecurrenceSpec { day: day.into(), time, duration_minutes, interval_weeks };
    let occurrences = recurrence::generate(&spec, start_date, end_date, settings.timezone)?;
    let number_of_lessons = i32::try_from(occurrences.len())
        .map_err(|_| AppError::validation("Too many occurrences."))?;
    let price = recurrence::lesson_price(duration_minutes, number_of_lessons, settings.hourly_rate);

    Ok(FulfillmentPlan {
        day,
        time,
        duration_minutes,
        interval_weeks,
        start_type,
        start_term_id,
        start_date,
        end_date,
        occurrences,
        number_of_lessons,
        price,
    })
}

pub struct LessonService;

impl LessonService {
    pub async fn get(pool: &PgPool, lesson_id: Uuid) -> AppResult<Lesson> {
        sqlx::query_as::<_, Lesson>("SELECT * FROM lessons WHERE id = $1")
            .bind(lesson_id)
            .fetch_optional(pool)
            .await?
            .ok_or(AppError::NotFound("Lesson"))
    }

    async fn ensure_teacher(pool: &PgPool, school_id: Uuid, teacher_id: Uuid) -> AppResult<()> {
        if !AdmissionService::is_active_with_role(pool, school_id, teacher_id, SchoolRole::Teacher)
            .await?
        {
            return Err(AppError::validation("The selected teacher does not teach at this school."));
        }
        Ok(())
    }

    /// The student, the student's parent, or an administrator of the school.
    /// A caller banned from the school, or without an admission there, is none
    /// of these.
    pub(crate) async fn can_manage(
        pool: &PgPool,
        actor: &AccessIndex,
        lesson: &Lesson,
    ) -> AppResult<bool> {
        if !matches!(actor.membership(lesson.school_id), Some(m) if m.is_active) {
            return Ok(false);
        }
        if actor.allows(lesson.school_id, SchoolRole::Administrator) {
            return Ok(true);
        }
        UserService::is_self_or_child(pool, actor.user_id(), lesson.student_id).await
    }

    pub async fn request(
        pool: &PgPool,
        actor: &AccessIndex,
        school_id: Uuid,
        req: &RequestLessonRequest,
        settings: &ScheduleSettings,
    ) -> AppResult<Lesson> {
        actor.require(school_id, SchoolRole::Client)?;

        let student_id = req.student_id.unwrap_or(actor.user_id());
        if !UserService::is_self_or_child(pool, actor.user_id(), student_id).await? {
            return Err(AppError::Forbidden);
        }
        if req.teacher_id == student_id {
            return Err(AppError::validation("A student cannot teach their own lesson."));
        }
        Self::ensure_teacher(pool, school_id, req.teacher_id).await?;
        validate_title(req.title.as_deref())?;
        validate_information(Some(&req.information))?;
        validate_recurrence(req.duration_minutes, req.interval_weeks)?;
        if req.number_of_lessons < 1 {
            return Err(AppError::validation("At least one lesson must be requested."));
        }

        let price = recurrence::lesson_price(
            req.duration_minutes,
            req.number_of_lessons,
            settings.hourly_rate,
        );
        let lesson = sqlx::query_as::<_, Lesson>(
            "INSERT INTO lessons
                 (school_id, student_id, teacher_id, title, information, instrument, day, time,
                  duration_minutes, interval_weeks, number_of_lessons, price)
             VALUES ($1, $2, $3, COALESCE($4, 'Music Lesson'), $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING *",
        )
        .bind(school_id)
        .bind(student_id)
        .bind(req.teacher_id)
        .bind(&req.title)
        .bind(&req.information)
        .bind(req.instrument)
        .bind(req.day)
        .bind(req.time)
        .bind(req.duration_minutes)
        .bind(req.interval_weeks)
        .bind(req.number_of_lessons)
        .bind(price)
        .fetch_one(pool)
        .await?;

        tracing::info!("Lesson {} requested in school {school_id}", lesson.id);
        Ok(lesson)
    }

    pub async fn modify(
        pool: &PgPool,
        actor: &AccessIndex,
        lesson_id: Uuid,
        req: &ModifyLessonRequest,
        settings: &ScheduleSettings,
    ) -> AppResult<Lesson> {
        let lesson = Self::get(pool, lesson_id).await?;
        if !Self::can_manage(pool, actor, &lesson).await? {
            return Err(AppError::Forbidden);
        }
        if lesson.fulfilled {
            return Err(AppError::Conflict("A fulfilled lesson can no longer be modified.".into()));
        }
        if let Some(teacher_id) = req.teacher_id {
            Self::ensure_teacher(pool, lesson.school_id, teacher_id).await?;
        }

        validate_title(req.title.as_deref())?;
        validate_information(req.information.as_deref())?;

        let duration = req.duration_minutes.unwrap_or(lesson.duration_minutes);
        let interval = req.interval_weeks.unwrap_or(lesson.interval_weeks);
        let count = req.number_of_lessons.unwrap_or(lesson.number_of_lessons);
        validate_recurrence(duration, interval)?;
        if count < 1 {
            return Err(AppError::validation("At least one lesson must be requested."));
        }
        let price = recurrence::lesson_price(duration, count, settings.hourly_rate);

        let updated = sqlx::query_as::<_, Lesson>(
            "UPDATE lessons
             SET teacher_id  = COALESCE($1, teacher_id),
                 title       = COALESCE($2, title),
                 information = COALESCE($3, information),
                 instrument  = COALESCE($4, instrument),
                 day         = COALESCE($5, day),
                 time        = COALESCE($6, time),
                 duration_minutes  = $7,
                 interval_weeks    = $8,
                 number_of_lessons = $9,
                 price = $10
             WHERE id = $11 AND fulfilled = FALSE
             RETURNING *",
        )
        .bind(req.teacher_id)
        .bind(&req.title)
        .bind(&req.information)
        .bind(req.instrument)
        .bind(req.day)
        .bind(req.time)
        .bind(duration)
        .bind(interval)
        .bind(count)
        .bind(price)
        .bind(lesson_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::Conflict("A fulfilled lesson can no longer be modified.".into()))?;
        Ok(updated)
    }

    /// Move a lesson to fulfilled and materialize its schedule.
    ///
    /// The flag flips with a compare-and-set in the same transaction that
    /// replaces the occurrences, so a concurrent fulfillment either sees the
    /// lesson already fulfilled or loses the race with no writes.
    pub async fn fulfill(
        pool: &PgPool,
        actor: &AccessIndex,
        lesson_id: Uuid,
        req: &FulfillLessonRequest,
        settings: &ScheduleSettings,
        today: NaiveDate,
    ) -> AppResult<Lesson> {
        let lesson = Self::get(pool, lesson_id).await?;
        actor.require(lesson.school_id, SchoolRole::Administrator)?;

        let terms = TermService::list(pool, lesson.school_id).await?;
        let current = TermService::current_term(pool, lesson.school_id, today).await?;
        let plan = plan_fulfillment(&lesson, req, &terms, current.as_ref(), today, settings)?;

        let mut tx = pool.begin().await?;
        let fulfilled = sqlx::query_as::<_, Lesson>(
            "UPDATE lessons
             SET fulfilled = TRUE,
                 day = $1, time = $2, duration_minutes = $3, interval_weeks = $4,
                 start_type = $5, start_term_id = $6, start_date = $7, end_date = $8,
                 number_of_lessons = $9, price = $10
             WHERE id = $11 AND fulfilled = FALSE
             RETURNING *",
        )
        .bind(plan.day)
        .bind(plan.time)
        .bind(plan.duration_minutes)
        .bind(plan.interval_weeks)
        .bind(plan.start_type)
        .bind(plan.start_term_id)
        .bind(plan.start_date)
        .bind(plan.end_date)
        .bind(plan.number_of_lessons)
        .bind(plan.price)
        .bind(lesson_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::Conflict("This lesson has already been fulfilled.".into()))?;

        sqlx::query("DELETE FROM scheduled_lessons WHERE lesson_id = $1")
            .bind(lesson_id)
            .execute(&mut *tx)
            .await?;

        let starts: Vec<_> = plan.occurrences.iter().map(|o| o.starts_at).collect();
        let ends: Vec<_> = plan.occurrences.iter().map(|o| o.ends_at).collect();
        sqlx::query(
            "INSERT INTO scheduled_lessons (lesson_id, starts_at, ends_at)
             SELECT $1, s, e FROM UNNEST($2::TIMESTAMPTZ[], $3::TIMESTAMPTZ[]) AS t(s, e)",
        )
        .bind(lesson_id)
        .bind(&starts)
        .bind(&ends)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(
            "Lesson {lesson_id} fulfilled: {} occurrence(s) from {} to {}, price {}",
            plan.number_of_lessons,
            plan.start_date,
            plan.end_date,
            plan.price
        );
        Ok(fulfilled)
    }

    /// All lessons of one student in the school, fulfilled first.
    pub async fn list_bookings(
        pool: &PgPool,
        actor: &AccessIndex,
        school_id: Uuid,
        student_id: Uuid,
    ) -> AppResult<Vec<Lesson>> {
        actor.require(school_id, SchoolRole::Administrator)?;
        let lessons = sqlx::query_as::<_, Lesson>(
            "SELECT * FROM lessons
             WHERE school_id = $1 AND student_id = $2
             ORDER BY fulfilled DESC, created_at",
        )
        .bind(school_id)
        .bind(student_id)
        .fetch_all(pool)
        .await?;
        Ok(lessons)
    }

    pub async fn invoice(
        pool: &PgPool,
        actor: &AccessIndex,
        lesson_id: Uuid,
    ) -> AppResult<Invoice> {
        let lesson = Self::get(pool, lesson_id).await?;
        if !Self::can_manage(pool, actor, &lesson).await? {
            return Err(AppError::Forbidden);
        }
        if !lesson.fulfilled {
            return Err(AppError::validation("This lesson has not been fulfilled yet."));
        }

        let total_paid: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM transfers WHERE lesson_id = $1",
        )
        .bind(lesson_id)
        .fetch_one(pool)
        .await?;

        let status = PaymentStatus::from_amounts(total_paid, lesson.price);
        let outstanding = (lesson.price - total_paid).max(Decimal::ZERO);
        Ok(Invoice { lesson, total_paid, outstanding, status })
    }

    /// The generated occurrences of one lesson, visible to whoever can see
    /// its invoice and to its teacher.
    pub async fn occurrences(
        pool: &PgPool,
        actor: &AccessIndex,
        lesson_id: Uuid,
    ) -> AppResult<Vec<ScheduledLesson>> {
        let lesson = Self::get(pool, lesson_id).await?;
        let is_teacher = lesson.teacher_id == actor.user_id()
            && actor.allows(lesson.school_id, SchoolRole::Teacher);
        if !is_teacher && !Self::can_manage(pool, actor, &lesson).await? {
            return Err(AppError::Forbidden);
        }
        let occurrences = sqlx::query_as::<_, ScheduledLesson>(
            "SELECT id, lesson_id, starts_at, ends_at FROM scheduled_lessons
             WHERE lesson_id = $1
             ORDER BY starts_at",
        )
        .bind(lesson_id)
        .fetch_all(pool)
        .await?;
        Ok(occurrences)
    }

    /// Occurrences of the caller's (and their children's) lessons, limited to
    /// lessons overlapping the current term when the school has one.
    pub async fn timetable(
        pool: &PgPool,
        actor: &AccessIndex,
        school_id: Uuid,
        today: NaiveDate,
    ) -> AppResult<Vec<TimetableEntry>> {
        actor.require(school_id, SchoolRole::Client)?;
        let term = TermService::current_term(pool, school_id, today).await?;

        let entries = sqlx::query_as::<_, TimetableEntry>(
            "SELECT s.id, s.lesson_id, l.title, l.instrument, l.student_id, l.teacher_id,
                    s.starts_at, s.ends_at
             FROM scheduled_lessons s
             JOIN lessons l ON l.id = s.lesson_id
             JOIN users u ON u.id = l.student_id
             WHERE l.school_id = $1
               AND (l.student_id = $2 OR u.parent_id = $2)
               AND ($3::DATE IS NULL OR (l.start_date <= $4 AND l.end_date >= $3))
             ORDER BY s.starts_at",
        )
        .bind(school_id)
        .bind(actor.user_id())
        .bind(term.as_ref().map(|t| t.start_date))
        .bind(term.as_ref().map(|t| t.end_date))
        .fetch_all(pool)
        .await?;
        Ok(entries)
    }

    pub async fn teacher_timetable(
        pool: &PgPool,
        actor: &AccessIndex,
        school_id: Uuid,
    ) -> AppResult<Vec<TimetableEntry>> {
        actor.require(school_id, SchoolRole::Teacher)?;
        let entries = sqlx::query_as::<_, TimetableEntry>(
            "SELECT s.id, s.lesson_id, l.title, l.instrument, l.student_id, l.teacher_id,
                    s.starts_at, s.ends_at
             FROM scheduled_lessons s
             JOIN lessons l ON l.id = s.lesson_id
             WHERE l.school_id = $1 AND l.teacher_id = $2
             ORDER BY s.starts_at",
        )
        .bind(school_id)
        .bind(actor.user_id())
        .fetch_all(pool)
        .await?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::lesson::Instrument,
        services::calendar::tests::{d, term},
    };
    use chrono::{Datelike, Utc, Weekday};
    use rust_decimal_macros::dec;
    use sqlx::postgres::PgPoolOptions;

    use crate::{
        models::admission::Admission,
        services::rbac::{role_names, school_closure},
    };

    fn settings() -> ScheduleSettings {
        ScheduleSettings { timezone: Tz::UTC, hourly_rate: dec!(10), rollover_days: 7 }
    }

    fn requested(start_type: StartType) -> Lesson {
        Lesson {
            id: Uuid::new_v4(),
            school_id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            teacher_id: Uuid::new_v4(),
            title: "Music Lesson".into(),
            information: String::new(),
            instrument: Instrument::Piano,
            day: LessonDay::Monday,
            time: NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
            duration_minutes: 60,
            interval_weeks: 1,
            number_of_lessons: 1,
            price: dec!(10),
            fulfilled: false,
            start_type,
            start_term_id: None,
            start_date: None,
            end_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn by_term_uses_current_term_bounds() {
        let terms = vec![term(d(2024, 9, 1), d(2024, 10, 21))];
        let lesson = requested(StartType::Term);
        let plan = plan_fulfillment(
            &lesson,
            &FulfillLessonRequest::default(),
            &terms,
            terms.first(),
            d(2024, 8, 20),
            &settings(),
        )
        .unwrap();

        assert_eq!(plan.start_term_id, Some(terms[0].id));
        assert_eq!(plan.start_date, d(2024, 9, 1));
        assert_eq!(plan.end_date, d(2024, 10, 21));
        assert_eq!(plan.number_of_lessons, 8);
        assert_eq!(plan.price, dec!(80));
        assert_eq!(plan.occurrences[0].starts_at.weekday(), Weekday::Mon);
        assert!(plan.occurrences.iter().all(|o| {
            let day = o.starts_at.date_naive();
            day >= plan.start_date && day <= plan.end_date
        }));
    }

    #[test]
    fn end_date_before_first_occurrence_yields_zero_lessons() {
        let terms = vec![term(d(2024, 9, 1), d(2024, 10, 21))];
        let lesson = requested(StartType::Date);
        let req = FulfillLessonRequest {
            start_date: Some(d(2024, 9, 3)),
            end_date: Some(d(2024, 9, 5)),
            ..Default::default()
        };
        let plan =
            plan_fulfillment(&lesson, &req, &terms, terms.first(), d(2024, 9, 1), &settings())
                .unwrap();
        assert!(plan.occurrences.is_empty());
        assert_eq!(plan.number_of_lessons, 0);
        assert_eq!(plan.price, dec!(0));
    }

    #[test]
    fn by_date_without_end_falls_back_to_current_term() {
        let terms = vec![term(d(2024, 9, 1), d(2024, 10, 21))];
        let lesson = requested(StartType::Date);
        let req = FulfillLessonRequest { start_date: Some(d(2024, 10, 1)), ..Default::default() };
        let plan =
            plan_fulfillment(&lesson, &req, &terms, terms.first(), d(2024, 9, 20), &settings())
                .unwrap();
        assert_eq!(plan.end_date, d(2024, 10, 21));
        assert_eq!(plan.start_term_id, None);
        // 10-07, 10-14, 10-21
        assert_eq!(plan.number_of_lessons, 3);
    }

    #[test]
    fn rejected_without_end_date_and_without_terms() {
        let lesson = requested(StartType::Date);
        let req = FulfillLessonRequest { start_date: Some(d(2024, 10, 1)), ..Default::default() };
        let err = plan_fulfillment(&lesson, &req, &[], None, d(2024, 9, 20), &settings());
        assert!(matches!(err, Err(AppError::Validation(_))));

        let lesson = requested(StartType::Term);
        let err = plan_fulfillment(
            &lesson,
            &FulfillLessonRequest::default(),
            &[],
            None,
            d(2024, 9, 20),
            &settings(),
        );
        assert!(matches!(err, Err(AppError::Validation(_))));
    }

    #[test]
    fn by_date_requires_start_date() {
        let terms = vec![term(d(2024, 9, 1), d(2024, 10, 21))];
        let lesson = requested(StartType::Date);
        let err = plan_fulfillment(
            &lesson,
            &FulfillLessonRequest::default(),
            &terms,
            terms.first(),
            d(2024, 9, 20),
            &settings(),
        );
        assert!(matches!(err, Err(AppError::Validation(_))));
    }

    #[test]
    fn explicit_unknown_term_is_not_found() {
        let terms = vec![term(d(2024, 9, 1), d(2024, 10, 21))];
        let lesson = requested(StartType::Term);
        let req =
            FulfillLessonRequest { start_term_id: Some(Uuid::new_v4()), ..Default::default() };
        let err =
            plan_fulfillment(&lesson, &req, &terms, terms.first(), d(2024, 9, 2), &settings());
        assert!(matches!(err, Err(AppError::NotFound("Term"))));
    }

    #[test]
    fn near_term_end_defaults_to_next_term() {
        let terms = vec![
            term(d(2024, 9, 1), d(2024, 10, 21)),
            term(d(2024, 11, 4), d(2024, 12, 16)),
        ];
        let lesson = requested(StartType::Term);
        let plan = plan_fulfillment(
            &lesson,
            &FulfillLessonRequest::default(),
            &terms,
            terms.first(),
            d(2024, 10, 18),
            &settings(),
        )
        .unwrap();
        assert_eq!(plan.start_term_id, Some(terms[1].id));
        assert_eq!(plan.occurrences[0].starts_at.date_naive(), d(2024, 11, 4));
    }

    #[test]
    fn overrides_replace_requested_recurrence() {
        let terms = vec![term(d(2024, 9, 1), d(2024, 10, 21))];
        let lesson = requested(StartType::Term);
        let req = FulfillLessonRequest {
            day: Some(LessonDay::Wednesday),
            duration_minutes: Some(30),
            interval_weeks: Some(2),
            ..Default::default()
        };
        let plan =
            plan_fulfillment(&lesson, &req, &terms, terms.first(), d(2024, 8, 30), &settings())
                .unwrap();
        // 09-04, 09-18, 10-02, 10-16
        assert_eq!(plan.number_of_lessons, 4);
        assert_eq!(plan.occurrences[0].starts_at.weekday(), Weekday::Wed);
        assert_eq!(plan.price, dec!(20));
    }

    #[test]
    fn end_before_start_is_a_validation_error() {
        let lesson = requested(StartType::Date);
        let req = FulfillLessonRequest {
            start_date: Some(d(2024, 9, 10)),
            end_date: Some(d(2024, 9, 1)),
            ..Default::default()
        };
        let err = plan_fulfillment(&lesson, &req, &[], None, d(2024, 9, 1), &settings());
        assert!(matches!(err, Err(AppError::Validation(_))));
    }

    #[test]
    fn titles_are_bounded() {
        assert!(validate_title(None).is_ok());
        assert!(validate_title(Some("Grade 5 piano")).is_ok());
        assert!(validate_title(Some("   ")).is_err());
        assert!(validate_title(Some("An extremely long lesson title")).is_err());
    }

    #[test]
    fn already_fulfilled_is_a_conflict() {
        let mut lesson = requested(StartType::Date);
        lesson.fulfilled = true;
        let err = plan_fulfillment(
            &lesson,
            &FulfillLessonRequest::default(),
            &[],
            None,
            d(2024, 9, 1),
            &settings(),
        );
        assert!(matches!(err, Err(AppError::Conflict(_))));
    }

    fn admission(
        school_id: Uuid,
        client_id: Uuid,
        roles: &[SchoolRole],
        active: bool,
    ) -> Admission {
        Admission {
            id: Uuid::new_v4(),
            school_id,
            client_id,
            roles: role_names(roles.iter().copied()),
            is_active: active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn banned_callers_cannot_manage_even_their_own_lessons() {
        // Never connects: the ban is decided from the index alone.
        let pool = PgPoolOptions::new().connect_lazy("postgres://localhost/unused").unwrap();
        let mut lesson = requested(StartType::Date);
        let user = lesson.student_id;

        let client_ban = admission(lesson.school_id, user, &[SchoolRole::Client], false);
        let banned = AccessIndex::new(user, &[client_ban]);
        assert!(!LessonService::can_manage(&pool, &banned, &lesson).await.unwrap());

        let outsider = AccessIndex::new(user, &[]);
        assert!(!LessonService::can_manage(&pool, &outsider, &lesson).await.unwrap());

        let roles: Vec<_> = school_closure(SchoolRole::Director).into_iter().collect();
        let director_ban = admission(lesson.school_id, user, &roles, false);
        let banned_director = AccessIndex::new(user, &[director_ban]);
        assert!(!LessonService::can_manage(&pool, &banned_director, &lesson).await.unwrap());

        lesson.student_id = Uuid::new_v4();
        let admin = AccessIndex::new(user, &[admission(lesson.school_id, user, &roles, true)]);
        assert!(LessonService::can_manage(&pool, &admin, &lesson).await.unwrap());
    }
}
