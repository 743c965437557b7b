//! Fixtures for tests that run against a real database.
//!
//! Tests using [`pool`] are skipped when `DATABASE_URL` is unset. Every
//! fixture creates fresh rows with random emails so tests can share one
//! database and run in parallel.

use chrono::NaiveTime;
use rust_decimal_macros::dec;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::{
    db,
    models::{
        admission::SchoolRole,
        lesson::{Instrument, LessonDay, RequestLessonRequest},
        school::{CreateSchoolRequest, School},
        user::{CreateUserRequest, GlobalRole, User},
    },
    services::{
        admissions::AdmissionService, lessons::ScheduleSettings, rbac::AccessIndex,
        schools::SchoolService, users::UserService,
    },
};

pub(crate) async fn pool() -> Option<PgPool> {
    let _ = dotenvy::dotenv();
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping database test");
        return None;
    };
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .unwrap();
    db::run_migrations(&pool).await.unwrap();
    Some(pool)
}

pub(crate) fn settings() -> ScheduleSettings {
    ScheduleSettings {
        timezone: chrono_tz::Europe::London,
        hourly_rate: dec!(10),
        rollover_days: 7,
    }
}

pub(crate) async fn adult(pool: &PgPool) -> User {
    let req = CreateUserRequest {
        email: format!("{}@test.example", Uuid::new_v4()),
        first_name: "Test".into(),
        last_name: "User".into(),
        instruments: vec![],
    };
    UserService::create(pool, &req).await.unwrap()
}

pub(crate) async fn index(pool: &PgPool, user: &User) -> AccessIndex {
    AccessIndex::load(pool, user.id).await.unwrap()
}

/// A fresh school and its director.
pub(crate) async fn school(pool: &PgPool) -> (School, User) {
    let director = adult(pool).await;
    UserService::grant_global(pool, director.id, GlobalRole::Director).await.unwrap();
    let req = CreateSchoolRequest { name: "Test School".into(), description: None };
    let school = SchoolService::create(pool, &index(pool, &director).await, &req).await.unwrap();
    (school, director)
}

/// A new user admitted to `school` with `role`.
pub(crate) async fn member(pool: &PgPool, school: &School, role: SchoolRole) -> User {
    let user = adult(pool).await;
    AdmissionService::grant(pool, school.id, user.id, role).await.unwrap();
    user
}

pub(crate) fn monday_lesson(student: &User, teacher: &User) -> RequestLessonRequest {
    RequestLessonRequest {
        student_id: Some(student.id),
        teacher_id: teacher.id,
        title: None,
        information: String::new(),
        instrument: Instrument::Piano,
        day: LessonDay::Monday,
        time: NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
        duration_minutes: 60,
        interval_weeks: 1,
        number_of_lessons: 1,
    }
}
