//! Demo data seed script
//!
//! Seeds two schools with a year of terms, staff, a family of students and a
//! handful of lessons (some fulfilled and paid):
//! - King's Music School, directed by Marty Major
//! - The Norma Noe School of Music, directed by its teacher Norma Noe
//!
//! Usage:
//!   DATABASE_URL=... ./seed [--year 2024] [--students 20] [--reset]

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, NaiveTime, Utc};
use clap::Parser;
use uuid::Uuid;

use lessonbook_api::{
    config::Config,
    db,
    models::{
        admission::SchoolRole,
        lesson::{FulfillLessonRequest, Instrument, LessonDay, RequestLessonRequest},
        school::CreateSchoolRequest,
        term::TermRequest,
        transfer::RecordTransferRequest,
        user::{CreateChildRequest, CreateUserRequest, GlobalRole, User},
    },
    services::{
        admissions::AdmissionService,
        calendar::TermService,
        lessons::{LessonService, ScheduleSettings},
        rbac::AccessIndex,
        schools::SchoolService,
        transfers::TransferService,
        users::UserService,
    },
};

#[derive(Parser)]
#[command(name = "seed", about = "Seed the lessonbook database with demo data")]
struct Args {
    /// Academic year the terms start in (defaults to the current year)
    #[arg(long)]
    year: Option<i32>,

    /// Number of extra client students to enrol at King's
    #[arg(long, default_value_t = 20)]
    students: usize,

    /// Delete all existing data first
    #[arg(long)]
    reset: bool,
}

/// Six terms of an academic year, September to July.
fn academic_terms(year: i32) -> Result<Vec<TermRequest>> {
    let shapes = [
        ((0, 9, 1), (0, 10, 21)),
        ((0, 10, 31), (0, 12, 16)),
        ((1, 1, 3), (1, 2, 10)),
        ((1, 2, 20), (1, 3, 31)),
        ((1, 4, 17), (1, 5, 26)),
        ((1, 6, 5), (1, 7, 21)),
    ];
    let date = |(dy, m, d): (i32, u32, u32)| {
        NaiveDate::from_ymd_opt(year + dy, m, d).context("invalid term date")
    };
    shapes
        .into_iter()
        .map(|(start, end)| Ok(TermRequest { start_date: date(start)?, end_date: date(end)? }))
        .collect()
}

async fn adult(
    pool: &sqlx::PgPool,
    email: &str,
    first_name: &str,
    last_name: &str,
    instruments: Vec<Instrument>,
) -> Result<User> {
    let req = CreateUserRequest {
        email: email.into(),
        first_name: first_name.into(),
        last_name: last_name.into(),
        instruments,
    };
    UserService::create(pool, &req)
        .await
        .with_context(|| format!("Failed to create user {email}"))
}

fn piano_lesson(student: &User, teacher: &User) -> RequestLessonRequest {
    RequestLessonRequest {
        student_id: Some(student.id),
        teacher_id: teacher.id,
        title: Some("Piano Lesson".into()),
        information: "I have no prior experience.".into(),
        instrument: Instrument::Piano,
        day: LessonDay::Monday,
        time: NaiveTime::from_hms_opt(15, 0, 0).unwrap_or_default(),
        duration_minutes: 30,
        interval_weeks: 1,
        number_of_lessons: 1,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;
    let settings = ScheduleSettings::from(&config);
    let pool = db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    db::run_migrations(&pool).await?;

    if args.reset {
        println!("Clearing existing data...");
        db::clear_all(&pool).await?;
    }

    let year = args.year.unwrap_or_else(|| Utc::now().year());
    let terms = academic_terms(year)?;
    // Fulfil as if on the eve of the first term.
    let today = terms[0].start_date.pred_opt().context("invalid seed date")?;

    println!("Creating users...");
    let director = adult(&pool, "marty.major@example.org", "Marty", "Major", vec![]).await?;
    UserService::grant_global(&pool, director.id, GlobalRole::Director).await?;

    let parent = adult(&pool, "john.doe@example.org", "John", "Doe", vec![]).await?;
    let child = |first: &str| CreateChildRequest {
        email: format!("{}.doe@example.org", first.to_lowercase()),
        first_name: first.into(),
        last_name: "Doe".into(),
    };
    let alice = UserService::create_child(&pool, parent.id, &child("Alice")).await?;
    let bob = UserService::create_child(&pool, parent.id, &child("Bob")).await?;

    let administrator =
        adult(&pool, "petra.pickles@example.org", "Petra", "Pickles", vec![]).await?;
    let teacher = adult(
        &pool,
        "norma.noe@example.org",
        "Norma",
        "Noe",
        vec![Instrument::Piano, Instrument::Violin],
    )
    .await?;
    UserService::grant_global(&pool, teacher.id, GlobalRole::Director).await?;

    println!("Creating King's Music School...");
    let kings = SchoolService::create(
        &pool,
        &AccessIndex::load(&pool, director.id).await?,
        &CreateSchoolRequest {
            name: "King's Music School".into(),
            description: Some("A friendly music school for all ages.".into()),
        },
    )
    .await?;
    for term in &terms {
        TermService::create(&pool, kings.id, term).await?;
    }
    AdmissionService::grant(&pool, kings.id, parent.id, SchoolRole::Client).await?;
    AdmissionService::grant(&pool, kings.id, administrator.id, SchoolRole::Administrator).await?;
    AdmissionService::grant(&pool, kings.id, teacher.id, SchoolRole::Teacher).await?;

    println!("Creating The Norma Noe School of Music...");
    let norma = SchoolService::create(
        &pool,
        &AccessIndex::load(&pool, teacher.id).await?,
        &CreateSchoolRequest {
            name: "The Norma Noe School of Music".into(),
            description: Some("Piano and violin tuition.".into()),
        },
    )
    .await?;
    for term in &terms {
        TermService::create(&pool, norma.id, term).await?;
    }
    AdmissionService::grant(&pool, norma.id, parent.id, SchoolRole::Administrator).await?;
    AdmissionService::grant(&pool, norma.id, administrator.id, SchoolRole::Client).await?;

    println!("Booking lessons...");
    let client = AccessIndex::load(&pool, parent.id).await?;
    let admin = AccessIndex::load(&pool, administrator.id).await?;
    let mut fulfilled = Vec::new();
    for student in [&parent, &alice, &bob] {
        let req = piano_lesson(student, &teacher);
        let lesson = LessonService::request(&pool, &client, kings.id, &req, &settings).await?;
        fulfilled.push(lesson.id);
    }
    // Left unfulfilled for the administrator to pick up.
    let req = piano_lesson(&parent, &teacher);
    LessonService::request(&pool, &client, kings.id, &req, &settings).await?;

    for lesson_id in fulfilled {
        let lesson = LessonService::fulfill(
            &pool,
            &admin,
            lesson_id,
            &FulfillLessonRequest::default(),
            &settings,
            today,
        )
        .await?;
        let paid = RecordTransferRequest { user_id: parent.id, lesson_id, amount: lesson.price };
        if lesson.price > rust_decimal::Decimal::ZERO {
            TransferService::record(&pool, &admin, kings.id, &paid).await?;
        }
    }

    println!("Enrolling {} students...", args.students);
    for i in 0..args.students {
        let id = Uuid::new_v4().simple().to_string();
        let student = adult(
            &pool,
            &format!("student.{}@example.org", &id[..8]),
            "Student",
            &(i + 1).to_string(),
            vec![],
        )
        .await?;
        AdmissionService::grant(&pool, kings.id, student.id, SchoolRole::Client).await?;
    }

    println!("Seed complete. Terms start {}.", terms[0].start_date);
    Ok(())
}
