use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "lesson_day", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LessonDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl From<LessonDay> for Weekday {
    fn from(day: LessonDay) -> Self {
        match day {
            LessonDay::Monday => Weekday::Mon,
            LessonDay::Tuesday => Weekday::Tue,
            LessonDay::Wednesday => Weekday::Wed,
            LessonDay::Thursday => Weekday::Thu,
            LessonDay::Friday => Weekday::Fri,
            LessonDay::Saturday => Weekday::Sat,
            LessonDay::Sunday => Weekday::Sun,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "instrument", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Instrument {
    Piano,
    Guitar,
    Drums,
    Violin,
    Trumpet,
    Flute,
    Harp,
}

impl std::fmt::Display for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Instrument::Piano => "piano",
            Instrument::Guitar => "guitar",
            Instrument::Drums => "drums",
            Instrument::Violin => "violin",
            Instrument::Trumpet => "trumpet",
            Instrument::Flute => "flute",
            Instrument::Harp => "harp",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "start_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StartType {
    Term,
    Date,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Lesson {
    pub id: Uuid,
    pub school_id: Uuid,
    pub student_id: Uuid,
    pub teacher_id: Uuid,
    pub title: String,
    pub information: String,
    pub instrument: Instrument,
    pub day: LessonDay,
    pub time: NaiveTime,
    pub duration_minutes: i32,
    pub interval_weeks: i32,
    pub number_of_lessons: i32,
    pub price: Decimal,
    pub fulfilled: bool,
    pub start_type: StartType,
    pub start_term_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One generated occurrence of a fulfilled lesson.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScheduledLesson {
    pub id: Uuid,
    pub lesson_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// Timetable row: an occurrence with the lesson details needed to display it.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TimetableEntry {
    pub id: Uuid,
    pub lesson_id: Uuid,
    pub title: String,
    pub instrument: Instrument,
    pub student_id: Uuid,
    pub teacher_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// Body for POST /schools/{id}/lessons.
#[derive(Debug, Deserialize)]
pub struct RequestLessonRequest {
    /// Defaults to the caller; may be one of the caller's children.
    pub student_id: Option<Uuid>,
    pub teacher_id: Uuid,
    pub title: Option<String>,
    #[serde(default)]
    pub information: String,
    pub instrument: Instrument,
    pub day: LessonDay,
    pub time: NaiveTime,
    pub duration_minutes: i32,
    pub interval_weeks: i32,
    pub number_of_lessons: i32,
}

/// Body for PUT /lessons/{id}. Only unfulfilled lessons can be modified.
#[derive(Debug, Default, Deserialize)]
pub struct ModifyLessonRequest {
    pub teacher_id: Option<Uuid>,
    pub title: Option<String>,
    pub information: Option<String>,
    pub instrument: Option<Instrument>,
    pub day: Option<LessonDay>,
    pub time: Option<NaiveTime>,
    pub duration_minutes: Option<i32>,
    pub interval_weeks: Option<i32>,
    pub number_of_lessons: Option<i32>,
}

/// Body for POST /lessons/{id}/fulfill. Every field overrides the requested value.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct FulfillLessonRequest {
    pub day: Option<LessonDay>,
    pub time: Option<NaiveTime>,
    pub duration_minutes: Option<i32>,
    pub interval_weeks: Option<i32>,
    pub start_type: Option<StartType>,
    pub start_date: Option<NaiveDate>,
    pub start_term_id: Option<Uuid>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    PartiallyPaid,
    Paid,
    Overpaid,
}

impl PaymentStatus {
    pub fn from_amounts(total_paid: Decimal, price: Decimal) -> Self {
        if total_paid.is_zero() {
            PaymentStatus::Unpaid
        } else if total_paid < price {
            PaymentStatus::PartiallyPaid
        } else if total_paid == price {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Overpaid
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Invoice {
    pub lesson: Lesson,
    pub total_paid: Decimal,
    pub outstanding: Decimal,
    pub status: PaymentStatus,
}
