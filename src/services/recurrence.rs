//! Expansion of a lesson's weekly recurrence into concrete occurrences.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use rust_decimal::Decimal;

use crate::error::{AppError, AppResult};

/// The recurrence parameters of a lesson, already resolved to concrete values.
#[derive(Debug, Clone, Copy)]
pub struct RecurrenceSpec {
    pub day: Weekday,
    pub time: NaiveTime,
    pub duration_minutes: i32,
    pub interval_weeks: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// First date on or after `from` falling on `day`.
pub fn anchor(from: NaiveDate, day: Weekday) -> NaiveDate {
    let mut date = from;
    while date.weekday() != day {
        date = date + Duration::days(1);
    }
    date
}

/// Occurrence dates from the anchored start up to and including `end`.
pub fn occurrence_dates(
    day: Weekday,
    interval_weeks: i32,
    start: NaiveDate,
    end: NaiveDate,
) -> AppResult<Vec<NaiveDate>> {
    if interval_weeks < 1 {
        return Err(AppError::validation("The interval must be at least one week."));
    }
    let step = Duration::weeks(i64::from(interval_weeks));
    let mut dates = Vec::new();
    let mut date = anchor(start, day);
    while date <= end {
        dates.push(date);
        date = date + step;
    }
    Ok(dates)
}

/// Expand `spec` between `start` and `end` (inclusive) into timezone-aware
/// occurrences. Either the whole set is produced or an error is returned.
pub fn generate(
    spec: &RecurrenceSpec,
    start: NaiveDate,
    end: NaiveDate,
    tz: Tz,
) -> AppResult<Vec<Occurrence>> {
    if spec.duration_minutes <= 0 {
        return Err(AppError::validation("The duration must be positive."));
    }
    let length = Duration::minutes(i64::from(spec.duration_minutes));

    occurrence_dates(spec.day, spec.interval_weeks, start, end)?
        .into_iter()
        .map(|date| {
            let local = date.and_time(spec.time);
            let starts_at = tz
                .from_local_datetime(&local)
                .earliest()
                .ok_or_else(|| {
                    AppError::validation(format!(
                        "{local} does not exist in the {tz} timezone."
                    ))
                })?
                .with_timezone(&Utc);
            Ok(Occurrence { starts_at, ends_at: starts_at + length })
        })
        .collect()
}

/// `(duration / 60) * number_of_lessons * hourly_rate`, rounded to cents.
pub fn lesson_price(
    duration_minutes: i32,
    number_of_lessons: i32,
    hourly_rate: Decimal,
) -> Decimal {
    let hours = Decimal::from(duration_minutes) / Decimal::from(60);
    (hours * Decimal::from(number_of_lessons) * hourly_rate).round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::calendar::tests::d;
    use rust_decimal_macros::dec;

    fn monday_one_pm() -> RecurrenceSpec {
        RecurrenceSpec {
            day: Weekday::Mon,
            time: NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
            duration_minutes: 60,
            interval_weeks: 1,
        }
    }

    fn expected_count(anchored: NaiveDate, end: NaiveDate, interval: i32) -> usize {
        if anchored > end {
            0
        } else {
            ((end - anchored).num_days() / (i64::from(interval) * 7)) as usize + 1
        }
    }

    #[test]
    fn anchor_moves_forward_to_weekday() {
        // 2024-09-01 is a Sunday.
        assert_eq!(anchor(d(2024, 9, 1), Weekday::Mon), d(2024, 9, 2));
        assert_eq!(anchor(d(2024, 9, 2), Weekday::Mon), d(2024, 9, 2));
        assert_eq!(anchor(d(2024, 9, 3), Weekday::Mon), d(2024, 9, 9));
    }

    #[test]
    fn autumn_term_weekly_mondays() {
        let occ = generate(&monday_one_pm(), d(2024, 9, 1), d(2024, 10, 21), Tz::UTC).unwrap();
        assert_eq!(occ.len(), 8);
        assert_eq!(occ[0].starts_at.date_naive(), d(2024, 9, 2));
        assert_eq!(occ[7].starts_at.date_naive(), d(2024, 10, 21));
        assert!(occ.iter().all(|o| o.ends_at - o.starts_at == Duration::minutes(60)));
        assert_eq!(lesson_price(60, occ.len() as i32, dec!(10)), dec!(80));
    }

    #[test]
    fn end_before_anchor_yields_nothing() {
        let occ = generate(&monday_one_pm(), d(2024, 9, 3), d(2024, 9, 5), Tz::UTC).unwrap();
        assert!(occ.is_empty());
    }

    #[test]
    fn count_matches_closed_form() {
        let start = d(2024, 1, 3);
        let end = d(2024, 7, 19);
        for interval in 1..=4 {
            for day in [Weekday::Mon, Weekday::Wed, Weekday::Sat] {
                let dates = occurrence_dates(day, interval, start, end).unwrap();
                let anchored = anchor(start, day);
                assert_eq!(dates.len(), expected_count(anchored, end, interval));
                assert_eq!(dates[0].weekday(), day);
                assert!(dates.iter().all(|x| *x >= start && *x <= end));
            }
        }
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = occurrence_dates(Weekday::Mon, 0, d(2024, 9, 1), d(2024, 10, 1));
        assert!(matches!(err, Err(AppError::Validation(_))));
    }

    #[test]
    fn local_time_is_converted_to_utc() {
        let tz: Tz = "Europe/London".parse().unwrap();
        // BST (UTC+1) until 27 October, GMT afterwards.
        let occ = generate(&monday_one_pm(), d(2024, 10, 21), d(2024, 11, 4), tz).unwrap();
        assert_eq!(occ[0].starts_at.to_rfc3339(), "2024-10-21T12:00:00+00:00");
        assert_eq!(occ[2].starts_at.to_rfc3339(), "2024-11-04T13:00:00+00:00");
    }

    #[test]
    fn nonexistent_local_time_aborts_whole_generation() {
        let tz: Tz = "Europe/London".parse().unwrap();
        let spec = RecurrenceSpec {
            day: Weekday::Sun,
            time: NaiveTime::from_hms_opt(1, 30, 0).unwrap(),
            duration_minutes: 30,
            interval_weeks: 1,
        };
        // Clocks go forward at 01:00 on 2024-03-31.
        assert!(generate(&spec, d(2024, 3, 17), d(2024, 4, 14), tz).is_err());
    }

    #[test]
    fn price_for_half_hours() {
        assert_eq!(lesson_price(30, 8, dec!(10)), dec!(40));
        assert_eq!(lesson_price(45, 3, dec!(10)), dec!(22.50));
        assert_eq!(lesson_price(60, 0, dec!(10)), dec!(0));
    }
}
