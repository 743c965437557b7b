use std::env;

use chrono_tz::Tz;
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub app_base_url: String,
    /// Zone in which lesson times of day are interpreted.
    pub school_timezone: Tz,
    pub lesson_hourly_rate: Decimal,
    /// A by-term lesson fulfilled with fewer days than this left in the
    /// current term defaults to the next term.
    pub term_rollover_days: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
            app_base_url: env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost".into()),
            school_timezone: env::var("SCHOOL_TIMEZONE")
                .unwrap_or_else(|_| "Europe/London".into())
                .parse::<Tz>()
                .map_err(|e| anyhow::anyhow!("Invalid SCHOOL_TIMEZONE: {e}"))?,
            lesson_hourly_rate: env::var("LESSON_HOURLY_RATE")
                .unwrap_or_else(|_| "10".into())
                .parse()?,
            term_rollover_days: env::var("TERM_ROLLOVER_DAYS")
                .unwrap_or_else(|_| "7".into())
                .parse()?,
        })
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("Missing required env var: {}", key))
}
