pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sqlx::PgPool;

use config::Config;
use services::lessons::ScheduleSettings;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn schedule(&self) -> ScheduleSettings {
        ScheduleSettings::from(self.config.as_ref())
    }

    /// Today's date in the school timezone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.config.school_timezone).date_naive()
    }
}
