pub mod feedback;
pub mod import;
pub mod init;
pub mod questions;
pub mod recommend;
pub mod results;
pub mod schedule;
pub mod take;
pub mod validate;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use chrono::{NaiveDate, NaiveTime};

use aptly_core::engine::AssessmentEngine;
use aptly_core::identity::{StoreDirectory, UserContext};
use aptly_core::model::ExamType;
use aptly_core::traits::SystemClock;
use aptly_store::{load_config_from, open_store, AptlyConfig};

/// Load the config and open the engine over the configured store.
pub fn open_engine(config_path: Option<&Path>) -> Result<(AptlyConfig, AssessmentEngine)> {
    let config = load_config_from(config_path)?;
    let store = open_store(&config.store)?;
    let engine = AssessmentEngine::open_with_store_users(store, Arc::new(SystemClock))?;
    Ok((config, engine))
}

/// Resolve a sign-in identifier against the registered users.
pub fn resolve_user(engine: &AssessmentEngine, email_or_id: &str) -> Result<UserContext> {
    let directory = StoreDirectory::load(engine.store().as_ref())?;
    Ok(UserContext::resolve(&directory, email_or_id))
}

pub fn parse_exam_type(s: &str) -> Result<ExamType, String> {
    s.parse()
}

pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|e| format!("{e} (expected YYYY-MM-DD)"))
}

pub fn parse_time(s: &str) -> Result<NaiveTime, String> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|e| format!("{e} (expected HH:MM)"))
}
