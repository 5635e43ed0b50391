//! Persistence backends behind the per-aggregate repository traits.
//!
//! `postgres` is the production store; `memory` backs tests and the
//! no-database development mode.

pub mod memory;
pub mod postgres;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::attendance::AttendanceRepository;
use crate::members::MemberRepository;
use crate::notifications::NotificationRepository;
use crate::tithes::TitheRepository;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(value: sqlx::Error) -> Self {
        match &value {
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::Conflict,
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => Self::NotFound,
            _ => Self::Unavailable(value.to_string()),
        }
    }
}

/// Inclusive date window; open ends are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn until(end: NaiveDate) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }
}

/// Everything the services need from a backend.
pub trait Store:
    MemberRepository + AttendanceRepository + TitheRepository + NotificationRepository + 'static
{
}

impl<T> Store for T where
    T: MemberRepository + AttendanceRepository + TitheRepository + NotificationRepository + 'static
{
}
