use async_trait::async_trait;
use chrono::NaiveDate;

use super::domain::{GivingPlan, TitheFrequency, TitheRecord, TitheStats};
use crate::members::MemberId;
use crate::store::{DateRange, RepositoryError};

/// Storage abstraction for tithe payments.
#[async_trait]
pub trait TitheRepository: Send + Sync {
    /// Fails with `Conflict` when the receipt number is already taken.
    async fn insert_tithe(&self, record: TitheRecord) -> Result<TitheRecord, RepositoryError>;
    /// Newest payment first.
    async fn tithes_for_member(
        &self,
        member: MemberId,
        range: DateRange,
    ) -> Result<Vec<TitheRecord>, RepositoryError>;
    async fn tithe_by_receipt(&self, receipt: &str) -> Result<Option<TitheRecord>, RepositoryError>;
    /// One entry per (member, frequency) pair with history, active members only.
    async fn giving_plans(&self) -> Result<Vec<GivingPlan>, RepositoryError>;
    async fn payments_after(
        &self,
        member: MemberId,
        frequency: TitheFrequency,
        after: NaiveDate,
    ) -> Result<u32, RepositoryError>;
    async fn tithe_stats(&self, member: MemberId) -> Result<TitheStats, RepositoryError>;
}
