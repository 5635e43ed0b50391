use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::members::MemberId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TitheId(pub Uuid);

impl TitheId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TitheId {
    fn default() -> Self {
        Self::new()
    }
}

/// Declared giving cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitheFrequency {
    Daily,
    Weekly,
    Monthly,
}

impl TitheFrequency {
    pub fn as_str(self) -> &'static str {
        match self {
            TitheFrequency::Daily => "daily",
            TitheFrequency::Weekly => "weekly",
            TitheFrequency::Monthly => "monthly",
        }
    }
}

impl fmt::Display for TitheFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown tithe frequency '{0}'")]
pub struct UnknownFrequency(pub String);

impl FromStr for TitheFrequency {
    type Err = UnknownFrequency;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "daily" => Ok(TitheFrequency::Daily),
            "weekly" => Ok(TitheFrequency::Weekly),
            "monthly" => Ok(TitheFrequency::Monthly),
            other => Err(UnknownFrequency(other.to_string())),
        }
    }
}

/// A recorded payment. Never updated after insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitheRecord {
    pub id: TitheId,
    pub member_id: MemberId,
    pub amount: Decimal,
    pub frequency: TitheFrequency,
    pub payment_date: NaiveDate,
    pub payment_method: String,
    pub receipt_number: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTithe {
    pub member_id: MemberId,
    pub amount: Decimal,
    pub frequency: TitheFrequency,
    pub payment_date: NaiveDate,
    pub payment_method: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TitheStats {
    pub total_amount: Decimal,
    pub total_payments: u32,
    pub last_payment_date: Option<NaiveDate>,
}

/// Latest payment of one (member, frequency) pair, as seen by the reminder scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GivingPlan {
    pub member_id: MemberId,
    pub frequency: TitheFrequency,
    pub last_payment: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TitheScanReport {
    pub scanned: usize,
    pub reminded: usize,
    pub escalated: usize,
    pub duplicates: usize,
}
