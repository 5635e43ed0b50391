//! Tithe payments, receipt numbers and the missed-payment reminder scan.

pub mod domain;
pub mod receipt;
pub mod reminder;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    GivingPlan, NewTithe, TitheFrequency, TitheId, TitheRecord, TitheScanReport, TitheStats,
    UnknownFrequency,
};
pub use receipt::ReceiptGenerator;
pub use reminder::{ReminderAction, ReminderPolicy};
pub use repository::TitheRepository;
pub use router::tithe_router;
pub use service::{TitheService, TitheServiceError, MAX_RECEIPT_ATTEMPTS};
