pub mod api;
pub mod attendance;
pub mod auth;
pub mod config;
pub mod error;
pub mod members;
pub mod notifications;
pub mod scheduler;
pub mod store;
pub mod telemetry;
pub mod tithes;

pub use api::{church_router, ChurchApi};
pub use config::AppConfig;
pub use error::{ApiError, AppError};

#[cfg(test)]
pub(crate) mod testing;
