//! Member inbox plus best-effort email mirroring.
//!
//! Every notification is written to the inbox first. Drafts carrying an
//! idempotency key are stored and mailed at most once, which is what lets the
//! scheduled scans re-run safely.

pub mod dispatcher;
pub mod domain;
pub mod mailer;
pub mod repository;
pub mod router;
mod template;

#[cfg(test)]
mod tests;

pub use dispatcher::{Dispatch, DispatchError, NotificationDispatcher};
pub use domain::{
    Notification, NotificationDraft, NotificationId, NotificationType, UnknownNotificationType,
};
pub use mailer::{ConfiguredMailer, LogMailer, MailError, Mailer, OutboundEmail, SendGridMailer};
pub use repository::NotificationRepository;
pub use router::notification_router;
