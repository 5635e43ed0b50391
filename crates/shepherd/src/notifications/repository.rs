use async_trait::async_trait;

use super::domain::{Notification, NotificationId};
use crate::members::MemberId;
use crate::store::RepositoryError;

/// Storage abstraction for the notification inbox.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Fails with `Conflict` when the idempotency key was already used.
    async fn insert_notification(
        &self,
        notification: Notification,
    ) -> Result<Notification, RepositoryError>;
    /// Newest first, optionally filtered by read flag.
    async fn notifications_for(
        &self,
        member: MemberId,
        is_read: Option<bool>,
    ) -> Result<Vec<Notification>, RepositoryError>;
    /// `None` when the notification does not exist or belongs to someone else.
    async fn mark_read(
        &self,
        id: NotificationId,
        member: MemberId,
    ) -> Result<Option<Notification>, RepositoryError>;
    async fn mark_all_read(&self, member: MemberId) -> Result<u64, RepositoryError>;
}
