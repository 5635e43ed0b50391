use std::sync::Arc;

use chrono::Utc;

use super::domain::{Notification, NotificationDraft, NotificationId};
use super::mailer::{Mailer, OutboundEmail};
use super::repository::NotificationRepository;
use super::template::render_notification_html;
use crate::members::{MemberId, MemberRepository};
use crate::store::RepositoryError;

/// What happened to a draft handed to the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Stored and accepted by the mail transport.
    Delivered(Notification),
    /// Stored in the inbox; the email could not be sent.
    Stored(Notification),
    /// The idempotency key was already used; nothing stored, nothing sent.
    Duplicate,
}

impl Dispatch {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Dispatch::Duplicate)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Persists notifications to the member inbox and mirrors them by email.
///
/// The inbox row is the source of truth; email delivery is best effort and a
/// failed send never rolls the row back.
pub struct NotificationDispatcher<S, M> {
    store: Arc<S>,
    mailer: Arc<M>,
    church_name: String,
}

impl<S, M> NotificationDispatcher<S, M>
where
    S: NotificationRepository + MemberRepository + 'static,
    M: Mailer + 'static,
{
    pub fn new(store: Arc<S>, mailer: Arc<M>, church_name: impl Into<String>) -> Self {
        Self {
            store,
            mailer,
            church_name: church_name.into(),
        }
    }

    pub async fn dispatch(&self, draft: NotificationDraft) -> Result<Dispatch, DispatchError> {
        let notification = draft.into_notification(Utc::now());
        let stored = match self.store.insert_notification(notification).await {
            Ok(stored) => stored,
            Err(RepositoryError::Conflict) => return Ok(Dispatch::Duplicate),
            Err(err) => return Err(err.into()),
        };

        let recipient = match self.store.member(stored.member_id).await {
            Ok(Some(member)) => member,
            Ok(None) => {
                tracing::warn!(member_id = %stored.member_id, "notification stored for unknown member");
                return Ok(Dispatch::Stored(stored));
            }
            Err(err) => {
                tracing::warn!(member_id = %stored.member_id, error = %err, "recipient lookup failed");
                return Ok(Dispatch::Stored(stored));
            }
        };

        let email = OutboundEmail {
            to: recipient.email.clone(),
            to_name: Some(recipient.full_name()),
            subject: stored.title.clone(),
            html: render_notification_html(&self.church_name, &stored.title, &stored.message),
        };

        match self.mailer.send(email).await {
            Ok(()) => {
                tracing::debug!(
                    member_id = %stored.member_id,
                    kind = stored.kind.as_str(),
                    "notification delivered"
                );
                Ok(Dispatch::Delivered(stored))
            }
            Err(err) => {
                tracing::warn!(
                    member_id = %stored.member_id,
                    kind = stored.kind.as_str(),
                    error = %err,
                    "notification email failed"
                );
                Ok(Dispatch::Stored(stored))
            }
        }
    }

    pub async fn inbox(
        &self,
        member: MemberId,
        is_read: Option<bool>,
    ) -> Result<Vec<Notification>, DispatchError> {
        Ok(self.store.notifications_for(member, is_read).await?)
    }

    /// Only the owner can mark a notification read; anyone else sees `NotFound`.
    pub async fn mark_read(
        &self,
        id: NotificationId,
        member: MemberId,
    ) -> Result<Notification, DispatchError> {
        self.store
            .mark_read(id, member)
            .await?
            .ok_or(DispatchError::Repository(RepositoryError::NotFound))
    }

    pub async fn mark_all_read(&self, member: MemberId) -> Result<u64, DispatchError> {
        Ok(self.store.mark_all_read(member).await?)
    }
}
