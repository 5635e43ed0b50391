use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::members::MemberId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub Uuid);

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Birthday,
    AbsenceWarning,
    AbsenceCritical,
    TitheReminder,
    EventReminder,
    FirstTimerWelcome,
    TravelBlessing,
    General,
}

impl NotificationType {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationType::Birthday => "birthday",
            NotificationType::AbsenceWarning => "absence_warning",
            NotificationType::AbsenceCritical => "absence_critical",
            NotificationType::TitheReminder => "tithe_reminder",
            NotificationType::EventReminder => "event_reminder",
            NotificationType::FirstTimerWelcome => "first_timer_welcome",
            NotificationType::TravelBlessing => "travel_blessing",
            NotificationType::General => "general",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown notification type '{0}'")]
pub struct UnknownNotificationType(pub String);

impl FromStr for NotificationType {
    type Err = UnknownNotificationType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "birthday" => Ok(NotificationType::Birthday),
            "absence_warning" => Ok(NotificationType::AbsenceWarning),
            "absence_critical" => Ok(NotificationType::AbsenceCritical),
            "tithe_reminder" => Ok(NotificationType::TitheReminder),
            "event_reminder" => Ok(NotificationType::EventReminder),
            "first_timer_welcome" => Ok(NotificationType::FirstTimerWelcome),
            "travel_blessing" => Ok(NotificationType::TravelBlessing),
            "general" => Ok(NotificationType::General),
            other => Err(UnknownNotificationType(other.to_string())),
        }
    }
}

/// Persisted notification. Only the read flag changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub member_id: MemberId,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub metadata: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Notification waiting to be dispatched.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationDraft {
    pub member_id: MemberId,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub metadata: Value,
    pub idempotency_key: Option<String>,
}

impl NotificationDraft {
    pub fn new(
        member_id: MemberId,
        kind: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            member_id,
            kind,
            title: title.into(),
            message: message.into(),
            metadata: Value::Object(Default::default()),
            idempotency_key: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// A second draft carrying the same key is stored once and mailed once.
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    pub(crate) fn into_notification(self, created_at: DateTime<Utc>) -> Notification {
        Notification {
            id: NotificationId(Uuid::new_v4()),
            member_id: self.member_id,
            kind: self.kind,
            title: self.title,
            message: self.message,
            is_read: false,
            read_at: None,
            metadata: self.metadata,
            idempotency_key: self.idempotency_key,
            created_at,
        }
    }
}
