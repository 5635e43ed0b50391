use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::json;

use super::domain::{GivingPlan, NewTithe, TitheId, TitheRecord, TitheScanReport, TitheStats};
use super::receipt::ReceiptGenerator;
use super::reminder::{expected_payments, missed_payments, ReminderAction, ReminderPolicy};
use super::repository::TitheRepository;
use crate::members::{Member, MemberId, MemberRepository};
use crate::notifications::{
    Dispatch, DispatchError, Mailer, NotificationDispatcher, NotificationDraft,
    NotificationRepository, NotificationType,
};
use crate::store::{DateRange, RepositoryError};

/// Attempts made before a receipt collision is reported to the caller.
pub const MAX_RECEIPT_ATTEMPTS: u32 = 3;

/// Payment recording, giving history and the weekly missed-tithe scan.
pub struct TitheService<S, M> {
    store: Arc<S>,
    dispatcher: Arc<NotificationDispatcher<S, M>>,
    receipts: ReceiptGenerator,
    policy: ReminderPolicy,
}

impl<S, M> TitheService<S, M>
where
    S: TitheRepository + MemberRepository + NotificationRepository + 'static,
    M: Mailer + 'static,
{
    pub fn new(
        store: Arc<S>,
        dispatcher: Arc<NotificationDispatcher<S, M>>,
        receipts: ReceiptGenerator,
        policy: ReminderPolicy,
    ) -> Self {
        Self {
            store,
            dispatcher,
            receipts,
            policy,
        }
    }

    pub async fn record(&self, tithe: NewTithe) -> Result<TitheRecord, TitheServiceError> {
        if tithe.amount <= Decimal::ZERO {
            return Err(TitheServiceError::Invalid(
                "amount must be greater than zero".to_string(),
            ));
        }
        let payment_method = tithe.payment_method.trim().to_string();
        if payment_method.is_empty() {
            return Err(TitheServiceError::Invalid(
                "payment_method is required".to_string(),
            ));
        }
        if self.store.member(tithe.member_id).await?.is_none() {
            return Err(TitheServiceError::UnknownMember(tithe.member_id));
        }

        for attempt in 1..=MAX_RECEIPT_ATTEMPTS {
            let record = TitheRecord {
                id: TitheId::new(),
                member_id: tithe.member_id,
                amount: tithe.amount,
                frequency: tithe.frequency,
                payment_date: tithe.payment_date,
                payment_method: payment_method.clone(),
                receipt_number: self.receipts.generate(),
                notes: tithe.notes.clone(),
                created_at: Utc::now(),
            };

            match self.store.insert_tithe(record).await {
                Ok(stored) => {
                    tracing::info!(
                        member_id = %stored.member_id,
                        receipt = %stored.receipt_number,
                        frequency = %stored.frequency,
                        "tithe recorded"
                    );
                    return Ok(stored);
                }
                Err(RepositoryError::Conflict) => {
                    tracing::warn!(attempt, "receipt number collision; regenerating");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(TitheServiceError::ReceiptCollision {
            attempts: MAX_RECEIPT_ATTEMPTS,
        })
    }

    pub async fn history(
        &self,
        member: MemberId,
        range: DateRange,
    ) -> Result<Vec<TitheRecord>, TitheServiceError> {
        Ok(self.store.tithes_for_member(member, range).await?)
    }

    pub async fn by_receipt(&self, receipt: &str) -> Result<Option<TitheRecord>, TitheServiceError> {
        Ok(self.store.tithe_by_receipt(receipt.trim()).await?)
    }

    pub async fn stats(&self, member: MemberId) -> Result<TitheStats, TitheServiceError> {
        Ok(self.store.tithe_stats(member).await?)
    }

    /// Payments missed by one giving plan as of `today`.
    pub async fn missed_for(&self, plan: &GivingPlan, today: NaiveDate) -> Result<u32, TitheServiceError> {
        let expected = expected_payments(plan.frequency, plan.last_payment, today);
        let actual = self
            .store
            .payments_after(plan.member_id, plan.frequency, plan.last_payment)
            .await?;
        Ok(missed_payments(expected, actual))
    }

    /// Remind members behind on their declared cadence; escalate the worst to their HOD.
    pub async fn scan_missed(&self, today: NaiveDate) -> Result<TitheScanReport, TitheServiceError> {
        let plans = self.store.giving_plans().await?;
        let week = today.iso_week();
        let period = format!("{}-W{:02}", week.year(), week.week());

        let mut report = TitheScanReport {
            scanned: plans.len(),
            ..TitheScanReport::default()
        };

        for plan in &plans {
            let missed = self.missed_for(plan, today).await?;
            let action = self.policy.classify(missed);
            if action == ReminderAction::None {
                continue;
            }

            let draft = NotificationDraft::new(
                plan.member_id,
                NotificationType::TitheReminder,
                "Tithe Reminder",
                format!(
                    "You've missed {missed} {} tithe payment(s). Remember, tithing is an act of worship and obedience to God.",
                    plan.frequency
                ),
            )
            .with_idempotency_key(format!("tithe:{}:{}:{period}", plan.member_id, plan.frequency));

            match self.dispatcher.dispatch(draft).await? {
                Dispatch::Duplicate => report.duplicates += 1,
                _ => report.reminded += 1,
            }

            if action == ReminderAction::Escalate && self.escalate(plan, missed, &period).await? {
                report.escalated += 1;
            }
        }

        tracing::info!(
            %today,
            scanned = report.scanned,
            reminded = report.reminded,
            escalated = report.escalated,
            duplicates = report.duplicates,
            "tithe reminder scan finished"
        );
        Ok(report)
    }

    async fn escalate(&self, plan: &GivingPlan, missed: u32, period: &str) -> Result<bool, TitheServiceError> {
        let Some(member) = self.store.member(plan.member_id).await? else {
            return Ok(false);
        };
        let Some(head) = self.store.department_head(member.id).await? else {
            return Ok(false);
        };
        if head.id == member.id {
            return Ok(false);
        }

        let draft = follow_up_draft(&head, &member, missed).with_idempotency_key(format!(
            "tithe-followup:{}:{}:{}:{period}",
            head.id, member.id, plan.frequency
        ));
        Ok(!self.dispatcher.dispatch(draft).await?.is_duplicate())
    }
}

fn follow_up_draft(head: &Member, member: &Member, missed: u32) -> NotificationDraft {
    NotificationDraft::new(
        head.id,
        NotificationType::TitheReminder,
        "Member Tithe Follow-up",
        format!("{} has missed {missed} tithe payments.", member.full_name()),
    )
    .with_metadata(json!({ "memberId": member.id, "missedPayments": missed }))
}

/// Error raised by the tithe service.
#[derive(Debug, thiserror::Error)]
pub enum TitheServiceError {
    #[error("{0}")]
    Invalid(String),
    #[error("member {0} not found")]
    UnknownMember(MemberId),
    #[error("could not allocate a unique receipt number after {attempts} attempts")]
    ReceiptCollision { attempts: u32 },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
