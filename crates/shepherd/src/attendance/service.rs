use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde_json::json;

use super::absence::{count_absences, lookback_window, AbsenceAction, AbsencePolicy, ABSENCE_WINDOW};
use super::domain::{
    AbsenceScanReport, AttendanceRecord, AttendanceStats, AttendanceStatus, CheckIn,
};
use super::repository::AttendanceRepository;
use crate::members::{Member, MemberId, MemberRepository};
use crate::notifications::{
    Dispatch, DispatchError, Mailer, NotificationDispatcher, NotificationDraft,
    NotificationRepository, NotificationType,
};
use crate::store::{DateRange, RepositoryError};

/// Check-ins, attendance history and the weekly absence scan.
pub struct AttendanceService<S, M> {
    store: Arc<S>,
    dispatcher: Arc<NotificationDispatcher<S, M>>,
    policy: AbsencePolicy,
    church_name: String,
}

impl<S, M> AttendanceService<S, M>
where
    S: AttendanceRepository + MemberRepository + NotificationRepository + 'static,
    M: Mailer + 'static,
{
    pub fn new(
        store: Arc<S>,
        dispatcher: Arc<NotificationDispatcher<S, M>>,
        policy: AbsencePolicy,
        church_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            policy,
            church_name: church_name.into(),
        }
    }

    /// Record (or update) a member's check-in for a service date.
    pub async fn record(&self, check_in: CheckIn) -> Result<AttendanceRecord, AttendanceServiceError> {
        let member_id = check_in.member_id;
        let member = self
            .store
            .member(member_id)
            .await?
            .ok_or(AttendanceServiceError::UnknownMember(member_id))?;
        if !member.is_active {
            return Err(AttendanceServiceError::InactiveMember(member_id));
        }

        let record = self
            .store
            .upsert_attendance(check_in.into_record(Utc::now()))
            .await?;
        tracing::info!(
            member_id = %member_id,
            service_date = %record.service_date,
            status = %record.status,
            "attendance recorded"
        );

        if record.is_first_timer {
            self.welcome(&member).await;
        }

        Ok(record)
    }

    pub async fn history(
        &self,
        member: MemberId,
        range: DateRange,
    ) -> Result<Vec<AttendanceRecord>, AttendanceServiceError> {
        Ok(self.store.attendance_for_member(member, range).await?)
    }

    pub async fn on_date(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>, AttendanceServiceError> {
        Ok(self.store.attendance_on(date).await?)
    }

    pub async fn absent_on(&self, date: NaiveDate) -> Result<Vec<Member>, AttendanceServiceError> {
        Ok(self.store.absent_members(date).await?)
    }

    /// Absences among the most recent service dates inside the lookback window.
    pub async fn consecutive_absences(
        &self,
        member: MemberId,
        today: NaiveDate,
    ) -> Result<u32, AttendanceServiceError> {
        let window = lookback_window(today);
        let dates = self.store.service_dates(window, Some(ABSENCE_WINDOW)).await?;
        let history = self.store.attendance_for_member(member, window).await?;
        Ok(count_absences(&dates, &history))
    }

    pub async fn stats(
        &self,
        member_id: MemberId,
        today: NaiveDate,
    ) -> Result<AttendanceStats, AttendanceServiceError> {
        let member = self
            .store
            .member(member_id)
            .await?
            .ok_or(AttendanceServiceError::UnknownMember(member_id))?;

        let since_join = DateRange::between(member.join_date, today);
        let total_services = self.store.service_dates(since_join, None).await?.len() as u32;
        let attended = self
            .store
            .attendance_for_member(member_id, since_join)
            .await?
            .iter()
            .filter(|record| record.status == AttendanceStatus::Present)
            .count() as u32;

        let percentage = if total_services == 0 {
            0.0
        } else {
            let raw = f64::from(attended) / f64::from(total_services) * 100.0;
            (raw * 100.0).round() / 100.0
        };

        Ok(AttendanceStats {
            total_services,
            attended,
            percentage,
            consecutive_absences: self.consecutive_absences(member_id, today).await?,
        })
    }

    /// Warn or escalate members missing from the latest service on or before `today`.
    pub async fn scan_absences(&self, today: NaiveDate) -> Result<AbsenceScanReport, AttendanceServiceError> {
        let Some(service_date) = self
            .store
            .service_dates(DateRange::until(today), Some(1))
            .await?
            .into_iter()
            .next()
        else {
            tracing::info!(%today, "no service history; absence scan skipped");
            return Ok(AbsenceScanReport::default());
        };

        let absent = self.store.absent_members(service_date).await?;
        let window = lookback_window(today);
        let recent_dates = self.store.service_dates(window, Some(ABSENCE_WINDOW)).await?;

        let mut report = AbsenceScanReport {
            service_date: Some(service_date),
            scanned: absent.len(),
            ..AbsenceScanReport::default()
        };

        for member in &absent {
            let history = self.store.attendance_for_member(member.id, window).await?;
            let absences = count_absences(&recent_dates, &history);

            match self.policy.classify(absences) {
                AbsenceAction::None => {}
                AbsenceAction::Warn => {
                    let draft = NotificationDraft::new(
                        member.id,
                        NotificationType::AbsenceWarning,
                        "We Miss You!",
                        format!(
                            "We noticed you've missed {absences} services. We hope everything is okay and look forward to seeing you soon!"
                        ),
                    )
                    .with_idempotency_key(format!("absence:{}:{service_date}", member.id));

                    match self.dispatcher.dispatch(draft).await? {
                        Dispatch::Duplicate => report.duplicates += 1,
                        _ => report.warned += 1,
                    }
                }
                AbsenceAction::Critical => {
                    let draft = NotificationDraft::new(
                        member.id,
                        NotificationType::AbsenceCritical,
                        "We Miss You!",
                        format!(
                            "You've been absent for {absences} services. Your pastor will be reaching out to you soon. We hope to see you again!"
                        ),
                    )
                    .with_idempotency_key(format!("absence:{}:{service_date}", member.id));

                    match self.dispatcher.dispatch(draft).await? {
                        Dispatch::Duplicate => report.duplicates += 1,
                        _ => report.critical += 1,
                    }

                    if self.escalate(member, absences, service_date).await? {
                        report.escalated += 1;
                    }
                }
            }
        }

        tracing::info!(
            %service_date,
            scanned = report.scanned,
            warned = report.warned,
            critical = report.critical,
            escalated = report.escalated,
            duplicates = report.duplicates,
            "absence scan finished"
        );
        Ok(report)
    }

    /// Returns whether a new follow-up went to the department head.
    async fn escalate(
        &self,
        member: &Member,
        absences: u32,
        service_date: NaiveDate,
    ) -> Result<bool, AttendanceServiceError> {
        let Some(head) = self.store.department_head(member.id).await? else {
            return Ok(false);
        };
        if head.id == member.id {
            return Ok(false);
        }

        let draft = NotificationDraft::new(
            head.id,
            NotificationType::AbsenceCritical,
            "Member Follow-up Required",
            format!(
                "{} has been absent for {absences} consecutive services.",
                member.full_name()
            ),
        )
        .with_metadata(json!({ "memberId": member.id, "absenceCount": absences }))
        .with_idempotency_key(format!(
            "absence-followup:{}:{}:{service_date}",
            head.id, member.id
        ));

        Ok(!self.dispatcher.dispatch(draft).await?.is_duplicate())
    }

    async fn welcome(&self, member: &Member) {
        let draft = NotificationDraft::new(
            member.id,
            NotificationType::FirstTimerWelcome,
            format!("Welcome to {}!", self.church_name),
            format!(
                "Welcome to {}! We're thrilled to have you join us. May God bless you abundantly.",
                self.church_name
            ),
        )
        .with_idempotency_key(format!("welcome:{}", member.id));

        if let Err(err) = self.dispatcher.dispatch(draft).await {
            tracing::warn!(member_id = %member.id, error = %err, "first-timer welcome failed");
        }
    }
}

/// Error raised by the attendance service.
#[derive(Debug, thiserror::Error)]
pub enum AttendanceServiceError {
    #[error("member {0} not found")]
    UnknownMember(MemberId),
    #[error("member {0} is not active")]
    InactiveMember(MemberId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
