use async_trait::async_trait;
use chrono::NaiveDate;

use super::domain::{Department, DepartmentId, Member, MemberCredentials, MemberId, Role};
use crate::store::RepositoryError;

/// Storage abstraction for members and their departments.
#[async_trait]
pub trait MemberRepository: Send + Sync {
    /// Fails with `Conflict` when the email is already registered and with
    /// `NotFound` when the department does not exist.
    async fn insert_member(&self, record: MemberCredentials) -> Result<Member, RepositoryError>;
    async fn member(&self, id: MemberId) -> Result<Option<Member>, RepositoryError>;
    async fn credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<MemberCredentials>, RepositoryError>;
    async fn active_members(&self) -> Result<Vec<Member>, RepositoryError>;
    async fn set_active(&self, id: MemberId, active: bool) -> Result<Member, RepositoryError>;
    async fn set_role(&self, id: MemberId, role: Role) -> Result<Member, RepositoryError>;
    /// `NotFound` when either the member or the department is missing.
    async fn set_department(
        &self,
        id: MemberId,
        department: Option<DepartmentId>,
    ) -> Result<Member, RepositoryError>;
    async fn insert_department(&self, department: Department)
        -> Result<Department, RepositoryError>;
    async fn department(&self, id: DepartmentId) -> Result<Option<Department>, RepositoryError>;
    async fn set_department_head(
        &self,
        id: DepartmentId,
        head: Option<MemberId>,
    ) -> Result<Department, RepositoryError>;
    /// Head of the member's department, if the member has one and it is staffed.
    async fn department_head(&self, member: MemberId) -> Result<Option<Member>, RepositoryError>;
    /// Active members whose birthday falls on `date`.
    async fn birthdays_on(&self, date: NaiveDate) -> Result<Vec<Member>, RepositoryError>;
}
