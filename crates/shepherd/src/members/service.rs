use std::sync::Arc;

use chrono::Utc;

use super::domain::{
    Department, DepartmentId, Member, MemberCredentials, MemberId, NewDepartment,
    RegistrationRequest, Role,
};
use super::repository::MemberRepository;
use crate::auth::password::{hash_password, verify_password};
use crate::store::RepositoryError;

const MIN_PASSWORD_LENGTH: usize = 8;

/// Registration, credential checks and the member directory.
pub struct MemberService<R> {
    repository: Arc<R>,
}

impl<R> MemberService<R>
where
    R: MemberRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Register a new member with the default `member` role.
    pub async fn register(&self, request: RegistrationRequest) -> Result<Member, MemberServiceError> {
        let email = normalize_email(&request.email)?;
        if request.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(MemberServiceError::Invalid(format!(
                "password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }
        let first_name = required("first_name", &request.first_name)?;
        let last_name = required("last_name", &request.last_name)?;
        let phone_number = required("phone_number", &request.phone_number)?;

        if let Some(department) = request.department_id {
            self.require_department(department).await?;
        }

        let password = request.password.clone();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|err| MemberServiceError::Hashing(err.to_string()))?
            .map_err(|err| MemberServiceError::Hashing(err.to_string()))?;

        let now = Utc::now();
        let member = Member {
            id: MemberId::new(),
            email,
            first_name,
            last_name,
            phone_number,
            role: Role::Member,
            department_id: request.department_id,
            cell_group_id: request.cell_group_id,
            date_of_birth: request.date_of_birth,
            address: request
                .address
                .map(|address| address.trim().to_string())
                .filter(|address| !address.is_empty()),
            is_first_timer: request.is_first_timer,
            join_date: now.date_naive(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let stored = self
            .repository
            .insert_member(MemberCredentials {
                member,
                password_hash,
            })
            .await
            .map_err(|err| match err {
                RepositoryError::Conflict => MemberServiceError::DuplicateEmail,
                RepositoryError::NotFound => {
                    MemberServiceError::Invalid("department not found".to_string())
                }
                other => MemberServiceError::Repository(other),
            })?;

        tracing::info!(member_id = %stored.id, "member registered");
        Ok(stored)
    }

    /// Check credentials; inactive members cannot sign in.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Member, MemberServiceError> {
        let email = email.trim().to_ascii_lowercase();
        let Some(credentials) = self.repository.credentials_by_email(&email).await? else {
            return Err(MemberServiceError::InvalidCredentials);
        };

        if !credentials.member.is_active {
            return Err(MemberServiceError::InvalidCredentials);
        }

        let password = password.to_string();
        let hash = credentials.password_hash.clone();
        let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|err| MemberServiceError::Hashing(err.to_string()))?;
        if !verified {
            return Err(MemberServiceError::InvalidCredentials);
        }

        Ok(credentials.member)
    }

    pub async fn get(&self, id: MemberId) -> Result<Member, MemberServiceError> {
        self.repository
            .member(id)
            .await?
            .ok_or(MemberServiceError::NotFound)
    }

    pub async fn active_members(&self) -> Result<Vec<Member>, MemberServiceError> {
        Ok(self.repository.active_members().await?)
    }

    /// Soft delete: history stays attached to the member row.
    pub async fn deactivate(&self, id: MemberId) -> Result<Member, MemberServiceError> {
        let member = self
            .repository
            .set_active(id, false)
            .await
            .map_err(not_found_as_member)?;
        tracing::info!(member_id = %id, "member deactivated");
        Ok(member)
    }

    pub async fn change_role(&self, id: MemberId, role: Role) -> Result<Member, MemberServiceError> {
        let member = self
            .repository
            .set_role(id, role)
            .await
            .map_err(not_found_as_member)?;
        tracing::info!(member_id = %id, %role, "member role changed");
        Ok(member)
    }

    pub async fn create_department(
        &self,
        request: NewDepartment,
    ) -> Result<Department, MemberServiceError> {
        let name = required("name", &request.name)?;
        if let Some(head) = request.head_id {
            self.get(head).await?;
        }

        let department = Department {
            id: DepartmentId::new(),
            name,
            description: request.description,
            head_id: request.head_id,
        };
        Ok(self.repository.insert_department(department).await?)
    }

    /// Move a member into a department, or out of any with `None`.
    pub async fn assign_department(
        &self,
        id: MemberId,
        department: Option<DepartmentId>,
    ) -> Result<Member, MemberServiceError> {
        if let Some(department) = department {
            self.require_department(department).await?;
        }
        let member = self
            .repository
            .set_department(id, department)
            .await
            .map_err(not_found_as_member)?;
        tracing::info!(member_id = %id, department_id = ?department, "member department changed");
        Ok(member)
    }

    /// Appoint (or clear) the head escalations are routed to.
    pub async fn set_department_head(
        &self,
        id: DepartmentId,
        head: Option<MemberId>,
    ) -> Result<Department, MemberServiceError> {
        if let Some(head) = head {
            let member = self.get(head).await?;
            if !member.is_active {
                return Err(MemberServiceError::Invalid(
                    "department head must be an active member".to_string(),
                ));
            }
        }
        self.repository
            .set_department_head(id, head)
            .await
            .map_err(|err| match err {
                RepositoryError::NotFound => MemberServiceError::DepartmentNotFound,
                other => MemberServiceError::Repository(other),
            })
    }

    async fn require_department(&self, id: DepartmentId) -> Result<(), MemberServiceError> {
        match self.repository.department(id).await? {
            Some(_) => Ok(()),
            None => Err(MemberServiceError::Invalid("department not found".to_string())),
        }
    }
}

fn not_found_as_member(err: RepositoryError) -> MemberServiceError {
    match err {
        RepositoryError::NotFound => MemberServiceError::NotFound,
        other => MemberServiceError::Repository(other),
    }
}

fn normalize_email(raw: &str) -> Result<String, MemberServiceError> {
    let email = raw.trim().to_ascii_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    };

    if valid {
        Ok(email)
    } else {
        Err(MemberServiceError::Invalid("a valid email address is required".to_string()))
    }
}

fn required(field: &str, value: &str) -> Result<String, MemberServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(MemberServiceError::Invalid(format!("{field} is required")))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Error raised by the member service.
#[derive(Debug, thiserror::Error)]
pub enum MemberServiceError {
    #[error("{0}")]
    Invalid(String),
    #[error("email is already registered")]
    DuplicateEmail,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("member not found")]
    NotFound,
    #[error("department not found")]
    DepartmentNotFound,
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
