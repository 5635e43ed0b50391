use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use super::jwt::JwtKeys;
use super::permissions::Permission;
use super::AuthError;
use crate::error::ApiError;
use crate::members::{MemberId, MemberRepository, Role};

/// Authenticated caller resolved from the `Authorization: Bearer` header.
///
/// The token only identifies the member: the account must still be active and
/// the role is read from the directory, so deactivation and role changes apply
/// to tokens issued before them.
#[derive(Debug, Clone)]
pub struct AuthMember {
    pub id: MemberId,
    pub email: String,
    pub role: Role,
}

impl AuthMember {
    pub fn require(&self, permission: Permission) -> Result<(), ApiError> {
        if self.role.allows(permission) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "forbidden: insufficient permissions".to_string(),
            ))
        }
    }

    /// Acting on your own records is always allowed; anyone else's needs `permission`.
    pub fn require_self_or(&self, member: MemberId, permission: Permission) -> Result<(), ApiError> {
        if self.id == member {
            Ok(())
        } else {
            self.require(permission)
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthMember
where
    S: Send + Sync,
    Arc<JwtKeys>: FromRef<S>,
    Arc<dyn MemberRepository>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = Arc::<JwtKeys>::from_ref(state);

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AuthError::MissingToken)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::MissingToken)?;

        let claims = keys.verify(token.trim())?;
        let directory = Arc::<dyn MemberRepository>::from_ref(state);
        let member = directory
            .member(claims.member_id())
            .await?
            .filter(|member| member.is_active)
            .ok_or(AuthError::InactiveAccount)?;

        Ok(Self {
            id: member.id,
            email: member.email,
            role: member.role,
        })
    }
}
