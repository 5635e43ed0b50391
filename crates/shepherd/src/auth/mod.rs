//! Bearer-token authentication and role-based authorization.

mod extractor;
pub mod jwt;
pub mod password;
pub mod permissions;

pub use extractor::AuthMember;
pub use jwt::{Claims, JwtKeys};
pub use permissions::Permission;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired, please login again")]
    Expired,
    #[error("account is inactive or no longer exists")]
    InactiveAccount,
    #[error("token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}
