use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AuthError;
use crate::members::{Member, MemberId, Role};

/// JWT claims carried by member bearer tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Member id
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    pub iat: usize,
}

impl Claims {
    pub fn member_id(&self) -> MemberId {
        MemberId(self.sub)
    }
}

/// Signing material plus token lifetime, built once from configuration.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours.max(1)),
        }
    }

    pub fn issue(&self, member: &Member) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: member.id.0,
            email: member.email.clone(),
            role: member.role,
            exp: (now + self.ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding).map_err(AuthError::Signing)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => {
                    tracing::debug!(error = %err, "JWT validation failed");
                    AuthError::InvalidToken
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn member(role: Role) -> Member {
        let now = Utc::now();
        Member {
            id: MemberId::new(),
            email: "grace@example.org".to_string(),
            first_name: "Grace".to_string(),
            last_name: "Okon".to_string(),
            phone_number: "08030000000".to_string(),
            role,
            department_id: None,
            cell_group_id: None,
            date_of_birth: None,
            address: None,
            is_first_timer: false,
            join_date: NaiveDate::from_ymd_opt(2024, 1, 7).expect("valid"),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn issued_token_round_trips_identity_and_role() {
        let keys = JwtKeys::new("unit-test-secret", 24);
        let member = member(Role::Pastor);
        let token = keys.issue(&member).expect("token issued");

        let claims = keys.verify(&token).expect("token verifies");
        assert_eq!(claims.member_id(), member.id);
        assert_eq!(claims.role, Role::Pastor);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = JwtKeys::new("first", 24)
            .issue(&member(Role::Member))
            .expect("token issued");

        assert!(matches!(
            JwtKeys::new("second", 24).verify(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let keys = JwtKeys::new("unit-test-secret", 24);
        let past = Utc::now() - Duration::hours(3);
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "old@example.org".to_string(),
            role: Role::Member,
            exp: past.timestamp() as usize,
            iat: (past - Duration::hours(1)).timestamp() as usize,
        };
        let token = jsonwebtoken::encode(&Header::default(), &claims, &keys.encoding)
            .expect("token encodes");

        assert!(matches!(keys.verify(&token), Err(AuthError::Expired)));
    }
}
