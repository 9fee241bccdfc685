//! Bearer JWT authentication and the `AuthContext` capability surface.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::StatusCode;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use ivd_domain::{Id, IvdError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Technician,
    Reviewer,
    Pathologist,
    Admin,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "technician" => Some(Self::Technician),
            "reviewer" => Some(Self::Reviewer),
            "pathologist" => Some(Self::Pathologist),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Reviewer-or-higher ordering, used by review-workflow routes.
    pub fn at_least_reviewer(self) -> bool {
        self >= Role::Reviewer
    }
}

/// The capability surface every authenticated request carries. `ivd-api`
/// owns the trait; issuance (login) stays out of scope, only decoding.
pub trait AuthContext: Send + Sync {
    fn tenant_id(&self) -> &Id;
    fn user_id(&self) -> &Id;
    fn role(&self) -> Role;

    fn require_role(&self, minimum: Role) -> Result<(), IvdError> {
        if self.role() >= minimum {
            Ok(())
        } else {
            Err(IvdError::Forbidden(format!(
                "role {:?} does not meet the required minimum of {:?}",
                self.role(),
                minimum
            )))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Id,
    pub tenant_id: Id,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// Decoded request identity, usable as an axum extractor and as an
/// `AuthContext` implementation.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub tenant_id: Id,
    pub user_id: Id,
    pub role: Role,
}

impl AuthContext for AuthenticatedUser {
    fn tenant_id(&self) -> &Id {
        &self.tenant_id
    }

    fn user_id(&self) -> &Id {
        &self.user_id
    }

    fn role(&self) -> Role {
        self.role
    }
}

/// Decodes and validates `SECRET_KEY`/`JWT_ALGORITHM`-signed bearer tokens
/// into `AuthenticatedUser`. The default, and currently only, `AuthContext`
/// producer — token issuance lives outside this crate's scope.
#[derive(Clone)]
pub struct StaticJwtAuthenticator {
    decoding_key: DecodingKey,
    algorithm: Algorithm,
}

impl StaticJwtAuthenticator {
    pub fn new(secret_key: &str, algorithm: &str) -> Self {
        let algorithm = match algorithm {
            "HS384" => Algorithm::HS384,
            "HS512" => Algorithm::HS512,
            _ => Algorithm::HS256,
        };
        Self {
            decoding_key: DecodingKey::from_secret(secret_key.as_bytes()),
            algorithm,
        }
    }

    pub fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, IvdError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = true;
        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| IvdError::Unauthorized(format!("invalid bearer token: {e}")))?;
        let role = Role::parse(&data.claims.role)
            .ok_or_else(|| IvdError::Unauthorized(format!("unknown role '{}'", data.claims.role)))?;
        Ok(AuthenticatedUser {
            tenant_id: data.claims.tenant_id,
            user_id: data.claims.sub,
            role,
        })
    }
}

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    StaticJwtAuthenticator: FromRef<S>,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let authenticator = StaticJwtAuthenticator::from_ref(state);
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or((StatusCode::UNAUTHORIZED, "missing Authorization header".to_string()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or((StatusCode::UNAUTHORIZED, "expected a Bearer token".to_string()))?;
        authenticator
            .authenticate(token)
            .map_err(|e| (StatusCode::UNAUTHORIZED, e.to_string()))
    }
}

/// Constant-time comparison for the `X-Instrument-Token` header, per §6's
/// "tokens are comparable by constant-time equality" requirement.
pub fn tokens_equal(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_for(secret: &str, tenant_id: &str, role: &str) -> String {
        use jsonwebtoken::{encode, EncodingKey, Header};
        let claims = Claims {
            sub: "user-1".into(),
            tenant_id: tenant_id.into(),
            role: role.into(),
            iat: chrono::Utc::now().timestamp(),
            exp: chrono::Utc::now().timestamp() + 3600,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn decodes_valid_token() {
        let auth = StaticJwtAuthenticator::new("test-secret", "HS256");
        let token = token_for("test-secret", "tenant-1", "admin");
        let user = auth.authenticate(&token).unwrap();
        assert_eq!(user.tenant_id, "tenant-1");
        assert_eq!(user.role, Role::Admin);
    }

    #[test]
    fn rejects_wrong_secret() {
        let auth = StaticJwtAuthenticator::new("test-secret", "HS256");
        let token = token_for("other-secret", "tenant-1", "admin");
        assert!(auth.authenticate(&token).is_err());
    }

    #[test]
    fn rejects_unknown_role() {
        let auth = StaticJwtAuthenticator::new("test-secret", "HS256");
        let token = token_for("test-secret", "tenant-1", "superuser");
        assert!(auth.authenticate(&token).is_err());
    }

    #[test]
    fn role_ordering_gates_reviewer_actions() {
        assert!(Role::Admin.at_least_reviewer());
        assert!(Role::Reviewer.at_least_reviewer());
        assert!(!Role::Technician.at_least_reviewer());
    }

    #[test]
    fn constant_time_compare_matches_equal_tokens() {
        assert!(tokens_equal("abc123", "abc123"));
        assert!(!tokens_equal("abc123", "abc124"));
        assert!(!tokens_equal("abc123", "abc1234"));
    }
}
