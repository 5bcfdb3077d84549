//! Credential handling for ParkForge services
//!
//! Identity is an external collaborator: services extract the bearer token
//! here and verify it through [`crate::clients::AuthClient`]. Nothing in this
//! module decides whether a token is valid.

use crate::errors::{AppError, Result};
use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};

/// The authenticated caller, as reported by the auth collaborator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    /// Username the token resolves to
    pub user: String,

    /// Role assigned by the auth service (e.g. "user", "admin")
    pub role: String,
}

impl Principal {
    /// Check whether this principal carries the admin role
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }

    /// Check ownership of a user-scoped resource
    pub fn owns(&self, user: &str) -> bool {
        self.user == user
    }
}

/// Strip the `Bearer ` scheme from an Authorization header value
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

/// Axum extractor for the raw bearer credential.
///
/// Rejects with 401 when the header is missing or not a bearer scheme;
/// verification against the auth service happens in the handler.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl BearerToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized {
                message: "Missing Authorization header".to_string(),
            })?;

        let token = extract_bearer(auth_header).ok_or_else(|| AppError::Unauthorized {
            message: "Authorization header is not a bearer credential".to_string(),
        })?;

        if token.is_empty() {
            return Err(AppError::Unauthorized {
                message: "Empty bearer credential".to_string(),
            });
        }

        Ok(BearerToken(token.to_string()))
    }
}

/// Optional idempotency key, read from the `Idempotency-Key` header
#[derive(Debug, Clone, Default)]
pub struct IdempotencyKey(pub Option<String>);

impl<S> FromRequestParts<S> for IdempotencyKey
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        let key = parts
            .headers
            .get("idempotency-key")
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .map(String::from);

        Ok(IdempotencyKey(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer tok_123"), Some("tok_123"));
        assert_eq!(extract_bearer("tok_123"), None);
        assert_eq!(extract_bearer("Basic abc"), None);
    }

    #[test]
    fn test_principal_roles() {
        let admin = Principal {
            user: "ops".into(),
            role: "admin".into(),
        };
        let user = Principal {
            user: "alice".into(),
            role: "user".into(),
        };

        assert!(admin.is_admin());
        assert!(!user.is_admin());
        assert!(user.owns("alice"));
        assert!(!user.owns("bob"));
    }
}
