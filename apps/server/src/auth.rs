//! # Acting User
//!
//! Sessions live in front of this server. The session layer forwards the
//! authenticated identity as headers:
//!
//! | Header | Required | Values |
//! |--------|----------|--------|
//! | `x-user-id` | yes (writes) | user id |
//! | `x-user-role` | no | `admin` or `seller` (default `seller`) |

use std::fmt;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tracing::warn;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Seller,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::Seller => f.write_str("seller"),
        }
    }
}

/// Identity of the user performing a write.
///
/// Rejects with `401` when `x-user-id` is missing or blank, and with `400`
/// on an unknown role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActingUser {
    pub id: String,
    pub role: Role,
}

impl ActingUser {
    pub fn require_admin(&self) -> Result<(), ApiError> {
        match self.role {
            Role::Admin => Ok(()),
            Role::Seller => Err(ApiError::forbidden("Only an admin can do this")),
        }
    }
}

impl<S> FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty());

        let Some(id) = id else {
            warn!(uri = %parts.uri, "Write without acting user");
            return Err(ApiError::unauthorized());
        };

        let role = match parts.headers.get(USER_ROLE_HEADER) {
            None => Role::Seller,
            Some(value) => match value.to_str().map(|v| v.trim().to_ascii_lowercase()) {
                Ok(role) if role == "admin" => Role::Admin,
                Ok(role) if role == "seller" => Role::Seller,
                _ => return Err(ApiError::invalid("x-user-role must be admin or seller")),
            },
        };

        Ok(ActingUser {
            id: id.to_string(),
            role,
        })
    }
}
