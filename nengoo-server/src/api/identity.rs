//! Caller identity extractor
//!
//! Authentication and session issuance live in an external
//! collaborator; by the time a request reaches this core the verified
//! identity travels in the `X-User-Id` / `X-User-Type` headers. The
//! extractor turns them into a typed [`UserRef`] so every policy check
//! happens inside the services against a parsed role, never against a
//! raw header string.

use axum::{extract::FromRequestParts, http::request::Parts};
use shared::{UserRef, UserType};

use crate::common::AppError;

const USER_ID_HEADER: &str = "x-user-id";
const USER_TYPE_HEADER: &str = "x-user-type";

/// The authenticated caller
#[derive(Debug, Clone)]
pub struct Identity {
    pub user: UserRef,
}

impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Check if already extracted earlier in the request
        if let Some(identity) = parts.extensions.get::<Identity>() {
            return Ok(identity.clone());
        }

        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or(AppError::Unauthorized)?;

        let user_type = parts
            .headers
            .get(USER_TYPE_HEADER)
            .and_then(|h| h.to_str().ok())
            .and_then(UserType::parse)
            .ok_or(AppError::Unauthorized)?;

        let identity = Identity {
            user: UserRef::new(user_id, user_type),
        };

        // Store in extensions for potential reuse
        parts.extensions.insert(identity.clone());
        Ok(identity)
    }
}
