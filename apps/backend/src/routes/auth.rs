//! Authentication middleware

use std::collections::HashSet;

use axum::{
    body::Body,
    extract::Request,
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::error::{ApiError, Result};

/// Authenticated user stored in request extensions
#[derive(Clone, Copy, Debug)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

/// Auth middleware - the bearer token is the caller's user id
///
/// Token issuance and verification belong to the identity provider in front
/// of this service.
pub async fn auth_middleware(mut request: Request<Body>, next: Next) -> Result<Response> {
    // Extract Bearer token
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization format".to_string()))?;

    let user_id = Uuid::parse_str(token.trim())
        .map_err(|_| ApiError::Unauthorized("Invalid user token".to_string()))?;

    // Store authenticated user in request extensions
    request
        .extensions_mut()
        .insert(AuthenticatedUser { user_id });

    Ok(next.run(request).await)
}

/// Who may create exercises.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum AdminPolicy {
    /// Every authenticated user.
    #[default]
    Open,
    Only(HashSet<Uuid>),
}

impl AdminPolicy {
    pub fn only(user_ids: impl IntoIterator<Item = Uuid>) -> Self {
        Self::Only(user_ids.into_iter().collect())
    }

    pub fn allows(&self, user_id: Uuid) -> bool {
        match self {
            Self::Open => true,
            Self::Only(admins) => admins.contains(&user_id),
        }
    }

    pub fn require(&self, user: &AuthenticatedUser) -> Result<()> {
        if self.allows(user.user_id) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "user {} may not manage exercises",
                user.user_id
            )))
        }
    }
}
