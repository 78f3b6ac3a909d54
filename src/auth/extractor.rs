// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated callers.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(claims): Auth) -> impl IntoResponse {
//!     // claims is a ClaimSet
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use super::{AuthError, ClaimSet};
use crate::state::AppState;

/// Extractor for authenticated callers.
///
/// Reads `Authorization: Bearer <token>` and runs it through the
/// [`Authenticator`](super::Authenticator) held in [`AppState`]. Rejections
/// render as 401, or 500 for configuration and upstream failures.
pub struct Auth(pub ClaimSet);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        match state.authenticator.authenticate(token).await {
            Ok(claims) => Ok(Auth(claims)),
            Err(e) => {
                warn!(
                    error_code = e.error_code(),
                    detail = e.detail().unwrap_or_default(),
                    path = %parts.uri.path(),
                    "Request authentication failed"
                );
                Err(e)
            }
        }
    }
}

/// Extract the raw token from the Authorization header.
fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingCredential)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let (scheme, token) = auth_header
        .split_once(' ')
        .ok_or(AuthError::InvalidAuthHeader)?;

    if !scheme.eq_ignore_ascii_case("Bearer") {
        return Err(AuthError::InvalidAuthHeader);
    }

    Ok(token.trim())
}
