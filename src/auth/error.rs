// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
///
/// Every verification path returns one of these; nothing is collapsed into a
/// boolean. Credential problems map to 401, deployment and upstream problems
/// map to 500.
///
/// Upstream and internal variants carry a detail string for logs only; their
/// `Display` (and so the response body) never includes it. See
/// [`AuthError::detail`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// A required setting is absent or invalid for the selected mode
    #[error("Authentication is misconfigured: {0}")]
    Configuration(String),
    /// No credential was presented (absent header or empty token)
    #[error("Bearer token is required")]
    MissingCredential,
    /// Authorization header present but not `Bearer <token>`
    #[error("Invalid authorization header format (expected 'Bearer <token>')")]
    InvalidAuthHeader,
    /// Token cannot be parsed into header/payload/signature, or has no `kid`
    #[error("Token is malformed")]
    MalformedToken,
    /// `kid` absent from the key set even after one forced refresh
    #[error("No matching signing key found in JWKS")]
    UnknownSigningKey,
    /// Token signature is invalid
    #[error("Token signature is invalid")]
    InvalidSignature,
    /// Token has expired
    #[error("Token has expired")]
    TokenExpired,
    /// Token issuer differs from the configured issuer
    #[error("Token issuer is invalid")]
    IssuerMismatch,
    /// Token audience does not contain the configured audience
    #[error("Token audience is invalid")]
    AudienceMismatch,
    /// Key set could not be fetched and nothing is cached
    #[error("Identity provider is unavailable")]
    UpstreamUnavailable(String),
    /// Introspection endpoint refused the token
    #[error("Token was rejected by the identity provider")]
    TokenRejectedByProvider,
    /// Introspection endpoint answered with an unusable body
    #[error("Identity provider response could not be parsed")]
    MalformedProviderResponse(String),
    /// Internal error
    #[error("Internal authentication error")]
    Internal(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Configuration(_) => "configuration_error",
            AuthError::MissingCredential => "missing_credential",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::UnknownSigningKey => "unknown_signing_key",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::IssuerMismatch => "issuer_mismatch",
            AuthError::AudienceMismatch => "audience_mismatch",
            AuthError::UpstreamUnavailable(_) => "upstream_unavailable",
            AuthError::TokenRejectedByProvider => "token_rejected_by_provider",
            AuthError::MalformedProviderResponse(_) => "malformed_provider_response",
            AuthError::Internal(_) => "internal_error",
        }
    }

    /// Operator-facing detail withheld from the response body.
    pub fn detail(&self) -> Option<&str> {
        match self {
            AuthError::UpstreamUnavailable(detail)
            | AuthError::MalformedProviderResponse(detail)
            | AuthError::Internal(detail) => Some(detail),
            _ => None,
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        if self.is_auth_failure() {
            StatusCode::UNAUTHORIZED
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    /// True when the credential itself was bad, as opposed to the deployment
    /// or the identity provider misbehaving.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            AuthError::MissingCredential
            | AuthError::InvalidAuthHeader
            | AuthError::MalformedToken
            | AuthError::UnknownSigningKey
            | AuthError::InvalidSignature
            | AuthError::TokenExpired
            | AuthError::IssuerMismatch
            | AuthError::AudienceMismatch
            | AuthError::TokenRejectedByProvider => true,
            AuthError::Configuration(_)
            | AuthError::UpstreamUnavailable(_)
            | AuthError::MalformedProviderResponse(_)
            | AuthError::Internal(_) => false,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
