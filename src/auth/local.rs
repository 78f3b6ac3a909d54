// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Local JWT verification against the provider's JWKS.
//!
//! 1. Read `kid` from the unverified header
//! 2. Look the key up in the [`KeyStore`]; on a miss force one refresh and
//!    look again (provider key rotation). A second miss is final.
//! 3. Verify the signature and the `exp`, `iss` and `aud` claims
//!
//! Clock checks use `jsonwebtoken`'s default leeway and nothing beyond it.

use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};
use tracing::debug;

use super::authenticator::TokenVerifier;
use super::jwks::{find_signing_key, jwk_to_decoding_key, KeyStore};
use super::{AuthError, ClaimSet};
use crate::config::VerifyMode;

/// Verifies RS256 (or other JWKS-advertised) tokens without a per-request
/// round trip to the provider.
pub struct LocalVerifier {
    key_store: Arc<dyn KeyStore>,
    issuer: String,
    audience: String,
}

impl LocalVerifier {
    pub fn new(
        key_store: Arc<dyn KeyStore>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            key_store,
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }

    pub fn key_store(&self) -> &Arc<dyn KeyStore> {
        &self.key_store
    }

    /// Resolve `kid` to a decoding key, allowing exactly one forced refresh.
    async fn resolve_key(&self, kid: &str) -> Result<(DecodingKey, Algorithm), AuthError> {
        let keys = self.key_store.get_keys().await?;
        if let Some(jwk) = find_signing_key(&keys, kid) {
            return jwk_to_decoding_key(jwk);
        }

        debug!(kid, "Signing key not in cached JWKS, forcing refresh");
        let keys = self.key_store.force_refresh().await?;
        match find_signing_key(&keys, kid) {
            Some(jwk) => jwk_to_decoding_key(jwk),
            None => Err(AuthError::UnknownSigningKey),
        }
    }

    fn validation(&self, algorithm: Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation
    }
}

#[async_trait]
impl TokenVerifier for LocalVerifier {
    fn mode(&self) -> VerifyMode {
        VerifyMode::Local
    }

    async fn verify(&self, token: &str) -> Result<ClaimSet, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;
        let kid = header.kid.ok_or(AuthError::MalformedToken)?;

        let (decoding_key, algorithm) = self.resolve_key(&kid).await?;

        let token_data =
            decode::<Map<String, Value>>(token, &decoding_key, &self.validation(algorithm))
                .map_err(|e| map_jwt_error(e.kind()))?;

        ClaimSet::from_jwt(token_data.claims)
    }
}

fn map_jwt_error(kind: &ErrorKind) -> AuthError {
    match kind {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::InvalidSignature,
        ErrorKind::InvalidIssuer => AuthError::IssuerMismatch,
        ErrorKind::InvalidAudience => AuthError::AudienceMismatch,
        ErrorKind::MissingRequiredClaim(claim) => match claim.as_str() {
            "iss" => AuthError::IssuerMismatch,
            "aud" => AuthError::AudienceMismatch,
            _ => AuthError::MalformedToken,
        },
        _ => AuthError::MalformedToken,
    }
}
