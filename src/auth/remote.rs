// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Remote verification through the provider's userinfo endpoint.
//!
//! The token is forwarded as the bearer credential; the provider's answer is
//! the decision. One network call per verified request, no key material held
//! locally.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use super::authenticator::TokenVerifier;
use super::{AuthError, ClaimSet};
use crate::config::VerifyMode;

pub struct RemoteVerifier {
    userinfo_url: String,
    issuer: String,
    client: reqwest::Client,
}

impl RemoteVerifier {
    /// # Arguments
    /// - `userinfo_url`: e.g. `https://tenant.us.auth0.com/userinfo`
    /// - `issuer`: issuer recorded on claim sets whose profile has no `iss`
    /// - `client`: HTTP client; its timeout bounds every call
    pub fn new(
        userinfo_url: impl Into<String>,
        issuer: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            userinfo_url: userinfo_url.into(),
            issuer: issuer.into(),
            client,
        }
    }

    pub fn userinfo_url(&self) -> &str {
        &self.userinfo_url
    }
}

#[async_trait]
impl TokenVerifier for RemoteVerifier {
    fn mode(&self) -> VerifyMode {
        VerifyMode::Remote
    }

    async fn verify(&self, token: &str) -> Result<ClaimSet, AuthError> {
        let response = self
            .client
            .get(&self.userinfo_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                debug!(error = %e, "userinfo request failed");
                AuthError::TokenRejectedByProvider
            })?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "userinfo rejected token");
            return Err(AuthError::TokenRejectedByProvider);
        }

        let profile: Map<String, Value> = response
            .json()
            .await
            .map_err(|e| AuthError::MalformedProviderResponse(e.to_string()))?;

        ClaimSet::from_userinfo(profile, &self.issuer)
    }
}
