// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verification facade.
//!
//! [`Authenticator`] is the single entry point used by request handlers: it
//! rejects empty credentials up front and dispatches to the strategy selected
//! by configuration. It holds no per-call state; the only persistent state is
//! inside the key store of the local strategy.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use super::jwks::{JwksManager, KeyStore};
use super::local::LocalVerifier;
use super::remote::RemoteVerifier;
use super::{AuthError, ClaimSet};
use crate::config::{AuthSettings, VerifyMode};

/// A token verification strategy.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Mode this strategy implements.
    fn mode(&self) -> VerifyMode;

    /// Verify a non-empty bearer token.
    async fn verify(&self, token: &str) -> Result<ClaimSet, AuthError>;
}

/// Selects and runs a verification strategy.
pub struct Authenticator {
    default_mode: VerifyMode,
    local: Option<Arc<dyn TokenVerifier>>,
    remote: Option<Arc<dyn TokenVerifier>>,
    key_store: Option<Arc<dyn KeyStore>>,
}

impl Authenticator {
    /// Create an authenticator with no strategies registered.
    pub fn new(default_mode: VerifyMode) -> Self {
        Self {
            default_mode,
            local: None,
            remote: None,
            key_store: None,
        }
    }

    /// Register a strategy under the mode it reports.
    pub fn with_verifier(mut self, verifier: Arc<dyn TokenVerifier>) -> Self {
        match verifier.mode() {
            VerifyMode::Local => self.local = Some(verifier),
            VerifyMode::Remote => self.remote = Some(verifier),
        }
        self
    }

    /// Register the key store backing the local strategy (health reporting).
    pub fn with_key_store(mut self, key_store: Arc<dyn KeyStore>) -> Self {
        self.key_store = Some(key_store);
        self
    }

    /// Build every strategy the settings allow.
    ///
    /// Fails with [`AuthError::Configuration`] when the default mode's
    /// prerequisites are missing. The other mode is built opportunistically.
    pub fn from_settings(settings: &AuthSettings) -> Result<Self, AuthError> {
        let mut authenticator = Self::new(settings.verify_mode);

        match local_prerequisites(settings) {
            Ok((jwks_url, issuer, audience)) => {
                let client = http_client(settings.jwks_timeout)?;
                let key_store: Arc<dyn KeyStore> =
                    Arc::new(JwksManager::new(jwks_url, client).with_cache_ttl(settings.jwks_ttl));
                let verifier = LocalVerifier::new(Arc::clone(&key_store), issuer, audience);
                authenticator = authenticator
                    .with_verifier(Arc::new(verifier))
                    .with_key_store(key_store);
            }
            Err(e) if settings.verify_mode == VerifyMode::Local => return Err(e),
            Err(_) => {}
        }

        match remote_prerequisites(settings) {
            Ok((userinfo_url, issuer)) => {
                let client = http_client(settings.userinfo_timeout)?;
                let verifier = RemoteVerifier::new(userinfo_url, issuer, client);
                authenticator = authenticator.with_verifier(Arc::new(verifier));
            }
            Err(e) if settings.verify_mode == VerifyMode::Remote => return Err(e),
            Err(_) => {}
        }

        info!(
            mode = %authenticator.default_mode,
            jwks = authenticator.local.is_some(),
            userinfo = authenticator.remote.is_some(),
            "Authenticator configured"
        );

        Ok(authenticator)
    }

    pub fn default_mode(&self) -> VerifyMode {
        self.default_mode
    }

    pub fn supports(&self, mode: VerifyMode) -> bool {
        self.verifier(mode).is_some()
    }

    /// Verify `token` with the configured default mode.
    pub async fn authenticate(&self, token: &str) -> Result<ClaimSet, AuthError> {
        self.authenticate_with(token, self.default_mode).await
    }

    /// Verify `token` with an explicit mode.
    ///
    /// `token` is the raw credential with the `Bearer ` prefix already
    /// stripped. Empty tokens fail before any strategy runs.
    pub async fn authenticate_with(
        &self,
        token: &str,
        mode: VerifyMode,
    ) -> Result<ClaimSet, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::MissingCredential);
        }

        let verifier = self.verifier(mode).ok_or_else(|| {
            AuthError::Configuration(format!("{mode} verification is not configured"))
        })?;

        verifier.verify(token).await
    }

    /// JWKS readiness for health probes: `None` when local verification is
    /// not configured, otherwise whether a key set can be served.
    pub async fn key_store_status(&self) -> Option<bool> {
        let key_store = self.key_store.as_ref()?;
        if key_store.is_cached().await {
            return Some(true);
        }
        Some(key_store.get_keys().await.is_ok())
    }

    fn verifier(&self, mode: VerifyMode) -> Option<&Arc<dyn TokenVerifier>> {
        match mode {
            VerifyMode::Local => self.local.as_ref(),
            VerifyMode::Remote => self.remote.as_ref(),
        }
    }
}

fn local_prerequisites(settings: &AuthSettings) -> Result<(String, String, String), AuthError> {
    let jwks_url = settings
        .jwks_url()
        .ok_or_else(|| missing("AUTH0_DOMAIN (or AUTH0_JWKS_URL)", VerifyMode::Local))?;
    let issuer = settings
        .issuer()
        .ok_or_else(|| missing("AUTH0_DOMAIN (or AUTH0_ISSUER)", VerifyMode::Local))?;
    let audience = settings
        .audience
        .clone()
        .ok_or_else(|| missing("AUTH0_AUDIENCE", VerifyMode::Local))?;
    Ok((jwks_url, issuer, audience))
}

fn remote_prerequisites(settings: &AuthSettings) -> Result<(String, String), AuthError> {
    let userinfo_url = settings
        .userinfo_url()
        .ok_or_else(|| missing("AUTH0_DOMAIN (or AUTH0_USERINFO_URL)", VerifyMode::Remote))?;
    let issuer = settings
        .issuer()
        .ok_or_else(|| missing("AUTH0_DOMAIN (or AUTH0_ISSUER)", VerifyMode::Remote))?;
    Ok((userinfo_url, issuer))
}

fn missing(setting: &str, mode: VerifyMode) -> AuthError {
    AuthError::Configuration(format!("{setting} is required for {mode} verification"))
}

fn http_client(timeout: Duration) -> Result<reqwest::Client, AuthError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AuthError::Configuration(format!("failed to build HTTP client: {e}")))
}
