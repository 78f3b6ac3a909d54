// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Cache lifecycle
//!
//! `absent -> fresh -> stale -> fresh (refreshed)`. The cache is created
//! lazily by the first lookup and lives as long as the [`JwksManager`].
//!
//! - A fresh entry (`age < ttl`) is served without touching the network
//! - A stale entry triggers a fetch; if the fetch fails the stale set is
//!   served (fail-open for availability)
//! - [`KeyStore::force_refresh`] always fetches and never falls back
//!
//! ## Concurrency
//!
//! Readers only hold the cache lock long enough to clone an `Arc`. Fetches are
//! serialized by a refresh lock. Before deciding to refresh, a caller records
//! the cache generation and the number of completed fetch attempts it saw.
//! Once it holds the lock it reuses whatever finished in the meantime: a new
//! generation on success, the recorded error on failure. One upstream fetch
//! therefore answers every caller that queued behind it, and no caller waits
//! longer than the fetch in flight plus its own. The fetch itself runs in a
//! spawned task so it completes even if the caller that started it is
//! dropped.
//!
//! After a failed fetch, lookups within the failure backoff (5 seconds by
//! default) return the recorded error without contacting the provider, so
//! `get_keys` falls straight back to the stale set during an outage.
//! [`KeyStore::force_refresh`] ignores the backoff.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm, PublicKeyUse};
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::error::AuthError;

/// Default JWKS cache TTL (1 hour).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Default time a failed fetch is reused before the provider is tried again.
pub const DEFAULT_FAILURE_BACKOFF: Duration = Duration::from_secs(5);

/// An immutable, shareable key set. Refreshes replace it, never mutate it.
pub type KeySet = Arc<JwkSet>;

/// Source of the provider's signing keys.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Cached key set if fresh, otherwise a refetched one (stale on failure).
    async fn get_keys(&self) -> Result<KeySet, AuthError>;

    /// Unconditionally refetch and replace the cached key set.
    async fn force_refresh(&self) -> Result<KeySet, AuthError>;

    /// Whether a fresh key set is currently cached.
    async fn is_cached(&self) -> bool;
}

/// JWKS cache entry.
struct CacheEntry {
    keys: KeySet,
    fetched_at: Instant,
    generation: u64,
}

/// Most recent failed fetch.
struct Failure {
    attempt: u64,
    at: Instant,
    error: AuthError,
}

/// What a caller saw before asking for a refresh.
#[derive(Clone, Copy)]
struct Observed {
    /// Cache generation (`None` when the cache was empty)
    generation: Option<u64>,
    /// Completed fetch attempts
    attempts: u64,
}

struct Inner {
    /// JWKS URL (provider endpoint)
    jwks_url: String,
    /// Cached JWKS, swapped whole on refresh
    cache: RwLock<Option<Arc<CacheEntry>>>,
    /// Held for the duration of one upstream fetch; guards the last failure
    refresh_lock: Mutex<Option<Failure>>,
    /// Completed fetch attempts, successful or not
    attempts: AtomicU64,
    /// HTTP client (carries the request timeout)
    client: reqwest::Client,
}

/// JWKS manager with caching.
///
/// Fetches and caches the provider's JWKS for local JWT verification.
#[derive(Clone)]
pub struct JwksManager {
    /// Cache TTL
    cache_ttl: Duration,
    /// How long a failed fetch answers `get_keys` without a new attempt
    failure_backoff: Duration,
    inner: Arc<Inner>,
}

impl JwksManager {
    /// Create a new JWKS manager.
    ///
    /// # Arguments
    /// - `jwks_url`: The JWKS endpoint URL (e.g., `https://tenant.us.auth0.com/.well-known/jwks.json`)
    /// - `client`: HTTP client; its timeout bounds every fetch
    pub fn new(jwks_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            failure_backoff: DEFAULT_FAILURE_BACKOFF,
            inner: Arc::new(Inner {
                jwks_url: jwks_url.into(),
                cache: RwLock::new(None),
                refresh_lock: Mutex::new(None),
                attempts: AtomicU64::new(0),
                client,
            }),
        }
    }

    /// Create with custom cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Create with custom failure backoff (`Duration::ZERO` disables it).
    pub fn with_failure_backoff(mut self, backoff: Duration) -> Self {
        self.failure_backoff = backoff;
        self
    }

    /// Get the JWKS URL.
    pub fn jwks_url(&self) -> &str {
        &self.inner.jwks_url
    }

    /// Get the cache TTL.
    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        entry.fetched_at.elapsed() < self.cache_ttl
    }

    /// Run a coalesced refresh in its own task.
    ///
    /// `backoff` is how long a recent failure is reused instead of fetching.
    async fn refresh_after(
        &self,
        observed: Observed,
        backoff: Duration,
    ) -> Result<KeySet, AuthError> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.refresh_locked(observed, backoff).await })
            .await
            .map_err(|e| AuthError::Internal(format!("JWKS refresh task failed: {e}")))?
    }
}

impl Inner {
    async fn current(&self) -> Option<Arc<CacheEntry>> {
        self.cache.read().await.clone()
    }

    /// Snapshot taken before a refresh decision. The attempt counter is read
    /// first so a fetch finishing in between is never missed.
    async fn observe(&self) -> (Observed, Option<Arc<CacheEntry>>) {
        let attempts = self.attempts.load(Ordering::SeqCst);
        let current = self.current().await;
        let observed = Observed {
            generation: current.as_ref().map(|entry| entry.generation),
            attempts,
        };
        (observed, current)
    }

    async fn refresh_locked(
        &self,
        observed: Observed,
        backoff: Duration,
    ) -> Result<KeySet, AuthError> {
        let mut last_failure = self.refresh_lock.lock().await;

        if let Some(entry) = self.current().await {
            if Some(entry.generation) != observed.generation {
                debug!(
                    generation = entry.generation,
                    "JWKS refreshed by a concurrent caller, reusing result"
                );
                return Ok(Arc::clone(&entry.keys));
            }
        }

        if let Some(failure) = last_failure.as_ref() {
            if failure.attempt > observed.attempts {
                debug!("JWKS fetch failed for a concurrent caller, reusing result");
                return Err(failure.error.clone());
            }
            if failure.at.elapsed() < backoff {
                debug!(
                    since_ms = failure.at.elapsed().as_millis() as u64,
                    "JWKS fetch failed recently, not retrying yet"
                );
                return Err(failure.error.clone());
            }
        }

        let result = self.fetch_jwks().await;
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;

        match result {
            Ok(jwks) => {
                *last_failure = None;
                let keys: KeySet = Arc::new(jwks);
                let generation = observed.generation.map_or(1, |g| g + 1);

                let mut cache = self.cache.write().await;
                *cache = Some(Arc::new(CacheEntry {
                    keys: Arc::clone(&keys),
                    fetched_at: Instant::now(),
                    generation,
                }));

                Ok(keys)
            }
            Err(error) => {
                warn!(
                    jwks_url = %self.jwks_url,
                    attempt,
                    detail = error.detail().unwrap_or_default(),
                    "JWKS fetch failed"
                );
                *last_failure = Some(Failure {
                    attempt,
                    at: Instant::now(),
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    /// Fetch JWKS from the endpoint.
    async fn fetch_jwks(&self) -> Result<JwkSet, AuthError> {
        debug!(jwks_url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| AuthError::UpstreamUnavailable(format!("JWKS request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AuthError::UpstreamUnavailable(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        let jwks: JwkSet = response
            .json()
            .await
            .map_err(|e| AuthError::UpstreamUnavailable(format!("invalid JWKS document: {e}")))?;

        ensure_unique_key_ids(&jwks)?;

        info!(
            jwks_url = %self.jwks_url,
            key_count = jwks.keys.len(),
            "JWKS fetched successfully"
        );

        Ok(jwks)
    }
}

#[async_trait]
impl KeyStore for JwksManager {
    async fn get_keys(&self) -> Result<KeySet, AuthError> {
        let (observed, current) = self.inner.observe().await;

        if let Some(entry) = &current {
            if self.is_fresh(entry) {
                return Ok(Arc::clone(&entry.keys));
            }
        }

        match self.refresh_after(observed, self.failure_backoff).await {
            Ok(keys) => Ok(keys),
            Err(err) => match current {
                Some(stale) => {
                    warn!(
                        jwks_url = %self.inner.jwks_url,
                        error_code = err.error_code(),
                        age_secs = stale.fetched_at.elapsed().as_secs(),
                        "JWKS fetch failed, using stale cache"
                    );
                    Ok(Arc::clone(&stale.keys))
                }
                None => Err(err),
            },
        }
    }

    async fn force_refresh(&self) -> Result<KeySet, AuthError> {
        let (observed, _) = self.inner.observe().await;
        self.refresh_after(observed, Duration::ZERO).await
    }

    async fn is_cached(&self) -> bool {
        match self.inner.current().await {
            Some(entry) => self.is_fresh(&entry),
            None => false,
        }
    }
}

fn ensure_unique_key_ids(jwks: &JwkSet) -> Result<(), AuthError> {
    let mut seen = HashSet::new();
    for kid in jwks.keys.iter().filter_map(|k| k.common.key_id.as_deref()) {
        if !seen.insert(kid) {
            return Err(AuthError::UpstreamUnavailable(format!(
                "invalid JWKS document: duplicate kid {kid}"
            )));
        }
    }
    Ok(())
}

/// Find the signing key with the given key ID.
///
/// Keys published for encryption (`use: "enc"`) never match.
pub fn find_signing_key<'a>(jwks: &'a JwkSet, kid: &str) -> Option<&'a Jwk> {
    jwks.keys.iter().find(|k| {
        k.common.key_id.as_deref() == Some(kid)
            && !matches!(k.common.public_key_use, Some(PublicKeyUse::Encryption))
    })
}

/// Convert a JWK to a DecodingKey.
pub fn jwk_to_decoding_key(jwk: &Jwk) -> Result<(DecodingKey, Algorithm), AuthError> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => {
            let key = DecodingKey::from_rsa_components(&rsa.n, &rsa.e).map_err(|e| {
                debug!(error = %e, "JWKS entry has unusable RSA components");
                AuthError::InvalidSignature
            })?;

            let alg = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::RS384) => Algorithm::RS384,
                Some(KeyAlgorithm::RS512) => Algorithm::RS512,
                _ => Algorithm::RS256,
            };

            Ok((key, alg))
        }
        AlgorithmParameters::EllipticCurve(ec) => {
            let key = DecodingKey::from_ec_components(&ec.x, &ec.y).map_err(|e| {
                debug!(error = %e, "JWKS entry has unusable EC components");
                AuthError::InvalidSignature
            })?;

            let alg = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::ES384) => Algorithm::ES384,
                _ => Algorithm::ES256,
            };

            Ok((key, alg))
        }
        _ => {
            debug!("Unsupported key type in JWKS");
            Err(AuthError::InvalidSignature)
        }
    }
}
