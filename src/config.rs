// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! once at startup; blank values count as unset.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `AUTH0_DOMAIN` | Identity provider domain | Required |
//! | `AUTH0_AUDIENCE` | Expected JWT audience claim | Required for `jwks` mode |
//! | `AUTH0_ISSUER` | Expected JWT issuer claim | `https://<domain>/` |
//! | `AUTH0_VERIFY_MODE` | `jwks` (local) or `userinfo` (remote) | `jwks` |
//! | `AUTH0_JWKS_URL` | JWKS endpoint override | `https://<domain>/.well-known/jwks.json` |
//! | `AUTH0_USERINFO_URL` | userinfo endpoint override | `https://<domain>/userinfo` |
//! | `AUTH0_JWKS_TTL_SECS` | JWKS cache TTL | `3600` |
//! | `AUTH0_JWKS_TIMEOUT_SECS` | JWKS fetch timeout (1-30) | `10` |
//! | `AUTH0_USERINFO_TIMEOUT_SECS` | userinfo call timeout (1-30) | `5` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::auth::jwks::DEFAULT_CACHE_TTL;
use crate::auth::AuthError;

pub const AUTH0_DOMAIN_ENV: &str = "AUTH0_DOMAIN";
pub const AUTH0_AUDIENCE_ENV: &str = "AUTH0_AUDIENCE";
pub const AUTH0_ISSUER_ENV: &str = "AUTH0_ISSUER";
pub const AUTH0_VERIFY_MODE_ENV: &str = "AUTH0_VERIFY_MODE";
pub const AUTH0_JWKS_URL_ENV: &str = "AUTH0_JWKS_URL";
pub const AUTH0_USERINFO_URL_ENV: &str = "AUTH0_USERINFO_URL";
pub const AUTH0_JWKS_TTL_ENV: &str = "AUTH0_JWKS_TTL_SECS";
pub const AUTH0_JWKS_TIMEOUT_ENV: &str = "AUTH0_JWKS_TIMEOUT_SECS";
pub const AUTH0_USERINFO_TIMEOUT_ENV: &str = "AUTH0_USERINFO_TIMEOUT_SECS";

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Default timeout for JWKS fetches.
pub const DEFAULT_JWKS_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for userinfo calls.
pub const DEFAULT_USERINFO_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound for any provider call timeout.
pub const MAX_PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Token verification strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VerifyMode {
    /// Verify the signature locally against the provider's JWKS
    #[default]
    Local,
    /// Ask the provider's userinfo endpoint
    Remote,
}

impl FromStr for VerifyMode {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jwks" | "local" => Ok(VerifyMode::Local),
            "userinfo" | "remote" => Ok(VerifyMode::Remote),
            other => Err(AuthError::Configuration(format!(
                "{AUTH0_VERIFY_MODE_ENV} must be 'jwks' or 'userinfo', got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for VerifyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyMode::Local => write!(f, "jwks"),
            VerifyMode::Remote => write!(f, "userinfo"),
        }
    }
}

/// Identity provider settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    /// Provider domain, bare host (e.g. `tenant.us.auth0.com`)
    pub domain: Option<String>,
    pub audience: Option<String>,
    /// Explicit issuer; see [`AuthSettings::issuer`] for the derived default
    pub issuer: Option<String>,
    pub verify_mode: VerifyMode,
    pub jwks_url: Option<String>,
    pub userinfo_url: Option<String>,
    pub jwks_ttl: Duration,
    pub jwks_timeout: Duration,
    pub userinfo_timeout: Duration,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            domain: None,
            audience: None,
            issuer: None,
            verify_mode: VerifyMode::default(),
            jwks_url: None,
            userinfo_url: None,
            jwks_ttl: DEFAULT_CACHE_TTL,
            jwks_timeout: DEFAULT_JWKS_TIMEOUT,
            userinfo_timeout: DEFAULT_USERINFO_TIMEOUT,
        }
    }
}

impl AuthSettings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AuthError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let domain = get(AUTH0_DOMAIN_ENV)
            .map(|d| normalize_domain(&d))
            .transpose()?;
        let verify_mode = match get(AUTH0_VERIFY_MODE_ENV) {
            Some(mode) => mode.parse()?,
            None => VerifyMode::default(),
        };
        let jwks_url = get(AUTH0_JWKS_URL_ENV)
            .map(|u| validate_url(AUTH0_JWKS_URL_ENV, u))
            .transpose()?;
        let userinfo_url = get(AUTH0_USERINFO_URL_ENV)
            .map(|u| validate_url(AUTH0_USERINFO_URL_ENV, u))
            .transpose()?;

        Ok(Self {
            domain,
            audience: get(AUTH0_AUDIENCE_ENV),
            issuer: get(AUTH0_ISSUER_ENV),
            verify_mode,
            jwks_url,
            userinfo_url,
            jwks_ttl: secs_or_default(
                AUTH0_JWKS_TTL_ENV,
                get(AUTH0_JWKS_TTL_ENV),
                DEFAULT_CACHE_TTL,
            )?,
            jwks_timeout: provider_timeout(
                AUTH0_JWKS_TIMEOUT_ENV,
                get(AUTH0_JWKS_TIMEOUT_ENV),
                DEFAULT_JWKS_TIMEOUT,
            )?,
            userinfo_timeout: provider_timeout(
                AUTH0_USERINFO_TIMEOUT_ENV,
                get(AUTH0_USERINFO_TIMEOUT_ENV),
                DEFAULT_USERINFO_TIMEOUT,
            )?,
        })
    }

    /// Expected issuer: explicit setting, else `https://<domain>/`.
    pub fn issuer(&self) -> Option<String> {
        self.issuer
            .clone()
            .or_else(|| self.domain.as_ref().map(|d| format!("https://{d}/")))
    }

    /// JWKS endpoint: explicit setting, else the domain's well-known path.
    pub fn jwks_url(&self) -> Option<String> {
        self.jwks_url.clone().or_else(|| {
            self.domain
                .as_ref()
                .map(|d| format!("https://{d}/.well-known/jwks.json"))
        })
    }

    /// userinfo endpoint: explicit setting, else `https://<domain>/userinfo`.
    pub fn userinfo_url(&self) -> Option<String> {
        self.userinfo_url
            .clone()
            .or_else(|| self.domain.as_ref().map(|d| format!("https://{d}/userinfo")))
    }
}

/// Accepts `tenant.auth0.com`, `https://tenant.auth0.com` or
/// `https://tenant.auth0.com/` and returns the bare host.
fn normalize_domain(raw: &str) -> Result<String, AuthError> {
    let bare = raw
        .strip_prefix("https://")
        .unwrap_or(raw)
        .trim_end_matches('/');

    let invalid = || {
        AuthError::Configuration(format!(
            "{AUTH0_DOMAIN_ENV} is not a valid domain: '{raw}'"
        ))
    };

    let url = Url::parse(&format!("https://{bare}/")).map_err(|_| invalid())?;
    if url.path() != "/" || url.query().is_some() || url.host_str().is_none() {
        return Err(invalid());
    }
    Ok(bare.to_string())
}

fn validate_url(name: &str, value: String) -> Result<String, AuthError> {
    Url::parse(&value)
        .map_err(|e| AuthError::Configuration(format!("{name} is not a valid URL: {e}")))?;
    Ok(value)
}

fn secs_or_default(
    name: &str,
    value: Option<String>,
    default: Duration,
) -> Result<Duration, AuthError> {
    match value {
        Some(v) => v.parse::<u64>().map(Duration::from_secs).map_err(|_| {
            AuthError::Configuration(format!("{name} must be a number of seconds, got '{v}'"))
        }),
        None => Ok(default),
    }
}

/// Like [`secs_or_default`], but the value must lie in
/// `1..=MAX_PROVIDER_TIMEOUT`.
fn provider_timeout(
    name: &str,
    value: Option<String>,
    default: Duration,
) -> Result<Duration, AuthError> {
    let timeout = secs_or_default(name, value, default)?;
    if timeout.is_zero() || timeout > MAX_PROVIDER_TIMEOUT {
        return Err(AuthError::Configuration(format!(
            "{name} must be between 1 and {} seconds, got {}",
            MAX_PROVIDER_TIMEOUT.as_secs(),
            timeout.as_secs()
        )));
    }
    Ok(timeout)
}
