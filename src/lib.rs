// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tumatask Auth - bearer token verification for the Tumatask API
//!
//! Verifies access tokens issued by an Auth0 tenant, either locally against
//! the tenant's JWKS or remotely through its userinfo endpoint.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token verification (JWKS key store, local and remote verifiers)
//! - `config` - Environment-driven settings
//! - `state` - Shared application state

pub mod api;
pub mod auth;
pub mod config;
pub mod state;

pub use auth::{AuthError, Authenticator, ClaimSet};
pub use config::{AuthSettings, VerifyMode};
