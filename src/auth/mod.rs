// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer token verification for tokens issued by the configured identity
//! provider (Auth0).
//!
//! ## Auth Flow
//!
//! 1. Frontend authenticates the user with the provider
//! 2. Frontend sends `Authorization: Bearer <access token>`
//! 3. Server, depending on `AUTH0_VERIFY_MODE`:
//!    - `jwks`: verifies signature, expiry, issuer and audience locally
//!      against the provider's cached JWKS
//!    - `userinfo`: forwards the token to the provider's userinfo endpoint
//!      and trusts its decision
//! 4. The result is a request-scoped [`ClaimSet`] or a typed [`AuthError`]
//!
//! ## Security
//!
//! - JWKS is cached with a TTL (1 hour by default)
//! - An unknown `kid` forces exactly one JWKS refresh (key rotation)
//! - Stale JWKS is served when the provider is unreachable
//! - Every provider call carries a timeout

pub mod authenticator;
pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod local;
pub mod remote;

#[cfg(test)]
pub(crate) mod testutil;

pub use authenticator::{Authenticator, TokenVerifier};
pub use claims::{ClaimSet, ClaimSource};
pub use error::AuthError;
pub use extractor::Auth;
pub use jwks::{JwksManager, KeySet, KeyStore};
pub use local::LocalVerifier;
pub use remote::RemoteVerifier;
