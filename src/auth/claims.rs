// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Normalized claim set produced by a successful verification.
//!
//! The two strategies see different shapes: the local path decodes the raw
//! JWT payload, the remote path receives the provider's userinfo profile.
//! Both are mapped onto [`ClaimSet`], and the untouched JSON object is kept in
//! [`ClaimSet::claims`].
//!
//! | Field | JWT payload | userinfo profile |
//! |-------|-------------|------------------|
//! | `subject` | `sub` if present | `sub`, else `user_id` (required) |
//! | `issuer` | `iss` | `iss`, else the configured issuer |
//! | `audience` | `aud` (string or array) | `aud` if present |
//! | `expires_at` | `exp` | `exp` if present |
//! | `email` | `email` | `email` |

use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::error::AuthError;

/// Where a claim set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClaimSource {
    /// Signature verified locally against the provider's JWKS
    Jwt,
    /// Accepted by the provider's userinfo endpoint
    Introspection,
}

/// Claims of an authenticated caller.
///
/// Request-scoped: built once per verification and never cached.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ClaimSet {
    /// Canonical user identifier
    ///
    /// Always present for userinfo profiles. A signed token is accepted on
    /// signature, `exp`, `iss` and `aud` alone, so it may lack `sub`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Issuer that vouched for the token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// Audiences the token was issued for
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub audience: Vec<String>,

    /// Expiry (Unix timestamp, seconds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,

    /// Email address, when the provider includes one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Verification strategy that produced this set
    pub source: ClaimSource,

    /// Raw claims exactly as received
    #[schema(value_type = Object)]
    pub claims: Map<String, Value>,
}

impl ClaimSet {
    /// Map a verified JWT payload.
    pub fn from_jwt(claims: Map<String, Value>) -> Result<Self, AuthError> {
        Ok(Self {
            subject: string_claim(&claims, "sub"),
            issuer: string_claim(&claims, "iss"),
            audience: audience_claim(&claims),
            expires_at: timestamp_claim(&claims, "exp"),
            email: string_claim(&claims, "email"),
            source: ClaimSource::Jwt,
            claims,
        })
    }

    /// Map a userinfo profile returned by the provider.
    ///
    /// `issuer` is the issuer configured for the provider that answered; it is
    /// only used when the profile carries no `iss` of its own.
    pub fn from_userinfo(claims: Map<String, Value>, issuer: &str) -> Result<Self, AuthError> {
        let subject = string_claim(&claims, "sub")
            .or_else(|| string_claim(&claims, "user_id"))
            .ok_or_else(|| {
                AuthError::MalformedProviderResponse("profile has no subject".to_string())
            })?;

        Ok(Self {
            subject: Some(subject),
            issuer: string_claim(&claims, "iss").or_else(|| Some(issuer.to_string())),
            audience: audience_claim(&claims),
            expires_at: timestamp_claim(&claims, "exp"),
            email: string_claim(&claims, "email"),
            source: ClaimSource::Introspection,
            claims,
        })
    }

    /// Look up a raw claim by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }
}

fn string_claim(claims: &Map<String, Value>, name: &str) -> Option<String> {
    claims
        .get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn audience_claim(claims: &Map<String, Value>) -> Vec<String> {
    match claims.get("aud") {
        Some(Value::String(aud)) => vec![aud.clone()],
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn timestamp_claim(claims: &Map<String, Value>, name: &str) -> Option<i64> {
    let value = claims.get(name)?;
    value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn from_jwt_maps_standard_claims() {
        let raw = object(json!({
            "sub": "auth0|123",
            "iss": "https://tenant.example/",
            "aud": "https://api.example/",
            "exp": 1_900_000_000,
            "email": "me@example.com",
            "https://tuma.example/roles": ["tasker"]
        }));

        let set = ClaimSet::from_jwt(raw.clone()).unwrap();
        assert_eq!(set.subject.as_deref(), Some("auth0|123"));
        assert_eq!(set.issuer.as_deref(), Some("https://tenant.example/"));
        assert_eq!(set.audience, vec!["https://api.example/".to_string()]);
        assert_eq!(set.expires_at, Some(1_900_000_000));
        assert_eq!(set.email.as_deref(), Some("me@example.com"));
        assert_eq!(set.source, ClaimSource::Jwt);
        assert_eq!(set.claims, raw);
        assert_eq!(set.get("https://tuma.example/roles"), Some(&json!(["tasker"])));
    }

    #[test]
    fn from_jwt_accepts_audience_array() {
        let raw = object(json!({
            "sub": "auth0|123",
            "aud": ["https://api.example/", "https://tenant.example/userinfo"]
        }));

        let set = ClaimSet::from_jwt(raw).unwrap();
        assert_eq!(set.audience.len(), 2);
        assert_eq!(set.audience[1], "https://tenant.example/userinfo");
    }

    #[test]
    fn from_jwt_without_subject_keeps_payload() {
        let raw = object(json!({
            "iss": "https://tenant.example/",
            "aud": "https://api.example/",
            "exp": 1_900_000_000
        }));

        let set = ClaimSet::from_jwt(raw.clone()).unwrap();
        assert_eq!(set.subject, None);
        assert_eq!(set.expires_at, Some(1_900_000_000));
        assert_eq!(set.claims, raw);

        let json = serde_json::to_value(&set).unwrap();
        assert!(json.get("subject").is_none());
    }

    #[test]
    fn from_userinfo_falls_back_to_user_id_and_configured_issuer() {
        let raw = object(json!({
            "user_id": "auth0|legacy",
            "email": "legacy@example.com",
            "name": "Legacy Profile"
        }));

        let set = ClaimSet::from_userinfo(raw, "https://tenant.example/").unwrap();
        assert_eq!(set.subject.as_deref(), Some("auth0|legacy"));
        assert_eq!(set.issuer.as_deref(), Some("https://tenant.example/"));
        assert!(set.audience.is_empty());
        assert_eq!(set.expires_at, None);
        assert_eq!(set.source, ClaimSource::Introspection);
        assert_eq!(set.get("name"), Some(&json!("Legacy Profile")));
    }

    #[test]
    fn from_userinfo_without_subject_is_malformed_response() {
        let raw = object(json!({ "email": "nobody@example.com" }));
        let err = ClaimSet::from_userinfo(raw, "https://tenant.example/").unwrap_err();
        assert!(matches!(err, AuthError::MalformedProviderResponse(_)));
    }

    #[test]
    fn serializes_without_empty_fields() {
        let set = ClaimSet::from_jwt(object(json!({ "sub": "auth0|1" }))).unwrap();
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json["subject"], "auth0|1");
        assert_eq!(json["source"], "jwt");
        assert!(json.get("issuer").is_none());
        assert!(json.get("audience").is_none());
    }
}
