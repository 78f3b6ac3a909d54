// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{Auth, ClaimSet};

#[derive(Debug, Serialize, ToSchema)]
pub struct PingResponse {
    pub ok: bool,
}

/// Claims of the authenticated caller.
#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub user: ClaimSet,
}

/// Unauthenticated connectivity check.
#[utoipa::path(
    get,
    path = "/v1/auth/ping",
    tag = "Auth",
    responses(
        (status = 200, description = "Service reachable", body = PingResponse)
    )
)]
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse { ok: true })
}

/// Return the verified claims of the caller.
#[utoipa::path(
    get,
    path = "/v1/auth/me",
    tag = "Auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Token accepted", body = MeResponse),
        (status = 401, description = "Token missing or rejected"),
        (status = 500, description = "Authentication misconfigured or provider unavailable")
    )
)]
pub async fn me(Auth(user): Auth) -> Json<MeResponse> {
    Json(MeResponse { user })
}
