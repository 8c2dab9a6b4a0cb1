// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provisioning HTTP handlers.

use axum::extract::rejection::JsonRejection;
use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use kiln_server_provisioning::{DeployRequest, ManagedDeployRequest};

use crate::api::AppState;
use crate::error::ServerError;

/// Response for a managed database deployment. The credentials are the ones
/// embedded in the workload's secret.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct ManagedDeployResponse {
	pub username: String,
	pub password: String,
	pub message: String,
}

#[utoipa::path(
    post,
    path = "/deploy-unmanaged",
    request_body = DeployRequest,
    responses(
        (status = 200, description = "Workload provisioned; message names the reachable endpoint", body = String),
        (status = 400, description = "Malformed request body", body = String),
        (status = 409, description = "Application name already provisioned", body = String),
        (status = 500, description = "A provisioning step failed", body = String)
    ),
    tag = "deploy"
)]
/// POST /deploy-unmanaged - Provision a stateless workload.
pub async fn deploy_unmanaged(
	State(state): State<AppState>,
	payload: Result<Json<DeployRequest>, JsonRejection>,
) -> Result<Json<String>, ServerError> {
	let Json(req) = payload.map_err(|_| ServerError::BadRequest)?;

	match state.provisioner.deploy_unmanaged(&req).await {
		Ok(message) => Ok(Json(message)),
		Err(e) => {
			tracing::error!(app = %req.app_name, error = %e, "unmanaged deploy failed");
			Err(e.into())
		}
	}
}

#[utoipa::path(
    post,
    path = "/deploy-managed",
    request_body = ManagedDeployRequest,
    responses(
        (status = 200, description = "Managed database provisioned", body = ManagedDeployResponse),
        (status = 400, description = "Malformed request body", body = String),
        (status = 500, description = "A provisioning step failed", body = String)
    ),
    tag = "deploy"
)]
/// POST /deploy-managed - Provision a managed PostgreSQL workload.
///
/// Credentials are generated server-side and echoed in the response so the
/// caller can connect.
pub async fn deploy_managed(
	State(state): State<AppState>,
	payload: Result<Json<ManagedDeployRequest>, JsonRejection>,
) -> Result<Json<ManagedDeployResponse>, ServerError> {
	let Json(req) = payload.map_err(|_| ServerError::BadRequest)?;

	match state.provisioner.deploy_managed(&req).await {
		Ok(outcome) => Ok(Json(ManagedDeployResponse {
			username: outcome.username,
			password: outcome.password,
			message: outcome.message,
		})),
		Err(e) => {
			tracing::error!(error = %e, "managed deploy failed");
			Err(e.into())
		}
	}
}
