// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Handler-boundary error mapping.
//!
//! Every platform- and store-level error is flattened into a generic message
//! here; the underlying cause stays in server-side logs only.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kiln_server_db::DbError;
use kiln_server_provisioning::ProvisionError;

pub const INTERNAL_ERROR: &str = "Internal server error";
pub const BAD_REQUEST: &str = "Request body doesn't have correct format";
pub const OBJECT_EXISTS: &str = "Object already exists";
pub const DEPLOYMENT_MISSING: &str = "Deployment doesn't exist";

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	#[error("bad request")]
	BadRequest,
	#[error("conflict")]
	Conflict,
	#[error("deployment not found")]
	DeploymentNotFound,
	#[error("internal error: {0}")]
	Internal(String),
}

impl From<ProvisionError> for ServerError {
	fn from(e: ProvisionError) -> Self {
		match e {
			ProvisionError::AlreadyExists { .. } => ServerError::Conflict,
			ProvisionError::NotFound { .. } => ServerError::DeploymentNotFound,
			// the specific failing step was already logged where it happened
			other => ServerError::Internal(other.to_string()),
		}
	}
}

impl From<DbError> for ServerError {
	fn from(e: DbError) -> Self {
		ServerError::Internal(e.to_string())
	}
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		let (status, message) = match self {
			ServerError::BadRequest => (StatusCode::BAD_REQUEST, BAD_REQUEST),
			ServerError::Conflict => (StatusCode::CONFLICT, OBJECT_EXISTS),
			ServerError::DeploymentNotFound => (StatusCode::NOT_ACCEPTABLE, DEPLOYMENT_MISSING),
			ServerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR),
		};
		(status, Json(message)).into_response()
	}
}
