// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Deployment and health query HTTP handlers.

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;
use utoipa::ToSchema;

use kiln_server_db::HealthRecord;
use kiln_server_provisioning::DeploymentStatusView;

use crate::api::AppState;
use crate::error::ServerError;

/// Persisted probe results for one application. Zero-valued when no probe
/// run has been recorded yet.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct HealthRecordResponse {
	pub app_name: String,
	pub failure_count: i64,
	pub success_count: i64,
	pub last_failure: Option<DateTime<Utc>>,
	pub last_success: Option<DateTime<Utc>>,
	pub created_at: Option<DateTime<Utc>>,
}

impl HealthRecordResponse {
	fn from_record(record: HealthRecord) -> Self {
		Self {
			app_name: record.app_name,
			failure_count: record.failure_count,
			success_count: record.success_count,
			last_failure: record.last_failure,
			last_success: record.last_success,
			created_at: Some(record.created_at),
		}
	}

	fn empty(app_name: String) -> Self {
		Self {
			app_name,
			failure_count: 0,
			success_count: 0,
			last_failure: None,
			last_success: None,
			created_at: None,
		}
	}
}

#[utoipa::path(
    get,
    path = "/get-deployment/{app_name}",
    params(
        ("app_name" = String, Path, description = "Application name")
    ),
    responses(
        (status = 200, description = "Deployment status", body = DeploymentStatusView),
        (status = 406, description = "Deployment doesn't exist", body = String),
        (status = 500, description = "Cluster listing failed", body = String)
    ),
    tag = "query"
)]
/// GET /get-deployment/{app_name} - Status of one deployment and its pods.
pub async fn get_deployment(
	State(state): State<AppState>,
	Path(app_name): Path<String>,
) -> Result<Json<DeploymentStatusView>, ServerError> {
	match state.query.get_deployment(&app_name).await {
		Ok(view) => Ok(Json(view)),
		Err(e) => {
			tracing::error!(app = %app_name, error = %e, "deployment query failed");
			Err(e.into())
		}
	}
}

#[utoipa::path(
    get,
    path = "/get-all-deployments",
    responses(
        (status = 200, description = "Status of every known deployment", body = [DeploymentStatusView]),
        (status = 500, description = "Cluster listing failed", body = String)
    ),
    tag = "query"
)]
/// GET /get-all-deployments - Status of every known deployment.
pub async fn get_all_deployments(
	State(state): State<AppState>,
) -> Result<Json<Vec<DeploymentStatusView>>, ServerError> {
	match state.query.get_all_deployments().await {
		Ok(views) => Ok(Json(views)),
		Err(e) => {
			tracing::error!(error = %e, "deployment listing failed");
			Err(e.into())
		}
	}
}

#[utoipa::path(
    get,
    path = "/health/{app_name}",
    params(
        ("app_name" = String, Path, description = "Application name")
    ),
    responses(
        (status = 200, description = "Health record for the application", body = HealthRecordResponse),
        (status = 500, description = "Record store failure", body = String)
    ),
    tag = "query"
)]
/// GET /health/{app_name} - Persisted probe results for one application.
///
/// An application without any recorded probe run yields a zero-valued
/// record, not an error.
pub async fn app_health(
	State(state): State<AppState>,
	Path(app_name): Path<String>,
) -> Result<Json<HealthRecordResponse>, ServerError> {
	let endpoint = format!("/health/{app_name}");
	let db_start = Instant::now();

	let record = match state.health_repo.get(&app_name).await {
		Ok(record) => record,
		Err(e) => {
			tracing::error!(app = %app_name, error = %e, "health record lookup failed");
			state
				.metrics
				.failed_db_requests
				.with_label_values(&["GET", &endpoint])
				.inc();
			return Err(e.into());
		}
	};

	state
		.metrics
		.db_response_time
		.with_label_values(&["GET", &endpoint])
		.observe(db_start.elapsed().as_secs_f64());

	let response = match record {
		Some(record) => HealthRecordResponse::from_record(record),
		None => HealthRecordResponse::empty(app_name),
	};
	Ok(Json(response))
}
