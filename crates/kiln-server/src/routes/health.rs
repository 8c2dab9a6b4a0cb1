// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Process health and metrics HTTP handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::AppState;
use crate::error::ServerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
	Healthy,
	Unhealthy,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthComponents {
	pub database: bool,
	pub monitors: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
	pub status: HealthStatus,
	pub timestamp: String,
	pub components: HealthComponents,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Process is healthy", body = HealthResponse),
        (status = 503, description = "Process is unhealthy", body = HealthResponse)
    ),
    tag = "health"
)]
/// GET /health - Process health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
	let database = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();
	let monitors = state.monitors.monitor_count().await;

	let status = if database {
		HealthStatus::Healthy
	} else {
		HealthStatus::Unhealthy
	};

	let http_status = match status {
		HealthStatus::Healthy => StatusCode::OK,
		HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
	};

	(
		http_status,
		Json(HealthResponse {
			status,
			timestamp: chrono::Utc::now().to_rfc3339(),
			components: HealthComponents { database, monitors },
		}),
	)
}

#[utoipa::path(
    get,
    path = "/metrics",
    responses(
        (status = 200, description = "Prometheus metrics", content_type = "text/plain")
    ),
    tag = "health"
)]
/// GET /metrics - Prometheus metrics export endpoint.
///
/// Returns request counts, failure counts, and response-time histograms in
/// Prometheus text format.
pub async fn prometheus_metrics(
	State(state): State<AppState>,
) -> Result<impl IntoResponse, ServerError> {
	match state.metrics.gather() {
		Ok(metrics) => Ok((
			StatusCode::OK,
			[(
				axum::http::header::CONTENT_TYPE,
				"text/plain; version=0.0.4; charset=utf-8",
			)],
			metrics,
		)),
		Err(e) => {
			tracing::error!(error = %e, "failed to gather metrics");
			Err(ServerError::Internal(format!(
				"Failed to gather metrics: {e}"
			)))
		}
	}
}
