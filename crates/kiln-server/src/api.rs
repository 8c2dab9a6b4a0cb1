// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Application state and router assembly.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{middleware, Router};
use sqlx::SqlitePool;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use kiln_server_config::ServerConfig;
use kiln_server_db::HealthRepository;
use kiln_server_k8s::ClusterClient;
use kiln_server_provisioning::{
	MonitorSupervisor, Provisioner, ProvisionerSettings, QueryService,
};

use crate::metrics::{self, Metrics};
use crate::routes;

/// Shared state for every request handler. Everything in here is safe for
/// concurrent use by parallel handlers.
#[derive(Clone)]
pub struct AppState {
	pub provisioner: Arc<Provisioner>,
	pub query: Arc<QueryService>,
	pub health_repo: HealthRepository,
	pub monitors: Arc<MonitorSupervisor>,
	pub metrics: Arc<Metrics>,
	pub pool: SqlitePool,
}

/// Creates the application state from the shared pool and cluster client.
pub fn create_app_state(
	pool: SqlitePool,
	cluster: Arc<dyn ClusterClient>,
	config: &ServerConfig,
) -> AppState {
	let health_repo = HealthRepository::new(pool.clone());
	let monitors = Arc::new(MonitorSupervisor::new());

	let settings = ProvisionerSettings {
		domain: config.provisioner.domain.clone(),
		platform_timeout: std::time::Duration::from_secs(config.provisioner.platform_timeout_secs),
		monitor_poll_interval: std::time::Duration::from_secs(config.provisioner.monitor_poll_secs),
	};

	let provisioner = Arc::new(Provisioner::new(
		Arc::clone(&cluster),
		health_repo.clone(),
		Arc::clone(&monitors),
		settings,
	));
	let query = Arc::new(QueryService::new(cluster));

	AppState {
		provisioner,
		query,
		health_repo,
		monitors,
		metrics: Arc::new(Metrics::new()),
		pool,
	}
}

/// Assemble the router with every route, the OpenAPI UI, and the request
/// metrics middleware.
pub fn create_router(state: AppState) -> Router {
	Router::new()
		.route("/deploy-unmanaged", post(routes::deploy::deploy_unmanaged))
		.route("/deploy-managed", post(routes::deploy::deploy_managed))
		.route(
			"/get-deployment/{app_name}",
			get(routes::query::get_deployment),
		)
		.route(
			"/get-all-deployments",
			get(routes::query::get_all_deployments),
		)
		.route("/health/{app_name}", get(routes::query::app_health))
		.route("/health", get(routes::health::health_check))
		.route("/metrics", get(routes::health::prometheus_metrics))
		.merge(SwaggerUi::new("/api").url("/api/openapi.json", crate::api_docs::ApiDoc::openapi()))
		.layer(middleware::from_fn_with_state(
			state.clone(),
			metrics::track_requests,
		))
		.with_state(state)
}
