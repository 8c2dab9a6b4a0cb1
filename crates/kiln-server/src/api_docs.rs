// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! OpenAPI documentation, served by Swagger UI at `/api`.

use utoipa::OpenApi;

use kiln_server_provisioning::{
	DeployRequest, DeploymentStatusView, EnvironmentEntry, ManagedDeployRequest, PodStatusView,
	ResourceLimits,
};

use crate::routes::deploy::ManagedDeployResponse;
use crate::routes::health::{HealthComponents, HealthResponse, HealthStatus};
use crate::routes::query::HealthRecordResponse;

#[derive(OpenApi)]
#[openapi(
	info(
		title = "Kiln Server API",
		description = "Provisions application workloads on a Kubernetes cluster and tracks their health."
	),
	paths(
		crate::routes::deploy::deploy_unmanaged,
		crate::routes::deploy::deploy_managed,
		crate::routes::query::get_deployment,
		crate::routes::query::get_all_deployments,
		crate::routes::query::app_health,
		crate::routes::health::health_check,
		crate::routes::health::prometheus_metrics,
	),
	components(schemas(
		DeployRequest,
		ManagedDeployRequest,
		EnvironmentEntry,
		ResourceLimits,
		DeploymentStatusView,
		PodStatusView,
		ManagedDeployResponse,
		HealthRecordResponse,
		HealthResponse,
		HealthComponents,
		HealthStatus,
	)),
	tags(
		(name = "deploy", description = "Workload provisioning"),
		(name = "query", description = "Deployment and health queries"),
		(name = "health", description = "Process health and metrics")
	)
)]
pub struct ApiDoc;
