// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Request and view types for the provisioning API.
//!
//! Wire field names are PascalCase for compatibility with existing clients;
//! missing fields default the way a zero value would.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use utoipa::ToSchema;

/// One environment entry of a deploy request, routed into the secret bundle
/// or the config bundle by `is_secret`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EnvironmentEntry {
	#[serde(rename = "Key")]
	pub key: String,
	#[serde(rename = "Value")]
	pub value: String,
	#[serde(rename = "IsSecret", default)]
	pub is_secret: bool,
}

/// Requested compute limits, as Kubernetes quantities (e.g. "500m", "1Gi").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ResourceLimits {
	#[serde(rename = "CPU", default)]
	pub cpu: String,
	#[serde(rename = "RAM", default)]
	pub ram: String,
}

/// Client request to provision a stateless workload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct DeployRequest {
	pub app_name: String,
	#[serde(default)]
	pub replicas: i32,
	pub image_address: String,
	pub image_tag: String,
	#[serde(default)]
	pub service_port: i32,
	#[serde(default)]
	pub resources: ResourceLimits,
	#[serde(default)]
	pub envs: Vec<EnvironmentEntry>,
	#[serde(default)]
	pub monitor: bool,
	#[serde(default)]
	pub external_access: bool,
}

/// Client request to provision a managed PostgreSQL workload. Credentials
/// are generated server-side, never supplied by the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct ManagedDeployRequest {
	#[serde(default)]
	pub envs: Vec<EnvironmentEntry>,
	#[serde(default)]
	pub external_access: bool,
}

/// Generated access credentials for a managed database.
///
/// This struct is the single source for both the cluster Secret data and the
/// client response, so the two can never disagree about which keys were
/// written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
	pub code: String,
	pub username: String,
	pub password: String,
}

/// Outcome of a managed deployment, echoed to the caller.
#[derive(Debug, Clone)]
pub struct ManagedDeployment {
	pub username: String,
	pub password: String,
	pub message: String,
}

/// Runtime status of one pod belonging to a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct PodStatusView {
	pub name: String,
	pub phase: String,
	#[serde(rename = "HostID")]
	pub host_id: String,
	#[serde(rename = "PodIP")]
	pub pod_ip: String,
	pub start_time: String,
}

/// Request-scoped join of a deployment's replica counts with its pods.
/// Never persisted; recomputed on every query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct DeploymentStatusView {
	pub deployment_name: String,
	pub replicas: i32,
	pub ready_replicas: i32,
	pub pod_statuses: Vec<PodStatusView>,
}

/// Tunables the provisioner is constructed with.
#[derive(Debug, Clone)]
pub struct ProvisionerSettings {
	/// Domain suffix for externally exposed hostnames.
	pub domain: String,
	/// Deadline applied to every individual cluster call.
	pub platform_timeout: Duration,
	/// Poll interval for health monitor tasks.
	pub monitor_poll_interval: Duration,
}

impl Default for ProvisionerSettings {
	fn default() -> Self {
		Self {
			domain: "kiln.local".to_string(),
			platform_timeout: Duration::from_secs(30),
			monitor_poll_interval: Duration::from_secs(60),
		}
	}
}
