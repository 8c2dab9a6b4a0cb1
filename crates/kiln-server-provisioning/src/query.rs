// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Read-side deployment queries.
//!
//! Joins a workload's declared/ready replica counts with the pods labeled as
//! belonging to it. Views are recomputed on every query, never persisted.

use std::sync::Arc;

use kiln_server_k8s::{ClusterClient, DeploymentSummary, PodSummary};
use tracing::instrument;

use crate::error::ProvisionError;
use crate::naming::NamingRoot;
use crate::types::{DeploymentStatusView, PodStatusView};

pub struct QueryService {
	cluster: Arc<dyn ClusterClient>,
}

impl QueryService {
	pub fn new(cluster: Arc<dyn ClusterClient>) -> Self {
		Self { cluster }
	}

	/// Status of one deployment. Zero matching pods is a valid answer, not
	/// an error; a missing deployment is.
	#[instrument(skip(self))]
	pub async fn get_deployment(&self, app_name: &str) -> Result<DeploymentStatusView, ProvisionError> {
		let root = NamingRoot::unmanaged(app_name);
		let deployment = self
			.cluster
			.get_deployment(&root.deployment())
			.await?
			.ok_or_else(|| ProvisionError::NotFound {
				name: app_name.to_string(),
			})?;

		let pods = self.cluster.list_pods().await?;
		Ok(status_view(deployment, &pods))
	}

	/// Status of every known deployment, joined against the full pod list.
	/// O(deployments × pods) by label match, fine at the cluster sizes this
	/// server targets.
	#[instrument(skip(self))]
	pub async fn get_all_deployments(&self) -> Result<Vec<DeploymentStatusView>, ProvisionError> {
		let deployments = self.cluster.list_deployments().await?;
		let pods = self.cluster.list_pods().await?;

		Ok(deployments
			.into_iter()
			.map(|deployment| status_view(deployment, &pods))
			.collect())
	}
}

fn status_view(deployment: DeploymentSummary, pods: &[PodSummary]) -> DeploymentStatusView {
	let pod_statuses = pods
		.iter()
		.filter(|pod| {
			pod
				.labels
				.get("app")
				.is_some_and(|app| format!("{app}-deployment") == deployment.name)
		})
		.map(|pod| PodStatusView {
			name: pod.name.clone(),
			phase: pod.phase.clone(),
			host_id: pod.host_ip.clone(),
			pod_ip: pod.pod_ip.clone(),
			start_time: pod
				.started_at
				.map(|t| t.to_rfc3339())
				.unwrap_or_default(),
		})
		.collect();

	DeploymentStatusView {
		deployment_name: deployment.name,
		replicas: deployment.replicas,
		ready_replicas: deployment.ready_replicas,
		pod_statuses,
	}
}
