// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! A mock cluster client for testing provisioning flows.
//!
//! The mock records every created resource in submission order, serves
//! configurable existence/listing fixtures, and can be scripted to fail the
//! first creation of a given resource kind.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::CronJob;
use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;

use crate::cluster::{ClusterClient, DeploymentSummary, PodSummary, ProbeRun};
use crate::error::{K8sError, K8sResult};

/// A resource the mock accepted, retained in submission order.
#[derive(Debug, Clone)]
pub enum CreatedResource {
	Secret(Secret),
	ConfigMap(ConfigMap),
	Deployment(Deployment),
	StatefulSet(StatefulSet),
	Service(Service),
	Ingress(Ingress),
	CronJob(CronJob),
}

impl CreatedResource {
	pub fn kind(&self) -> &'static str {
		match self {
			CreatedResource::Secret(_) => "Secret",
			CreatedResource::ConfigMap(_) => "ConfigMap",
			CreatedResource::Deployment(_) => "Deployment",
			CreatedResource::StatefulSet(_) => "StatefulSet",
			CreatedResource::Service(_) => "Service",
			CreatedResource::Ingress(_) => "Ingress",
			CreatedResource::CronJob(_) => "CronJob",
		}
	}

	pub fn name(&self) -> String {
		let meta = match self {
			CreatedResource::Secret(r) => &r.metadata,
			CreatedResource::ConfigMap(r) => &r.metadata,
			CreatedResource::Deployment(r) => &r.metadata,
			CreatedResource::StatefulSet(r) => &r.metadata,
			CreatedResource::Service(r) => &r.metadata,
			CreatedResource::Ingress(r) => &r.metadata,
			CreatedResource::CronJob(r) => &r.metadata,
		};
		meta.name.clone().unwrap_or_default()
	}
}

#[derive(Default)]
struct MockState {
	created: Vec<CreatedResource>,
	existing_deployments: HashSet<String>,
	existing_stateful_sets: HashSet<String>,
	deployments: Vec<DeploymentSummary>,
	pods: Vec<PodSummary>,
	probe_runs: HashMap<String, VecDeque<Option<ProbeRun>>>,
	fail_on_kind: Option<&'static str>,
	fail_listings: bool,
}

/// A mock cluster client that can be used without a real cluster.
#[derive(Clone, Default)]
pub struct MockClusterClient {
	state: Arc<Mutex<MockState>>,
}

impl MockClusterClient {
	/// Create a new mock with no fixtures.
	pub fn new() -> Self {
		Self::default()
	}

	/// Everything created so far, in submission order.
	pub fn created(&self) -> Vec<CreatedResource> {
		self.state.lock().unwrap().created.clone()
	}

	/// Kinds created so far, in submission order.
	pub fn created_kinds(&self) -> Vec<&'static str> {
		self.state
			.lock()
			.unwrap()
			.created
			.iter()
			.map(|r| r.kind())
			.collect()
	}

	/// Mark a deployment name as already present on the cluster.
	pub fn add_existing_deployment(&self, name: &str) {
		self.state
			.lock()
			.unwrap()
			.existing_deployments
			.insert(name.to_string());
	}

	/// Mark a stateful set name as already present on the cluster.
	pub fn add_existing_stateful_set(&self, name: &str) {
		self.state
			.lock()
			.unwrap()
			.existing_stateful_sets
			.insert(name.to_string());
	}

	/// Serve a deployment summary from `get_deployment`/`list_deployments`.
	pub fn add_deployment_summary(&self, summary: DeploymentSummary) {
		self.state.lock().unwrap().deployments.push(summary);
	}

	/// Serve a pod from `list_pods`.
	pub fn add_pod(&self, pod: PodSummary) {
		self.state.lock().unwrap().pods.push(pod);
	}

	/// Queue the result of the next `latest_probe_run` call for `app`.
	/// Results are consumed in FIFO order; an exhausted queue yields `None`.
	pub fn push_probe_run(&self, app: &str, run: Option<ProbeRun>) {
		self.state
			.lock()
			.unwrap()
			.probe_runs
			.entry(app.to_string())
			.or_default()
			.push_back(run);
	}

	/// Fail every creation of the given kind ("Secret", "ConfigMap", ...).
	pub fn fail_on_kind(&self, kind: &'static str) {
		self.state.lock().unwrap().fail_on_kind = Some(kind);
	}

	/// Fail `list_deployments`/`list_pods` calls.
	pub fn fail_listings(&self) {
		self.state.lock().unwrap().fail_listings = true;
	}

	fn record(&self, resource: CreatedResource) -> K8sResult<()> {
		let mut state = self.state.lock().unwrap();
		if state.fail_on_kind == Some(resource.kind()) {
			return Err(K8sError::ApiError {
				message: format!("mock failure creating {}", resource.kind()),
			});
		}
		state.created.push(resource);
		Ok(())
	}
}

#[async_trait]
impl ClusterClient for MockClusterClient {
	async fn deployment_exists(&self, name: &str) -> K8sResult<bool> {
		let state = self.state.lock().unwrap();
		Ok(state.existing_deployments.contains(name)
			|| state
				.created
				.iter()
				.any(|r| r.kind() == "Deployment" && r.name() == name))
	}

	async fn stateful_set_exists(&self, name: &str) -> K8sResult<bool> {
		let state = self.state.lock().unwrap();
		Ok(state.existing_stateful_sets.contains(name)
			|| state
				.created
				.iter()
				.any(|r| r.kind() == "StatefulSet" && r.name() == name))
	}

	async fn create_secret(&self, secret: Secret) -> K8sResult<()> {
		self.record(CreatedResource::Secret(secret))
	}

	async fn create_config_map(&self, config_map: ConfigMap) -> K8sResult<()> {
		self.record(CreatedResource::ConfigMap(config_map))
	}

	async fn create_deployment(&self, deployment: Deployment) -> K8sResult<()> {
		self.record(CreatedResource::Deployment(deployment))
	}

	async fn create_stateful_set(&self, stateful_set: StatefulSet) -> K8sResult<()> {
		self.record(CreatedResource::StatefulSet(stateful_set))
	}

	async fn create_service(&self, service: Service) -> K8sResult<()> {
		self.record(CreatedResource::Service(service))
	}

	async fn create_ingress(&self, ingress: Ingress) -> K8sResult<()> {
		self.record(CreatedResource::Ingress(ingress))
	}

	async fn create_cron_job(&self, cron_job: CronJob) -> K8sResult<()> {
		self.record(CreatedResource::CronJob(cron_job))
	}

	async fn get_deployment(&self, name: &str) -> K8sResult<Option<DeploymentSummary>> {
		let state = self.state.lock().unwrap();
		Ok(state.deployments.iter().find(|d| d.name == name).cloned())
	}

	async fn list_deployments(&self) -> K8sResult<Vec<DeploymentSummary>> {
		let state = self.state.lock().unwrap();
		if state.fail_listings {
			return Err(K8sError::ApiError {
				message: "mock listing failure".to_string(),
			});
		}
		Ok(state.deployments.clone())
	}

	async fn list_pods(&self) -> K8sResult<Vec<PodSummary>> {
		let state = self.state.lock().unwrap();
		if state.fail_listings {
			return Err(K8sError::ApiError {
				message: "mock listing failure".to_string(),
			});
		}
		Ok(state.pods.clone())
	}

	async fn latest_probe_run(&self, app: &str) -> K8sResult<Option<ProbeRun>> {
		let mut state = self.state.lock().unwrap();
		Ok(state
			.probe_runs
			.get_mut(app)
			.and_then(|queue| queue.pop_front())
			.flatten())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;

	#[tokio::test]
	async fn records_creations_in_order() {
		let mock = MockClusterClient::new();

		mock
			.create_secret(Secret {
				metadata: kube::api::ObjectMeta {
					name: Some("web1-secret".to_string()),
					..Default::default()
				},
				..Default::default()
			})
			.await
			.unwrap();
		mock
			.create_config_map(ConfigMap {
				metadata: kube::api::ObjectMeta {
					name: Some("web1-config".to_string()),
					..Default::default()
				},
				..Default::default()
			})
			.await
			.unwrap();

		assert_eq!(mock.created_kinds(), vec!["Secret", "ConfigMap"]);
		assert_eq!(mock.created()[0].name(), "web1-secret");
	}

	#[tokio::test]
	async fn scripted_failure_rejects_creation() {
		let mock = MockClusterClient::new();
		mock.fail_on_kind("Service");

		let result = mock.create_service(Service::default()).await;
		assert!(result.is_err());
		assert!(mock.created().is_empty());
	}

	#[tokio::test]
	async fn probe_runs_are_consumed_fifo() {
		let mock = MockClusterClient::new();
		mock.push_probe_run("web1", None);
		mock.push_probe_run(
			"web1",
			Some(ProbeRun {
				run_id: "web1-probe-1".to_string(),
				succeeded: true,
				finished_at: Utc::now(),
			}),
		);

		assert!(mock.latest_probe_run("web1").await.unwrap().is_none());
		assert!(mock.latest_probe_run("web1").await.unwrap().is_some());
		// exhausted queue keeps yielding None
		assert!(mock.latest_probe_run("web1").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn created_deployments_count_as_existing() {
		let mock = MockClusterClient::new();
		assert!(!mock.deployment_exists("web1-deployment").await.unwrap());

		mock
			.create_deployment(Deployment {
				metadata: kube::api::ObjectMeta {
					name: Some("web1-deployment".to_string()),
					..Default::default()
				},
				..Default::default()
			})
			.await
			.unwrap();

		assert!(mock.deployment_exists("web1-deployment").await.unwrap());
	}
}
