// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cluster client boundary.
//!
//! `ClusterClient` is the seam between the provisioning logic and the
//! Kubernetes API: every cluster interaction the server performs is a method
//! here, so tests can substitute [`crate::mock::MockClusterClient`] without a
//! cluster.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{ConfigMap, Pod, Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{Api, ListParams, PostParams};
use kube::Client;

use crate::error::K8sResult;

/// Replica state of one workload, as reported by the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentSummary {
	pub name: String,
	pub replicas: i32,
	pub ready_replicas: i32,
}

/// Runtime state of one pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodSummary {
	pub name: String,
	pub phase: String,
	pub host_ip: String,
	pub pod_ip: String,
	pub started_at: Option<DateTime<Utc>>,
	pub labels: BTreeMap<String, String>,
}

/// One finished run of a probe job. `run_id` is the child Job object's name,
/// unique per scheduled run, and is the monitor's de-duplication key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRun {
	pub run_id: String,
	pub succeeded: bool,
	pub finished_at: DateTime<Utc>,
}

/// Everything the server asks of the cluster.
#[async_trait]
pub trait ClusterClient: Send + Sync {
	async fn deployment_exists(&self, name: &str) -> K8sResult<bool>;
	async fn stateful_set_exists(&self, name: &str) -> K8sResult<bool>;

	async fn create_secret(&self, secret: Secret) -> K8sResult<()>;
	async fn create_config_map(&self, config_map: ConfigMap) -> K8sResult<()>;
	async fn create_deployment(&self, deployment: Deployment) -> K8sResult<()>;
	async fn create_stateful_set(&self, stateful_set: StatefulSet) -> K8sResult<()>;
	async fn create_service(&self, service: Service) -> K8sResult<()>;
	async fn create_ingress(&self, ingress: Ingress) -> K8sResult<()>;
	async fn create_cron_job(&self, cron_job: CronJob) -> K8sResult<()>;

	async fn get_deployment(&self, name: &str) -> K8sResult<Option<DeploymentSummary>>;
	async fn list_deployments(&self) -> K8sResult<Vec<DeploymentSummary>>;
	async fn list_pods(&self) -> K8sResult<Vec<PodSummary>>;

	/// The most recent finished run of the probe job labeled `app=<app>`,
	/// or `None` when no run has finished yet.
	async fn latest_probe_run(&self, app: &str) -> K8sResult<Option<ProbeRun>>;
}

/// `ClusterClient` implementation over a real `kube::Client`, scoped to one
/// namespace.
#[derive(Clone)]
pub struct KubeClusterClient {
	client: Client,
	namespace: String,
}

impl KubeClusterClient {
	pub fn new(client: Client, namespace: impl Into<String>) -> Self {
		Self {
			client,
			namespace: namespace.into(),
		}
	}

	pub fn namespace(&self) -> &str {
		&self.namespace
	}

	fn api<K>(&self) -> Api<K>
	where
		K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
		K::DynamicType: Default,
		K: serde::de::DeserializeOwned + Clone + std::fmt::Debug,
	{
		Api::namespaced(self.client.clone(), &self.namespace)
	}
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
	async fn deployment_exists(&self, name: &str) -> K8sResult<bool> {
		let deployments: Api<Deployment> = self.api();
		Ok(deployments.get_opt(name).await?.is_some())
	}

	async fn stateful_set_exists(&self, name: &str) -> K8sResult<bool> {
		let stateful_sets: Api<StatefulSet> = self.api();
		Ok(stateful_sets.get_opt(name).await?.is_some())
	}

	async fn create_secret(&self, secret: Secret) -> K8sResult<()> {
		let secrets: Api<Secret> = self.api();
		secrets.create(&PostParams::default(), &secret).await?;
		Ok(())
	}

	async fn create_config_map(&self, config_map: ConfigMap) -> K8sResult<()> {
		let config_maps: Api<ConfigMap> = self.api();
		config_maps
			.create(&PostParams::default(), &config_map)
			.await?;
		Ok(())
	}

	async fn create_deployment(&self, deployment: Deployment) -> K8sResult<()> {
		let deployments: Api<Deployment> = self.api();
		deployments
			.create(&PostParams::default(), &deployment)
			.await?;
		Ok(())
	}

	async fn create_stateful_set(&self, stateful_set: StatefulSet) -> K8sResult<()> {
		let stateful_sets: Api<StatefulSet> = self.api();
		stateful_sets
			.create(&PostParams::default(), &stateful_set)
			.await?;
		Ok(())
	}

	async fn create_service(&self, service: Service) -> K8sResult<()> {
		let services: Api<Service> = self.api();
		services.create(&PostParams::default(), &service).await?;
		Ok(())
	}

	async fn create_ingress(&self, ingress: Ingress) -> K8sResult<()> {
		let ingresses: Api<Ingress> = self.api();
		ingresses.create(&PostParams::default(), &ingress).await?;
		Ok(())
	}

	async fn create_cron_job(&self, cron_job: CronJob) -> K8sResult<()> {
		let cron_jobs: Api<CronJob> = self.api();
		cron_jobs.create(&PostParams::default(), &cron_job).await?;
		Ok(())
	}

	async fn get_deployment(&self, name: &str) -> K8sResult<Option<DeploymentSummary>> {
		let deployments: Api<Deployment> = self.api();
		Ok(deployments.get_opt(name).await?.map(deployment_summary))
	}

	async fn list_deployments(&self) -> K8sResult<Vec<DeploymentSummary>> {
		let deployments: Api<Deployment> = self.api();
		let list = deployments.list(&ListParams::default()).await?;
		Ok(list.items.into_iter().map(deployment_summary).collect())
	}

	async fn list_pods(&self) -> K8sResult<Vec<PodSummary>> {
		let pods: Api<Pod> = self.api();
		let list = pods.list(&ListParams::default()).await?;
		Ok(list.items.into_iter().map(pod_summary).collect())
	}

	async fn latest_probe_run(&self, app: &str) -> K8sResult<Option<ProbeRun>> {
		let jobs: Api<Job> = self.api();
		let list = jobs
			.list(&ListParams::default().labels(&format!("app={app}")))
			.await?;

		Ok(list
			.items
			.into_iter()
			.filter_map(probe_run)
			.max_by_key(|run| run.finished_at))
	}
}

fn deployment_summary(deployment: Deployment) -> DeploymentSummary {
	let status = deployment.status.unwrap_or_default();
	DeploymentSummary {
		name: deployment.metadata.name.unwrap_or_default(),
		replicas: status.replicas.unwrap_or(0),
		ready_replicas: status.ready_replicas.unwrap_or(0),
	}
}

fn pod_summary(pod: Pod) -> PodSummary {
	let status = pod.status.unwrap_or_default();
	PodSummary {
		name: pod.metadata.name.unwrap_or_default(),
		phase: status.phase.unwrap_or_default(),
		host_ip: status.host_ip.unwrap_or_default(),
		pod_ip: status.pod_ip.unwrap_or_default(),
		started_at: status.start_time.map(|t| t.0),
		labels: pod.metadata.labels.unwrap_or_default(),
	}
}

/// Classify a Job object as a finished probe run, or `None` while it is
/// still running.
fn probe_run(job: Job) -> Option<ProbeRun> {
	let name = job.metadata.name?;
	let status = job.status?;

	if status.succeeded.unwrap_or(0) > 0 {
		let finished_at = status
			.completion_time
			.map(|t| t.0)
			.or_else(|| status.start_time.as_ref().map(|t| t.0))?;
		return Some(ProbeRun {
			run_id: name,
			succeeded: true,
			finished_at,
		});
	}

	let failed = status
		.conditions
		.as_ref()
		.is_some_and(|conditions| {
			conditions
				.iter()
				.any(|c| c.type_ == "Failed" && c.status == "True")
		});
	if failed {
		let finished_at = status
			.conditions
			.unwrap_or_default()
			.into_iter()
			.find(|c| c.type_ == "Failed" && c.status == "True")
			.and_then(|c| c.last_transition_time.map(|t| t.0))
			.or_else(|| status.start_time.map(|t| t.0))?;
		return Some(ProbeRun {
			run_id: name,
			succeeded: false,
			finished_at,
		});
	}

	None
}

#[cfg(test)]
mod tests {
	use super::*;
	use k8s_openapi::api::batch::v1::JobStatus;
	use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

	fn job(name: &str, status: JobStatus) -> Job {
		Job {
			metadata: kube::api::ObjectMeta {
				name: Some(name.to_string()),
				..Default::default()
			},
			status: Some(status),
			..Default::default()
		}
	}

	#[test]
	fn succeeded_job_classifies_as_success() {
		let now = Utc::now();
		let run = probe_run(job(
			"web1-probe-1",
			JobStatus {
				succeeded: Some(1),
				completion_time: Some(Time(now)),
				..Default::default()
			},
		))
		.unwrap();

		assert_eq!(run.run_id, "web1-probe-1");
		assert!(run.succeeded);
		assert_eq!(run.finished_at, now);
	}

	#[test]
	fn failed_job_classifies_as_failure() {
		let now = Utc::now();
		let run = probe_run(job(
			"web1-probe-2",
			JobStatus {
				failed: Some(3),
				conditions: Some(vec![k8s_openapi::api::batch::v1::JobCondition {
					type_: "Failed".to_string(),
					status: "True".to_string(),
					last_transition_time: Some(Time(now)),
					..Default::default()
				}]),
				..Default::default()
			},
		))
		.unwrap();

		assert!(!run.succeeded);
		assert_eq!(run.finished_at, now);
	}

	#[test]
	fn running_job_is_not_a_run() {
		let run = probe_run(job(
			"web1-probe-3",
			JobStatus {
				active: Some(1),
				start_time: Some(Time(Utc::now())),
				..Default::default()
			},
		));

		assert!(run.is_none());
	}
}
