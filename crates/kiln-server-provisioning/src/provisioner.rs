// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provisioning orchestrator.
//!
//! Submits a composed [`ResourceBundle`](crate::compose::ResourceBundle) to
//! the cluster as a forward-only sequence: the first failing step ends the
//! request and earlier resources are left in place (no rollback). Two things
//! guard the sequence: a per-name lock closes the gap between the existence
//! check and the first creation, and every cluster call runs under its own
//! deadline so a hung platform call cannot pin the request handler.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use kiln_server_db::HealthRepository;
use kiln_server_k8s::{ClusterClient, K8sResult};
use tokio::sync::Mutex;
use tracing::instrument;

use crate::compose::{self, Workload};
use crate::credentials;
use crate::error::ProvisionError;
use crate::monitor::{HealthMonitor, MonitorSupervisor};
use crate::naming::NamingRoot;
use crate::types::{
	Credential, DeployRequest, ManagedDeployRequest, ManagedDeployment, ProvisionerSettings,
};

/// Serializes provisioning per naming root. Two concurrent requests for the
/// same name cannot both pass the existence check.
#[derive(Clone, Default)]
struct NameLocks {
	locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl NameLocks {
	async fn acquire(&self, name: &str) -> tokio::sync::OwnedMutexGuard<()> {
		let lock = {
			let mut locks = self.locks.lock().await;
			Arc::clone(locks.entry(name.to_string()).or_default())
		};
		lock.lock_owned().await
	}
}

pub struct Provisioner {
	cluster: Arc<dyn ClusterClient>,
	records: HealthRepository,
	monitors: Arc<MonitorSupervisor>,
	settings: ProvisionerSettings,
	locks: NameLocks,
}

impl Provisioner {
	pub fn new(
		cluster: Arc<dyn ClusterClient>,
		records: HealthRepository,
		monitors: Arc<MonitorSupervisor>,
		settings: ProvisionerSettings,
	) -> Self {
		Self {
			cluster,
			records,
			monitors,
			settings,
			locks: NameLocks::default(),
		}
	}

	/// Run one cluster call under the configured deadline, tagging failures
	/// with the step name for server-side logs.
	async fn step<T, F>(&self, step: &'static str, fut: F) -> Result<T, ProvisionError>
	where
		F: Future<Output = K8sResult<T>>,
	{
		match tokio::time::timeout(self.settings.platform_timeout, fut).await {
			Ok(Ok(value)) => Ok(value),
			Ok(Err(e)) => {
				tracing::error!(step, error = %e, "provisioning step failed");
				Err(ProvisionError::Step { step, source: e })
			}
			Err(_) => {
				tracing::error!(step, "provisioning step timed out");
				Err(ProvisionError::StepTimeout { step })
			}
		}
	}

	/// Submit whichever workload kind the composer produced.
	async fn create_workload(&self, workload: Workload) -> Result<(), ProvisionError> {
		match workload {
			Workload::Deployment(deployment) => {
				self
					.step(
						"create workload",
						self.cluster.create_deployment(deployment),
					)
					.await
			}
			Workload::StatefulSet(stateful_set) => {
				self
					.step(
						"create workload",
						self.cluster.create_stateful_set(stateful_set),
					)
					.await
			}
		}
	}

	/// Provision a stateless workload. Returns the client-visible message
	/// naming the reachable endpoint.
	#[instrument(skip(self, req), fields(app = %req.app_name))]
	pub async fn deploy_unmanaged(&self, req: &DeployRequest) -> Result<String, ProvisionError> {
		let root = NamingRoot::unmanaged(&req.app_name);
		let _guard = self.locks.acquire(root.as_str()).await;

		if self
			.step(
				"existence check",
				self.cluster.deployment_exists(&root.deployment()),
			)
			.await?
		{
			return Err(ProvisionError::AlreadyExists {
				name: root.as_str().to_string(),
			});
		}

		let bundle = compose::compose_unmanaged(req, &root, &self.settings.domain);

		self
			.step("create secret", self.cluster.create_secret(bundle.secret))
			.await?;
		self
			.step(
				"create config",
				self.cluster.create_config_map(bundle.config_map),
			)
			.await?;
		self.create_workload(bundle.workload).await?;
		self
			.step("create service", self.cluster.create_service(bundle.service))
			.await?;

		if let Some(probe_job) = bundle.probe_job {
			self
				.step("create probe job", self.cluster.create_cron_job(probe_job))
				.await?;

			// Fire-and-forget from the caller's point of view: the monitor's
			// outcome never affects this response.
			let monitor = HealthMonitor::new(
				root.as_str(),
				Arc::clone(&self.cluster),
				self.records.clone(),
			);
			self
				.monitors
				.start_monitor(monitor, self.settings.monitor_poll_interval)
				.await;
		}

		if let Some(ingress) = bundle.ingress {
			self
				.step("create ingress", self.cluster.create_ingress(ingress))
				.await?;
			return Ok(format!(
				"for external access, domain address is: {}",
				root.host(&self.settings.domain)
			));
		}

		Ok(format!(
			"for internal access, service name is: {}",
			root.service()
		))
	}

	/// Provision a managed database workload. The generated credential is
	/// both embedded in the cluster Secret and echoed to the caller.
	#[instrument(skip(self, req))]
	pub async fn deploy_managed(
		&self,
		req: &ManagedDeployRequest,
	) -> Result<ManagedDeployment, ProvisionError> {
		let code = credentials::generate_identifier_code();
		let credential = Credential::generate(&code)?;
		let root = NamingRoot::managed(&code);
		let _guard = self.locks.acquire(root.as_str()).await;

		// A code collision fails the request rather than overwriting the
		// existing workload's resources.
		if self
			.step(
				"existence check",
				self.cluster.stateful_set_exists(&root.stateful_set()),
			)
			.await?
		{
			return Err(ProvisionError::AlreadyExists {
				name: root.as_str().to_string(),
			});
		}

		let bundle = compose::compose_managed(req, &credential, &root, &self.settings.domain);

		self
			.step("create secret", self.cluster.create_secret(bundle.secret))
			.await?;
		self
			.step(
				"create config",
				self.cluster.create_config_map(bundle.config_map),
			)
			.await?;
		self
			.step("create service", self.cluster.create_service(bundle.service))
			.await?;
		self.create_workload(bundle.workload).await?;

		let message = if let Some(ingress) = bundle.ingress {
			self
				.step("create ingress", self.cluster.create_ingress(ingress))
				.await?;
			format!(
				"for external access, domain name is: postgres.{code}.{}",
				self.settings.domain
			)
		} else {
			format!("for internal access, service name is: {}", root.service())
		};

		Ok(ManagedDeployment {
			username: credential.username,
			password: credential.password,
			message,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use kiln_server_db::testing::create_health_test_pool;
	use kiln_server_k8s::{CreatedResource, MockClusterClient};

	use crate::types::{EnvironmentEntry, ResourceLimits};

	async fn provisioner_with(mock: &MockClusterClient) -> Provisioner {
		let pool = create_health_test_pool().await;
		Provisioner::new(
			Arc::new(mock.clone()),
			HealthRepository::new(pool),
			Arc::new(MonitorSupervisor::new()),
			ProvisionerSettings::default(),
		)
	}

	fn request() -> DeployRequest {
		DeployRequest {
			app_name: "web1".to_string(),
			replicas: 2,
			image_address: "registry/web".to_string(),
			image_tag: "v1".to_string(),
			service_port: 8080,
			resources: ResourceLimits::default(),
			envs: vec![EnvironmentEntry {
				key: "MODE".to_string(),
				value: "fast".to_string(),
				is_secret: false,
			}],
			monitor: false,
			external_access: false,
		}
	}

	#[tokio::test]
	async fn unmanaged_creates_resources_in_fixed_order() {
		let mock = MockClusterClient::new();
		let provisioner = provisioner_with(&mock).await;

		let message = provisioner.deploy_unmanaged(&request()).await.unwrap();

		assert_eq!(
			mock.created_kinds(),
			vec!["Secret", "ConfigMap", "Deployment", "Service"]
		);
		assert_eq!(message, "for internal access, service name is: web1-service");
	}

	#[tokio::test]
	async fn unmanaged_with_all_flags_appends_probe_then_ingress() {
		let mock = MockClusterClient::new();
		let provisioner = provisioner_with(&mock).await;

		let mut req = request();
		req.monitor = true;
		req.external_access = true;

		let message = provisioner.deploy_unmanaged(&req).await.unwrap();

		assert_eq!(
			mock.created_kinds(),
			vec![
				"Secret",
				"ConfigMap",
				"Deployment",
				"Service",
				"CronJob",
				"Ingress"
			]
		);
		assert_eq!(
			message,
			"for external access, domain address is: web1.kiln.local"
		);
	}

	#[tokio::test]
	async fn failure_at_step_k_stops_the_sequence() {
		let mock = MockClusterClient::new();
		mock.fail_on_kind("ConfigMap");
		let provisioner = provisioner_with(&mock).await;

		let err = provisioner.deploy_unmanaged(&request()).await.unwrap_err();

		assert!(matches!(
			err,
			ProvisionError::Step {
				step: "create config",
				..
			}
		));
		// the secret was created and is left in place; nothing after the
		// failing step was attempted
		assert_eq!(mock.created_kinds(), vec!["Secret"]);
	}

	#[tokio::test]
	async fn existing_name_conflicts_before_any_creation() {
		let mock = MockClusterClient::new();
		mock.add_existing_deployment("web1-deployment");
		let provisioner = provisioner_with(&mock).await;

		let err = provisioner.deploy_unmanaged(&request()).await.unwrap_err();

		assert!(matches!(err, ProvisionError::AlreadyExists { name } if name == "web1"));
		assert!(mock.created().is_empty());
	}

	#[tokio::test]
	async fn app_name_is_normalized_to_lowercase() {
		let mock = MockClusterClient::new();
		let provisioner = provisioner_with(&mock).await;

		let mut req = request();
		req.app_name = "Web1".to_string();

		let message = provisioner.deploy_unmanaged(&req).await.unwrap();
		assert_eq!(message, "for internal access, service name is: web1-service");
		assert_eq!(mock.created()[0].name(), "web1-secret");
	}

	#[tokio::test]
	async fn monitor_flag_starts_a_supervised_monitor() {
		let mock = MockClusterClient::new();
		let pool = create_health_test_pool().await;
		let monitors = Arc::new(MonitorSupervisor::new());
		let provisioner = Provisioner::new(
			Arc::new(mock.clone()),
			HealthRepository::new(pool),
			Arc::clone(&monitors),
			ProvisionerSettings::default(),
		);

		let mut req = request();
		req.monitor = true;
		provisioner.deploy_unmanaged(&req).await.unwrap();

		assert_eq!(monitors.monitor_count().await, 1);
		monitors.shutdown().await;
	}

	#[tokio::test]
	async fn managed_creates_service_before_workload() {
		let mock = MockClusterClient::new();
		let provisioner = provisioner_with(&mock).await;

		let outcome = provisioner
			.deploy_managed(&ManagedDeployRequest::default())
			.await
			.unwrap();

		assert_eq!(
			mock.created_kinds(),
			vec!["Secret", "ConfigMap", "Service", "StatefulSet"]
		);
		assert!(outcome
			.message
			.starts_with("for internal access, service name is: postgres-"));
	}

	#[tokio::test]
	async fn managed_response_echoes_the_secret_credentials() {
		let mock = MockClusterClient::new();
		let provisioner = provisioner_with(&mock).await;

		let outcome = provisioner
			.deploy_managed(&ManagedDeployRequest::default())
			.await
			.unwrap();

		let created = mock.created();
		let CreatedResource::Secret(secret) = &created[0] else {
			panic!("first resource must be the secret");
		};
		let data = secret.data.as_ref().unwrap();

		assert_eq!(
			data.get("POSTGRES_USER").unwrap().0,
			outcome.username.as_bytes()
		);
		assert_eq!(
			data.get("POSTGRES_PASSWORD").unwrap().0,
			outcome.password.as_bytes()
		);
		assert!(outcome.username.starts_with("user-"));
		assert_eq!(outcome.password.len(), 10);
	}

	#[tokio::test]
	async fn managed_external_access_appends_ingress_and_hostname() {
		let mock = MockClusterClient::new();
		let provisioner = provisioner_with(&mock).await;

		let outcome = provisioner
			.deploy_managed(&ManagedDeployRequest {
				envs: Vec::new(),
				external_access: true,
			})
			.await
			.unwrap();

		assert_eq!(
			mock.created_kinds(),
			vec!["Secret", "ConfigMap", "Service", "StatefulSet", "Ingress"]
		);
		assert!(outcome
			.message
			.starts_with("for external access, domain name is: postgres."));
		assert!(outcome.message.ends_with(".kiln.local"));
	}
}
