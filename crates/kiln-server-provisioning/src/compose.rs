// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resource composition.
//!
//! Pure functions that turn a validated deploy request into the declarative
//! cluster objects the orchestrator submits. No I/O happens here; a composed
//! [`ResourceBundle`] is owned by exactly one provisioning attempt and never
//! mutated after composition.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, StatefulSet, StatefulSetSpec};
use k8s_openapi::api::batch::v1::{CronJob, CronJobSpec, JobSpec, JobTemplateSpec};
use k8s_openapi::api::core::v1::{
	ConfigMap, ConfigMapEnvSource, Container, ContainerPort, EnvFromSource, PersistentVolumeClaim,
	PersistentVolumeClaimSpec, PodSpec, PodTemplateSpec, ResourceRequirements, Secret,
	SecretEnvSource, Service, ServicePort, ServiceSpec, VolumeMount, VolumeResourceRequirements,
};
use k8s_openapi::api::networking::v1::{
	HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
	IngressServiceBackend, IngressSpec, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use k8s_openapi::ByteString;

use crate::naming::NamingRoot;
use crate::types::{Credential, DeployRequest, EnvironmentEntry, ManagedDeployRequest, ResourceLimits};

/// Managed databases are provisioned with one fixed image and size; the
/// request does not parameterize them.
const MANAGED_IMAGE: &str = "postgres:13-alpine";
const MANAGED_PORT: i32 = 5432;
const MANAGED_CPU: &str = "500m";
const MANAGED_RAM: &str = "1Gi";
const MANAGED_VOLUME_SIZE: &str = "1Gi";
const MANAGED_DATA_PATH: &str = "/var/lib/postgresql/data";

const PROBE_IMAGE: &str = "busybox:1.36";
const PROBE_SCHEDULE: &str = "*/1 * * * *";

/// The declarative resources for one provisioning attempt.
#[derive(Debug, Clone)]
pub struct ResourceBundle {
	pub secret: Secret,
	pub config_map: ConfigMap,
	pub workload: Workload,
	pub service: Service,
	pub ingress: Option<Ingress>,
	pub probe_job: Option<CronJob>,
}

/// The compute resource of a bundle.
#[derive(Debug, Clone)]
pub enum Workload {
	Deployment(Deployment),
	StatefulSet(StatefulSet),
}

/// Compose the bundle for a stateless workload.
pub fn compose_unmanaged(req: &DeployRequest, root: &NamingRoot, domain: &str) -> ResourceBundle {
	let (secret_data, config_data) = split_environment(&req.envs);

	ResourceBundle {
		secret: secret(root, secret_data),
		config_map: config_map(root, config_data),
		workload: Workload::Deployment(deployment(root, req)),
		service: service(root, req.service_port),
		ingress: req
			.external_access
			.then(|| ingress(root, &root.host(domain), req.service_port)),
		probe_job: req.monitor.then(|| probe_cron_job(root, req.service_port)),
	}
}

/// Compose the bundle for a managed database workload. Everything about the
/// workload itself is fixed; only environment entries and external exposure
/// come from the request.
pub fn compose_managed(
	req: &ManagedDeployRequest,
	credential: &Credential,
	root: &NamingRoot,
	domain: &str,
) -> ResourceBundle {
	// Managed requests treat every entry as plain configuration; the only
	// secret material is the generated credential.
	let config_data: BTreeMap<String, String> = req
		.envs
		.iter()
		.map(|env| (env.key.clone(), env.value.clone()))
		.collect();

	let mut secret_data = BTreeMap::new();
	secret_data.insert(
		"POSTGRES_USER".to_string(),
		ByteString(credential.username.clone().into_bytes()),
	);
	secret_data.insert(
		"POSTGRES_PASSWORD".to_string(),
		ByteString(credential.password.clone().into_bytes()),
	);

	let host = format!("postgres.{}.{domain}", credential.code);

	ResourceBundle {
		secret: secret(root, secret_data),
		config_map: config_map(root, config_data),
		workload: Workload::StatefulSet(stateful_set(root)),
		service: service(root, MANAGED_PORT),
		ingress: req
			.external_access
			.then(|| ingress(root, &host, MANAGED_PORT)),
		probe_job: None,
	}
}

/// Split environment entries into secret data and plain config data.
/// Later entries win on duplicate keys.
pub fn split_environment(
	envs: &[EnvironmentEntry],
) -> (BTreeMap<String, ByteString>, BTreeMap<String, String>) {
	let mut secret_data = BTreeMap::new();
	let mut config_data = BTreeMap::new();

	for env in envs {
		if env.is_secret {
			secret_data.insert(env.key.clone(), ByteString(env.value.clone().into_bytes()));
		} else {
			config_data.insert(env.key.clone(), env.value.clone());
		}
	}

	(secret_data, config_data)
}

fn labels(root: &NamingRoot) -> BTreeMap<String, String> {
	BTreeMap::from([("app".to_string(), root.as_str().to_string())])
}

fn metadata(name: String, root: &NamingRoot) -> ObjectMeta {
	ObjectMeta {
		name: Some(name),
		labels: Some(labels(root)),
		..Default::default()
	}
}

pub fn secret(root: &NamingRoot, data: BTreeMap<String, ByteString>) -> Secret {
	Secret {
		metadata: metadata(root.secret(), root),
		data: Some(data),
		..Default::default()
	}
}

pub fn config_map(root: &NamingRoot, data: BTreeMap<String, String>) -> ConfigMap {
	ConfigMap {
		metadata: metadata(root.config_map(), root),
		data: Some(data),
		..Default::default()
	}
}

/// Wire the application's secret and config bundles into a pod.
fn env_from(root: &NamingRoot) -> Vec<EnvFromSource> {
	vec![
		EnvFromSource {
			secret_ref: Some(SecretEnvSource {
				name: root.secret(),
				optional: Some(false),
			}),
			..Default::default()
		},
		EnvFromSource {
			config_map_ref: Some(ConfigMapEnvSource {
				name: root.config_map(),
				optional: Some(false),
			}),
			..Default::default()
		},
	]
}

fn resource_limits(limits: &ResourceLimits) -> Option<ResourceRequirements> {
	let mut quantities = BTreeMap::new();
	if !limits.cpu.is_empty() {
		quantities.insert("cpu".to_string(), Quantity(limits.cpu.clone()));
	}
	if !limits.ram.is_empty() {
		quantities.insert("memory".to_string(), Quantity(limits.ram.clone()));
	}

	if quantities.is_empty() {
		return None;
	}

	Some(ResourceRequirements {
		limits: Some(quantities),
		..Default::default()
	})
}

pub fn deployment(root: &NamingRoot, req: &DeployRequest) -> Deployment {
	let container = Container {
		name: root.as_str().to_string(),
		image: Some(format!("{}:{}", req.image_address, req.image_tag)),
		ports: Some(vec![ContainerPort {
			container_port: req.service_port,
			..Default::default()
		}]),
		env_from: Some(env_from(root)),
		resources: resource_limits(&req.resources),
		..Default::default()
	};

	Deployment {
		metadata: metadata(root.deployment(), root),
		spec: Some(DeploymentSpec {
			replicas: Some(req.replicas),
			selector: LabelSelector {
				match_labels: Some(labels(root)),
				..Default::default()
			},
			template: PodTemplateSpec {
				metadata: Some(ObjectMeta {
					labels: Some(labels(root)),
					..Default::default()
				}),
				spec: Some(PodSpec {
					containers: vec![container],
					..Default::default()
				}),
			},
			..Default::default()
		}),
		..Default::default()
	}
}

/// The managed database workload: single replica, stable network identity,
/// one persistent volume per replica.
pub fn stateful_set(root: &NamingRoot) -> StatefulSet {
	let container = Container {
		name: root.as_str().to_string(),
		image: Some(MANAGED_IMAGE.to_string()),
		ports: Some(vec![ContainerPort {
			container_port: MANAGED_PORT,
			..Default::default()
		}]),
		env_from: Some(env_from(root)),
		resources: resource_limits(&ResourceLimits {
			cpu: MANAGED_CPU.to_string(),
			ram: MANAGED_RAM.to_string(),
		}),
		volume_mounts: Some(vec![VolumeMount {
			name: "data".to_string(),
			mount_path: MANAGED_DATA_PATH.to_string(),
			..Default::default()
		}]),
		..Default::default()
	};

	StatefulSet {
		metadata: metadata(root.stateful_set(), root),
		spec: Some(StatefulSetSpec {
			replicas: Some(1),
			service_name: root.service(),
			selector: LabelSelector {
				match_labels: Some(labels(root)),
				..Default::default()
			},
			template: PodTemplateSpec {
				metadata: Some(ObjectMeta {
					labels: Some(labels(root)),
					..Default::default()
				}),
				spec: Some(PodSpec {
					containers: vec![container],
					..Default::default()
				}),
			},
			volume_claim_templates: Some(vec![PersistentVolumeClaim {
				metadata: ObjectMeta {
					name: Some("data".to_string()),
					..Default::default()
				},
				spec: Some(PersistentVolumeClaimSpec {
					access_modes: Some(vec!["ReadWriteOnce".to_string()]),
					resources: Some(VolumeResourceRequirements {
						requests: Some(BTreeMap::from([(
							"storage".to_string(),
							Quantity(MANAGED_VOLUME_SIZE.to_string()),
						)])),
						..Default::default()
					}),
					..Default::default()
				}),
				..Default::default()
			}]),
			..Default::default()
		}),
		..Default::default()
	}
}

pub fn service(root: &NamingRoot, port: i32) -> Service {
	Service {
		metadata: metadata(root.service(), root),
		spec: Some(ServiceSpec {
			selector: Some(labels(root)),
			ports: Some(vec![ServicePort {
				port,
				target_port: Some(IntOrString::Int(port)),
				..Default::default()
			}]),
			..Default::default()
		}),
		..Default::default()
	}
}

pub fn ingress(root: &NamingRoot, host: &str, port: i32) -> Ingress {
	Ingress {
		metadata: metadata(root.ingress(), root),
		spec: Some(IngressSpec {
			rules: Some(vec![IngressRule {
				host: Some(host.to_string()),
				http: Some(HTTPIngressRuleValue {
					paths: vec![HTTPIngressPath {
						path: Some("/".to_string()),
						path_type: "Prefix".to_string(),
						backend: IngressBackend {
							service: Some(IngressServiceBackend {
								name: root.service(),
								port: Some(ServiceBackendPort {
									number: Some(port),
									..Default::default()
								}),
							}),
							..Default::default()
						},
					}],
				}),
			}]),
			..Default::default()
		}),
		..Default::default()
	}
}

/// Periodic probe against the workload's service. The child Jobs inherit the
/// `app` label, which is how the health monitor finds their runs.
pub fn probe_cron_job(root: &NamingRoot, port: i32) -> CronJob {
	let probe = Container {
		name: "probe".to_string(),
		image: Some(PROBE_IMAGE.to_string()),
		command: Some(vec![
			"wget".to_string(),
			"-q".to_string(),
			"-O-".to_string(),
			format!("http://{}:{port}/", root.service()),
		]),
		..Default::default()
	};

	CronJob {
		metadata: metadata(root.probe_job(), root),
		spec: Some(CronJobSpec {
			schedule: PROBE_SCHEDULE.to_string(),
			job_template: JobTemplateSpec {
				metadata: Some(ObjectMeta {
					labels: Some(labels(root)),
					..Default::default()
				}),
				spec: Some(JobSpec {
					backoff_limit: Some(1),
					template: PodTemplateSpec {
						metadata: Some(ObjectMeta {
							labels: Some(labels(root)),
							..Default::default()
						}),
						spec: Some(PodSpec {
							containers: vec![probe],
							restart_policy: Some("Never".to_string()),
							..Default::default()
						}),
					},
					..Default::default()
				}),
			},
			..Default::default()
		}),
		..Default::default()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn entry(key: &str, value: &str, is_secret: bool) -> EnvironmentEntry {
		EnvironmentEntry {
			key: key.to_string(),
			value: value.to_string(),
			is_secret,
		}
	}

	fn request() -> DeployRequest {
		DeployRequest {
			app_name: "web1".to_string(),
			replicas: 2,
			image_address: "registry/web".to_string(),
			image_tag: "v1".to_string(),
			service_port: 8080,
			resources: ResourceLimits {
				cpu: "250m".to_string(),
				ram: "512Mi".to_string(),
			},
			envs: vec![
				entry("TOKEN", "hunter2", true),
				entry("MODE", "fast", false),
				entry("TOKEN", "hunter3", true),
				entry("COLOR", "blue", false),
			],
			monitor: false,
			external_access: false,
		}
	}

	#[test]
	fn split_routes_entries_by_secret_flag() {
		let (secret_data, config_data) = split_environment(&request().envs);

		assert_eq!(
			secret_data.keys().collect::<Vec<_>>(),
			vec![&"TOKEN".to_string()]
		);
		assert_eq!(
			config_data.keys().collect::<Vec<_>>(),
			vec![&"COLOR".to_string(), &"MODE".to_string()]
		);
	}

	#[test]
	fn split_is_last_write_wins() {
		let (secret_data, _) = split_environment(&request().envs);
		assert_eq!(
			secret_data.get("TOKEN"),
			Some(&ByteString(b"hunter3".to_vec()))
		);
	}

	#[test]
	fn unmanaged_bundle_names_and_labels_share_the_root() {
		let req = request();
		let root = NamingRoot::unmanaged(&req.app_name);
		let bundle = compose_unmanaged(&req, &root, "kiln.local");

		assert_eq!(bundle.secret.metadata.name.as_deref(), Some("web1-secret"));
		assert_eq!(
			bundle.config_map.metadata.name.as_deref(),
			Some("web1-config")
		);
		assert_eq!(bundle.service.metadata.name.as_deref(), Some("web1-service"));

		let Workload::Deployment(deployment) = &bundle.workload else {
			panic!("unmanaged bundle must carry a Deployment");
		};
		assert_eq!(
			deployment.metadata.name.as_deref(),
			Some("web1-deployment")
		);
		assert_eq!(
			deployment
				.metadata
				.labels
				.as_ref()
				.and_then(|l| l.get("app"))
				.map(String::as_str),
			Some("web1")
		);

		// neither flag set: no conditional resources
		assert!(bundle.ingress.is_none());
		assert!(bundle.probe_job.is_none());
	}

	#[test]
	fn unmanaged_deployment_carries_request_parameters() {
		let req = request();
		let root = NamingRoot::unmanaged(&req.app_name);
		let bundle = compose_unmanaged(&req, &root, "kiln.local");

		let Workload::Deployment(deployment) = bundle.workload else {
			panic!("expected deployment");
		};
		let spec = deployment.spec.unwrap();
		assert_eq!(spec.replicas, Some(2));

		let container = &spec.template.spec.as_ref().unwrap().containers[0];
		assert_eq!(container.image.as_deref(), Some("registry/web:v1"));
		assert_eq!(container.ports.as_ref().unwrap()[0].container_port, 8080);

		let limits = container.resources.as_ref().unwrap().limits.as_ref().unwrap();
		assert_eq!(limits.get("cpu"), Some(&Quantity("250m".to_string())));
		assert_eq!(limits.get("memory"), Some(&Quantity("512Mi".to_string())));
	}

	#[test]
	fn external_access_adds_ingress_with_derived_host() {
		let mut req = request();
		req.external_access = true;
		let root = NamingRoot::unmanaged(&req.app_name);
		let bundle = compose_unmanaged(&req, &root, "kiln.local");

		let ingress = bundle.ingress.unwrap();
		let rules = ingress.spec.unwrap().rules.unwrap();
		assert_eq!(rules[0].host.as_deref(), Some("web1.kiln.local"));

		let backend = &rules[0].http.as_ref().unwrap().paths[0].backend;
		assert_eq!(
			backend.service.as_ref().unwrap().name,
			"web1-service".to_string()
		);
	}

	#[test]
	fn monitor_adds_probe_cron_job_on_fixed_schedule() {
		let mut req = request();
		req.monitor = true;
		let root = NamingRoot::unmanaged(&req.app_name);
		let bundle = compose_unmanaged(&req, &root, "kiln.local");

		let cron_job = bundle.probe_job.unwrap();
		assert_eq!(cron_job.metadata.name.as_deref(), Some("web1-probe"));

		let spec = cron_job.spec.unwrap();
		assert_eq!(spec.schedule, "*/1 * * * *");

		// child jobs must carry the app label for run harvesting
		assert_eq!(
			spec
				.job_template
				.metadata
				.as_ref()
				.and_then(|m| m.labels.as_ref())
				.and_then(|l| l.get("app"))
				.map(String::as_str),
			Some("web1")
		);

		let probe = &spec
			.job_template
			.spec
			.as_ref()
			.unwrap()
			.template
			.spec
			.as_ref()
			.unwrap()
			.containers[0];
		assert_eq!(
			probe.command.as_ref().unwrap().last().unwrap(),
			"http://web1-service:8080/"
		);
	}

	#[test]
	fn managed_bundle_is_fixed_single_replica_postgres() {
		let credential = Credential {
			code: "a1b2c3d4".to_string(),
			username: "user-a1b2c3d4".to_string(),
			password: "pw".to_string(),
		};
		let root = NamingRoot::managed(&credential.code);
		let req = ManagedDeployRequest {
			envs: vec![entry("POSTGRES_DB", "app", false)],
			external_access: false,
		};
		let bundle = compose_managed(&req, &credential, &root, "kiln.local");

		let Workload::StatefulSet(stateful_set) = bundle.workload else {
			panic!("managed bundle must carry a StatefulSet");
		};
		let spec = stateful_set.spec.unwrap();
		assert_eq!(spec.replicas, Some(1));
		assert_eq!(spec.service_name, "postgres-a1b2c3d4-service");
		assert_eq!(spec.volume_claim_templates.as_ref().unwrap().len(), 1);

		let container = &spec.template.spec.as_ref().unwrap().containers[0];
		assert_eq!(container.image.as_deref(), Some("postgres:13-alpine"));
		assert_eq!(container.ports.as_ref().unwrap()[0].container_port, 5432);

		// all request entries land in the config bundle, none in the secret
		let config_data = bundle.config_map.data.unwrap();
		assert_eq!(config_data.get("POSTGRES_DB"), Some(&"app".to_string()));

		let secret_data = bundle.secret.data.unwrap();
		assert_eq!(
			secret_data.get("POSTGRES_USER"),
			Some(&ByteString(b"user-a1b2c3d4".to_vec()))
		);
		assert!(secret_data.contains_key("POSTGRES_PASSWORD"));
	}

	#[test]
	fn managed_external_access_uses_postgres_hostname() {
		let credential = Credential {
			code: "a1b2c3d4".to_string(),
			username: "user-a1b2c3d4".to_string(),
			password: "pw".to_string(),
		};
		let root = NamingRoot::managed(&credential.code);
		let req = ManagedDeployRequest {
			envs: Vec::new(),
			external_access: true,
		};
		let bundle = compose_managed(&req, &credential, &root, "kiln.local");

		let ingress = bundle.ingress.unwrap();
		let rules = ingress.spec.unwrap().rules.unwrap();
		assert_eq!(
			rules[0].host.as_deref(),
			Some("postgres.a1b2c3d4.kiln.local")
		);
	}

	#[test]
	fn empty_resource_limits_are_omitted() {
		assert!(resource_limits(&ResourceLimits::default()).is_none());
	}
}
