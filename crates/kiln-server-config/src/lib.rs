// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Centralized configuration management for Kiln server.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`KILN_SERVER_*`)
//!
//! # Usage
//!
//! ```ignore
//! use kiln_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("Server listening on {}:{}", config.http.host, config.http.port);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub database: DatabaseConfig,
	pub kubernetes: KubernetesConfig,
	pub provisioner: ProvisionerConfig,
	pub logging: LoggingConfig,
}

impl ServerConfig {
	/// Get the socket address string for binding.
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`KILN_SERVER_*`)
/// 2. Config file (`/etc/kiln/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration from environment only (for testing or simple deployments).
pub fn load_config_from_env() -> Result<ServerConfig, ConfigError> {
	let mut merged = ServerConfigLayer::default();
	merged.merge(EnvSource.load()?);
	finalize(merged)
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let http = layer.http.unwrap_or_default().finalize();
	let database = layer.database.unwrap_or_default().finalize();
	let kubernetes = layer.kubernetes.unwrap_or_default().finalize();
	let provisioner = layer.provisioner.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	validate_config(&kubernetes, &provisioner)?;

	info!(
		host = %http.host,
		port = http.port,
		database = %database.url,
		namespace = %kubernetes.namespace,
		in_cluster = kubernetes.in_cluster,
		domain = %provisioner.domain,
		"Server configuration loaded"
	);

	Ok(ServerConfig {
		http,
		database,
		kubernetes,
		provisioner,
		logging,
	})
}

/// Validate cross-field configuration rules.
fn validate_config(
	kubernetes: &KubernetesConfig,
	provisioner: &ProvisionerConfig,
) -> Result<(), ConfigError> {
	if kubernetes.in_cluster && kubernetes.kubeconfig.is_some() {
		return Err(ConfigError::Validation(
			"KILN_SERVER_K8S_IN_CLUSTER and KILN_SERVER_KUBECONFIG are mutually exclusive. \
			 Remove one of them."
				.to_string(),
		));
	}

	if provisioner.platform_timeout_secs == 0 {
		return Err(ConfigError::Validation(
			"provisioner.platform_timeout_secs must be greater than zero".to_string(),
		));
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_in_cluster_with_kubeconfig_rejected() {
		let kubernetes = KubernetesConfig {
			in_cluster: true,
			kubeconfig: Some("/home/op/.kube/config".to_string()),
			..Default::default()
		};
		let result = validate_config(&kubernetes, &ProvisionerConfig::default());
		assert!(result.is_err());
		assert!(result
			.unwrap_err()
			.to_string()
			.contains("mutually exclusive"));
	}

	#[test]
	fn test_zero_platform_timeout_rejected() {
		let provisioner = ProvisionerConfig {
			platform_timeout_secs: 0,
			..Default::default()
		};
		let result = validate_config(&KubernetesConfig::default(), &provisioner);
		assert!(result.is_err());
	}

	#[test]
	fn test_defaults_resolve() {
		let config = finalize(ServerConfigLayer::default()).unwrap();
		assert_eq!(config.http.port, 8080);
		assert_eq!(config.database.url, "sqlite:./kiln.db");
		assert_eq!(config.kubernetes.namespace, "default");
		assert_eq!(config.provisioner.domain, "kiln.local");
	}

	#[test]
	fn test_socket_addr() {
		let config = ServerConfig {
			http: HttpConfig {
				host: "127.0.0.1".to_string(),
				port: 9000,
			},
			..Default::default()
		};
		assert_eq!(config.socket_addr(), "127.0.0.1:9000");
	}
}
