// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Kubernetes client configuration section.

use serde::Deserialize;

/// Kubernetes configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct KubernetesConfig {
	/// Namespace every provisioned resource is created in.
	pub namespace: String,
	/// Explicit kubeconfig path. When unset, the default kubeconfig
	/// resolution applies (`KUBECONFIG`, then `~/.kube/config`).
	pub kubeconfig: Option<String>,
	/// Use the in-cluster service account instead of a kubeconfig.
	pub in_cluster: bool,
}

impl Default for KubernetesConfig {
	fn default() -> Self {
		Self {
			namespace: "default".to_string(),
			kubeconfig: None,
			in_cluster: false,
		}
	}
}

/// Kubernetes configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KubernetesConfigLayer {
	#[serde(default)]
	pub namespace: Option<String>,
	#[serde(default)]
	pub kubeconfig: Option<String>,
	#[serde(default)]
	pub in_cluster: Option<bool>,
}

impl KubernetesConfigLayer {
	pub fn merge(&mut self, other: KubernetesConfigLayer) {
		if other.namespace.is_some() {
			self.namespace = other.namespace;
		}
		if other.kubeconfig.is_some() {
			self.kubeconfig = other.kubeconfig;
		}
		if other.in_cluster.is_some() {
			self.in_cluster = other.in_cluster;
		}
	}

	pub fn finalize(self) -> KubernetesConfig {
		KubernetesConfig {
			namespace: self.namespace.unwrap_or_else(|| "default".to_string()),
			kubeconfig: self.kubeconfig,
			in_cluster: self.in_cluster.unwrap_or(false),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = KubernetesConfigLayer::default().finalize();
		assert_eq!(config.namespace, "default");
		assert!(config.kubeconfig.is_none());
		assert!(!config.in_cluster);
	}

	#[test]
	fn test_merge_preserves_base_when_overlay_is_none() {
		let mut base = KubernetesConfigLayer {
			namespace: Some("workloads".to_string()),
			kubeconfig: Some("/etc/kiln/kubeconfig".to_string()),
			in_cluster: None,
		};
		base.merge(KubernetesConfigLayer::default());
		assert_eq!(base.namespace, Some("workloads".to_string()));
		assert_eq!(base.kubeconfig, Some("/etc/kiln/kubeconfig".to_string()));
	}
}
