// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Kubernetes client bootstrap.
//!
//! Builds a `kube::Client` from an explicit kubeconfig path, the default
//! kubeconfig resolution (`KUBECONFIG`, then `~/.kube/config`), or the
//! in-cluster service account.

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};

use crate::error::{K8sError, K8sResult};

/// Create a client from an explicit kubeconfig file.
pub async fn client_from_kubeconfig(path: &str) -> K8sResult<Client> {
	let kubeconfig = Kubeconfig::read_from(path).map_err(|e| K8sError::InvalidKubeconfig {
		message: format!("failed to read kubeconfig {path}: {e}"),
	})?;

	let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
		.await
		.map_err(|e| K8sError::InvalidKubeconfig {
			message: format!("failed to build config from {path}: {e}"),
		})?;

	Client::try_from(config).map_err(|e| K8sError::InvalidKubeconfig {
		message: format!("failed to create client: {e}"),
	})
}

/// Create a client from the in-cluster service account.
pub async fn client_from_incluster() -> K8sResult<Client> {
	let config = Config::incluster().map_err(|e| K8sError::InvalidKubeconfig {
		message: format!("failed to get in-cluster config: {e}"),
	})?;

	Client::try_from(config).map_err(|e| K8sError::InvalidKubeconfig {
		message: format!("failed to create client: {e}"),
	})
}

/// Create a client using the requested strategy.
///
/// `in_cluster` takes the service-account path; an explicit `kubeconfig`
/// path is read directly; otherwise the default kube client inference
/// applies (environment, then local kubeconfig, then in-cluster).
pub async fn create_client(kubeconfig: Option<&str>, in_cluster: bool) -> K8sResult<Client> {
	if in_cluster {
		tracing::debug!("creating in-cluster kubernetes client");
		return client_from_incluster().await;
	}

	if let Some(path) = kubeconfig {
		tracing::debug!(path, "creating kubernetes client from kubeconfig");
		return client_from_kubeconfig(path).await;
	}

	tracing::debug!("creating kubernetes client with default inference");
	Client::try_default()
		.await
		.map_err(|e| K8sError::InvalidKubeconfig {
			message: format!("failed to infer client config: {e}"),
		})
}
