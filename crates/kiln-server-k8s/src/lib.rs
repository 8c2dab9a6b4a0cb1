// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! K8s client abstraction for Kiln workload provisioning.
//!
//! This crate owns the boundary to the cluster: client bootstrap
//! (kubeconfig or in-cluster), the [`ClusterClient`] trait that the
//! provisioning and query layers depend on, the real [`KubeClusterClient`]
//! implementation, and a [`MockClusterClient`] for tests.

pub mod client;
pub mod cluster;
pub mod error;
pub mod mock;

pub use client::{client_from_incluster, client_from_kubeconfig, create_client};
pub use cluster::{ClusterClient, DeploymentSummary, KubeClusterClient, PodSummary, ProbeRun};
pub use error::{K8sError, K8sResult};
pub use mock::{CreatedResource, MockClusterClient};
