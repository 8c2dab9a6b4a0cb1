// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provisioner error types.

use kiln_server_db::DbError;
use kiln_server_k8s::K8sError;

/// Errors that can occur during workload provisioning operations.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
	/// A workload with the same naming root is already provisioned.
	#[error("Workload already exists: {name}")]
	AlreadyExists { name: String },

	/// Queried deployment does not exist.
	#[error("Deployment not found: {name}")]
	NotFound { name: String },

	/// Password generation was asked for an empty character alphabet.
	#[error("Password generation requires at least one character class")]
	EmptyAlphabet,

	/// A cluster call failed; the step is logged server-side only.
	#[error("Cluster error during {step}: {source}")]
	Step {
		step: &'static str,
		#[source]
		source: K8sError,
	},

	/// A cluster call exceeded its deadline.
	#[error("Cluster operation timed out during {step}")]
	StepTimeout { step: &'static str },

	/// Cluster error outside the provisioning sequence.
	#[error(transparent)]
	K8s(#[from] K8sError),

	/// Record store error.
	#[error(transparent)]
	Db(#[from] DbError),
}
