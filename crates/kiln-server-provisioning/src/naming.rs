// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resource naming.
//!
//! Every resource belonging to one provisioned application shares a naming
//! root: the lowercased application name, or `postgres-<code>` for managed
//! databases. The root doubles as the `app` label value, which is how pods
//! are matched back to their deployment.

/// The common name prefix and label value for one application's resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingRoot(String);

impl NamingRoot {
	/// Root for a stateless workload: the application name, lowercased.
	pub fn unmanaged(app_name: &str) -> Self {
		Self(app_name.to_lowercase())
	}

	/// Root for a managed database workload.
	pub fn managed(code: &str) -> Self {
		Self(format!("postgres-{code}"))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn deployment(&self) -> String {
		format!("{}-deployment", self.0)
	}

	pub fn stateful_set(&self) -> String {
		format!("{}-statefulset", self.0)
	}

	pub fn service(&self) -> String {
		format!("{}-service", self.0)
	}

	pub fn secret(&self) -> String {
		format!("{}-secret", self.0)
	}

	pub fn config_map(&self) -> String {
		format!("{}-config", self.0)
	}

	pub fn ingress(&self) -> String {
		format!("{}-ingress", self.0)
	}

	pub fn probe_job(&self) -> String {
		format!("{}-probe", self.0)
	}

	/// Public hostname for an externally exposed stateless workload.
	pub fn host(&self, domain: &str) -> String {
		format!("{}.{domain}", self.0)
	}
}

impl std::fmt::Display for NamingRoot {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn unmanaged_root_is_lowercased() {
		let root = NamingRoot::unmanaged("Web1");
		assert_eq!(root.as_str(), "web1");
		assert_eq!(root.deployment(), "web1-deployment");
		assert_eq!(root.service(), "web1-service");
		assert_eq!(root.host("kiln.local"), "web1.kiln.local");
	}

	#[test]
	fn managed_root_carries_postgres_prefix() {
		let root = NamingRoot::managed("a1b2c3d4");
		assert_eq!(root.as_str(), "postgres-a1b2c3d4");
		assert_eq!(root.service(), "postgres-a1b2c3d4-service");
		assert_eq!(root.stateful_set(), "postgres-a1b2c3d4-statefulset");
	}
}
