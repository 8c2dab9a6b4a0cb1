// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provisioner configuration section.

use serde::Deserialize;

/// Provisioner configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct ProvisionerConfig {
	/// Domain suffix for externally exposed ingress hostnames.
	pub domain: String,
	/// Deadline applied to every individual cluster API call.
	pub platform_timeout_secs: u64,
	/// Interval at which a health monitor polls for new probe runs.
	pub monitor_poll_secs: u64,
}

impl Default for ProvisionerConfig {
	fn default() -> Self {
		Self {
			domain: "kiln.local".to_string(),
			platform_timeout_secs: 30,
			monitor_poll_secs: 60,
		}
	}
}

/// Provisioner configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvisionerConfigLayer {
	#[serde(default)]
	pub domain: Option<String>,
	#[serde(default)]
	pub platform_timeout_secs: Option<u64>,
	#[serde(default)]
	pub monitor_poll_secs: Option<u64>,
}

impl ProvisionerConfigLayer {
	pub fn merge(&mut self, other: ProvisionerConfigLayer) {
		if other.domain.is_some() {
			self.domain = other.domain;
		}
		if other.platform_timeout_secs.is_some() {
			self.platform_timeout_secs = other.platform_timeout_secs;
		}
		if other.monitor_poll_secs.is_some() {
			self.monitor_poll_secs = other.monitor_poll_secs;
		}
	}

	pub fn finalize(self) -> ProvisionerConfig {
		ProvisionerConfig {
			domain: self.domain.unwrap_or_else(|| "kiln.local".to_string()),
			platform_timeout_secs: self.platform_timeout_secs.unwrap_or(30),
			monitor_poll_secs: self.monitor_poll_secs.unwrap_or(60),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = ProvisionerConfigLayer::default().finalize();
		assert_eq!(config.domain, "kiln.local");
		assert_eq!(config.platform_timeout_secs, 30);
		assert_eq!(config.monitor_poll_secs, 60);
	}

	#[test]
	fn test_merge_individual_fields() {
		let mut base = ProvisionerConfigLayer {
			domain: Some("apps.example.com".to_string()),
			platform_timeout_secs: Some(10),
			monitor_poll_secs: None,
		};
		base.merge(ProvisionerConfigLayer {
			domain: None,
			platform_timeout_secs: Some(60),
			monitor_poll_secs: Some(15),
		});
		assert_eq!(base.domain, Some("apps.example.com".to_string()));
		assert_eq!(base.platform_timeout_secs, Some(60));
		assert_eq!(base.monitor_poll_secs, Some(15));
	}
}
