// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Health monitoring of provisioned workloads.
//!
//! One [`HealthMonitor`] task runs per monitored deployment, started right
//! after its probe job is created. The task polls for finished probe runs
//! and folds them into the persisted health record. Monitor failures are
//! logged and never surface to any HTTP caller.
//!
//! Tasks are owned by a [`MonitorSupervisor`]: a broadcast shutdown channel
//! plus the retained join handles, so process shutdown can stop every
//! monitor instead of leaking detached tasks.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use kiln_server_db::HealthRepository;
use kiln_server_k8s::ClusterClient;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::ProvisionError;

/// Polls probe-job runs for one application and updates its health record.
pub struct HealthMonitor {
	app: String,
	cluster: Arc<dyn ClusterClient>,
	records: HealthRepository,
	/// De-duplication key: the name of the last processed probe Job.
	last_run_id: Option<String>,
}

impl HealthMonitor {
	pub fn new(app: impl Into<String>, cluster: Arc<dyn ClusterClient>, records: HealthRepository) -> Self {
		Self {
			app: app.into(),
			cluster,
			records,
			last_run_id: None,
		}
	}

	pub fn app(&self) -> &str {
		&self.app
	}

	/// Process at most one new probe run.
	///
	/// No finished run yet is a no-op, as is seeing the same run again:
	/// probe jobs fire on their own schedule and polling must not
	/// double-count a run it has already recorded. Returns whether a run
	/// was recorded.
	pub async fn poll_once(&mut self) -> Result<bool, ProvisionError> {
		let Some(run) = self.cluster.latest_probe_run(&self.app).await? else {
			return Ok(false);
		};

		if self.last_run_id.as_deref() == Some(run.run_id.as_str()) {
			return Ok(false);
		}

		let now = Utc::now();
		if run.succeeded {
			self.records.record_success(&self.app, now).await?;
		} else {
			self.records.record_failure(&self.app, now).await?;
		}

		tracing::debug!(
			app = %self.app,
			run_id = %run.run_id,
			succeeded = run.succeeded,
			"probe run recorded"
		);
		self.last_run_id = Some(run.run_id);
		Ok(true)
	}
}

/// Owns every running health monitor task.
pub struct MonitorSupervisor {
	shutdown_tx: broadcast::Sender<()>,
	handles: Mutex<Vec<JoinHandle<()>>>,
}

impl MonitorSupervisor {
	pub fn new() -> Self {
		let (shutdown_tx, _) = broadcast::channel(1);
		Self {
			shutdown_tx,
			handles: Mutex::new(Vec::new()),
		}
	}

	/// Spawn a monitor task polling on `poll_interval` until shutdown.
	pub async fn start_monitor(&self, mut monitor: HealthMonitor, poll_interval: Duration) {
		let mut shutdown_rx = self.shutdown_tx.subscribe();
		let app = monitor.app().to_string();

		let handle = tokio::spawn(async move {
			loop {
				tokio::select! {
					_ = tokio::time::sleep(poll_interval) => {
						if let Err(e) = monitor.poll_once().await {
							warn!(app = %monitor.app(), error = %e, "health monitor poll failed");
						}
					}
					_ = shutdown_rx.recv() => {
						info!(app = %monitor.app(), "shutting down health monitor");
						break;
					}
				}
			}
		});

		self.handles.lock().await.push(handle);
		info!(app = %app, "health monitor started");
	}

	/// Stop every monitor and wait for the tasks to finish.
	pub async fn shutdown(&self) {
		let _ = self.shutdown_tx.send(());

		let mut handles = self.handles.lock().await;
		for handle in handles.drain(..) {
			let _ = handle.await;
		}

		info!("monitor supervisor shut down");
	}

	/// Number of currently tracked monitor tasks.
	pub async fn monitor_count(&self) -> usize {
		self.handles.lock().await.len()
	}
}

impl Default for MonitorSupervisor {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::{DateTime, Utc};
	use kiln_server_db::testing::create_health_test_pool;
	use kiln_server_k8s::{MockClusterClient, ProbeRun};

	fn run(id: &str, succeeded: bool, at: DateTime<Utc>) -> ProbeRun {
		ProbeRun {
			run_id: id.to_string(),
			succeeded,
			finished_at: at,
		}
	}

	async fn monitor_with(mock: &MockClusterClient) -> (HealthMonitor, HealthRepository) {
		let pool = create_health_test_pool().await;
		let records = HealthRepository::new(pool);
		let monitor = HealthMonitor::new("web1", Arc::new(mock.clone()), records.clone());
		(monitor, records)
	}

	#[tokio::test]
	async fn no_probe_output_is_a_noop() {
		let mock = MockClusterClient::new();
		let (mut monitor, records) = monitor_with(&mock).await;

		assert!(!monitor.poll_once().await.unwrap());
		assert!(records.get("web1").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn successive_runs_accumulate_success_count() {
		let mock = MockClusterClient::new();
		let (mut monitor, records) = monitor_with(&mock).await;

		let base = Utc::now();
		for i in 0..3 {
			mock.push_probe_run(
				"web1",
				Some(run(
					&format!("web1-probe-{i}"),
					true,
					base + chrono::Duration::seconds(60 * i),
				)),
			);
		}

		let before = Utc::now();
		for _ in 0..3 {
			assert!(monitor.poll_once().await.unwrap());
		}
		let after = Utc::now();

		let record = records.get("web1").await.unwrap().unwrap();
		assert_eq!(record.success_count, 3);
		assert_eq!(record.failure_count, 0);
		assert!(record.last_failure.is_none());

		// the timestamp reflects when the last run was processed
		let last_success = record.last_success.unwrap();
		assert!(last_success >= before && last_success <= after);
	}

	#[tokio::test]
	async fn repeated_run_id_is_not_double_counted() {
		let mock = MockClusterClient::new();
		let (mut monitor, records) = monitor_with(&mock).await;

		let at = Utc::now();
		mock.push_probe_run("web1", Some(run("web1-probe-1", true, at)));
		mock.push_probe_run("web1", Some(run("web1-probe-1", true, at)));

		assert!(monitor.poll_once().await.unwrap());
		assert!(!monitor.poll_once().await.unwrap());

		let record = records.get("web1").await.unwrap().unwrap();
		assert_eq!(record.success_count, 1);
	}

	#[tokio::test]
	async fn failed_runs_touch_only_failure_fields() {
		let mock = MockClusterClient::new();
		let (mut monitor, records) = monitor_with(&mock).await;

		mock.push_probe_run("web1", Some(run("web1-probe-1", false, Utc::now())));
		assert!(monitor.poll_once().await.unwrap());

		let record = records.get("web1").await.unwrap().unwrap();
		assert_eq!(record.failure_count, 1);
		assert_eq!(record.success_count, 0);
		assert!(record.last_success.is_none());
		assert!(record.last_failure.is_some());
	}

	#[tokio::test]
	async fn supervisor_shutdown_stops_monitors() {
		let mock = MockClusterClient::new();
		let (monitor, _records) = monitor_with(&mock).await;

		let supervisor = MonitorSupervisor::new();
		supervisor
			.start_monitor(monitor, Duration::from_secs(3600))
			.await;
		assert_eq!(supervisor.monitor_count().await, 1);

		supervisor.shutdown().await;
		assert_eq!(supervisor.monitor_count().await, 0);
	}
}
