// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Persisted health records for monitored deployments.
//!
//! One row per application. Counters only ever increase and timestamps only
//! move forward; the health monitor is the sole writer, the HTTP read path
//! the sole consumer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::Result;

/// Accumulated probe results for one application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
	pub app_name: String,
	pub failure_count: i64,
	pub success_count: i64,
	pub last_failure: Option<DateTime<Utc>>,
	pub last_success: Option<DateTime<Utc>>,
	pub created_at: DateTime<Utc>,
}

impl HealthRecord {
	/// A record for an application that has no probe results yet.
	pub fn empty(app_name: &str, created_at: DateTime<Utc>) -> Self {
		Self {
			app_name: app_name.to_string(),
			failure_count: 0,
			success_count: 0,
			last_failure: None,
			last_success: None,
			created_at,
		}
	}
}

#[derive(Clone)]
pub struct HealthRepository {
	pool: SqlitePool,
}

impl HealthRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Record one successful probe run. Creates the record on first use.
	#[tracing::instrument(skip(self))]
	pub async fn record_success(&self, app_name: &str, at: DateTime<Utc>) -> Result<()> {
		sqlx::query(
			r#"
            INSERT INTO health_checks (app_name, failure_count, success_count, last_success, created_at)
            VALUES (?, 0, 1, ?, ?)
            ON CONFLICT(app_name) DO UPDATE SET
                success_count = success_count + 1,
                last_success = excluded.last_success
            "#,
		)
		.bind(app_name)
		.bind(at)
		.bind(at)
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	/// Record one failed probe run. Creates the record on first use.
	#[tracing::instrument(skip(self))]
	pub async fn record_failure(&self, app_name: &str, at: DateTime<Utc>) -> Result<()> {
		sqlx::query(
			r#"
            INSERT INTO health_checks (app_name, failure_count, success_count, last_failure, created_at)
            VALUES (?, 1, 0, ?, ?)
            ON CONFLICT(app_name) DO UPDATE SET
                failure_count = failure_count + 1,
                last_failure = excluded.last_failure
            "#,
		)
		.bind(app_name)
		.bind(at)
		.bind(at)
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	/// Fetch the record for an application, if any probe run was recorded.
	#[tracing::instrument(skip(self))]
	pub async fn get(&self, app_name: &str) -> Result<Option<HealthRecord>> {
		let row = sqlx::query_as::<
			_,
			(
				i64,
				i64,
				Option<DateTime<Utc>>,
				Option<DateTime<Utc>>,
				DateTime<Utc>,
			),
		>(
			r#"
            SELECT failure_count, success_count, last_failure, last_success, created_at
            FROM health_checks
            WHERE app_name = ?
            "#,
		)
		.bind(app_name)
		.fetch_optional(&self.pool)
		.await?;

		Ok(row.map(
			|(failure_count, success_count, last_failure, last_success, created_at)| HealthRecord {
				app_name: app_name.to_string(),
				failure_count,
				success_count,
				last_failure,
				last_success,
				created_at,
			},
		))
	}
}
