// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Prometheus request metrics.
//!
//! The registry owns every collector; handlers and middleware increment
//! them, `/metrics` encodes the whole registry.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use tokio::time::Instant;

use crate::api::AppState;

pub struct Metrics {
	registry: Registry,

	pub requests: CounterVec,
	pub failed_requests: CounterVec,
	pub failed_db_requests: CounterVec,
	pub response_time: HistogramVec,
	pub db_response_time: HistogramVec,
}

impl Default for Metrics {
	fn default() -> Self {
		Self::new()
	}
}

impl Metrics {
	pub fn new() -> Self {
		let registry = Registry::new();

		let requests = CounterVec::new(
			Opts::new("kiln_requests_total", "Total number of requests."),
			&["method", "endpoint"],
		)
		.unwrap();
		registry.register(Box::new(requests.clone())).unwrap();

		let failed_requests = CounterVec::new(
			Opts::new("kiln_failed_requests_total", "Total number of failed requests."),
			&["method", "endpoint"],
		)
		.unwrap();
		registry
			.register(Box::new(failed_requests.clone()))
			.unwrap();

		let failed_db_requests = CounterVec::new(
			Opts::new(
				"kiln_failed_db_requests_total",
				"Total number of failed database requests.",
			),
			&["method", "endpoint"],
		)
		.unwrap();
		registry
			.register(Box::new(failed_db_requests.clone()))
			.unwrap();

		let response_time = HistogramVec::new(
			HistogramOpts::new("kiln_response_time_seconds", "Response time in seconds"),
			&["method", "endpoint"],
		)
		.unwrap();
		registry.register(Box::new(response_time.clone())).unwrap();

		let db_response_time = HistogramVec::new(
			HistogramOpts::new(
				"kiln_db_response_time_seconds",
				"Database response time in seconds",
			),
			&["method", "endpoint"],
		)
		.unwrap();
		registry
			.register(Box::new(db_response_time.clone()))
			.unwrap();

		Self {
			registry,
			requests,
			failed_requests,
			failed_db_requests,
			response_time,
			db_response_time,
		}
	}

	/// Encode every registered collector in Prometheus text format.
	pub fn gather(&self) -> Result<String, prometheus::Error> {
		let mut buffer = Vec::new();
		let encoder = TextEncoder::new();
		encoder.encode(&self.registry.gather(), &mut buffer)?;
		String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
	}
}

/// Middleware counting every request and observing its response time, with
/// failures (4xx/5xx) counted separately.
pub async fn track_requests(State(state): State<AppState>, req: Request, next: Next) -> Response {
	let start = Instant::now();
	let method = req.method().to_string();
	let endpoint = req.uri().path().to_string();

	let response = next.run(req).await;

	state
		.metrics
		.requests
		.with_label_values(&[&method, &endpoint])
		.inc();
	state
		.metrics
		.response_time
		.with_label_values(&[&method, &endpoint])
		.observe(start.elapsed().as_secs_f64());

	if response.status().is_client_error() || response.status().is_server_error() {
		state
			.metrics
			.failed_requests
			.with_label_values(&[&method, &endpoint])
			.inc();
	}

	response
}
