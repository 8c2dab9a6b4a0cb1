// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Kiln workload provisioning server.
//!
//! This crate provides the HTTP server that provisions application
//! workloads on a Kubernetes cluster and serves their status and health.

pub mod api;
pub mod api_docs;
pub mod error;
pub mod metrics;
pub mod routes;

pub use api::{create_app_state, create_router, AppState};
pub use api_docs::ApiDoc;
pub use error::ServerError;
pub use kiln_server_config::ServerConfig;
pub use metrics::Metrics;
