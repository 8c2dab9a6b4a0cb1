// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Kiln workload provisioning server binary.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use kiln_server::{create_app_state, create_router};
use kiln_server_k8s::KubeClusterClient;
use tower_http::{
	cors::{Any, CorsLayer},
	trace::TraceLayer,
};

/// Kiln server - HTTP server for workload provisioning.
#[derive(Parser, Debug)]
#[command(name = "kiln-server", about = "Kiln workload provisioning server", version)]
struct Args {
	/// Subcommands for kiln-server (e.g., `version`)
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version information
	Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	// Parse CLI arguments
	let args = Args::parse();

	// Handle subcommands that should not start the server
	if let Some(Command::Version) = args.command {
		println!("kiln-server {}", env!("CARGO_PKG_VERSION"));
		return Ok(());
	}

	// Load .env file if present
	dotenvy::dotenv().ok();

	// Load configuration
	let config = kiln_server_config::load_config()?;

	// Setup tracing
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.init();

	tracing::info!(
		host = %config.http.host,
		port = config.http.port,
		database = %config.database.url,
		namespace = %config.kubernetes.namespace,
		"starting kiln-server"
	);

	// Create database pool and run migrations
	let pool = kiln_server_db::create_pool(&config.database.url).await?;
	kiln_server_db::run_migrations(&pool).await?;

	// Create the cluster client; provisioning cannot work without one
	let client = kiln_server_k8s::create_client(
		config.kubernetes.kubeconfig.as_deref(),
		config.kubernetes.in_cluster,
	)
	.await?;
	let cluster = Arc::new(KubeClusterClient::new(
		client,
		config.kubernetes.namespace.clone(),
	));

	let state = create_app_state(pool, cluster, &config);
	let monitors = Arc::clone(&state.monitors);

	let app = create_router(state)
		.layer(TraceLayer::new_for_http())
		.layer(
			CorsLayer::new()
				.allow_origin(Any)
				.allow_methods(Any)
				.allow_headers(Any),
		);

	// Start server
	let addr = config.socket_addr();
	tracing::info!("listening on {}", addr);

	let listener = tokio::net::TcpListener::bind(&addr).await?;

	// Run server with graceful shutdown
	tokio::select! {
		result = axum::serve(listener, app) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "Server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("Received shutdown signal");
			tracing::info!("Shutting down health monitors...");
			monitors.shutdown().await;
		}
	}

	tracing::info!("Server shutdown complete");
	Ok(())
}
