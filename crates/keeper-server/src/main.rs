// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Keeper server binary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use keeper_server::jobs::create_scheduler;
use keeper_server::{create_app_state, create_router};
use keeper_server_config::LogFormat;
use tower_http::{
	cors::{Any, CorsLayer},
	trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Keeper server - secret storage with websocket sync.
#[derive(Parser, Debug)]
#[command(name = "keeper-server", about = "Keeper secret storage server", version)]
struct Args {
	#[command(subcommand)]
	command: Option<Command>,

	/// Configuration file, replacing /etc/keeper/server.toml
	#[arg(long, env = "KEEPER_SERVER_CONFIG")]
	config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Run the server (default)
	Serve,
	/// Show version and build information
	Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("{}", keeper_common_version::format_build_info("keeper-server"));
		return Ok(());
	}

	dotenvy::dotenv().ok();

	let config = keeper_server_config::load_config(args.config).context("loading configuration")?;

	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| config.logging.level.clone().into());
	let registry = tracing_subscriber::registry().with(filter);
	match config.logging.format {
		LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
		LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
	}

	tracing::info!(
		host = %config.http.host,
		port = config.http.port,
		database = %config.database.url,
		flush_interval = ?config.flush.interval,
		failure_policy = %config.flush.failure_policy,
		"starting keeper-server"
	);

	let pool = keeper_server_db::create_pool(&config.database.url)
		.await
		.context("opening database")?;
	keeper_server_db::run_migrations(&pool)
		.await
		.context("running migrations")?;

	let mut state = create_app_state(pool, &config);

	let scheduler = Arc::new(create_scheduler(&state));
	state.job_scheduler = Some(Arc::clone(&scheduler));

	if let Err(e) = scheduler.start().await {
		tracing::error!(error = %e, "Failed to start job scheduler");
	}

	let app = create_router(state)
		.layer(TraceLayer::new_for_http())
		.layer(
			CorsLayer::new()
				.allow_origin(Any)
				.allow_methods(Any)
				.allow_headers(Any),
		);

	let addr = config.socket_addr();
	tracing::info!("listening on {}", addr);

	let listener = tokio::net::TcpListener::bind(&addr)
		.await
		.with_context(|| format!("binding {addr}"))?;

	tokio::select! {
		result = axum::serve(listener, app) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "Server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("Received shutdown signal");
		}
	}

	// Final flush runs here, so staged writes survive a clean stop.
	tracing::info!("Shutting down job scheduler...");
	scheduler.shutdown().await;

	tracing::info!("Server shutdown complete");
	Ok(())
}
