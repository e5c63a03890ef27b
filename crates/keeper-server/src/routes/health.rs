// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use keeper_common_version::BuildInfo;
use serde::Serialize;

use crate::api::AppState;
use crate::health::{
	aggregate_status, check_database, check_jobs, check_staging, HealthComponents, HealthStatus,
};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
	pub status: HealthStatus,
	pub timestamp: String,
	pub duration_ms: u64,
	pub version: BuildInfo,
	pub components: HealthComponents,
}

/// GET /health
#[tracing::instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
	let start = tokio::time::Instant::now();

	let components = HealthComponents {
		database: check_database(&state.pool).await,
		staging: check_staging(&state.staging).await,
		jobs: check_jobs(state.job_scheduler.as_ref()).await,
	};
	let status = aggregate_status(&components);

	let response = HealthResponse {
		status,
		timestamp: chrono::Utc::now().to_rfc3339(),
		duration_ms: start.elapsed().as_millis() as u64,
		version: BuildInfo::current(),
		components,
	};

	let code = match status {
		HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
		HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
	};
	(code, Json(response))
}

/// GET /api/version
pub async fn version() -> Json<BuildInfo> {
	Json(BuildInfo::current())
}
