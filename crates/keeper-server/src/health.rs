// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Health check types and component checking logic.

use std::sync::Arc;
use std::time::Duration;

use keeper_common_vault::StagingCache;
use keeper_server_jobs::{HealthState, JobScheduler};
use serde::Serialize;
use sqlx::sqlite::SqlitePool;
use tokio::sync::Mutex;
use tokio::time::{timeout, Instant};

const DB_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// Health status for components and overall system.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
	Healthy,
	Degraded,
	Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct DatabaseHealth {
	pub status: HealthStatus,
	pub latency_ms: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

/// Write-back buffer state. Dead letters are writes the flush gave up on.
#[derive(Debug, Serialize)]
pub struct StagingHealth {
	pub status: HealthStatus,
	pub pending: usize,
	pub dead_letters: usize,
}

#[derive(Debug, Serialize)]
pub struct JobsHealth {
	pub status: HealthStatus,
	pub jobs_total: usize,
	pub jobs_healthy: usize,
	pub jobs_failing: usize,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub failing_jobs: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct HealthComponents {
	pub database: DatabaseHealth,
	pub staging: StagingHealth,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub jobs: Option<JobsHealth>,
}

pub async fn check_database(pool: &SqlitePool) -> DatabaseHealth {
	let start = Instant::now();

	let result = timeout(DB_CHECK_TIMEOUT, sqlx::query("SELECT 1").execute(pool)).await;
	let latency_ms = start.elapsed().as_millis() as u64;

	match result {
		Ok(Ok(_)) => DatabaseHealth {
			status: HealthStatus::Healthy,
			latency_ms,
			error: None,
		},
		Ok(Err(e)) => DatabaseHealth {
			status: HealthStatus::Unhealthy,
			latency_ms,
			error: Some(e.to_string()),
		},
		Err(_) => DatabaseHealth {
			status: HealthStatus::Unhealthy,
			latency_ms,
			error: Some("database health check timed out".to_string()),
		},
	}
}

pub async fn check_staging(staging: &Mutex<StagingCache>) -> StagingHealth {
	let cache = staging.lock().await;
	let dead_letters = cache.dead_letter_count();
	StagingHealth {
		status: if dead_letters > 0 {
			HealthStatus::Degraded
		} else {
			HealthStatus::Healthy
		},
		pending: cache.len(),
		dead_letters,
	}
}

pub async fn check_jobs(scheduler: Option<&Arc<JobScheduler>>) -> Option<JobsHealth> {
	let scheduler = scheduler?;
	let health = scheduler.health_status().await;

	let failing: Vec<String> = health
		.jobs
		.iter()
		.filter(|j| j.status == HealthState::Unhealthy)
		.map(|j| j.job_id.clone())
		.collect();

	let status = match health.status {
		HealthState::Healthy => HealthStatus::Healthy,
		HealthState::Degraded => HealthStatus::Degraded,
		HealthState::Unhealthy => HealthStatus::Unhealthy,
	};

	Some(JobsHealth {
		status,
		jobs_total: health.jobs.len(),
		jobs_healthy: health
			.jobs
			.iter()
			.filter(|j| j.status == HealthState::Healthy)
			.count(),
		jobs_failing: failing.len(),
		failing_jobs: if failing.is_empty() { None } else { Some(failing) },
	})
}

pub fn aggregate_status(components: &HealthComponents) -> HealthStatus {
	let mut statuses = vec![components.database.status, components.staging.status];
	if let Some(ref jobs) = components.jobs {
		statuses.push(jobs.status);
	}

	if statuses.contains(&HealthStatus::Unhealthy) {
		HealthStatus::Unhealthy
	} else if statuses.contains(&HealthStatus::Degraded) {
		HealthStatus::Degraded
	} else {
		HealthStatus::Healthy
	}
}
