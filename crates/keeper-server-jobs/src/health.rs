// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::types::{JobRun, JobStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct JobHealthStatus {
	pub job_id: String,
	pub name: String,
	pub status: HealthState,
	pub last_run: Option<LastRunInfo>,
	pub consecutive_failures: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct LastRunInfo {
	pub run_id: String,
	pub status: JobStatus,
	pub started_at: DateTime<Utc>,
	pub duration_ms: Option<i64>,
	pub error: Option<String>,
}

impl From<JobRun> for LastRunInfo {
	fn from(run: JobRun) -> Self {
		Self {
			run_id: run.id,
			status: run.status,
			started_at: run.started_at,
			duration_ms: run.duration_ms,
			error: run.error_message,
		}
	}
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
	Healthy,
	Degraded,
	Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobsHealthStatus {
	pub status: HealthState,
	pub jobs: Vec<JobHealthStatus>,
}

/// One failure degrades a job; three in a row make it unhealthy.
pub(crate) fn determine_health_state(last_run: Option<&JobRun>, consecutive_failures: u32) -> HealthState {
	match last_run.map(|r| r.status) {
		Some(JobStatus::Failed) if consecutive_failures >= 3 => HealthState::Unhealthy,
		Some(JobStatus::Failed) if consecutive_failures >= 1 => HealthState::Degraded,
		_ => HealthState::Healthy,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::TriggerSource;

	fn run(status: JobStatus) -> JobRun {
		let mut run = JobRun::started("flush", "run-1", TriggerSource::Schedule);
		run.status = status;
		run
	}

	#[test]
	fn no_runs_is_healthy() {
		assert_eq!(determine_health_state(None, 0), HealthState::Healthy);
	}

	#[test]
	fn non_failed_runs_are_healthy() {
		for status in [JobStatus::Succeeded, JobStatus::Running] {
			assert_eq!(determine_health_state(Some(&run(status)), 0), HealthState::Healthy);
		}
	}

	#[test]
	fn failures_degrade_then_become_unhealthy() {
		let failed = run(JobStatus::Failed);
		assert_eq!(determine_health_state(Some(&failed), 0), HealthState::Healthy);
		assert_eq!(determine_health_state(Some(&failed), 1), HealthState::Degraded);
		assert_eq!(determine_health_state(Some(&failed), 2), HealthState::Degraded);
		assert_eq!(determine_health_state(Some(&failed), 3), HealthState::Unhealthy);
		assert_eq!(determine_health_state(Some(&failed), 7), HealthState::Unhealthy);
	}

	#[test]
	fn health_states_order_by_severity() {
		assert!(HealthState::Healthy < HealthState::Degraded);
		assert!(HealthState::Degraded < HealthState::Unhealthy);
	}
}
