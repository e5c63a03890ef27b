// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a successful run reports back to the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutput {
	pub message: String,
	pub metadata: Option<serde_json::Value>,
}

impl JobOutput {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
			metadata: None,
		}
	}

	pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
		self.metadata = Some(metadata);
		self
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
	Running,
	Succeeded,
	Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
	Schedule,
	Manual,
	Retry,
	/// The last pass made while the server stops.
	Shutdown,
}

/// One run of a job, retries included.
#[derive(Debug, Clone, Serialize)]
pub struct JobRun {
	pub id: String,
	pub job_id: String,
	pub status: JobStatus,
	pub started_at: DateTime<Utc>,
	pub completed_at: Option<DateTime<Utc>>,
	pub duration_ms: Option<i64>,
	pub error_message: Option<String>,
	pub retry_count: u32,
	pub triggered_by: TriggerSource,
	pub metadata: Option<serde_json::Value>,
}

impl JobRun {
	/// A run that has just begun its first attempt.
	pub fn started(job_id: &str, run_id: &str, triggered_by: TriggerSource) -> Self {
		Self {
			id: run_id.to_string(),
			job_id: job_id.to_string(),
			status: JobStatus::Running,
			started_at: Utc::now(),
			completed_at: None,
			duration_ms: None,
			error_message: None,
			retry_count: 0,
			triggered_by,
			metadata: None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn started_run_is_running_without_timing() {
		let run = JobRun::started("staging-flush", "r1", TriggerSource::Shutdown);
		assert_eq!(run.status, JobStatus::Running);
		assert_eq!(run.retry_count, 0);
		assert!(run.completed_at.is_none());
		assert_eq!(
			serde_json::to_value(run.triggered_by).unwrap(),
			serde_json::json!("shutdown")
		);
	}

	#[test]
	fn output_metadata_is_optional() {
		assert!(JobOutput::new("idle").metadata.is_none());
		let out = JobOutput::new("flushed").with_metadata(serde_json::json!({ "applied": 1 }));
		assert_eq!(out.metadata.unwrap()["applied"], 1);
	}
}
