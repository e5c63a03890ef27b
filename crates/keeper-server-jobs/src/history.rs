// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bounded in-memory record of recent job runs.

use std::collections::{HashMap, VecDeque};

use chrono::Utc;
use tokio::sync::Mutex;

use crate::types::{JobRun, JobStatus};

pub const DEFAULT_HISTORY_PER_JOB: usize = 32;

pub struct RunHistory {
	runs: Mutex<HashMap<String, VecDeque<JobRun>>>,
	per_job: usize,
}

impl Default for RunHistory {
	fn default() -> Self {
		Self::new(DEFAULT_HISTORY_PER_JOB)
	}
}

impl RunHistory {
	pub fn new(per_job: usize) -> Self {
		Self {
			runs: Mutex::new(HashMap::new()),
			per_job: per_job.max(1),
		}
	}

	pub async fn record_run_start(&self, run: &JobRun) {
		let mut runs = self.runs.lock().await;
		let history = runs.entry(run.job_id.clone()).or_default();
		if history.len() == self.per_job {
			history.pop_front();
		}
		history.push_back(run.clone());
	}

	pub async fn record_run_complete(
		&self,
		job_id: &str,
		run_id: &str,
		status: JobStatus,
		error_message: Option<String>,
		metadata: Option<serde_json::Value>,
	) {
		let mut runs = self.runs.lock().await;
		let Some(run) = runs
			.get_mut(job_id)
			.and_then(|h| h.iter_mut().rev().find(|r| r.id == run_id))
		else {
			return;
		};

		let now = Utc::now();
		run.status = status;
		run.completed_at = Some(now);
		run.duration_ms = Some((now - run.started_at).num_milliseconds());
		run.error_message = error_message;
		run.metadata = metadata;
	}

	pub async fn record_retry(&self, job_id: &str, run_id: &str, retry_count: u32) {
		let mut runs = self.runs.lock().await;
		if let Some(run) = runs
			.get_mut(job_id)
			.and_then(|h| h.iter_mut().rev().find(|r| r.id == run_id))
		{
			run.retry_count = retry_count;
		}
	}

	pub async fn get_last_run(&self, job_id: &str) -> Option<JobRun> {
		self.runs.lock().await.get(job_id)?.back().cloned()
	}

	pub async fn recent_runs(&self, job_id: &str) -> Vec<JobRun> {
		self
			.runs
			.lock()
			.await
			.get(job_id)
			.map(|h| h.iter().rev().cloned().collect())
			.unwrap_or_default()
	}

	/// Failed runs since the most recent run that did not fail.
	pub async fn count_consecutive_failures(&self, job_id: &str) -> u32 {
		let runs = self.runs.lock().await;
		runs.get(job_id)
			.map(|h| {
				h.iter()
					.rev()
					.filter(|r| r.status != JobStatus::Running)
					.take_while(|r| r.status == JobStatus::Failed)
					.count() as u32
			})
			.unwrap_or(0)
	}
}
