// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::context::JobContext;
use crate::error::{JobError, Result};
use crate::health::{determine_health_state, HealthState, JobHealthStatus, JobsHealthStatus};
use crate::history::RunHistory;
use crate::job::Job;
use crate::types::{JobRun, JobStatus, TriggerSource};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

const BASE_RETRY_DELAY_MS: u64 = 250;
const MAX_RETRY_DELAY_MS: u64 = 10_000;
const RETRY_FACTOR: f64 = 2.0;
const MAX_RETRIES: u32 = 3;

struct RegisteredJob {
	job: Arc<dyn Job>,
	interval: Duration,
}

pub struct JobScheduler {
	jobs: HashMap<String, RegisteredJob>,
	history: Arc<RunHistory>,
	shutdown_tx: broadcast::Sender<()>,
	handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Default for JobScheduler {
	fn default() -> Self {
		Self::new(Arc::new(RunHistory::default()))
	}
}

impl JobScheduler {
	pub fn new(history: Arc<RunHistory>) -> Self {
		let (shutdown_tx, _) = broadcast::channel(1);
		Self {
			jobs: HashMap::new(),
			history,
			shutdown_tx,
			handles: Mutex::new(Vec::new()),
		}
	}

	/// Register `job` to run every `interval` once the scheduler starts.
	/// It can also be run on demand with [`JobScheduler::trigger_job`].
	pub fn register_periodic(&mut self, job: Arc<dyn Job>, interval: Duration) {
		let id = job.id().to_string();
		self.jobs.insert(
			id,
			RegisteredJob {
				job,
				interval,
			},
		);
	}

	/// Spawn one loop per periodic job. The next tick is scheduled only
	/// after the previous run finished, so runs of one job never overlap.
	#[instrument(skip(self))]
	pub async fn start(&self) -> Result<()> {
		let mut handles = self.handles.lock().await;

		for (job_id, registered) in &self.jobs {
			let interval = registered.interval;
			let job = Arc::clone(&registered.job);
			let history = Arc::clone(&self.history);
			let mut shutdown_rx = self.shutdown_tx.subscribe();
			let job_id = job_id.clone();

			let handle = tokio::spawn(async move {
				loop {
					tokio::select! {
						_ = tokio::time::sleep(interval) => {
							let _ = run_job_with_retry(&job, &history, TriggerSource::Schedule).await;
						}
						_ = shutdown_rx.recv() => {
							info!(job_id = %job_id, "Shutting down periodic job");
							break;
						}
					}
				}
			});

			handles.push(handle);
		}

		info!(job_count = handles.len(), "Job scheduler started");
		Ok(())
	}

	#[instrument(skip(self))]
	pub async fn trigger_job(&self, job_id: &str, triggered_by: TriggerSource) -> Result<String> {
		let registered = self
			.jobs
			.get(job_id)
			.ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

		run_job_with_retry(&registered.job, &self.history, triggered_by).await
	}

	/// Stop every periodic loop, then give each periodic job one last run
	/// so work buffered since the final tick is not lost.
	#[instrument(skip(self))]
	pub async fn shutdown(&self) {
		let _ = self.shutdown_tx.send(());

		let mut handles = self.handles.lock().await;
		for handle in handles.drain(..) {
			let _ = handle.await;
		}

		for (job_id, registered) in &self.jobs {
			if let Err(e) = run_job_once(&registered.job, &self.history, TriggerSource::Shutdown).await {
				warn!(job_id = %job_id, error = %e, "Final run before shutdown failed");
			}
		}

		info!("Job scheduler shut down");
	}

	#[instrument(skip(self))]
	pub async fn job_status(&self, job_id: &str) -> Option<JobHealthStatus> {
		let registered = self.jobs.get(job_id)?;

		let last_run = self.history.get_last_run(job_id).await;
		let consecutive_failures = self.history.count_consecutive_failures(job_id).await;
		let status = determine_health_state(last_run.as_ref(), consecutive_failures);

		Some(JobHealthStatus {
			job_id: job_id.to_string(),
			name: registered.job.name().to_string(),
			status,
			last_run: last_run.map(Into::into),
			consecutive_failures,
		})
	}

	#[instrument(skip(self))]
	pub async fn health_status(&self) -> JobsHealthStatus {
		let mut jobs = Vec::new();
		let mut worst_state = HealthState::Healthy;

		for job_id in self.jobs.keys() {
			if let Some(status) = self.job_status(job_id).await {
				worst_state = worst_state.max(status.status);
				jobs.push(status);
			}
		}
		jobs.sort_by(|a, b| a.job_id.cmp(&b.job_id));

		JobsHealthStatus {
			status: worst_state,
			jobs,
		}
	}
}

async fn run_job_once(
	job: &Arc<dyn Job>,
	history: &RunHistory,
	triggered_by: TriggerSource,
) -> Result<String> {
	let run_id = uuid::Uuid::new_v4().to_string();
	execute(job, history, &run_id, triggered_by, 0).await
}

async fn run_job_with_retry(
	job: &Arc<dyn Job>,
	history: &RunHistory,
	triggered_by: TriggerSource,
) -> Result<String> {
	let run_id = uuid::Uuid::new_v4().to_string();
	let mut retry_count = 0u32;

	loop {
		let trigger = if retry_count > 0 {
			TriggerSource::Retry
		} else {
			triggered_by
		};

		match execute(job, history, &run_id, trigger, retry_count).await {
			Err(JobError::Failed {
				message,
				retryable: true,
			}) if retry_count < MAX_RETRIES => {
				retry_count += 1;
				let delay_ms = calculate_backoff_delay(retry_count);
				warn!(
					job_id = %job.id(),
					run_id = %run_id,
					retry_count,
					delay_ms,
					error = %message,
					"Job failed, retrying"
				);
				tokio::time::sleep(Duration::from_millis(delay_ms)).await;
			}
			outcome => return outcome,
		}
	}
}

async fn execute(
	job: &Arc<dyn Job>,
	history: &RunHistory,
	run_id: &str,
	triggered_by: TriggerSource,
	retry_count: u32,
) -> Result<String> {
	let ctx = JobContext {
		run_id: run_id.to_string(),
		triggered_by,
	};

	if retry_count == 0 {
		history
			.record_run_start(&JobRun::started(job.id(), run_id, triggered_by))
			.await;
	} else {
		history.record_retry(job.id(), run_id, retry_count).await;
	}

	match job.run(&ctx).await {
		Ok(output) => {
			history
				.record_run_complete(job.id(), run_id, JobStatus::Succeeded, None, output.metadata)
				.await;
			debug!(job_id = %job.id(), run_id = %run_id, message = %output.message, "Job completed");
			Ok(run_id.to_string())
		}
		Err(e) => {
			let message = e.to_string();
			history
				.record_run_complete(job.id(), run_id, JobStatus::Failed, Some(message.clone()), None)
				.await;
			warn!(job_id = %job.id(), run_id = %run_id, error = %message, "Job failed");
			Err(e)
		}
	}
}

pub(crate) fn calculate_backoff_delay(retry_count: u32) -> u64 {
	let delay = BASE_RETRY_DELAY_MS as f64 * RETRY_FACTOR.powi(retry_count as i32 - 1);
	(delay as u64).min(MAX_RETRY_DELAY_MS)
}
