// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Periodic write-back of the staging cache.
//!
//! The sweep holds the staging lock from the first record to the last, so a
//! handler staging a record either lands before the sweep (and is written by
//! it) or waits for the next one. Each record gets exactly one store call.

use std::sync::Arc;

use async_trait::async_trait;
use keeper_common_vault::StagingCache;
use keeper_server_config::{FailurePolicy, FlushConfig};
use keeper_server_db::SecretStore;
use keeper_server_jobs::{Job, JobContext, JobError, JobOutput};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

pub const FLUSH_JOB_ID: &str = "staging-flush";

pub struct FlushJob {
	store: Arc<dyn SecretStore>,
	staging: Arc<Mutex<StagingCache>>,
	config: FlushConfig,
}

impl FlushJob {
	pub fn new(store: Arc<dyn SecretStore>, staging: Arc<Mutex<StagingCache>>, config: FlushConfig) -> Self {
		Self {
			store,
			staging,
			config,
		}
	}
}

#[async_trait]
impl Job for FlushJob {
	fn id(&self) -> &str {
		FLUSH_JOB_ID
	}

	fn name(&self) -> &str {
		"Staging Flush"
	}

	#[instrument(skip(self, ctx), fields(job_id = FLUSH_JOB_ID, policy = %self.config.failure_policy))]
	async fn run(&self, ctx: &JobContext) -> Result<JobOutput, JobError> {
		let mut staging = self.staging.lock().await;
		let pending = staging.take_all();
		let total = pending.len();
		if ctx.is_final() && total > 0 {
			info!(total, "final flush before shutdown");
		}
		let mut applied = 0usize;
		let mut failed = 0usize;

		for secret in pending {
			let outcome = tokio::time::timeout(self.config.store_timeout, self.store.apply(&secret)).await;
			let error = match outcome {
				Ok(Ok(())) => {
					staging.clear_failures(&secret);
					applied += 1;
					continue;
				}
				Ok(Err(e)) => e.to_string(),
				Err(_) => format!("store call exceeded {:?}", self.config.store_timeout),
			};

			failed += 1;
			warn!(
				kind = %secret.kind(),
				uid = %secret.uid(),
				event = %secret.event(),
				error = %error,
				"flush of staged record failed"
			);
			match self.config.failure_policy {
				FailurePolicy::Retry => {
					let attempts = staging.record_failure(&secret);
					if attempts >= self.config.max_attempts {
						warn!(uid = %secret.uid(), attempts, "giving up on staged record");
						staging.push_dead_letter(secret, error);
					} else {
						staging.restage(secret);
					}
				}
				FailurePolicy::DeadLetter => staging.push_dead_letter(secret, error),
			}
		}
		let still_pending = staging.len();
		drop(staging);

		if total > 0 {
			debug!(total, applied, failed, still_pending, "flush sweep finished");
		}

		let metadata = serde_json::json!({
			"applied": applied,
			"failed": failed,
		});
		if failed > 0 {
			let mut message = format!("{failed} of {total} staged records failed to flush");
			if ctx.is_final() {
				warn!(failed, "staged records lost at shutdown");
				message.push_str("; lost at shutdown");
			}
			// Not retryable here: the next scheduled sweep is the retry.
			return Err(JobError::failed(message));
		}

		Ok(JobOutput::new(format!("flushed {applied} staged records")).with_metadata(metadata))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::BTreeMap;
	use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
	use std::time::Duration;

	use keeper_common_vault::{CredentialPair, Event, Note, Secret, SecretKind, SecretRecord};
	use keeper_server_db::testing::create_test_pool;
	use keeper_server_db::{DbError, SecretRepository};
	use keeper_server_jobs::TriggerSource;

	fn ctx() -> JobContext {
		JobContext::new(TriggerSource::Manual)
	}

	fn note(uid: &str, text: &str, event: Event) -> Secret {
		Note {
			owner: "test".to_string(),
			uid: uid.to_string(),
			text: text.to_string(),
			event,
		}
		.into_secret()
	}

	/// Store that counts calls and fails while `broken` is set.
	#[derive(Default)]
	struct FlakyStore {
		calls: AtomicUsize,
		broken: AtomicBool,
	}

	#[async_trait]
	impl SecretStore for FlakyStore {
		async fn check_existence(&self, _: &Secret) -> keeper_server_db::Result<bool> {
			Ok(false)
		}
		async fn insert(&self, _: &Secret) -> keeper_server_db::Result<()> {
			Ok(())
		}
		async fn update(&self, _: &Secret) -> keeper_server_db::Result<()> {
			Ok(())
		}
		async fn upsert(&self, _: &Secret) -> keeper_server_db::Result<()> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			if self.broken.load(Ordering::SeqCst) {
				return Err(DbError::Internal("store offline".to_string()));
			}
			Ok(())
		}
		async fn delete(&self, _: &Secret) -> keeper_server_db::Result<()> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			Ok(())
		}
		async fn select(&self, _: SecretKind, _: &str) -> keeper_server_db::Result<BTreeMap<String, Secret>> {
			Ok(BTreeMap::new())
		}
	}

	fn job(store: Arc<dyn SecretStore>, policy: FailurePolicy) -> (FlushJob, Arc<Mutex<StagingCache>>) {
		let staging = Arc::new(Mutex::new(StagingCache::new()));
		let config = FlushConfig {
			failure_policy: policy,
			..FlushConfig::default()
		};
		(FlushJob::new(store, Arc::clone(&staging), config), staging)
	}

	#[tokio::test]
	async fn coalesced_writes_reach_store_once() {
		let store = Arc::new(FlakyStore::default());
		let (job, staging) = job(store.clone(), FailurePolicy::Retry);
		{
			let mut cache = staging.lock().await;
			cache.stage(note("n1", "a", Event::Upsert));
			cache.stage(note("n1", "b", Event::Upsert));
			cache.stage(note("n1", "c", Event::Delete));
			cache.stage(note("n2", "x", Event::Upsert));
		}

		let output = job.run(&ctx()).await.unwrap();
		assert_eq!(store.calls.load(Ordering::SeqCst), 2);
		assert_eq!(output.metadata.unwrap()["applied"], 2);
		assert!(staging.lock().await.is_empty());
	}

	#[tokio::test]
	async fn retry_policy_keeps_failed_records_staged() {
		let store = Arc::new(FlakyStore::default());
		store.broken.store(true, Ordering::SeqCst);
		let (job, staging) = job(store.clone(), FailurePolicy::Retry);
		staging.lock().await.stage(note("n1", "a", Event::Upsert));

		let err = job.run(&ctx()).await.unwrap_err();
		assert!(matches!(err, JobError::Failed { retryable: false, .. }));
		assert_eq!(staging.lock().await.len(), 1);

		store.broken.store(false, Ordering::SeqCst);
		job.run(&ctx()).await.unwrap();
		assert!(staging.lock().await.is_empty());
		assert_eq!(store.calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn retry_gives_up_after_max_attempts() {
		let store = Arc::new(FlakyStore::default());
		store.broken.store(true, Ordering::SeqCst);
		let staging = Arc::new(Mutex::new(StagingCache::new()));
		let config = FlushConfig {
			max_attempts: 3,
			..FlushConfig::default()
		};
		let job = FlushJob::new(store.clone(), Arc::clone(&staging), config);
		staging.lock().await.stage(note("n1", "a", Event::Upsert));

		for attempt in 1..3 {
			assert!(job.run(&ctx()).await.is_err());
			let cache = staging.lock().await;
			assert_eq!(cache.len(), 1, "still staged after attempt {attempt}");
			assert_eq!(cache.failures(SecretKind::Note, "n1"), attempt);
		}

		assert!(job.run(&ctx()).await.is_err());
		let cache = staging.lock().await;
		assert!(cache.is_empty());
		assert_eq!(cache.dead_letter_count(), 1);
		assert_eq!(store.calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn dead_letter_policy_drops_failed_records() {
		let store = Arc::new(FlakyStore::default());
		store.broken.store(true, Ordering::SeqCst);
		let (job, staging) = job(store, FailurePolicy::DeadLetter);
		staging.lock().await.stage(note("n1", "a", Event::Upsert));

		assert!(job.run(&ctx()).await.is_err());
		let cache = staging.lock().await;
		assert!(cache.is_empty());
		assert_eq!(cache.dead_letter_count(), 1);
		let letter = cache.dead_letters().next().unwrap();
		assert_eq!(letter.secret.uid(), "n1");
		assert!(letter.error.contains("store offline"));
	}

	#[tokio::test]
	async fn final_sweep_reports_what_it_could_not_write() {
		let store = Arc::new(FlakyStore::default());
		let (job, staging) = job(store.clone(), FailurePolicy::Retry);
		staging.lock().await.stage(note("n1", "a", Event::Upsert));

		let shutdown = JobContext::new(TriggerSource::Shutdown);
		job.run(&shutdown).await.unwrap();
		assert!(staging.lock().await.is_empty());

		store.broken.store(true, Ordering::SeqCst);
		staging.lock().await.stage(note("n2", "b", Event::Upsert));
		match job.run(&shutdown).await {
			Err(JobError::Failed { message, .. }) => assert!(message.contains("lost at shutdown")),
			other => panic!("expected failure, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn sweep_persists_to_sqlite() {
		let repo = Arc::new(SecretRepository::new(create_test_pool().await));
		let (job, staging) = job(repo.clone(), FailurePolicy::Retry);
		let pair = CredentialPair {
			owner: "test".to_string(),
			uid: "bf340769-687e-485e-968b-976cf12f7b64".to_string(),
			type_pair: "site".to_string(),
			name: "enc-name".to_string(),
			password: "enc-pass".to_string(),
			event: Event::Upsert,
		}
		.into_secret();
		staging.lock().await.stage(pair.clone());

		job.run(&ctx()).await.unwrap();
		let rows = repo.select(SecretKind::CredentialPair, "test").await.unwrap();
		assert_eq!(rows.get(pair.uid()), Some(&pair));
	}

	#[tokio::test(start_paused = true)]
	async fn slow_store_call_is_bounded() {
		struct StuckStore;

		#[async_trait]
		impl SecretStore for StuckStore {
			async fn check_existence(&self, _: &Secret) -> keeper_server_db::Result<bool> {
				Ok(false)
			}
			async fn insert(&self, _: &Secret) -> keeper_server_db::Result<()> {
				Ok(())
			}
			async fn update(&self, _: &Secret) -> keeper_server_db::Result<()> {
				Ok(())
			}
			async fn upsert(&self, _: &Secret) -> keeper_server_db::Result<()> {
				tokio::time::sleep(Duration::from_secs(3600)).await;
				Ok(())
			}
			async fn delete(&self, _: &Secret) -> keeper_server_db::Result<()> {
				Ok(())
			}
			async fn select(&self, _: SecretKind, _: &str) -> keeper_server_db::Result<BTreeMap<String, Secret>> {
				Ok(BTreeMap::new())
			}
		}

		let (job, staging) = job(Arc::new(StuckStore), FailurePolicy::Retry);
		staging.lock().await.stage(note("n1", "a", Event::Upsert));

		assert!(job.run(&ctx()).await.is_err());
		assert_eq!(staging.lock().await.len(), 1);
	}
}
