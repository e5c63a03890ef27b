// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Token-bucket limiter for register and login attempts, keyed by login name.
//!
//! Logins come from unauthenticated requests, so the map is bounded: once it
//! holds `max_tracked` entries, buckets that have refilled completely are
//! dropped. A full bucket behaves exactly like a fresh one, so eviction never
//! loosens the limit.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::KeeperError;

#[derive(Debug, Clone)]
struct TokenBucket {
	tokens: f64,
	last_refill: Instant,
}

pub const DEFAULT_MAX_TRACKED: usize = 10_000;

#[derive(Debug, Clone)]
pub struct LoginRateLimiter {
	buckets: Arc<Mutex<HashMap<String, TokenBucket>>>,
	refill_rate: f64,
	max_tokens: u32,
	max_tracked: usize,
}

impl LoginRateLimiter {
	pub fn per_minute(attempts: u32) -> Self {
		Self::with_rate(f64::from(attempts) / 60.0, attempts)
	}

	/// `refill_rate` is in tokens per second.
	pub fn with_rate(refill_rate: f64, max_tokens: u32) -> Self {
		Self {
			buckets: Arc::new(Mutex::new(HashMap::new())),
			refill_rate,
			max_tokens: max_tokens.max(1),
			max_tracked: DEFAULT_MAX_TRACKED,
		}
	}

	pub fn with_max_tracked(mut self, max_tracked: usize) -> Self {
		self.max_tracked = max_tracked;
		self
	}

	/// Number of logins currently holding a bucket.
	pub async fn tracked(&self) -> usize {
		self.buckets.lock().await.len()
	}

	fn refilled(&self, bucket: &TokenBucket, now: Instant) -> f64 {
		let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
		(bucket.tokens + elapsed * self.refill_rate).min(f64::from(self.max_tokens))
	}

	pub async fn check(&self, login: &str) -> Result<(), KeeperError> {
		let mut buckets = self.buckets.lock().await;
		let now = Instant::now();

		if buckets.len() >= self.max_tracked && !buckets.contains_key(login) {
			let before = buckets.len();
			let full = f64::from(self.max_tokens);
			buckets.retain(|_, b| self.refilled(b, now) < full);
			debug!(evicted = before - buckets.len(), "evicted idle login buckets");
		}

		let bucket = buckets.entry(login.to_string()).or_insert_with(|| TokenBucket {
			tokens: f64::from(self.max_tokens),
			last_refill: now,
		});

		bucket.tokens = self.refilled(bucket, now);
		bucket.last_refill = now;

		if bucket.tokens >= 1.0 {
			bucket.tokens -= 1.0;
			Ok(())
		} else {
			debug!(login = %login, "login attempts exhausted");
			Err(KeeperError::RateLimited)
		}
	}
}
