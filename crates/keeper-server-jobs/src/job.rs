// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;

use crate::context::JobContext;
use crate::error::JobError;
use crate::types::JobOutput;

/// Periodic background work driven by the [`crate::JobScheduler`].
#[async_trait]
pub trait Job: Send + Sync {
	/// Stable key for history and health reporting.
	fn id(&self) -> &str;

	fn name(&self) -> &str {
		self.id()
	}

	/// One pass. A `Failed { retryable: true }` error is retried with backoff.
	async fn run(&self, ctx: &JobContext) -> Result<JobOutput, JobError>;
}
