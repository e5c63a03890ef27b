// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::types::TriggerSource;

/// What a job knows about the run it is executing.
pub struct JobContext {
	/// Shared by a run and all of its retries.
	pub run_id: String,
	pub triggered_by: TriggerSource,
}

impl JobContext {
	pub fn new(triggered_by: TriggerSource) -> Self {
		Self {
			run_id: uuid::Uuid::new_v4().to_string(),
			triggered_by,
		}
	}

	/// The run made while the scheduler shuts down. Nothing runs after it.
	pub fn is_final(&self) -> bool {
		self.triggered_by == TriggerSource::Shutdown
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn only_shutdown_run_is_final() {
		assert!(JobContext::new(TriggerSource::Shutdown).is_final());
		for source in [TriggerSource::Schedule, TriggerSource::Manual, TriggerSource::Retry] {
			assert!(!JobContext::new(source).is_final());
		}
	}

	#[test]
	fn each_context_gets_its_own_run_id() {
		let a = JobContext::new(TriggerSource::Manual);
		let b = JobContext::new(TriggerSource::Manual);
		assert_ne!(a.run_id, b.run_id);
	}
}
