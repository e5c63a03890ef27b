// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

pub mod flush;

use std::sync::Arc;

use keeper_server_jobs::JobScheduler;

use crate::api::AppState;

pub use flush::{FlushJob, FLUSH_JOB_ID};

/// Scheduler with every background job of the server registered.
pub fn create_scheduler(state: &AppState) -> JobScheduler {
	let mut scheduler = JobScheduler::default();
	let flush = &state.config.flush;
	scheduler.register_periodic(
		Arc::new(FlushJob::new(
			Arc::clone(&state.store),
			Arc::clone(&state.staging),
			flush.clone(),
		)),
		flush.interval,
	);
	scheduler
}
