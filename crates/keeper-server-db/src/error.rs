// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use keeper_common_vault::VaultError;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Conflict: {0}")]
	Conflict(String),

	#[error("Internal: {0}")]
	Internal(String),

	#[error("Malformed record: {0}")]
	Record(#[from] VaultError),
}

impl DbError {
	pub fn is_unique_violation(&self) -> bool {
		matches!(self, DbError::Sqlx(sqlx::Error::Database(e)) if e.is_unique_violation())
	}

	/// Failures of the pool or connection rather than of a statement.
	pub fn is_unavailable(&self) -> bool {
		matches!(
			self,
			DbError::Sqlx(
				sqlx::Error::PoolTimedOut
					| sqlx::Error::PoolClosed
					| sqlx::Error::Io(_)
					| sqlx::Error::WorkerCrashed
			)
		)
	}
}

pub type Result<T> = std::result::Result<T, DbError>;
