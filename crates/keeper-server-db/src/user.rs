// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, SecondsFormat, Utc};
use keeper_common_vault::SecretKind;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use crate::error::{DbError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
	pub name: String,
	pub password_hash: String,
	pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct UserRepository {
	pool: SqlitePool,
}

impl UserRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Register a new account. A taken name is a [`DbError::Conflict`].
	#[tracing::instrument(skip(self, password_hash), fields(user = %name))]
	pub async fn create_user(&self, name: &str, password_hash: &str) -> Result<UserRecord> {
		let created_at = Utc::now();
		sqlx::query("INSERT INTO users (name, password_hash, created_at) VALUES (?1, ?2, ?3)")
			.bind(name)
			.bind(password_hash)
			.bind(created_at.to_rfc3339_opts(SecondsFormat::AutoSi, true))
			.execute(&self.pool)
			.await
			.map_err(|e| match e {
				sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
					DbError::Conflict(format!("user {name} already exists"))
				}
				_ => DbError::Sqlx(e),
			})?;

		Ok(UserRecord {
			name: name.to_string(),
			password_hash: password_hash.to_string(),
			created_at,
		})
	}

	#[tracing::instrument(skip(self), fields(user = %name))]
	pub async fn find_user(&self, name: &str) -> Result<Option<UserRecord>> {
		let row = sqlx::query("SELECT name, password_hash, created_at FROM users WHERE name = ?1")
			.bind(name)
			.fetch_optional(&self.pool)
			.await?;

		row.map(|r| {
			let created_at: String = r.try_get("created_at")?;
			Ok(UserRecord {
				name: r.try_get("name")?,
				password_hash: r.try_get("password_hash")?,
				created_at: DateTime::parse_from_rfc3339(&created_at)
					.map_err(|e| DbError::Internal(format!("bad created_at for {name}: {e}")))?
					.with_timezone(&Utc),
			})
		})
		.transpose()
	}

	pub async fn get_password_hash(&self, name: &str) -> Result<Option<String>> {
		Ok(self.find_user(name).await?.map(|u| u.password_hash))
	}

	/// Remove the account together with every record and file block it owns.
	/// Returns `false` if there was no such user.
	#[tracing::instrument(skip(self), fields(user = %name))]
	pub async fn delete_user(&self, name: &str) -> Result<bool> {
		let mut tx = self.pool.begin().await?;

		sqlx::query(
			r#"
			DELETE FROM file_chunks
			WHERE file_uid IN (SELECT uid FROM files WHERE owner = ?1)
			AND NOT EXISTS (
				SELECT 1 FROM files other
				WHERE other.uid = file_chunks.file_uid AND other.owner <> ?1
			)
			"#,
		)
		.bind(name)
		.execute(&mut *tx)
		.await?;

		for kind in SecretKind::ALL {
			sqlx::query(&format!("DELETE FROM {} WHERE owner = ?1", kind.table()))
				.bind(name)
				.execute(&mut *tx)
				.await?;
		}

		let removed = sqlx::query("DELETE FROM users WHERE name = ?1")
			.bind(name)
			.execute(&mut *tx)
			.await?
			.rows_affected();

		tx.commit().await?;
		tracing::info!(removed = removed > 0, "account deleted");
		Ok(removed > 0)
	}
}
