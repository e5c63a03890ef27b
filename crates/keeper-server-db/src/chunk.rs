// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use keeper_common_vault::FileChunk;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use tracing::instrument;

use crate::error::{DbError, Result};

/// Encrypted file blocks, keyed by `(file_uid, portion)`.
#[derive(Clone)]
pub struct ChunkRepository {
	pool: SqlitePool,
}

impl ChunkRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Store one block. Re-sending a portion replaces it.
	#[instrument(skip(self, chunk), fields(uid = %chunk.file_uid, portion = chunk.portion))]
	pub async fn insert_chunk(&self, chunk: &FileChunk) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO file_chunks (file_uid, portion, len, body)
			VALUES (?1, ?2, ?3, ?4)
			ON CONFLICT(file_uid, portion) DO UPDATE SET len = excluded.len, body = excluded.body
			"#,
		)
		.bind(&chunk.file_uid)
		.bind(to_i64(chunk.portion, "portion")?)
		.bind(to_i64(chunk.len, "len")?)
		.bind(&chunk.body)
		.execute(&self.pool)
		.await?;
		Ok(())
	}

	/// Every stored block of a file, in arrival order.
	#[instrument(skip(self))]
	pub async fn select_chunks(&self, file_uid: &str) -> Result<Vec<FileChunk>> {
		let rows = sqlx::query(
			"SELECT file_uid, portion, len, body FROM file_chunks WHERE file_uid = ?1 ORDER BY rowid",
		)
		.bind(file_uid)
		.fetch_all(&self.pool)
		.await?;

		rows.iter()
			.map(|row| {
				Ok(FileChunk {
					file_uid: row.try_get("file_uid")?,
					portion: to_u64(row.try_get("portion")?, "portion")?,
					len: to_u64(row.try_get("len")?, "len")?,
					body: row.try_get("body")?,
				})
			})
			.collect()
	}

	/// Owner of the file metadata row with this uid, once it has been flushed.
	#[instrument(skip(self))]
	pub async fn file_owner(&self, file_uid: &str) -> Result<Option<String>> {
		let owner: Option<(String,)> =
			sqlx::query_as("SELECT owner FROM files WHERE uid = ?1 LIMIT 1")
				.bind(file_uid)
				.fetch_optional(&self.pool)
				.await?;
		Ok(owner.map(|(o,)| o))
	}
}

fn to_i64(value: u64, field: &str) -> Result<i64> {
	i64::try_from(value).map_err(|_| DbError::Internal(format!("{field} {value} out of range")))
}

fn to_u64(value: i64, field: &str) -> Result<u64> {
	u64::try_from(value).map_err(|_| DbError::Internal(format!("negative {field} {value}")))
}
