// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqliteSynchronous};
use std::str::FromStr;

use crate::error::DbError;

/// Create a SqlitePool with WAL mode and common settings.
///
/// # Arguments
/// * `database_url` - SQLite connection string (e.g., "sqlite:./keeper.db")
///
/// # Errors
/// Returns `DbError::Internal` if the URL is invalid or connection fails.
#[tracing::instrument(skip(database_url))]
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, DbError> {
	let options = SqliteConnectOptions::from_str(database_url)
		.map_err(|e| DbError::Internal(format!("Invalid database URL: {e}")))?
		.journal_mode(SqliteJournalMode::Wal)
		.synchronous(SqliteSynchronous::Normal)
		.foreign_keys(true)
		.create_if_missing(true);

	let pool = SqlitePool::connect_with(options).await?;

	tracing::debug!("database pool created");
	Ok(pool)
}

const SCHEMA: &[&str] = &[
	r#"
	CREATE TABLE IF NOT EXISTS users (
		name TEXT PRIMARY KEY,
		password_hash TEXT NOT NULL,
		created_at TEXT NOT NULL
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS credential_pairs (
		owner TEXT NOT NULL,
		uid TEXT NOT NULL,
		type_pair TEXT NOT NULL,
		name TEXT NOT NULL,
		password TEXT NOT NULL,
		PRIMARY KEY (owner, uid)
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS notes (
		owner TEXT NOT NULL,
		uid TEXT NOT NULL,
		body TEXT NOT NULL,
		PRIMARY KEY (owner, uid)
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS files (
		owner TEXT NOT NULL,
		uid TEXT NOT NULL,
		name TEXT NOT NULL,
		extension TEXT NOT NULL,
		size INTEGER NOT NULL,
		path TEXT NOT NULL,
		PRIMARY KEY (owner, uid)
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS file_chunks (
		file_uid TEXT NOT NULL,
		portion INTEGER NOT NULL,
		len INTEGER NOT NULL,
		body TEXT NOT NULL,
		UNIQUE (file_uid, portion)
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS payment_cards (
		owner TEXT NOT NULL,
		uid TEXT NOT NULL,
		number TEXT NOT NULL,
		cvc TEXT NOT NULL,
		expiry TEXT,
		PRIMARY KEY (owner, uid)
	)
	"#,
	"CREATE INDEX IF NOT EXISTS idx_files_uid ON files (uid)",
];

/// Create every table the server needs if it does not exist yet.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
	for statement in SCHEMA {
		sqlx::query(statement).execute(pool).await?;
	}
	tracing::debug!(statements = SCHEMA.len(), "schema ensured");
	Ok(())
}
