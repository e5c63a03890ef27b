// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Runs [`Instruction`]s against SQLite.
//!
//! Nothing here knows about record kinds. Arguments are bound positionally
//! and result rows come back as plain [`Value`] lists.

use keeper_common_vault::{Instruction, Value};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use sqlx::{Executor, Row, TypeInfo, ValueRef};

use crate::error::Result;

fn bind<'q>(instruction: &'q Instruction) -> Query<'q, Sqlite, SqliteArguments<'q>> {
	instruction
		.args
		.iter()
		.fold(sqlx::query(&instruction.sql), |query, arg| match arg {
			Value::Text(s) => query.bind(s.as_str()),
			Value::Integer(i) => query.bind(*i),
			Value::Null => query.bind(Option::<String>::None),
		})
}

/// Run a statement, returning the number of affected rows.
pub async fn execute<'c, E>(executor: E, instruction: &Instruction) -> Result<u64>
where
	E: Executor<'c, Database = Sqlite>,
{
	let result = bind(instruction).execute(executor).await?;
	Ok(result.rows_affected())
}

/// Whether the statement yields at least one row.
pub async fn exists<'c, E>(executor: E, instruction: &Instruction) -> Result<bool>
where
	E: Executor<'c, Database = Sqlite>,
{
	Ok(bind(instruction).fetch_optional(executor).await?.is_some())
}

pub async fn fetch_rows<'c, E>(executor: E, instruction: &Instruction) -> Result<Vec<Vec<Value>>>
where
	E: Executor<'c, Database = Sqlite>,
{
	let rows = bind(instruction).fetch_all(executor).await?;
	rows.iter().map(row_values).collect()
}

fn row_values(row: &SqliteRow) -> Result<Vec<Value>> {
	(0..row.len())
		.map(|i| {
			let storage = {
				let raw = row.try_get_raw(i)?;
				if raw.is_null() {
					return Ok(Value::Null);
				}
				raw.type_info().name().to_string()
			};
			Ok(match storage.as_str() {
				"INTEGER" => Value::Integer(row.try_get::<i64, _>(i)?),
				_ => Value::Text(row.try_get::<String, _>(i)?),
			})
		})
		.collect()
}
