// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Declarative store operations.
//!
//! An [`Instruction`] is a statement with positional placeholders (`?1`,
//! `?2`, ...) and the arguments that bind to them, in order. Records build
//! these; only the store adapter executes them.

use crate::error::{Result, VaultError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
	Text(String),
	Integer(i64),
	Null,
}

impl Value {
	pub fn text(s: impl Into<String>) -> Self {
		Value::Text(s.into())
	}

	pub fn opt_text(s: Option<&str>) -> Self {
		s.map_or(Value::Null, Value::text)
	}

	pub(crate) fn into_text(self, kind: &'static str, column: &str) -> Result<String> {
		match self {
			Value::Text(s) => Ok(s),
			Value::Integer(i) => Ok(i.to_string()),
			Value::Null => Err(VaultError::MalformedRow {
				kind,
				message: format!("column {column} is null"),
			}),
		}
	}

	pub(crate) fn into_opt_text(self) -> Option<String> {
		match self {
			Value::Text(s) => Some(s),
			Value::Integer(i) => Some(i.to_string()),
			Value::Null => None,
		}
	}

	pub(crate) fn into_integer(self, kind: &'static str, column: &str) -> Result<i64> {
		match self {
			Value::Integer(i) => Ok(i),
			Value::Text(s) => s.parse().map_err(|_| VaultError::MalformedRow {
				kind,
				message: format!("column {column} is not an integer: {s}"),
			}),
			Value::Null => Err(VaultError::MalformedRow {
				kind,
				message: format!("column {column} is null"),
			}),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
	pub sql: String,
	pub args: Vec<Value>,
}

impl Instruction {
	pub fn new(sql: impl Into<String>, args: Vec<Value>) -> Self {
		Self {
			sql: sql.into(),
			args,
		}
	}
}

/// `?1, ?2, ... ?n`
pub(crate) fn placeholders(from: usize, count: usize) -> String {
	(from..from + count)
		.map(|i| format!("?{i}"))
		.collect::<Vec<_>>()
		.join(", ")
}
