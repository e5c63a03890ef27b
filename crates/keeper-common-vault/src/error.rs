// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
	#[error("unknown secret kind: {0}")]
	UnknownKind(String),

	#[error("record has no uid")]
	MissingUid,

	#[error("malformed {kind} row: {message}")]
	MalformedRow { kind: &'static str, message: String },

	#[error("malformed record: {0}")]
	Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, VaultError>;
