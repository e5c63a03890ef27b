// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
	#[error("missing bearer token")]
	MissingToken,

	#[error("invalid bearer token: {0}")]
	InvalidToken(String),

	#[error("bearer token expired")]
	Expired,

	#[error("bearer token is not authorized")]
	NotAuthorized,

	#[error("failed to sign token: {0}")]
	Signing(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;
