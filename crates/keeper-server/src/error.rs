// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Externally visible failure kinds and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use keeper_common_crypto::CryptoError;
use keeper_common_vault::VaultError;
use keeper_server_auth::AuthError;
use keeper_server_db::DbError;

use crate::api_response::{error_response, ErrorResponse};

/// Shown for every failed register or login, whatever the cause.
pub const INVALID_CREDENTIALS: &str = "invalid login or password";

#[derive(Debug, thiserror::Error)]
pub enum KeeperError {
	#[error("invalid format: {0}")]
	InvalidFormat(String),

	#[error("unauthenticated: {0}")]
	Unauthenticated(String),

	#[error("invalid login or password")]
	InvalidCredential,

	#[error("login is already taken")]
	LoginBusy,

	#[error("server fault: {0}")]
	ServerFault(String),

	#[error("conflict: {0}")]
	Conflict(String),

	#[error("no content")]
	NoContent,

	#[error("too many requests")]
	RateLimited,
}

impl KeeperError {
	pub fn status(&self) -> StatusCode {
		match self {
			KeeperError::InvalidFormat(_) => StatusCode::BAD_REQUEST,
			KeeperError::Unauthenticated(_) | KeeperError::InvalidCredential => StatusCode::UNAUTHORIZED,
			KeeperError::LoginBusy | KeeperError::Conflict(_) => StatusCode::CONFLICT,
			KeeperError::ServerFault(_) => StatusCode::INTERNAL_SERVER_ERROR,
			KeeperError::NoContent => StatusCode::NO_CONTENT,
			KeeperError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
		}
	}

	pub fn code(&self) -> &'static str {
		match self {
			KeeperError::InvalidFormat(_) => "invalid_format",
			KeeperError::Unauthenticated(_) => "unauthenticated",
			KeeperError::InvalidCredential => "invalid_credential",
			KeeperError::LoginBusy => "login_busy",
			KeeperError::ServerFault(_) => "server_fault",
			KeeperError::Conflict(_) => "conflict",
			KeeperError::NoContent => "no_content",
			KeeperError::RateLimited => "rate_limited",
		}
	}
}

impl From<DbError> for KeeperError {
	fn from(e: DbError) -> Self {
		if e.is_unavailable() {
			return KeeperError::ServerFault(e.to_string());
		}
		match e {
			DbError::NotFound(_) => KeeperError::NoContent,
			DbError::Conflict(msg) => KeeperError::Conflict(msg),
			DbError::Internal(msg) => KeeperError::ServerFault(msg),
			DbError::Record(e) => KeeperError::InvalidFormat(e.to_string()),
			DbError::Sqlx(e) => KeeperError::InvalidFormat(e.to_string()),
		}
	}
}

impl From<AuthError> for KeeperError {
	fn from(e: AuthError) -> Self {
		match e {
			AuthError::Signing(msg) => KeeperError::ServerFault(msg),
			other => KeeperError::Unauthenticated(other.to_string()),
		}
	}
}

impl From<VaultError> for KeeperError {
	fn from(e: VaultError) -> Self {
		KeeperError::InvalidFormat(e.to_string())
	}
}

impl From<CryptoError> for KeeperError {
	fn from(e: CryptoError) -> Self {
		KeeperError::InvalidFormat(e.to_string())
	}
}

impl From<serde_json::Error> for KeeperError {
	fn from(e: serde_json::Error) -> Self {
		KeeperError::InvalidFormat(e.to_string())
	}
}

impl IntoResponse for KeeperError {
	fn into_response(self) -> Response {
		let status = self.status();
		match &self {
			KeeperError::NoContent => return status.into_response(),
			KeeperError::ServerFault(msg) => {
				tracing::error!(error = %msg, "request failed with server fault");
			}
			other => {
				tracing::debug!(error = %other, status = status.as_u16(), "request rejected");
			}
		}

		let message = match &self {
			KeeperError::ServerFault(_) => "internal server error".to_string(),
			other => other.to_string(),
		};
		error_response::<ErrorResponse>(status, self.code(), message).into_response()
	}
}

pub type Result<T> = std::result::Result<T, KeeperError>;
