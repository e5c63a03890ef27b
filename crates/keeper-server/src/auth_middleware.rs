// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bearer-token extractor resolving the record owner.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use keeper_server_auth::{extract_bearer_token, AuthError};
use tracing::instrument;

use crate::api::AppState;
use crate::error::KeeperError;

/// The account a request acts for, taken from a verified bearer token.
///
/// Owners named in request bodies are never trusted; handlers stamp this
/// value onto every record they stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequireOwner(pub String);

impl RequireOwner {
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

/// Verify the bearer token in `headers` and return its owner.
pub async fn resolve_owner(state: &AppState, headers: &HeaderMap) -> Result<String, KeeperError> {
	let token = extract_bearer_token(headers).ok_or(AuthError::MissingToken)?;
	verify_owner(state, &token).await
}

/// Check the token signature and expiry, then that its account still exists.
/// A token issued before its account was deleted is refused.
pub async fn verify_owner(state: &AppState, token: &str) -> Result<String, KeeperError> {
	let claims = state.tokens.verify(token)?;
	if state.users.find_user(&claims.user).await?.is_none() {
		return Err(KeeperError::Unauthenticated(format!(
			"account {} no longer exists",
			claims.user
		)));
	}
	Ok(claims.user)
}

impl FromRequestParts<AppState> for RequireOwner {
	type Rejection = KeeperError;

	#[instrument(name = "RequireOwner::from_request_parts", skip_all)]
	async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
		match resolve_owner(state, &parts.headers).await {
			Ok(owner) => {
				tracing::debug!(owner = %owner, "bearer token accepted");
				Ok(RequireOwner(owner))
			}
			Err(e) => {
				tracing::debug!(error = %e, "bearer token rejected");
				Err(e)
			}
		}
	}
}
