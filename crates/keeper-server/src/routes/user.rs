// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Account registration, login and removal.
//!
//! Every credential failure answers with the same message so callers cannot
//! tell an unknown login from a wrong password.

use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::response::IntoResponse;
use axum::Json;
use keeper_server_db::DbError;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::api::AppState;
use crate::api_response::Accepted;
use crate::error::{KeeperError, Result};
use crate::extract::GzipBody;

#[derive(Clone, Deserialize, Serialize)]
pub struct Credentials {
	#[serde(alias = "name")]
	pub login: String,
	pub password: String,
}

impl std::fmt::Debug for Credentials {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Credentials")
			.field("login", &self.login)
			.field("password", &keeper_common_crypto::REDACTED)
			.finish()
	}
}

impl Credentials {
	fn from_body(body: &GzipBody) -> Result<Self> {
		let creds: Credentials = body.json()?;
		if creds.login.trim().is_empty() || creds.password.is_empty() {
			return Err(KeeperError::InvalidFormat(
				"login and password are required".to_string(),
			));
		}
		Ok(creds)
	}
}

fn with_token(token: String) -> impl IntoResponse {
	([(AUTHORIZATION, token)], Accepted::ok())
}

/// POST /api/user/register
#[instrument(skip_all)]
pub async fn register(State(state): State<AppState>, body: GzipBody) -> Result<impl IntoResponse> {
	let creds = Credentials::from_body(&body)?;
	state.login_limiter.check(&creds.login).await?;

	let hash = state.hasher.hash(&creds.password);
	match state.users.create_user(&creds.login, &hash).await {
		Ok(_) => {}
		Err(DbError::Conflict(_)) => {
			tracing::info!(login = %creds.login, "registration rejected, login taken");
			return Err(KeeperError::LoginBusy);
		}
		Err(e) => return Err(e.into()),
	}

	let token = state.tokens.issue(&creds.login)?;
	tracing::info!(login = %creds.login, "user registered");
	Ok(with_token(token))
}

/// POST /api/user/login
#[instrument(skip_all)]
pub async fn login(State(state): State<AppState>, body: GzipBody) -> Result<impl IntoResponse> {
	let creds = Credentials::from_body(&body)?;
	state.login_limiter.check(&creds.login).await?;
	verify_credentials(&state, &creds).await?;

	let token = state.tokens.issue(&creds.login)?;
	tracing::info!(login = %creds.login, "user logged in");
	Ok(with_token(token))
}

/// DELETE /api/user
///
/// Removes the account and everything it owns, pending writes included.
#[instrument(skip_all)]
pub async fn delete_account(State(state): State<AppState>, body: GzipBody) -> Result<Json<Accepted>> {
	let creds = Credentials::from_body(&body)?;
	state.login_limiter.check(&creds.login).await?;
	verify_credentials(&state, &creds).await?;

	let mut staging = state.staging.lock().await;
	let discarded = staging.discard_owner(&creds.login);
	state.users.delete_user(&creds.login).await?;
	drop(staging);

	tracing::info!(login = %creds.login, discarded, "account deleted");
	Ok(Accepted::ok())
}

async fn verify_credentials(state: &AppState, creds: &Credentials) -> Result<()> {
	let stored = state.users.get_password_hash(&creds.login).await?;
	match stored {
		Some(hash) if state.hasher.verify(&creds.password, &hash) => Ok(()),
		_ => {
			tracing::debug!(login = %creds.login, "credential check failed");
			Err(KeeperError::InvalidCredential)
		}
	}
}
