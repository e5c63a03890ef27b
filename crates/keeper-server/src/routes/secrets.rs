// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Record write endpoints.
//!
//! Writes only reach the staging cache here. The flush job persists them.

use axum::extract::State;
use axum::Json;
use keeper_common_vault::{Secret, SecretKind};

use crate::api::AppState;
use crate::api_response::Accepted;
use crate::auth_middleware::RequireOwner;
use crate::error::{KeeperError, Result};
use crate::extract::GzipBody;

/// POST /api/user/pairs
pub async fn put_pair(
	State(state): State<AppState>,
	owner: RequireOwner,
	body: GzipBody,
) -> Result<Json<Accepted>> {
	stage(&state, SecretKind::CredentialPair, &owner, &body).await
}

/// POST /api/user/text
pub async fn put_note(
	State(state): State<AppState>,
	owner: RequireOwner,
	body: GzipBody,
) -> Result<Json<Accepted>> {
	stage(&state, SecretKind::Note, &owner, &body).await
}

/// POST /api/user/binary
pub async fn put_file(
	State(state): State<AppState>,
	owner: RequireOwner,
	body: GzipBody,
) -> Result<Json<Accepted>> {
	stage(&state, SecretKind::FileBlob, &owner, &body).await
}

/// POST /api/user/card
pub async fn put_card(
	State(state): State<AppState>,
	owner: RequireOwner,
	body: GzipBody,
) -> Result<Json<Accepted>> {
	stage(&state, SecretKind::PaymentCard, &owner, &body).await
}

#[tracing::instrument(skip(state, body), fields(kind = %kind, owner = %owner.as_str()))]
async fn stage(
	state: &AppState,
	kind: SecretKind,
	owner: &RequireOwner,
	body: &GzipBody,
) -> Result<Json<Accepted>> {
	let mut secret = Secret::from_json(kind, &body.0)?;
	secret.validate()?;
	secret.set_owner(owner.as_str());

	// File blocks are keyed by uid alone, so a uid stays with its first owner.
	let is_file = kind == SecretKind::FileBlob;
	if is_file {
		claim_file(state.chunks.file_owner(secret.uid()).await?, owner, secret.uid())?;
	}

	let uid = secret.uid().to_string();
	let event = secret.event();
	let pending = {
		let mut staging = state.staging.lock().await;
		if is_file {
			let staged = staging.get(kind, &uid).map(|s| s.owner().to_string());
			claim_file(staged, owner, &uid)?;
		}
		secret.stage_into(&mut staging);
		staging.len()
	};
	tracing::debug!(uid = %uid, event = %event, pending, "record staged");
	Ok(Accepted::ok())
}

fn claim_file(existing: Option<String>, owner: &RequireOwner, uid: &str) -> Result<()> {
	match existing {
		Some(existing) if existing != owner.as_str() => Err(KeeperError::Conflict(format!(
			"file {uid} belongs to another account"
		))),
		_ => Ok(()),
	}
}
