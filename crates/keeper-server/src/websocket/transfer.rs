// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Chunked file transfer channels.
//!
//! Upload: the client streams one [`FileChunk`] frame per block and closes
//! the socket when done. The first frame that cannot be decoded or stored
//! ends the upload with a non-normal close naming the error code. Download: the server streams every stored block of
//! the file named by the `UID` header, then closes. Blocks carry their own
//! offset, so neither side depends on frame order.

use std::collections::HashSet;
use std::time::Duration;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use keeper_common_vault::FileChunk;
use keeper_server_auth::UID_HEADER;
use tracing::{debug, info, instrument, warn};

use super::frame;
use crate::api::AppState;
use crate::auth_middleware::resolve_owner;
use crate::error::KeeperError;

const CLOSE_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn upload_upgrade_handler(
	ws: WebSocketUpgrade,
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Response, KeeperError> {
	let owner = resolve_owner(&state, &headers).await?;
	debug!(owner = %owner, "upload socket upgrade requested");
	Ok(ws.on_upgrade(move |socket| handle_upload(socket, state, owner)))
}

pub async fn download_upgrade_handler(
	ws: WebSocketUpgrade,
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Response, KeeperError> {
	let owner = resolve_owner(&state, &headers).await?;
	let uid = headers
		.get(UID_HEADER)
		.and_then(|v| v.to_str().ok())
		.map(str::trim)
		.filter(|v| !v.is_empty())
		.ok_or_else(|| KeeperError::InvalidFormat(format!("missing {UID_HEADER} header")))?
		.to_string();

	match state.file_owner(&uid).await? {
		Some(existing) if existing == owner => {}
		Some(_) => {
			return Err(KeeperError::Conflict(format!("file {uid} belongs to another account")));
		}
		None => return Err(KeeperError::NoContent),
	}

	debug!(owner = %owner, uid = %uid, "download socket upgrade requested");
	Ok(ws.on_upgrade(move |socket| handle_download(socket, state, owner, uid)))
}

#[instrument(skip(socket, state))]
async fn handle_upload(mut socket: WebSocket, state: AppState, owner: String) {
	let mut claimed: HashSet<String> = HashSet::new();
	let mut stored = 0usize;

	while let Some(msg) = socket.recv().await {
		let msg = match msg {
			Ok(Message::Close(_)) => break,
			Ok(msg) => msg,
			Err(e) => {
				debug!(error = %e, "upload socket error");
				break;
			}
		};
		let Some(payload) = frame::payload(&msg) else {
			continue;
		};

		if let Err(e) = store_chunk(&state, &owner, &mut claimed, payload).await {
			warn!(error = %e, stored, "upload aborted");
			let code = if matches!(e, KeeperError::ServerFault(_)) {
				close_code::ERROR
			} else {
				close_code::POLICY
			};
			let close = CloseFrame {
				code,
				reason: e.code().into(),
			};
			let _ = socket.send(Message::Close(Some(close))).await;
			// Discard what the client already had in flight until it acknowledges.
			let _ = tokio::time::timeout(CLOSE_DRAIN_TIMEOUT, async {
				while let Some(Ok(msg)) = socket.recv().await {
					if matches!(msg, Message::Close(_)) {
						break;
					}
				}
			})
			.await;
			return;
		}
		stored += 1;
	}

	info!(chunks = stored, "upload finished");
}

/// Decode and persist one chunk frame. Any error ends the upload, since a
/// skipped block would leave a hole in the file.
async fn store_chunk(
	state: &AppState,
	owner: &str,
	claimed: &mut HashSet<String>,
	payload: Result<Vec<u8>, KeeperError>,
) -> Result<(), KeeperError> {
	let chunk: FileChunk = frame::decode(&payload?)?;
	if chunk.file_uid.trim().is_empty() {
		return Err(KeeperError::InvalidFormat("chunk without uid".to_string()));
	}

	if !claimed.contains(&chunk.file_uid) {
		match state.file_owner(&chunk.file_uid).await? {
			Some(existing) if existing == owner => {}
			Some(_) => {
				return Err(KeeperError::Conflict(format!(
					"file {} belongs to another account",
					chunk.file_uid
				)));
			}
			None => {
				debug!(uid = %chunk.file_uid, "chunk for a file without metadata");
				return Err(KeeperError::NoContent);
			}
		}
		claimed.insert(chunk.file_uid.clone());
	}

	state
		.chunks
		.insert_chunk(&chunk)
		.await
		.map_err(|e| KeeperError::ServerFault(format!("storing chunk {}: {e}", chunk.portion)))?;
	debug!(uid = %chunk.file_uid, portion = chunk.portion, len = chunk.len, "chunk stored");
	Ok(())
}

#[instrument(skip(socket, state))]
async fn handle_download(socket: WebSocket, state: AppState, owner: String, uid: String) {
	let (mut sender, mut receiver) = socket.split();

	let chunks = match state.chunks.select_chunks(&uid).await {
		Ok(chunks) => chunks,
		Err(e) => {
			warn!(error = %e, "failed to read file chunks");
			let close = CloseFrame {
				code: close_code::ERROR,
				reason: "server_fault".into(),
			};
			let _ = sender.send(Message::Close(Some(close))).await;
			return;
		}
	};

	let total = chunks.len();
	for chunk in &chunks {
		let msg = match frame::encode(chunk) {
			Ok(msg) => msg,
			Err(e) => {
				warn!(error = %e, portion = chunk.portion, "failed to encode chunk");
				return;
			}
		};
		if let Err(e) = sender.send(msg).await {
			debug!(error = %e, "download socket closed early");
			return;
		}
	}

	let close = CloseFrame {
		code: close_code::NORMAL,
		reason: "done".into(),
	};
	let _ = sender.send(Message::Close(Some(close))).await;

	// Drain until the client acknowledges the close.
	while let Some(Ok(msg)) = receiver.next().await {
		if matches!(msg, Message::Close(_)) {
			break;
		}
	}
	info!(chunks = total, "download finished");
}
