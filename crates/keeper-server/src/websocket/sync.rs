// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Record sync channel.
//!
//! The client sends its bearer token whenever it wants a fresh view. Each
//! token is answered with one frame per record kind holding every persisted
//! record of that kind, then a terminator. Staged writes show up once the
//! flush has persisted them.

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use keeper_common_vault::{SecretKind, SnapshotFrame};
use keeper_server_db::SecretStore;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use super::{config, frame};
use crate::api::AppState;
use crate::auth_middleware::verify_owner;
use crate::error::KeeperError;

pub async fn sync_upgrade_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
	debug!("sync socket upgrade requested");
	ws.on_upgrade(move |socket| handle_sync_connection(socket, state))
}

/// Every persisted record of `owner`, one frame per kind, then the terminator.
#[instrument(skip(store))]
pub async fn build_snapshot(store: &dyn SecretStore, owner: &str) -> Result<Vec<SnapshotFrame>, KeeperError> {
	let mut frames = Vec::with_capacity(SecretKind::ALL.len() + 1);
	for kind in SecretKind::ALL {
		let records: Vec<_> = store.select(kind, owner).await?.into_values().collect();
		frames.push(SnapshotFrame::for_kind(kind, &records)?);
	}
	frames.push(SnapshotFrame::terminator());
	Ok(frames)
}

async fn handle_sync_connection(socket: WebSocket, state: AppState) {
	let (mut sender, mut receiver) = socket.split();
	let (tx, mut rx) = mpsc::channel::<Message>(config::MAX_QUEUE_SIZE);

	let send_task = tokio::spawn(async move {
		while let Some(msg) = rx.recv().await {
			let closing = matches!(msg, Message::Close(_));
			if let Err(e) = sender.send(msg).await {
				debug!(error = %e, "failed to send sync frame");
				break;
			}
			if closing {
				break;
			}
		}
	});

	while let Some(msg) = receiver.next().await {
		let msg = match msg {
			Ok(Message::Close(_)) => break,
			Ok(msg) => msg,
			Err(e) => {
				debug!(error = %e, "sync socket error");
				break;
			}
		};
		let Some(payload) = frame::payload(&msg) else {
			continue;
		};

		let token = match payload.map(|p| String::from_utf8_lossy(&p).trim().to_string()) {
			Ok(token) if !token.is_empty() => token,
			Ok(_) => continue,
			Err(e) => {
				debug!(error = %e, "unreadable sync request");
				continue;
			}
		};
		let token = token.strip_prefix("Bearer ").unwrap_or(&token);

		let owner = match verify_owner(&state, token).await {
			Ok(owner) => owner,
			Err(e) => {
				warn!(error = %e, "sync request refused");
				let close = CloseFrame {
					code: close_code::POLICY,
					reason: e.code().into(),
				};
				let _ = tx.send(Message::Close(Some(close))).await;
				break;
			}
		};

		if let Err(e) = send_snapshot(&state, &owner, &tx).await {
			warn!(owner = %owner, error = %e, "failed to send snapshot");
			break;
		}
	}

	drop(tx);
	let _ = send_task.await;
	info!("sync socket closed");
}

async fn send_snapshot(state: &AppState, owner: &str, tx: &mpsc::Sender<Message>) -> Result<(), KeeperError> {
	let frames = build_snapshot(state.store.as_ref(), owner).await?;
	for snapshot in &frames {
		let msg = frame::encode(snapshot)?;
		if tx.send(msg).await.is_err() {
			return Err(KeeperError::ServerFault("sync socket sender gone".to_string()));
		}
	}
	debug!(owner = %owner, frames = frames.len(), "snapshot sent");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use keeper_common_vault::{Event, Note, SecretRecord};
	use keeper_server_db::testing::create_test_pool;
	use keeper_server_db::SecretRepository;

	#[tokio::test]
	async fn snapshot_has_every_kind_then_terminator() {
		let repo = SecretRepository::new(create_test_pool().await);
		let note = Note {
			owner: "test".to_string(),
			uid: "n1".to_string(),
			text: "enc".to_string(),
			event: Event::Upsert,
		}
		.into_secret();
		repo.upsert(&note).await.unwrap();

		let frames = build_snapshot(&repo, "test").await.unwrap();
		assert_eq!(frames.len(), 5);
		assert!(frames[4].is_terminator());

		let kinds: Vec<_> = frames[..4].iter().map(|f| f.kind.as_str()).collect();
		assert_eq!(kinds, vec!["Pairs login/password", "Text", "Binary", "Bank card"]);

		let (_, notes) = frames[1].clone().records().unwrap().unwrap();
		assert_eq!(notes, vec![note]);
	}

	#[tokio::test]
	async fn snapshot_of_other_owner_is_empty() {
		let repo = SecretRepository::new(create_test_pool().await);
		let frames = build_snapshot(&repo, "nobody").await.unwrap();
		for frame in frames.into_iter().take(4) {
			let (_, records) = frame.records().unwrap().unwrap();
			assert!(records.is_empty());
		}
	}
}
