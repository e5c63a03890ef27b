// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client side of the sync channel.
//!
//! Every request is just the bearer token. The server answers with a full
//! batch, which the mirror swaps in whole.

use std::future::Future;

use futures::{SinkExt, StreamExt};
use keeper_common_crypto::{compress, SecretString};
use keeper_common_vault::SnapshotFrame;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::mirror::Mirror;
use crate::socket::{self, Socket};

pub struct SyncChannel {
	socket: Socket,
}

impl SyncChannel {
	pub async fn connect(config: &ClientConfig) -> Result<Self> {
		let socket = socket::connect(config.ws_url("/socket")?, &[]).await?;
		Ok(Self { socket })
	}

	/// Ask for a fresh batch. An empty token sends nothing.
	pub async fn request(&mut self, token: &SecretString) -> Result<bool> {
		if token.is_empty() {
			return Ok(false);
		}
		let payload = compress(token.expose().as_bytes())?;
		self.socket.send(Message::Binary(payload)).await?;
		Ok(true)
	}

	/// Next snapshot frame, or `None` once the server has closed the channel.
	pub async fn next_frame(&mut self) -> Result<Option<SnapshotFrame>> {
		while let Some(msg) = self.socket.next().await {
			let msg = msg?;
			if matches!(msg, Message::Close(_)) {
				return Ok(None);
			}
			if let Some(frame) = socket::decode::<SnapshotFrame>(&msg)? {
				return Ok(Some(frame));
			}
		}
		Ok(None)
	}

	/// One request and the full batch it produces.
	#[instrument(skip_all)]
	pub async fn refresh(&mut self, token: &SecretString, mirror: &mut Mirror) -> Result<()> {
		if !self.request(token).await? {
			return Err(ClientError::NotLoggedIn);
		}
		loop {
			let frame = self.next_frame().await?.ok_or(ClientError::ChannelClosed)?;
			if mirror.apply(frame)? {
				debug!(records = mirror.len(), "mirror refreshed");
				return Ok(());
			}
		}
	}

	pub async fn close(mut self) -> Result<()> {
		self.socket.close(None).await?;
		Ok(())
	}
}

/// Keep `mirror` current until `shutdown` resolves, requesting a batch every
/// sync interval and calling `on_refresh` after each completed batch.
#[instrument(skip_all, fields(interval = ?config.sync_interval))]
pub async fn watch<S, F>(
	config: &ClientConfig,
	token: &SecretString,
	mirror: &mut Mirror,
	shutdown: S,
	mut on_refresh: F,
) -> Result<()>
where
	S: Future<Output = ()>,
	F: FnMut(&Mirror),
{
	let mut channel = SyncChannel::connect(config).await?;
	let mut ticker = tokio::time::interval(config.sync_interval);
	ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
	tokio::pin!(shutdown);

	loop {
		tokio::select! {
			_ = &mut shutdown => {
				debug!("sync loop stopping");
				return channel.close().await;
			}
			_ = ticker.tick() => {
				channel.request(token).await?;
			}
			frame = channel.next_frame() => {
				let Some(frame) = frame? else {
					return Err(ClientError::ChannelClosed);
				};
				match mirror.apply(frame) {
					Ok(true) => on_refresh(mirror),
					Ok(false) => {}
					Err(e) => warn!(error = %e, "ignoring unreadable sync frame"),
				}
			}
		}
	}
}
