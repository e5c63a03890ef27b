// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Gzip-compressed JSON frames.
//!
//! Outbound frames are always binary gzip. Inbound frames may be gzip or
//! plain, in either a text or a binary message.

use axum::extract::ws::Message;
use keeper_common_crypto::{compress, decompress_or_raw};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::KeeperError;

pub fn encode<T: Serialize>(value: &T) -> Result<Message, KeeperError> {
	let json = serde_json::to_vec(value)?;
	Ok(Message::Binary(compress(&json)?.into()))
}

/// Payload bytes of a data message. Control messages have none.
pub fn payload(msg: &Message) -> Option<Result<Vec<u8>, KeeperError>> {
	match msg {
		Message::Text(text) => Some(Ok(text.as_str().as_bytes().to_vec())),
		Message::Binary(data) => Some(decompress_or_raw(data).map_err(KeeperError::from)),
		_ => None,
	}
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, KeeperError> {
	Ok(serde_json::from_slice(bytes)?)
}
