// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Websocket connection helpers shared by sync and transfer.

use keeper_common_crypto::{compress, decompress_or_raw};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;
use url::Url;

use crate::error::{ClientError, Result};

pub type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Open a socket, sending `headers` with the upgrade request. A refused
/// upgrade surfaces as [`ClientError::Rejected`] with the server's status.
pub async fn connect(url: Url, headers: &[(&'static str, &str)]) -> Result<Socket> {
	let mut request = url.as_str().into_client_request()?;
	for (name, value) in headers {
		let value = HeaderValue::from_str(value)
			.map_err(|e| ClientError::Address(format!("bad {name} header: {e}")))?;
		request.headers_mut().insert(HeaderName::from_static(name), value);
	}

	match connect_async(request).await {
		Ok((socket, _)) => {
			debug!(url = %url, "socket connected");
			Ok(socket)
		}
		Err(WsError::Http(response)) => {
			let status = response.status().as_u16();
			let (error, message) = response
				.body()
				.as_deref()
				.and_then(|b| serde_json::from_slice::<serde_json::Value>(b).ok())
				.map(|v| {
					(
						v["error"].as_str().unwrap_or_default().to_string(),
						v["message"].as_str().unwrap_or_default().to_string(),
					)
				})
				.unwrap_or_default();
			Err(ClientError::Rejected { status, error, message })
		}
		Err(e) => Err(e.into()),
	}
}

pub fn encode<T: Serialize>(value: &T) -> Result<Message> {
	Ok(Message::Binary(compress(&serde_json::to_vec(value)?)?))
}

/// Decode a data message. Control messages yield `None`.
pub fn decode<T: DeserializeOwned>(msg: &Message) -> Result<Option<T>> {
	let bytes = match msg {
		Message::Binary(data) => decompress_or_raw(data)?,
		Message::Text(text) => text.as_bytes().to_vec(),
		_ => return Ok(None),
	};
	Ok(Some(serde_json::from_slice(&bytes)?))
}
