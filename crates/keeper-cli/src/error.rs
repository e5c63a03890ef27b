// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use keeper_common_crypto::CryptoError;
use keeper_common_vault::VaultError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
	#[error("server rejected request ({status}): {message}")]
	Rejected {
		status: u16,
		error: String,
		message: String,
	},

	#[error("server did not return a token")]
	MissingToken,

	#[error("not logged in; run `keeper login` first")]
	NotLoggedIn,

	#[error("no crypto key configured; set KEEPER_CRYPTO_KEY_FILE or --crypto-key-file")]
	NoPassphrase,

	#[error("invalid server address: {0}")]
	Address(String),

	#[error("http error: {0}")]
	Http(#[from] reqwest::Error),

	#[error("websocket error: {0}")]
	Socket(#[from] tokio_tungstenite::tungstenite::Error),

	#[error("sync channel closed by server")]
	ChannelClosed,

	#[error("server aborted the transfer: {0}")]
	Aborted(String),

	#[error("download incomplete: bytes {from}..{to} never arrived")]
	Incomplete { from: u64, to: u64 },

	#[error("chunk at {portion} decrypted to {actual} bytes, expected {expected}")]
	ChunkLength { portion: u64, expected: u64, actual: u64 },

	#[error(transparent)]
	Crypto(#[from] CryptoError),

	#[error(transparent)]
	Vault(#[from] VaultError),

	#[error("json error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("io error: {0}")]
	Io(#[from] std::io::Error),
}

impl ClientError {
	/// Machine-readable code from the server's error body, if any.
	pub fn code(&self) -> Option<&str> {
		match self {
			ClientError::Rejected { error, .. } => Some(error),
			_ => None,
		}
	}
}

pub type Result<T> = std::result::Result<T, ClientError>;
