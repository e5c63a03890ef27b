// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use keeper_common_crypto::{FieldCipher, SecretString};
use tracing::debug;
use url::Url;

use crate::error::{ClientError, Result};

pub const DEFAULT_ADDRESS: &str = "localhost:8080";
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct ClientConfig {
	/// `host:port` of the server.
	pub address: String,
	pub crypto_key_file: Option<PathBuf>,
	pub sync_interval: Duration,
	pub token_file: PathBuf,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			address: DEFAULT_ADDRESS.to_string(),
			crypto_key_file: None,
			sync_interval: DEFAULT_SYNC_INTERVAL,
			token_file: default_token_file(),
		}
	}
}

/// `~/.config/keeper/token`, or `./keeper-token` when there is no config dir.
pub fn default_token_file() -> PathBuf {
	dirs::config_dir()
		.map(|d| d.join("keeper").join("token"))
		.unwrap_or_else(|| PathBuf::from("keeper-token"))
}

impl ClientConfig {
	pub fn http_url(&self, path: &str) -> Result<Url> {
		self.url("http", path)
	}

	pub fn ws_url(&self, path: &str) -> Result<Url> {
		self.url("ws", path)
	}

	fn url(&self, scheme: &str, path: &str) -> Result<Url> {
		let address = self
			.address
			.trim_start_matches("http://")
			.trim_start_matches("ws://")
			.trim_end_matches('/');
		Url::parse(&format!("{scheme}://{address}{path}"))
			.map_err(|e| ClientError::Address(format!("{address}: {e}")))
	}

	/// Passphrase from the crypto key file, trimmed.
	pub fn passphrase(&self) -> Result<SecretString> {
		let path = self.crypto_key_file.as_deref().ok_or(ClientError::NoPassphrase)?;
		read_passphrase(path)
	}

	pub fn cipher(&self) -> Result<FieldCipher> {
		let passphrase = self.passphrase()?;
		Ok(FieldCipher::new(passphrase.expose()))
	}
}

fn read_passphrase(path: &Path) -> Result<SecretString> {
	let raw = std::fs::read_to_string(path)?;
	let passphrase = SecretString::from(raw.trim());
	if passphrase.is_empty() {
		return Err(ClientError::NoPassphrase);
	}
	debug!(path = %path.display(), "crypto key loaded");
	Ok(passphrase)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn urls_follow_address() {
		let config = ClientConfig {
			address: "127.0.0.1:9000/".to_string(),
			..ClientConfig::default()
		};
		assert_eq!(config.http_url("/api/user/login").unwrap().as_str(), "http://127.0.0.1:9000/api/user/login");
		assert_eq!(config.ws_url("/socket").unwrap().as_str(), "ws://127.0.0.1:9000/socket");
	}

	#[test]
	fn passphrase_is_trimmed_and_required() {
		let dir = tempfile::tempdir().unwrap();
		let key = dir.path().join("key");
		std::fs::write(&key, "  passphrase\n").unwrap();

		let mut config = ClientConfig {
			crypto_key_file: Some(key.clone()),
			..ClientConfig::default()
		};
		assert_eq!(config.passphrase().unwrap().expose(), "passphrase");

		std::fs::write(&key, "\n").unwrap();
		assert!(matches!(config.passphrase(), Err(ClientError::NoPassphrase)));

		config.crypto_key_file = None;
		assert!(matches!(config.cipher(), Err(ClientError::NoPassphrase)));
	}
}
