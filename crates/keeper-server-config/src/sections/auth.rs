// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Password hashing and token signing configuration.

use std::time::Duration;

use keeper_common_crypto::SecretString;
use serde::Deserialize;

use super::parse_duration;
use crate::error::ConfigError;

const DEFAULT_HASH_KEY: &str = "taekwondo";
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(5 * 60 * 60);
const DEFAULT_LOGIN_ATTEMPTS_PER_MINUTE: u32 = 30;

#[derive(Debug, Clone)]
pub struct AuthConfig {
	pub hash_key: SecretString,
	/// Signs bearer tokens. Falls back to the hash key when unset.
	pub jwt_secret: SecretString,
	pub token_ttl: Duration,
	/// Register and login attempts allowed per login name per minute.
	pub login_attempts_per_minute: u32,
}

impl Default for AuthConfig {
	fn default() -> Self {
		Self {
			hash_key: SecretString::from(DEFAULT_HASH_KEY),
			jwt_secret: SecretString::from(DEFAULT_HASH_KEY),
			token_ttl: DEFAULT_TOKEN_TTL,
			login_attempts_per_minute: DEFAULT_LOGIN_ATTEMPTS_PER_MINUTE,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfigLayer {
	#[serde(default)]
	pub hash_key: Option<SecretString>,
	#[serde(default)]
	pub jwt_secret: Option<SecretString>,
	/// humantime string, e.g. `5h`.
	#[serde(default)]
	pub token_ttl: Option<String>,
	#[serde(default)]
	pub login_attempts_per_minute: Option<u32>,
}

impl AuthConfigLayer {
	pub fn merge(&mut self, other: AuthConfigLayer) {
		if other.hash_key.is_some() {
			self.hash_key = other.hash_key;
		}
		if other.jwt_secret.is_some() {
			self.jwt_secret = other.jwt_secret;
		}
		if other.token_ttl.is_some() {
			self.token_ttl = other.token_ttl;
		}
		if other.login_attempts_per_minute.is_some() {
			self.login_attempts_per_minute = other.login_attempts_per_minute;
		}
	}

	pub fn finalize(self) -> Result<AuthConfig, ConfigError> {
		let hash_key = self
			.hash_key
			.filter(|k| !k.is_empty())
			.unwrap_or_else(|| SecretString::from(DEFAULT_HASH_KEY));
		let jwt_secret = self
			.jwt_secret
			.filter(|k| !k.is_empty())
			.unwrap_or_else(|| hash_key.clone());
		let token_ttl = match self.token_ttl {
			Some(raw) => parse_duration("auth.token_ttl", &raw)?,
			None => DEFAULT_TOKEN_TTL,
		};
		if token_ttl.is_zero() {
			return Err(ConfigError::Validation(
				"auth.token_ttl must be greater than zero".to_string(),
			));
		}

		let login_attempts_per_minute = self
			.login_attempts_per_minute
			.unwrap_or(DEFAULT_LOGIN_ATTEMPTS_PER_MINUTE);
		if login_attempts_per_minute == 0 {
			return Err(ConfigError::Validation(
				"auth.login_attempts_per_minute must be greater than zero".to_string(),
			));
		}

		Ok(AuthConfig {
			hash_key,
			jwt_secret,
			token_ttl,
			login_attempts_per_minute,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_use_builtin_hash_key() {
		let config = AuthConfigLayer::default().finalize().unwrap();
		assert_eq!(config.hash_key.expose(), "taekwondo");
		assert_eq!(config.jwt_secret.expose(), "taekwondo");
		assert_eq!(config.token_ttl, Duration::from_secs(18_000));
		assert_eq!(config.login_attempts_per_minute, 30);
	}

	#[test]
	fn jwt_secret_follows_hash_key() {
		let layer = AuthConfigLayer {
			hash_key: Some(SecretString::from("deploy-key")),
			..Default::default()
		};
		let config = layer.finalize().unwrap();
		assert_eq!(config.jwt_secret.expose(), "deploy-key");
	}

	#[test]
	fn ttl_parses_humantime() {
		let layer = AuthConfigLayer {
			token_ttl: Some("30m".to_string()),
			..Default::default()
		};
		assert_eq!(layer.finalize().unwrap().token_ttl, Duration::from_secs(1800));
	}

	#[test]
	fn zero_ttl_is_rejected() {
		let layer = AuthConfigLayer {
			token_ttl: Some("0s".to_string()),
			..Default::default()
		};
		assert!(matches!(layer.finalize(), Err(ConfigError::Validation(_))));
	}
}
