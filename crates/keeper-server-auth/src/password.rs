// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use hmac::{Hmac, Mac};
use keeper_common_crypto::SecretString;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Key used when the deployment does not configure one.
pub const DEFAULT_HASH_KEY: &str = "taekwondo";

/// Keyed hash of account passwords. The stored form is lowercase hex.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
	key: SecretString,
}

impl PasswordHasher {
	/// An empty key falls back to [`DEFAULT_HASH_KEY`].
	pub fn new(key: SecretString) -> Self {
		if key.is_empty() {
			Self {
				key: SecretString::from(DEFAULT_HASH_KEY),
			}
		} else {
			Self { key }
		}
	}

	fn mac(&self) -> HmacSha256 {
		match HmacSha256::new_from_slice(self.key.expose().as_bytes()) {
			Ok(mac) => mac,
			Err(_) => unreachable!("HMAC-SHA256 accepts keys of any length"),
		}
	}

	pub fn hash(&self, password: &str) -> String {
		let mut mac = self.mac();
		mac.update(password.as_bytes());
		hex::encode(mac.finalize().into_bytes())
	}

	/// Constant-time comparison of `password` against a stored hex hash.
	pub fn verify(&self, password: &str, stored: &str) -> bool {
		let Ok(expected) = hex::decode(stored) else {
			return false;
		};
		let mut mac = self.mac();
		mac.update(password.as_bytes());
		mac.verify_slice(&expected).is_ok()
	}
}

impl Default for PasswordHasher {
	fn default() -> Self {
		Self::new(SecretString::from(DEFAULT_HASH_KEY))
	}
}
