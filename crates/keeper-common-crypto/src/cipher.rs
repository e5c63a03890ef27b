// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Passphrase-keyed encryption of record fields and file blocks.
//!
//! The passphrase is hashed with SHA-256 into an AES-256 key. Every call to
//! [`FieldCipher::encrypt`] draws a fresh random nonce which is prepended to
//! the AES-GCM output; the whole buffer is then encoded as URL-safe base64 so
//! it can travel inside JSON and be stored in a TEXT column.

use aes_gcm::{
	aead::{Aead, KeyInit, OsRng},
	Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{CryptoError, Result};

/// Size of the AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

const TAG_SIZE: usize = 16;

/// Smallest decoded buffer that can hold a nonce and an authentication tag.
pub const MIN_CIPHERTEXT_LEN: usize = NONCE_SIZE + TAG_SIZE;

#[derive(Clone)]
pub struct FieldCipher {
	key: Zeroizing<[u8; 32]>,
}

impl FieldCipher {
	pub fn new(passphrase: &str) -> Self {
		let digest = Sha256::digest(passphrase.as_bytes());
		let mut key = Zeroizing::new([0u8; 32]);
		key.copy_from_slice(&digest);
		Self { key }
	}

	fn aead(&self) -> Aes256Gcm {
		Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(self.key.as_slice()))
	}

	pub fn encrypt(&self, plaintext: &[u8]) -> Result<String> {
		let mut nonce_bytes = [0u8; NONCE_SIZE];
		OsRng.fill_bytes(&mut nonce_bytes);

		let ciphertext = self
			.aead()
			.encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
			.map_err(|e| CryptoError::Cipher(format!("encryption failed: {e}")))?;

		let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
		out.extend_from_slice(&nonce_bytes);
		out.extend_from_slice(&ciphertext);
		Ok(URL_SAFE.encode(out))
	}

	pub fn encrypt_str(&self, plaintext: &str) -> Result<String> {
		self.encrypt(plaintext.as_bytes())
	}

	pub fn decrypt(&self, encoded: &str) -> Result<Vec<u8>> {
		let raw = URL_SAFE.decode(encoded.trim())?;
		if raw.len() < MIN_CIPHERTEXT_LEN {
			return Err(CryptoError::NotCiphertext {
				len: raw.len(),
				min: MIN_CIPHERTEXT_LEN,
			});
		}

		let (nonce, ciphertext) = raw.split_at(NONCE_SIZE);
		self
			.aead()
			.decrypt(Nonce::from_slice(nonce), ciphertext)
			.map_err(|e| CryptoError::Cipher(format!("decryption failed: {e}")))
	}

	pub fn decrypt_str(&self, encoded: &str) -> Result<String> {
		Ok(String::from_utf8(self.decrypt(encoded)?)?)
	}

	/// Decrypt a field for display.
	///
	/// Values that do not decrypt are returned unchanged and the failure is
	/// logged, so a single corrupt or plaintext field never hides the rest of
	/// a record.
	pub fn decrypt_for_display(&self, encoded: &str) -> String {
		match self.decrypt_str(encoded) {
			Ok(plain) => plain,
			Err(e) => {
				tracing::error!(error = %e, "failed to decrypt field, showing stored value");
				encoded.to_string()
			}
		}
	}
}

impl std::fmt::Debug for FieldCipher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FieldCipher").finish_non_exhaustive()
	}
}
