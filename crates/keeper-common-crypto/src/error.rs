// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
	#[error("not ciphertext: {len} bytes is shorter than the minimum of {min}")]
	NotCiphertext { len: usize, min: usize },

	#[error("invalid text encoding: {0}")]
	Encoding(#[from] base64::DecodeError),

	#[error("cipher failure: {0}")]
	Cipher(String),

	#[error("decrypted value is not valid UTF-8")]
	Utf8(#[from] std::string::FromUtf8Error),

	#[error("decompressed payload exceeds {limit} bytes")]
	TooLarge { limit: usize },

	#[error("compression failure: {0}")]
	Compression(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
