// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! gzip framing for websocket payloads and `Content-Encoding: gzip` bodies.

use std::io::{Read, Write};

use flate2::{read::GzDecoder, write::GzEncoder, Compression};

use crate::error::{CryptoError, Result};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Largest payload [`decompress`] will inflate to. A full snapshot of a
/// large vault stays well under it; a gzip bomb does not.
pub const MAX_DECOMPRESSED_LEN: usize = 16 * 1024 * 1024;

pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
	let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2 + 32), Compression::best());
	encoder.write_all(data)?;
	Ok(encoder.finish()?)
}

pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
	decompress_with_limit(data, MAX_DECOMPRESSED_LEN)
}

/// Inflate `data`, refusing to produce more than `limit` bytes.
pub fn decompress_with_limit(data: &[u8], limit: usize) -> Result<Vec<u8>> {
	let mut out = Vec::new();
	GzDecoder::new(data)
		.take((limit as u64).saturating_add(1))
		.read_to_end(&mut out)?;
	if out.len() > limit {
		return Err(CryptoError::TooLarge { limit });
	}
	Ok(out)
}

/// Decompress when the payload carries the gzip magic, otherwise pass it through.
pub fn decompress_or_raw(data: &[u8]) -> Result<Vec<u8>> {
	if data.starts_with(&GZIP_MAGIC) {
		decompress(data)
	} else {
		Ok(data.to_vec())
	}
}
