// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Offset-addressed file chunks.
//!
//! A file is cut into [`BLOCK_SIZE`] blocks. Each block travels and is stored
//! as one [`FileChunk`] carrying its byte offset (`portion`) and its plaintext
//! length (`len`), so a reader can place every block without relying on
//! arrival order or on the final block being full.

use serde::{Deserialize, Serialize};

/// Plaintext bytes per chunk.
pub const BLOCK_SIZE: usize = 512_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChunk {
	#[serde(rename = "uid")]
	pub file_uid: String,
	pub portion: u64,
	pub len: u64,
	/// Encrypted, text-encoded block.
	pub body: String,
}

/// `(offset, len)` of every block of a file of `size` bytes.
pub fn plan_portions(size: u64, block: usize) -> Vec<(u64, u64)> {
	let block = block.max(1) as u64;
	let mut portions = Vec::with_capacity((size / block + 1) as usize);
	let mut offset = 0;
	while offset < size {
		let len = block.min(size - offset);
		portions.push((offset, len));
		offset += len;
	}
	portions
}

/// Rebuild a buffer from `(offset, bytes)` blocks in any order.
pub fn reassemble<'a, I>(blocks: I) -> Vec<u8>
where
	I: IntoIterator<Item = (u64, &'a [u8])>,
{
	let mut out = Vec::new();
	for (offset, bytes) in blocks {
		let start = offset as usize;
		let end = start + bytes.len();
		if out.len() < end {
			out.resize(end, 0);
		}
		out[start..end].copy_from_slice(bytes);
	}
	out
}
