// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Chunked file upload and download.
//!
//! Files move in [`BLOCK_SIZE`] blocks. Each block is encrypted on its own
//! and sent as a [`FileChunk`] carrying its offset and plaintext length, so
//! the receiving side writes it in place whatever order it arrives in.

use std::io::SeekFrom;
use std::path::Path;

use futures::{SinkExt, StreamExt};
use keeper_common_crypto::{FieldCipher, SecretString};
use keeper_common_vault::{FileChunk, BLOCK_SIZE};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::socket::{self, Socket};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferSummary {
	pub chunks: usize,
	pub bytes: u64,
}

/// Stream `path` to the server as the content of file `uid`.
///
/// Returns once the server has taken every block and closed the channel.
#[instrument(skip(config, token, cipher), fields(path = %path.display()))]
pub async fn upload(
	config: &ClientConfig,
	token: &SecretString,
	cipher: &FieldCipher,
	uid: &str,
	path: &Path,
) -> Result<TransferSummary> {
	let mut file = File::open(path).await?;
	let mut socket = socket::connect(
		config.ws_url("/socket_file")?,
		&[("authorization", token.expose().as_str())],
	)
	.await?;

	let mut summary = TransferSummary::default();
	let mut block = vec![0u8; BLOCK_SIZE];
	loop {
		let len = read_block(&mut file, &mut block).await?;
		if len == 0 {
			break;
		}
		let chunk = FileChunk {
			file_uid: uid.to_string(),
			portion: summary.bytes,
			len: len as u64,
			body: cipher.encrypt(&block[..len])?,
		};
		if let Err(e) = socket.send(socket::encode(&chunk)?).await {
			// The server may have closed on an earlier block; its reason wins.
			finish(&mut socket).await?;
			return Err(e.into());
		}
		debug!(portion = chunk.portion, len, "chunk sent");

		summary.chunks += 1;
		summary.bytes += len as u64;
	}

	socket.close(None).await?;
	finish(&mut socket).await?;
	info!(chunks = summary.chunks, bytes = summary.bytes, "upload complete");
	Ok(summary)
}

/// Fetch file `uid` into `dest`.
///
/// `size`, when known from the file's metadata, fixes the final length;
/// otherwise the file ends where the last block ends. Blocks must cover the
/// whole length; a hole is [`ClientError::Incomplete`] and `dest` is removed.
#[instrument(skip(config, token, cipher), fields(dest = %dest.display()))]
pub async fn download(
	config: &ClientConfig,
	token: &SecretString,
	cipher: &FieldCipher,
	uid: &str,
	dest: &Path,
	size: Option<u64>,
) -> Result<TransferSummary> {
	let mut socket = socket::connect(
		config.ws_url("/socket_download_file")?,
		&[("authorization", token.expose().as_str()), ("uid", uid)],
	)
	.await?;

	if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
		tokio::fs::create_dir_all(parent).await?;
	}
	let mut file = OpenOptions::new()
		.create(true)
		.write(true)
		.truncate(true)
		.open(dest)
		.await?;

	let mut summary = TransferSummary::default();
	let mut ranges = Vec::new();
	while let Some(msg) = socket.next().await {
		let msg = msg?;
		if let Message::Close(frame) = &msg {
			check_close(frame.as_ref().map(|f| (f.code, &*f.reason)))?;
			break;
		}
		let Some(chunk) = socket::decode::<FileChunk>(&msg)? else {
			continue;
		};

		let bytes = cipher.decrypt(&chunk.body)?;
		if bytes.len() as u64 != chunk.len {
			return Err(ClientError::ChunkLength {
				portion: chunk.portion,
				expected: chunk.len,
				actual: bytes.len() as u64,
			});
		}
		file.seek(SeekFrom::Start(chunk.portion)).await?;
		file.write_all(&bytes).await?;
		debug!(portion = chunk.portion, len = chunk.len, "chunk written");

		ranges.push((chunk.portion, chunk.len));
		summary.chunks += 1;
		summary.bytes += chunk.len;
	}

	let end = ranges.iter().map(|(portion, len)| portion.saturating_add(*len)).max().unwrap_or(0);
	let len = size.unwrap_or(end);
	if let Some((from, to)) = first_gap(ranges, len) {
		drop(file);
		if let Err(e) = tokio::fs::remove_file(dest).await {
			warn!(error = %e, "could not remove incomplete download");
		}
		return Err(ClientError::Incomplete { from, to });
	}

	file.set_len(len).await?;
	file.flush().await?;
	info!(chunks = summary.chunks, bytes = summary.bytes, "download complete");
	Ok(summary)
}

/// First byte range in `[0, size)` that no `(portion, len)` block covers.
fn first_gap(mut ranges: Vec<(u64, u64)>, size: u64) -> Option<(u64, u64)> {
	ranges.sort_unstable();
	let mut covered = 0u64;
	for (portion, len) in ranges {
		if covered >= size {
			break;
		}
		if portion > covered {
			return Some((covered, portion.min(size)));
		}
		covered = covered.max(portion.saturating_add(len));
	}
	(covered < size).then_some((covered, size))
}

/// Fill `buf` from `file`, stopping short only at end of file.
async fn read_block(file: &mut File, buf: &mut [u8]) -> Result<usize> {
	let mut filled = 0;
	while filled < buf.len() {
		let n = file.read(&mut buf[filled..]).await?;
		if n == 0 {
			break;
		}
		filled += n;
	}
	Ok(filled)
}

/// Wait for the server to close its side. A policy close means the server
/// refused the data.
async fn finish(socket: &mut Socket) -> Result<()> {
	while let Some(msg) = socket.next().await {
		match msg {
			Ok(Message::Close(frame)) => {
				return check_close(frame.as_ref().map(|f| (f.code, &*f.reason)));
			}
			Ok(_) => {}
			// The server may drop the connection right after reading our close.
			Err(e) => {
				debug!(error = %e, "socket ended after close");
				break;
			}
		}
	}
	Ok(())
}

fn check_close(frame: Option<(CloseCode, &str)>) -> Result<()> {
	match frame {
		Some((CloseCode::Normal, _)) | None => Ok(()),
		Some((_, reason)) => Err(ClientError::Aborted(reason.to_string())),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn read_block_fills_until_eof() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("data");
		tokio::fs::write(&path, vec![7u8; 1500]).await.unwrap();

		let mut file = File::open(&path).await.unwrap();
		let mut buf = vec![0u8; 1000];
		assert_eq!(read_block(&mut file, &mut buf).await.unwrap(), 1000);
		assert_eq!(read_block(&mut file, &mut buf).await.unwrap(), 500);
		assert_eq!(read_block(&mut file, &mut buf).await.unwrap(), 0);
	}

	#[test]
	fn gaps_are_found_wherever_they_are() {
		let full = vec![(512_000, 512_000), (0, 512_000), (1_024_000, 476_000)];
		assert_eq!(first_gap(full, 1_500_000), None);
		assert_eq!(first_gap(Vec::new(), 0), None);

		let middle = vec![(0, 512_000), (1_024_000, 476_000)];
		assert_eq!(first_gap(middle, 1_500_000), Some((512_000, 1_024_000)));
		assert_eq!(first_gap(vec![(0, 10)], 25), Some((10, 25)));
		assert_eq!(first_gap(vec![(5, 10)], 15), Some((0, 5)));
		assert_eq!(first_gap(Vec::new(), 3), Some((0, 3)));
	}

	#[test]
	fn only_normal_close_counts_as_success() {
		assert!(check_close(None).is_ok());
		assert!(check_close(Some((CloseCode::Normal, "done"))).is_ok());
		let err = check_close(Some((CloseCode::Policy, "conflict"))).unwrap_err();
		assert!(matches!(err, ClientError::Aborted(reason) if reason == "conflict"));
	}

	proptest::proptest! {
		#![proptest_config(proptest::prelude::ProptestConfig::with_cases(16))]

		#[test]
		fn prop_blocks_are_full_except_the_last(len in 0usize..5000, block in 1usize..2048) {
			let rt = tokio::runtime::Runtime::new().unwrap();
			let sizes = rt.block_on(async {
				let dir = tempfile::tempdir().unwrap();
				let path = dir.path().join("data");
				tokio::fs::write(&path, vec![1u8; len]).await.unwrap();

				let mut file = File::open(&path).await.unwrap();
				let mut buf = vec![0u8; block];
				let mut sizes = Vec::new();
				loop {
					let n = read_block(&mut file, &mut buf).await.unwrap();
					if n == 0 {
						break;
					}
					sizes.push(n);
				}
				sizes
			});

			proptest::prop_assert_eq!(sizes.iter().sum::<usize>(), len);
			proptest::prop_assert_eq!(sizes.len(), len.div_ceil(block));
			if let Some((_, full)) = sizes.split_last() {
				proptest::prop_assert!(full.iter().all(|&n| n == block));
			}
		}
	}
}
