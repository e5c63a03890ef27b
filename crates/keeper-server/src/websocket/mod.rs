// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Websocket channels: record sync and chunked file transfer.

pub mod frame;
pub mod sync;
pub mod transfer;

pub mod config {
	/// Outbound frames buffered per connection before the sender waits.
	pub const MAX_QUEUE_SIZE: usize = 64;
}
