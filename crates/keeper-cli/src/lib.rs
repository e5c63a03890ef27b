// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Keeper command-line client.
//!
//! Field values are encrypted locally before they leave the machine. The
//! server only ever sees ciphertext for pair, note and card fields, and for
//! file content.

pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod mirror;
pub mod session;
pub mod socket;
pub mod sync;
pub mod transfer;

pub use commands::Keeper;
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use mirror::Mirror;
