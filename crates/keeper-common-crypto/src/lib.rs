// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cryptographic and transport primitives shared by the Keeper client and server.
//!
//! - [`FieldCipher`]: passphrase-keyed encryption of individual record fields and file blocks
//! - [`SecretString`]: redacting wrapper for passphrases, hash keys and signing keys
//! - [`codec`]: gzip compression of websocket frames and request bodies

pub mod cipher;
pub mod codec;
pub mod error;
pub mod secret;

pub use cipher::{FieldCipher, MIN_CIPHERTEXT_LEN, NONCE_SIZE};
pub use codec::{compress, decompress, decompress_or_raw, decompress_with_limit, MAX_DECOMPRESSED_LEN};
pub use error::{CryptoError, Result};
pub use secret::{Secret, SecretString, REDACTED};
