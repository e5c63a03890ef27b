// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret record model for Keeper.
//!
//! Four unrelated record kinds share one persistence contract,
//! [`SecretRecord`]. Each kind describes its own store operations as
//! [`Instruction`] values (statement text plus ordered arguments) so that a
//! single generic executor can run them without knowing which kind it holds.
//!
//! The crate also carries the in-memory [`StagingCache`] that buffers writes
//! between request handling and the periodic flush, the [`FileChunk`] unit of
//! the chunked transfer protocol, and the [`SnapshotFrame`] wire shape of the
//! sync channel.

pub mod card;
pub mod chunk;
pub mod error;
pub mod file;
pub mod instruction;
pub mod kind;
pub mod note;
pub mod pair;
pub mod record;
pub mod snapshot;
pub mod staging;

pub use card::PaymentCard;
pub use chunk::{plan_portions, reassemble, FileChunk, BLOCK_SIZE};
pub use error::{Result, VaultError};
pub use file::FileBlob;
pub use instruction::{Instruction, Value};
pub use kind::{Event, SecretKind};
pub use note::Note;
pub use pair::CredentialPair;
pub use record::{Secret, SecretRecord, LABEL_SEPARATOR};
pub use snapshot::SnapshotFrame;
pub use staging::{DeadLetter, StagingCache, DEFAULT_DEAD_LETTER_CAPACITY};
