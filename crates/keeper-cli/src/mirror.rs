// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Local copy of the server's records.
//!
//! Frames of a sync batch are collected on the side. The terminator swaps
//! the collected batch in whole, so a reader never sees half a refresh and
//! records deleted on the server disappear locally.

use std::collections::BTreeMap;

use keeper_common_crypto::FieldCipher;
use keeper_common_vault::{Secret, SecretKind, SnapshotFrame};

use crate::error::Result;

#[derive(Debug, Default, Clone)]
pub struct Mirror {
	current: BTreeMap<SecretKind, Vec<Secret>>,
	pending: BTreeMap<SecretKind, Vec<Secret>>,
	generation: u64,
}

impl Mirror {
	pub fn new() -> Self {
		Self::default()
	}

	/// Take one sync frame. Returns `true` when it completed a batch.
	pub fn apply(&mut self, frame: SnapshotFrame) -> Result<bool> {
		match frame.records()? {
			Some((kind, records)) => {
				self.pending.insert(kind, records);
				Ok(false)
			}
			None => {
				let batch = std::mem::take(&mut self.pending);
				self.replace_all(batch);
				Ok(true)
			}
		}
	}

	/// Replace every kind at once. Kinds absent from `records` become empty.
	pub fn replace_all(&mut self, records: BTreeMap<SecretKind, Vec<Secret>>) {
		self.current = records;
		self.generation += 1;
	}

	/// Number of completed batches applied so far.
	pub fn generation(&self) -> u64 {
		self.generation
	}

	pub fn records(&self, kind: SecretKind) -> &[Secret] {
		self.current.get(&kind).map(Vec::as_slice).unwrap_or(&[])
	}

	pub fn find(&self, kind: SecretKind, uid: &str) -> Option<&Secret> {
		self.records(kind).iter().find(|s| s.uid() == uid)
	}

	pub fn len(&self) -> usize {
		self.current.values().map(Vec::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// `(primary, secondary)` display labels of every record of `kind`.
	pub fn labels(&self, kind: SecretKind, cipher: &FieldCipher) -> Vec<(String, String)> {
		self.records(kind)
			.iter()
			.map(|s| (s.primary_label().to_string(), s.secondary_label(cipher)))
			.collect()
	}
}
