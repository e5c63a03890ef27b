// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Write-back buffer between request handlers and the store.
//!
//! The cache holds at most one pending record per `(kind, uid)`. Staging a
//! record whose key is already pending replaces it, so a burst of edits to
//! the same record reaches the store as a single write. The cache itself is
//! not synchronized; the server wraps it in one exclusive lock.
//!
//! Failed flush attempts are counted per key until the key flushes, gets a
//! fresh write, or is given up on.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};

use crate::kind::SecretKind;
use crate::record::Secret;

pub const DEFAULT_DEAD_LETTER_CAPACITY: usize = 1024;

/// A staged write the flush gave up on.
#[derive(Debug, Clone)]
pub struct DeadLetter {
	pub secret: Secret,
	pub error: String,
	pub failed_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct StagingCache {
	pending: HashMap<SecretKind, HashMap<String, Secret>>,
	failures: HashMap<(SecretKind, String), u32>,
	dead_letters: VecDeque<DeadLetter>,
	dead_letter_capacity: usize,
}

impl Default for StagingCache {
	fn default() -> Self {
		Self::new()
	}
}

impl StagingCache {
	pub fn new() -> Self {
		Self::with_dead_letter_capacity(DEFAULT_DEAD_LETTER_CAPACITY)
	}

	pub fn with_dead_letter_capacity(capacity: usize) -> Self {
		Self {
			pending: HashMap::new(),
			failures: HashMap::new(),
			dead_letters: VecDeque::new(),
			dead_letter_capacity: capacity,
		}
	}

	/// Stage `secret`, returning the pending record it displaced, if any.
	/// A fresh write starts its failure count over.
	pub fn stage(&mut self, secret: Secret) -> Option<Secret> {
		self.failures.remove(&(secret.kind(), secret.uid().to_string()));
		self
			.pending
			.entry(secret.kind())
			.or_default()
			.insert(secret.uid().to_string(), secret)
	}

	/// Put back a record whose flush failed, unless a newer write for the
	/// same key has been staged since.
	pub fn restage(&mut self, secret: Secret) -> bool {
		let slot = self.pending.entry(secret.kind()).or_default();
		if slot.contains_key(secret.uid()) {
			return false;
		}
		slot.insert(secret.uid().to_string(), secret);
		true
	}

	/// Count one more failed flush of `secret`'s key and return the total.
	pub fn record_failure(&mut self, secret: &Secret) -> u32 {
		let count = self
			.failures
			.entry((secret.kind(), secret.uid().to_string()))
			.or_default();
		*count += 1;
		*count
	}

	/// Forget the failure count of a key that flushed or was given up on.
	pub fn clear_failures(&mut self, secret: &Secret) {
		self.failures.remove(&(secret.kind(), secret.uid().to_string()));
	}

	pub fn failures(&self, kind: SecretKind, uid: &str) -> u32 {
		self.failures.get(&(kind, uid.to_string())).copied().unwrap_or(0)
	}

	pub fn get(&self, kind: SecretKind, uid: &str) -> Option<&Secret> {
		self.pending.get(&kind).and_then(|m| m.get(uid))
	}

	pub fn len(&self) -> usize {
		self.pending.values().map(HashMap::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Remove and return every pending record.
	pub fn take_all(&mut self) -> Vec<Secret> {
		self
			.pending
			.drain()
			.flat_map(|(_, by_uid)| by_uid.into_values())
			.collect()
	}

	/// Drop every pending record of `owner`, returning how many were dropped.
	pub fn discard_owner(&mut self, owner: &str) -> usize {
		let mut dropped = 0;
		for by_uid in self.pending.values_mut() {
			let before = by_uid.len();
			by_uid.retain(|_, s| s.owner() != owner);
			dropped += before - by_uid.len();
		}
		let pending = &self.pending;
		self.failures
			.retain(|(kind, uid), _| pending.get(kind).is_some_and(|m| m.contains_key(uid)));
		dropped
	}

	pub fn push_dead_letter(&mut self, secret: Secret, error: impl Into<String>) {
		self.clear_failures(&secret);
		if self.dead_letter_capacity == 0 {
			return;
		}
		if self.dead_letters.len() == self.dead_letter_capacity {
			self.dead_letters.pop_front();
		}
		self.dead_letters.push_back(DeadLetter {
			secret,
			error: error.into(),
			failed_at: Utc::now(),
		});
	}

	pub fn dead_letters(&self) -> impl Iterator<Item = &DeadLetter> {
		self.dead_letters.iter()
	}

	pub fn dead_letter_count(&self) -> usize {
		self.dead_letters.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::kind::Event;
	use crate::note::Note;
	use crate::record::SecretRecord;
	use proptest::prelude::*;

	fn note(uid: &str, text: &str) -> Secret {
		Note {
			owner: "test".to_string(),
			uid: uid.to_string(),
			text: text.to_string(),
			event: Event::Upsert,
		}
		.into_secret()
	}

	#[test]
	fn second_stage_overwrites_first() {
		let mut cache = StagingCache::new();
		assert!(cache.stage(note("n1", "first")).is_none());
		let displaced = cache.stage(note("n1", "second")).unwrap();
		assert_eq!(displaced, note("n1", "first"));
		assert_eq!(cache.len(), 1);
		assert_eq!(cache.get(SecretKind::Note, "n1"), Some(&note("n1", "second")));
	}

	#[test]
	fn stage_into_uses_record_uid() {
		let mut cache = StagingCache::new();
		note("n2", "x").stage_into(&mut cache);
		Note {
			owner: "test".to_string(),
			uid: "n2".to_string(),
			text: "y".to_string(),
			event: Event::Delete,
		}
		.stage_into(&mut cache);

		let pending = cache.take_all();
		assert_eq!(pending.len(), 1);
		assert_eq!(pending[0].event(), Event::Delete);
		assert!(cache.is_empty());
	}

	#[test]
	fn restage_yields_to_newer_write() {
		let mut cache = StagingCache::new();
		cache.stage(note("n1", "newer"));
		assert!(!cache.restage(note("n1", "older")));
		assert_eq!(cache.get(SecretKind::Note, "n1"), Some(&note("n1", "newer")));

		let mut empty = StagingCache::new();
		assert!(empty.restage(note("n1", "older")));
		assert_eq!(empty.len(), 1);
	}

	#[test]
	fn discard_owner_keeps_other_owners() {
		let mut cache = StagingCache::new();
		cache.stage(note("n1", "mine"));
		let theirs = Note {
			owner: "other".to_string(),
			uid: "n2".to_string(),
			text: "theirs".to_string(),
			event: Event::Upsert,
		};
		cache.stage(theirs.clone().into_secret());

		assert_eq!(cache.discard_owner("test"), 1);
		assert_eq!(cache.get(SecretKind::Note, "n2"), Some(&theirs.into_secret()));
		assert_eq!(cache.len(), 1);
	}

	#[test]
	fn failure_count_resets_on_fresh_write() {
		let mut cache = StagingCache::new();
		let first = note("n1", "a");
		assert_eq!(cache.record_failure(&first), 1);
		assert_eq!(cache.record_failure(&first), 2);
		cache.restage(first);
		assert_eq!(cache.failures(SecretKind::Note, "n1"), 2);

		cache.stage(note("n1", "b"));
		assert_eq!(cache.failures(SecretKind::Note, "n1"), 0);

		let given_up = note("n2", "c");
		cache.record_failure(&given_up);
		cache.push_dead_letter(given_up, "boom");
		assert_eq!(cache.failures(SecretKind::Note, "n2"), 0);
	}

	#[test]
	fn dead_letters_are_bounded() {
		let mut cache = StagingCache::with_dead_letter_capacity(2);
		cache.push_dead_letter(note("a", "1"), "boom");
		cache.push_dead_letter(note("b", "2"), "boom");
		cache.push_dead_letter(note("c", "3"), "boom");
		let uids: Vec<_> = cache.dead_letters().map(|d| d.secret.uid().to_string()).collect();
		assert_eq!(uids, vec!["b", "c"]);
	}

	proptest! {
		#[test]
		fn prop_one_entry_per_key_holding_last_write(
			writes in proptest::collection::vec((0u8..5, "[a-z]{1,8}"), 1..50)
		) {
			let mut cache = StagingCache::new();
			let mut last = HashMap::new();
			for (uid, text) in &writes {
				let uid = format!("n{uid}");
				cache.stage(note(&uid, text));
				last.insert(uid, text.clone());
			}

			prop_assert_eq!(cache.len(), last.len());
			for (uid, text) in last {
				prop_assert_eq!(cache.get(SecretKind::Note, &uid), Some(&note(&uid, &text)));
			}
		}
	}
}
