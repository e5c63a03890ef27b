// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use keeper_common_crypto::FieldCipher;
use serde::Serialize;

use crate::card::PaymentCard;
use crate::error::{Result, VaultError};
use crate::file::FileBlob;
use crate::instruction::{placeholders, Instruction, Value};
use crate::kind::{Event, SecretKind};
use crate::note::Note;
use crate::pair::CredentialPair;
use crate::staging::StagingCache;

/// Joins decrypted fields in [`SecretRecord::secondary_label`].
pub const LABEL_SEPARATOR: &str = ":::";

/// Persistence contract shared by every record kind.
///
/// Implementors supply their table shape through [`SecretRecord::KIND`] and
/// [`SecretRecord::COLUMNS`] plus the matching [`SecretRecord::column_values`];
/// the provided methods derive every store instruction from that. Rows are
/// keyed by `(owner, uid)`.
pub trait SecretRecord: Sized {
	const KIND: SecretKind;

	/// Non-key columns, in the order of [`SecretRecord::column_values`].
	const COLUMNS: &'static [&'static str];

	fn owner(&self) -> &str;
	fn set_owner(&mut self, owner: &str);
	fn uid(&self) -> &str;
	fn event(&self) -> Event;
	fn column_values(&self) -> Vec<Value>;
	fn from_columns(owner: String, uid: String, columns: Vec<Value>) -> Result<Self>;
	fn secondary_label(&self, cipher: &FieldCipher) -> String;
	fn into_secret(self) -> Secret;

	fn kind(&self) -> SecretKind {
		Self::KIND
	}

	fn primary_label(&self) -> &str {
		self.uid()
	}

	fn check_existence(&self) -> Instruction {
		Instruction::new(
			format!(
				"SELECT 1 FROM {} WHERE owner = ?1 AND uid = ?2 LIMIT 1",
				Self::KIND.table()
			),
			self.key_values(),
		)
	}

	fn instructions_insert(&self) -> Instruction {
		Instruction::new(insert_sql(Self::KIND, Self::COLUMNS), self.all_values())
	}

	fn instructions_update(&self) -> Instruction {
		let assignments = Self::COLUMNS
			.iter()
			.enumerate()
			.map(|(i, c)| format!("{c} = ?{}", i + 3))
			.collect::<Vec<_>>()
			.join(", ");
		Instruction::new(
			format!(
				"UPDATE {} SET {assignments} WHERE owner = ?1 AND uid = ?2",
				Self::KIND.table()
			),
			self.all_values(),
		)
	}

	/// Single-statement insert-or-update on the `(owner, uid)` key.
	fn instructions_upsert(&self) -> Instruction {
		let assignments = Self::COLUMNS
			.iter()
			.map(|c| format!("{c} = excluded.{c}"))
			.collect::<Vec<_>>()
			.join(", ");
		Instruction::new(
			format!(
				"{} ON CONFLICT(owner, uid) DO UPDATE SET {assignments}",
				insert_sql(Self::KIND, Self::COLUMNS)
			),
			self.all_values(),
		)
	}

	/// Statements that remove the record. Executed together in one transaction.
	fn instructions_delete(&self) -> Vec<Instruction> {
		vec![Instruction::new(
			format!(
				"DELETE FROM {} WHERE owner = ?1 AND uid = ?2",
				Self::KIND.table()
			),
			self.key_values(),
		)]
	}

	fn instructions_select(&self) -> Instruction {
		select_instruction(Self::KIND, Self::COLUMNS, self.owner())
	}

	fn stage_into(self, cache: &mut StagingCache) {
		cache.stage(self.into_secret());
	}

	fn key_values(&self) -> Vec<Value> {
		vec![Value::text(self.owner()), Value::text(self.uid())]
	}

	fn all_values(&self) -> Vec<Value> {
		let mut values = self.key_values();
		values.extend(self.column_values());
		values
	}
}

fn insert_sql(kind: SecretKind, columns: &[&str]) -> String {
	format!(
		"INSERT INTO {} (owner, uid, {}) VALUES ({})",
		kind.table(),
		columns.join(", "),
		placeholders(1, columns.len() + 2)
	)
}

fn select_instruction(kind: SecretKind, columns: &[&str], owner: &str) -> Instruction {
	Instruction::new(
		format!(
			"SELECT owner, uid, {} FROM {} WHERE owner = ?1 ORDER BY uid",
			columns.join(", "),
			kind.table()
		),
		vec![Value::text(owner)],
	)
}

/// Pulls the next column out of a decoded row.
pub(crate) fn next_column(
	columns: &mut std::vec::IntoIter<Value>,
	kind: SecretKind,
	name: &str,
) -> Result<Value> {
	columns.next().ok_or_else(|| VaultError::MalformedRow {
		kind: kind.as_str(),
		message: format!("missing column {name}"),
	})
}

/// A record of any kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Secret {
	CredentialPair(CredentialPair),
	Note(Note),
	FileBlob(FileBlob),
	PaymentCard(PaymentCard),
}

macro_rules! dispatch {
	($self:expr, $inner:ident => $body:expr) => {
		match $self {
			Secret::CredentialPair($inner) => $body,
			Secret::Note($inner) => $body,
			Secret::FileBlob($inner) => $body,
			Secret::PaymentCard($inner) => $body,
		}
	};
}

impl Secret {
	pub fn kind(&self) -> SecretKind {
		dispatch!(self, r => r.kind())
	}

	pub fn owner(&self) -> &str {
		dispatch!(self, r => r.owner())
	}

	pub fn set_owner(&mut self, owner: &str) {
		dispatch!(self, r => r.set_owner(owner))
	}

	pub fn uid(&self) -> &str {
		dispatch!(self, r => r.uid())
	}

	pub fn event(&self) -> Event {
		dispatch!(self, r => r.event())
	}

	pub fn primary_label(&self) -> &str {
		dispatch!(self, r => r.primary_label())
	}

	pub fn secondary_label(&self, cipher: &FieldCipher) -> String {
		dispatch!(self, r => r.secondary_label(cipher))
	}

	pub fn check_existence(&self) -> Instruction {
		dispatch!(self, r => r.check_existence())
	}

	pub fn instructions_insert(&self) -> Instruction {
		dispatch!(self, r => r.instructions_insert())
	}

	pub fn instructions_update(&self) -> Instruction {
		dispatch!(self, r => r.instructions_update())
	}

	pub fn instructions_upsert(&self) -> Instruction {
		dispatch!(self, r => r.instructions_upsert())
	}

	pub fn instructions_delete(&self) -> Vec<Instruction> {
		dispatch!(self, r => r.instructions_delete())
	}

	pub fn instructions_select(&self) -> Instruction {
		dispatch!(self, r => r.instructions_select())
	}

	pub fn stage_into(self, cache: &mut StagingCache) {
		cache.stage(self);
	}

	/// Rejects records that cannot be keyed.
	pub fn validate(&self) -> Result<()> {
		if self.uid().trim().is_empty() {
			return Err(VaultError::MissingUid);
		}
		Ok(())
	}

	/// Parse one record of `kind` from a JSON body.
	pub fn from_json(kind: SecretKind, body: &[u8]) -> Result<Secret> {
		Ok(match kind {
			SecretKind::CredentialPair => serde_json::from_slice::<CredentialPair>(body)?.into_secret(),
			SecretKind::Note => serde_json::from_slice::<Note>(body)?.into_secret(),
			SecretKind::FileBlob => serde_json::from_slice::<FileBlob>(body)?.into_secret(),
			SecretKind::PaymentCard => serde_json::from_slice::<PaymentCard>(body)?.into_secret(),
		})
	}

	/// Parse a JSON array of records of `kind`, as carried in a snapshot frame.
	pub fn from_json_array(kind: SecretKind, value: serde_json::Value) -> Result<Vec<Secret>> {
		fn collect<T>(value: serde_json::Value) -> Result<Vec<Secret>>
		where
			T: SecretRecord + serde::de::DeserializeOwned,
		{
			let records: Vec<T> = serde_json::from_value(value)?;
			Ok(records.into_iter().map(SecretRecord::into_secret).collect())
		}

		match kind {
			SecretKind::CredentialPair => collect::<CredentialPair>(value),
			SecretKind::Note => collect::<Note>(value),
			SecretKind::FileBlob => collect::<FileBlob>(value),
			SecretKind::PaymentCard => collect::<PaymentCard>(value),
		}
	}
}

impl SecretKind {
	/// Statement selecting every record of this kind for `owner`.
	pub fn instructions_select(&self, owner: &str) -> Instruction {
		let columns = match self {
			SecretKind::CredentialPair => CredentialPair::COLUMNS,
			SecretKind::Note => Note::COLUMNS,
			SecretKind::FileBlob => FileBlob::COLUMNS,
			SecretKind::PaymentCard => PaymentCard::COLUMNS,
		};
		select_instruction(*self, columns, owner)
	}

	/// Decode one row produced by [`SecretKind::instructions_select`].
	pub fn decode_row(&self, row: Vec<Value>) -> Result<Secret> {
		let mut columns = row.into_iter();
		let owner = next_column(&mut columns, *self, "owner")?.into_text(self.as_str(), "owner")?;
		let uid = next_column(&mut columns, *self, "uid")?.into_text(self.as_str(), "uid")?;
		let rest: Vec<Value> = columns.collect();

		Ok(match self {
			SecretKind::CredentialPair => CredentialPair::from_columns(owner, uid, rest)?.into_secret(),
			SecretKind::Note => Note::from_columns(owner, uid, rest)?.into_secret(),
			SecretKind::FileBlob => FileBlob::from_columns(owner, uid, rest)?.into_secret(),
			SecretKind::PaymentCard => PaymentCard::from_columns(owner, uid, rest)?.into_secret(),
		})
	}
}
