// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use keeper_common_crypto::FieldCipher;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::instruction::{Instruction, Value};
use crate::kind::{Event, SecretKind};
use crate::record::{next_column, Secret, SecretRecord, LABEL_SEPARATOR};

/// Metadata of an uploaded file. The content lives in `file_chunks` rows
/// keyed by this record's uid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileBlob {
	#[serde(rename = "user", default)]
	pub owner: String,
	pub uid: String,
	/// Source path on the uploading client.
	#[serde(rename = "patch", default)]
	pub path: String,
	/// Destination path on the downloading client. Never stored.
	#[serde(rename = "download_patch", default, skip_serializing_if = "Option::is_none")]
	pub download_path: Option<String>,
	#[serde(default)]
	pub name: String,
	#[serde(rename = "expansion", default)]
	pub extension: String,
	#[serde(default)]
	pub size: u64,
	#[serde(default)]
	pub event: Event,
}

impl SecretRecord for FileBlob {
	const KIND: SecretKind = SecretKind::FileBlob;
	const COLUMNS: &'static [&'static str] = &["name", "extension", "size", "path"];

	fn owner(&self) -> &str {
		&self.owner
	}

	fn set_owner(&mut self, owner: &str) {
		self.owner = owner.to_string();
	}

	fn uid(&self) -> &str {
		&self.uid
	}

	fn event(&self) -> Event {
		self.event
	}

	fn column_values(&self) -> Vec<Value> {
		vec![
			Value::text(&self.name),
			Value::text(&self.extension),
			Value::Integer(i64::try_from(self.size).unwrap_or(i64::MAX)),
			Value::text(&self.path),
		]
	}

	fn from_columns(owner: String, uid: String, columns: Vec<Value>) -> Result<Self> {
		let kind = Self::KIND.as_str();
		let mut columns = columns.into_iter();
		Ok(Self {
			owner,
			uid,
			name: next_column(&mut columns, Self::KIND, "name")?.into_text(kind, "name")?,
			extension: next_column(&mut columns, Self::KIND, "extension")?.into_text(kind, "extension")?,
			size: next_column(&mut columns, Self::KIND, "size")?
				.into_integer(kind, "size")?
				.max(0) as u64,
			path: next_column(&mut columns, Self::KIND, "path")?.into_text(kind, "path")?,
			download_path: None,
			event: Event::Upsert,
		})
	}

	/// Chunks go first, then the metadata row. Chunks of a uid owned by
	/// someone else are left alone.
	fn instructions_delete(&self) -> Vec<Instruction> {
		vec![
			Instruction::new(
				"DELETE FROM file_chunks WHERE file_uid = ?2 \
				 AND NOT EXISTS (SELECT 1 FROM files WHERE uid = ?2 AND owner <> ?1)",
				self.key_values(),
			),
			Instruction::new(
				"DELETE FROM files WHERE owner = ?1 AND uid = ?2",
				self.key_values(),
			),
		]
	}

	fn secondary_label(&self, _cipher: &FieldCipher) -> String {
		[
			self.name.clone(),
			self.extension.clone(),
			self.size.to_string(),
			self.path.clone(),
		]
		.join(LABEL_SEPARATOR)
	}

	fn into_secret(self) -> Secret {
		Secret::FileBlob(self)
	}
}
