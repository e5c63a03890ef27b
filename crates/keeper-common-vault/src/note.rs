// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use keeper_common_crypto::FieldCipher;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::instruction::Value;
use crate::kind::{Event, SecretKind};
use crate::record::{next_column, Secret, SecretRecord};

/// Free-form encrypted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
	#[serde(rename = "user", default)]
	pub owner: String,
	pub uid: String,
	#[serde(default)]
	pub text: String,
	#[serde(default)]
	pub event: Event,
}

impl SecretRecord for Note {
	const KIND: SecretKind = SecretKind::Note;
	const COLUMNS: &'static [&'static str] = &["body"];

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
		vec![Value::text(&self.text)]
	}

	fn from_columns(owner: String, uid: String, columns: Vec<Value>) -> Result<Self> {
		let mut columns = columns.into_iter();
		Ok(Self {
			owner,
			uid,
			text: next_column(&mut columns, Self::KIND, "body")?.into_text(Self::KIND.as_str(), "body")?,
			event: Event::Upsert,
		})
	}

	fn secondary_label(&self, cipher: &FieldCipher) -> String {
		cipher.decrypt_for_display(&self.text)
	}

	fn into_secret(self) -> Secret {
		Secret::Note(self)
	}
}
