// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use keeper_common_crypto::FieldCipher;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::instruction::Value;
use crate::kind::{Event, SecretKind};
use crate::record::{next_column, Secret, SecretRecord, LABEL_SEPARATOR};

/// A login/password pair. `type_pair`, `name` and `password` arrive already
/// encrypted by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
	#[serde(rename = "user", default)]
	pub owner: String,
	pub uid: String,
	#[serde(default)]
	pub type_pair: String,
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub password: String,
	#[serde(default)]
	pub event: Event,
}

impl SecretRecord for CredentialPair {
	const KIND: SecretKind = SecretKind::CredentialPair;
	const COLUMNS: &'static [&'static str] = &["type_pair", "name", "password"];

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
			Value::text(&self.type_pair),
			Value::text(&self.name),
			Value::text(&self.password),
		]
	}

	fn from_columns(owner: String, uid: String, columns: Vec<Value>) -> Result<Self> {
		let kind = Self::KIND.as_str();
		let mut columns = columns.into_iter();
		Ok(Self {
			owner,
			uid,
			type_pair: next_column(&mut columns, Self::KIND, "type_pair")?.into_text(kind, "type_pair")?,
			name: next_column(&mut columns, Self::KIND, "name")?.into_text(kind, "name")?,
			password: next_column(&mut columns, Self::KIND, "password")?.into_text(kind, "password")?,
			event: Event::Upsert,
		})
	}

	fn secondary_label(&self, cipher: &FieldCipher) -> String {
		[
			cipher.decrypt_for_display(&self.type_pair),
			cipher.decrypt_for_display(&self.name),
			cipher.decrypt_for_display(&self.password),
		]
		.join(LABEL_SEPARATOR)
	}

	fn into_secret(self) -> Secret {
		Secret::CredentialPair(self)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn secondary_label_decrypts_all_fields() {
		let cipher = FieldCipher::new("key");
		let pair = CredentialPair {
			owner: "test".to_string(),
			uid: "u1".to_string(),
			type_pair: cipher.encrypt_str("site").unwrap(),
			name: cipher.encrypt_str("yandex.ru").unwrap(),
			password: cipher.encrypt_str("test_password").unwrap(),
			event: Event::Upsert,
		};
		assert_eq!(pair.secondary_label(&cipher), "site:::yandex.ru:::test_password");
	}

	#[test]
	fn missing_event_defaults_to_upsert() {
		let pair: CredentialPair =
			serde_json::from_str(r#"{"uid":"u1","name":"n","password":"p"}"#).unwrap();
		assert_eq!(pair.event, Event::Upsert);
		assert!(pair.owner.is_empty());
	}
}
