// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use keeper_common_crypto::FieldCipher;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::instruction::Value;
use crate::kind::{Event, SecretKind};
use crate::record::{next_column, Secret, SecretRecord, LABEL_SEPARATOR};

/// A payment card. `number` and `cvc` are encrypted; the expiry (`MM/YY`) is not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCard {
	#[serde(rename = "user", default)]
	pub owner: String,
	pub uid: String,
	#[serde(default)]
	pub number: String,
	#[serde(default)]
	pub cvc: String,
	#[serde(rename = "date", default, skip_serializing_if = "Option::is_none")]
	pub expiry: Option<String>,
	#[serde(default)]
	pub event: Event,
}

impl SecretRecord for PaymentCard {
	const KIND: SecretKind = SecretKind::PaymentCard;
	const COLUMNS: &'static [&'static str] = &["number", "cvc", "expiry"];

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
			Value::text(&self.number),
			Value::text(&self.cvc),
			Value::opt_text(self.expiry.as_deref()),
		]
	}

	fn from_columns(owner: String, uid: String, columns: Vec<Value>) -> Result<Self> {
		let kind = Self::KIND.as_str();
		let mut columns = columns.into_iter();
		Ok(Self {
			owner,
			uid,
			number: next_column(&mut columns, Self::KIND, "number")?.into_text(kind, "number")?,
			cvc: next_column(&mut columns, Self::KIND, "cvc")?.into_text(kind, "cvc")?,
			expiry: next_column(&mut columns, Self::KIND, "expiry")?.into_opt_text(),
			event: Event::Upsert,
		})
	}

	fn secondary_label(&self, cipher: &FieldCipher) -> String {
		let mut parts = vec![
			cipher.decrypt_for_display(&self.number),
			cipher.decrypt_for_display(&self.cvc),
		];
		if let Some(expiry) = &self.expiry {
			parts.push(expiry.clone());
		}
		parts.join(LABEL_SEPARATOR)
	}

	fn into_secret(self) -> Secret {
		Secret::PaymentCard(self)
	}
}
