// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VaultError;

/// The four record kinds. The serialized form is the name carried in the
/// `type` field of snapshot frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SecretKind {
	#[serde(rename = "Pairs login/password")]
	CredentialPair,
	#[serde(rename = "Text")]
	Note,
	#[serde(rename = "Binary")]
	FileBlob,
	#[serde(rename = "Bank card")]
	PaymentCard,
}

impl SecretKind {
	/// Every kind, in the order snapshots are sent.
	pub const ALL: [SecretKind; 4] = [
		SecretKind::CredentialPair,
		SecretKind::Note,
		SecretKind::FileBlob,
		SecretKind::PaymentCard,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			SecretKind::CredentialPair => "Pairs login/password",
			SecretKind::Note => "Text",
			SecretKind::FileBlob => "Binary",
			SecretKind::PaymentCard => "Bank card",
		}
	}

	pub fn table(&self) -> &'static str {
		match self {
			SecretKind::CredentialPair => "credential_pairs",
			SecretKind::Note => "notes",
			SecretKind::FileBlob => "files",
			SecretKind::PaymentCard => "payment_cards",
		}
	}

	/// Last path segment of the mutating endpoint under `/api/user/`.
	pub fn endpoint(&self) -> &'static str {
		match self {
			SecretKind::CredentialPair => "pairs",
			SecretKind::Note => "text",
			SecretKind::FileBlob => "binary",
			SecretKind::PaymentCard => "card",
		}
	}
}

impl fmt::Display for SecretKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for SecretKind {
	type Err = VaultError;

	/// Accepts the wire name or the endpoint alias.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		SecretKind::ALL
			.into_iter()
			.find(|k| k.as_str() == s || k.endpoint().eq_ignore_ascii_case(s))
			.ok_or_else(|| VaultError::UnknownKind(s.to_string()))
	}
}

/// What the sender wants done with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Event {
	#[default]
	#[serde(rename = "edit")]
	Upsert,
	#[serde(rename = "del")]
	Delete,
}

impl Event {
	pub fn as_str(&self) -> &'static str {
		match self {
			Event::Upsert => "edit",
			Event::Delete => "del",
		}
	}
}

impl fmt::Display for Event {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn kind_parses_wire_names_and_aliases() {
		for kind in SecretKind::ALL {
			assert_eq!(kind.as_str().parse::<SecretKind>().unwrap(), kind);
			assert_eq!(kind.endpoint().parse::<SecretKind>().unwrap(), kind);
		}
		assert!(matches!(
			"Users".parse::<SecretKind>(),
			Err(VaultError::UnknownKind(_))
		));
	}

	#[test]
	fn kind_serializes_as_wire_name() {
		let json = serde_json::to_string(&SecretKind::PaymentCard).unwrap();
		assert_eq!(json, "\"Bank card\"");
		let parsed: SecretKind = serde_json::from_str("\"Pairs login/password\"").unwrap();
		assert_eq!(parsed, SecretKind::CredentialPair);
	}

	#[test]
	fn event_wire_names() {
		assert_eq!(serde_json::to_string(&Event::Upsert).unwrap(), "\"edit\"");
		assert_eq!(serde_json::to_string(&Event::Delete).unwrap(), "\"del\"");
		assert_eq!(Event::default(), Event::Upsert);
	}
}
