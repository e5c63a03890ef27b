// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::kind::{Event, SecretKind};
use crate::record::Secret;

/// One frame of a sync batch: every record of one kind for the owner.
///
/// A batch is four kind frames followed by a terminator whose `type` is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotFrame {
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(default)]
	pub event: String,
	#[serde(default)]
	pub value: serde_json::Value,
}

impl SnapshotFrame {
	pub fn for_kind(kind: SecretKind, records: &[Secret]) -> Result<Self> {
		Ok(Self {
			kind: kind.as_str().to_string(),
			event: Event::Upsert.as_str().to_string(),
			value: serde_json::to_value(records)?,
		})
	}

	pub fn terminator() -> Self {
		Self {
			kind: String::new(),
			event: String::new(),
			value: serde_json::Value::Array(Vec::new()),
		}
	}

	pub fn is_terminator(&self) -> bool {
		self.kind.is_empty()
	}

	/// Decode the frame's records. The terminator has none.
	pub fn records(self) -> Result<Option<(SecretKind, Vec<Secret>)>> {
		if self.is_terminator() {
			return Ok(None);
		}
		let kind: SecretKind = self.kind.parse()?;
		let value = match self.value {
			serde_json::Value::Null => serde_json::Value::Array(Vec::new()),
			other => other,
		};
		Ok(Some((kind, Secret::from_json_array(kind, value)?)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::note::Note;
	use crate::record::SecretRecord;

	#[test]
	fn kind_frame_roundtrips() {
		let note = Note {
			owner: "test".to_string(),
			uid: "n1".to_string(),
			text: "enc".to_string(),
			event: Event::Upsert,
		}
		.into_secret();

		let frame = SnapshotFrame::for_kind(SecretKind::Note, std::slice::from_ref(&note)).unwrap();
		let bytes = serde_json::to_vec(&frame).unwrap();
		let parsed: SnapshotFrame = serde_json::from_slice(&bytes).unwrap();
		assert_eq!(parsed.kind, "Text");

		let (kind, records) = parsed.records().unwrap().unwrap();
		assert_eq!(kind, SecretKind::Note);
		assert_eq!(records, vec![note]);
	}

	#[test]
	fn terminator_has_no_records() {
		let bytes = serde_json::to_vec(&SnapshotFrame::terminator()).unwrap();
		let parsed: SnapshotFrame = serde_json::from_slice(&bytes).unwrap();
		assert!(parsed.is_terminator());
		assert!(parsed.records().unwrap().is_none());
	}

	#[test]
	fn null_value_is_an_empty_kind() {
		let parsed: SnapshotFrame =
			serde_json::from_str(r#"{"type":"Bank card","event":"edit","value":null}"#).unwrap();
		let (kind, records) = parsed.records().unwrap().unwrap();
		assert_eq!(kind, SecretKind::PaymentCard);
		assert!(records.is_empty());
	}
}
