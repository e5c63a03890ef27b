// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Deserialize;

use crate::sections::{
	AuthConfigLayer, DatabaseConfigLayer, FlushConfigLayer, HttpConfigLayer, LoggingConfigLayer,
};

/// One source's partial view of the server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfigLayer {
	#[serde(default)]
	pub http: Option<HttpConfigLayer>,
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub auth: Option<AuthConfigLayer>,
	#[serde(default)]
	pub flush: Option<FlushConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

fn merge_section<T>(into: &mut Option<T>, other: Option<T>, merge: impl FnOnce(&mut T, T)) {
	match (into.as_mut(), other) {
		(Some(current), Some(other)) => merge(current, other),
		(None, Some(other)) => *into = Some(other),
		(_, None) => {}
	}
}

impl ServerConfigLayer {
	/// Overlay `other` on top of `self`; set fields in `other` win.
	pub fn merge(&mut self, other: ServerConfigLayer) {
		merge_section(&mut self.http, other.http, HttpConfigLayer::merge);
		merge_section(&mut self.database, other.database, DatabaseConfigLayer::merge);
		merge_section(&mut self.auth, other.auth, AuthConfigLayer::merge);
		merge_section(&mut self.flush, other.flush, FlushConfigLayer::merge);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn later_layer_overrides_set_fields_only() {
		let mut base: ServerConfigLayer = toml::from_str(
			r#"
			[http]
			host = "0.0.0.0"
			port = 9000
			"#,
		)
		.unwrap();
		let top: ServerConfigLayer = toml::from_str(
			r#"
			[http]
			port = 9443
			"#,
		)
		.unwrap();

		base.merge(top);
		let http = base.http.unwrap();
		assert_eq!(http.host.as_deref(), Some("0.0.0.0"));
		assert_eq!(http.port, Some(9443));
	}
}
