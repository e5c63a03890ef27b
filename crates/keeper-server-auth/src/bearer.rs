// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use http::header::AUTHORIZATION;
use http::HeaderMap;

pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Names the file on the download channel.
pub const UID_HEADER: &str = "UID";

/// Extract the token from the `Authorization` header.
///
/// Accepts both `Bearer <token>` and a bare token, which is what the
/// terminal client sends. Blank values count as missing.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
	let raw = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
	let token = match raw.split_once(' ') {
		Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
		_ if raw.eq_ignore_ascii_case("bearer") => "",
		_ => raw,
	};
	if token.is_empty() {
		None
	} else {
		Some(token.to_string())
	}
}
