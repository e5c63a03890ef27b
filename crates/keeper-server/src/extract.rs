// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use keeper_common_crypto::decompress_or_raw;

use crate::error::KeeperError;

/// Request body, gunzipped when the client compressed it.
///
/// Clients send gzip; plain JSON is accepted too.
#[derive(Debug, Clone)]
pub struct GzipBody(pub Vec<u8>);

impl GzipBody {
	pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, KeeperError> {
		serde_json::from_slice(&self.0).map_err(|e| KeeperError::InvalidFormat(e.to_string()))
	}
}

impl<S> FromRequest<S> for GzipBody
where
	S: Send + Sync,
{
	type Rejection = KeeperError;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		let bytes = Bytes::from_request(req, state)
			.await
			.map_err(|e| KeeperError::InvalidFormat(e.body_text()))?;
		Ok(GzipBody(decompress_or_raw(&bytes)?))
	}
}
