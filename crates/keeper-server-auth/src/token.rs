// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HS256 bearer tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use keeper_common_crypto::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{AuthError, Result};

/// Lifetime of a freshly issued token. Clients log in again afterwards.
pub const DEFAULT_TOKEN_TTL: std::time::Duration = std::time::Duration::from_secs(5 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BearerClaims {
	pub authorized: bool,
	/// Account name; the owner of every record the token's holder writes.
	pub user: String,
	/// Expiry, seconds since the epoch.
	pub exp: i64,
}

#[derive(Clone)]
pub struct TokenIssuer {
	encoding_key: EncodingKey,
	decoding_key: DecodingKey,
	ttl: Duration,
}

impl TokenIssuer {
	pub fn new(secret: &SecretString, ttl: std::time::Duration) -> Self {
		let bytes = secret.expose().as_bytes();
		Self {
			encoding_key: EncodingKey::from_secret(bytes),
			decoding_key: DecodingKey::from_secret(bytes),
			ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::hours(5)),
		}
	}

	#[instrument(skip(self))]
	pub fn issue(&self, user: &str) -> Result<String> {
		let claims = BearerClaims {
			authorized: true,
			user: user.to_string(),
			exp: (Utc::now() + self.ttl).timestamp(),
		};
		let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
			.map_err(|e| AuthError::Signing(e.to_string()))?;
		debug!(exp = claims.exp, "issued bearer token");
		Ok(token)
	}

	pub fn verify(&self, token: &str) -> Result<BearerClaims> {
		let mut validation = Validation::new(Algorithm::HS256);
		validation.leeway = 0;

		let data = decode::<BearerClaims>(token, &self.decoding_key, &validation).map_err(|e| {
			match e.kind() {
				ErrorKind::ExpiredSignature => AuthError::Expired,
				_ => AuthError::InvalidToken(e.to_string()),
			}
		})?;

		let claims = data.claims;
		if !claims.authorized || claims.user.is_empty() {
			return Err(AuthError::NotAuthorized);
		}
		Ok(claims)
	}
}

impl std::fmt::Debug for TokenIssuer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TokenIssuer")
			.field("ttl", &self.ttl)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn issuer() -> TokenIssuer {
		TokenIssuer::new(&SecretString::from("signing-key"), DEFAULT_TOKEN_TTL)
	}

	fn sign(claims: &BearerClaims, key: &str) -> String {
		encode(
			&Header::new(Algorithm::HS256),
			claims,
			&EncodingKey::from_secret(key.as_bytes()),
		)
		.unwrap()
	}

	#[test]
	fn issued_token_verifies() {
		let issuer = issuer();
		let token = issuer.issue("test").unwrap();
		let claims = issuer.verify(&token).unwrap();
		assert_eq!(claims.user, "test");
		assert!(claims.authorized);
		assert!(claims.exp > Utc::now().timestamp());
	}

	#[test]
	fn expired_token_is_rejected() {
		let claims = BearerClaims {
			authorized: true,
			user: "test".to_string(),
			exp: Utc::now().timestamp() - 10,
		};
		let token = sign(&claims, "signing-key");
		assert!(matches!(issuer().verify(&token), Err(AuthError::Expired)));
	}

	#[test]
	fn foreign_signature_is_rejected() {
		let claims = BearerClaims {
			authorized: true,
			user: "test".to_string(),
			exp: Utc::now().timestamp() + 60,
		};
		let token = sign(&claims, "other-key");
		assert!(matches!(issuer().verify(&token), Err(AuthError::InvalidToken(_))));
	}

	#[test]
	fn unauthorized_claims_are_rejected() {
		let claims = BearerClaims {
			authorized: false,
			user: "test".to_string(),
			exp: Utc::now().timestamp() + 60,
		};
		let token = sign(&claims, "signing-key");
		assert!(matches!(issuer().verify(&token), Err(AuthError::NotAuthorized)));
	}

	#[test]
	fn garbage_is_rejected() {
		assert!(issuer().verify("not-a-token").is_err());
		assert!(issuer().verify("").is_err());
	}
}
