// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authentication primitives for the Keeper server.
//!
//! - [`PasswordHasher`]: keyed HMAC-SHA256 of account passwords
//! - [`TokenIssuer`]: signed bearer tokens carrying [`BearerClaims`]
//! - [`extract_bearer_token`]: `Authorization` header parsing

pub mod bearer;
pub mod error;
pub mod password;
pub mod token;

pub use bearer::{extract_bearer_token, AUTHORIZATION_HEADER, UID_HEADER};
pub use error::{AuthError, Result};
pub use password::{PasswordHasher, DEFAULT_HASH_KEY};
pub use token::{BearerClaims, TokenIssuer, DEFAULT_TOKEN_TTL};
