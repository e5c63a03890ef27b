// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bearer token cache between invocations.

use std::path::PathBuf;

use keeper_common_crypto::SecretString;
use tracing::debug;

use crate::error::{ClientError, Result};

#[derive(Debug, Clone)]
pub struct TokenCache {
	path: PathBuf,
}

impl TokenCache {
	pub fn new(path: PathBuf) -> Self {
		Self { path }
	}

	pub fn load(&self) -> Result<Option<SecretString>> {
		match std::fs::read_to_string(&self.path) {
			Ok(raw) if !raw.trim().is_empty() => Ok(Some(SecretString::from(raw.trim()))),
			Ok(_) => Ok(None),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
			Err(e) => Err(e.into()),
		}
	}

	pub fn require(&self) -> Result<SecretString> {
		self.load()?.ok_or(ClientError::NotLoggedIn)
	}

	pub fn save(&self, token: &SecretString) -> Result<()> {
		if let Some(parent) = self.path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		std::fs::write(&self.path, token.expose())?;
		#[cfg(unix)]
		{
			use std::os::unix::fs::PermissionsExt;
			std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
		}
		debug!(path = %self.path.display(), "token cached");
		Ok(())
	}

	pub fn clear(&self) -> Result<()> {
		match std::fs::remove_file(&self.path) {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(e.into()),
		}
	}
}
