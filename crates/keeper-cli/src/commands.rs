// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! What each `keeper` subcommand does, independent of argument parsing.

use std::path::Path;

use keeper_common_crypto::{FieldCipher, SecretString};
use keeper_common_vault::{
	CredentialPair, Event, FileBlob, Note, PaymentCard, Secret, SecretKind, SecretRecord,
};
use tracing::{info, instrument};

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::mirror::Mirror;
use crate::session::TokenCache;
use crate::sync::SyncChannel;
use crate::transfer::{self, TransferSummary};

pub struct Keeper {
	config: ClientConfig,
	tokens: TokenCache,
}

impl Keeper {
	pub fn new(config: ClientConfig) -> Self {
		let tokens = TokenCache::new(config.token_file.clone());
		Self { config, tokens }
	}

	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	pub async fn register(&self, login: &str, password: &str) -> Result<()> {
		let token = ApiClient::new(self.config.clone()).register(login, password).await?;
		self.tokens.save(&token)?;
		info!(login, "registered");
		Ok(())
	}

	pub async fn login(&self, login: &str, password: &str) -> Result<()> {
		let token = ApiClient::new(self.config.clone()).login(login, password).await?;
		self.tokens.save(&token)?;
		info!(login, "logged in");
		Ok(())
	}

	pub fn logout(&self) -> Result<()> {
		self.tokens.clear()
	}

	pub async fn delete_account(&self, login: &str, password: &str) -> Result<()> {
		ApiClient::new(self.config.clone()).delete_account(login, password).await?;
		self.tokens.clear()?;
		info!(login, "account deleted");
		Ok(())
	}

	pub fn token(&self) -> Result<SecretString> {
		self.tokens.require()
	}

	fn api(&self) -> Result<ApiClient> {
		Ok(ApiClient::new(self.config.clone()).with_token(self.token()?))
	}

	pub async fn put_pair(
		&self,
		uid: Option<String>,
		type_pair: &str,
		name: &str,
		password: &str,
	) -> Result<String> {
		let cipher = self.config.cipher()?;
		let pair = CredentialPair {
			owner: String::new(),
			uid: uid.unwrap_or_else(new_uid),
			type_pair: cipher.encrypt_str(type_pair)?,
			name: cipher.encrypt_str(name)?,
			password: cipher.encrypt_str(password)?,
			event: Event::Upsert,
		};
		self.put(pair.into_secret()).await
	}

	pub async fn put_note(&self, uid: Option<String>, text: &str) -> Result<String> {
		let cipher = self.config.cipher()?;
		let note = Note {
			owner: String::new(),
			uid: uid.unwrap_or_else(new_uid),
			text: cipher.encrypt_str(text)?,
			event: Event::Upsert,
		};
		self.put(note.into_secret()).await
	}

	pub async fn put_card(
		&self,
		uid: Option<String>,
		number: &str,
		cvc: &str,
		expiry: Option<String>,
	) -> Result<String> {
		let cipher = self.config.cipher()?;
		let card = PaymentCard {
			owner: String::new(),
			uid: uid.unwrap_or_else(new_uid),
			number: cipher.encrypt_str(number)?,
			cvc: cipher.encrypt_str(cvc)?,
			expiry,
			event: Event::Upsert,
		};
		self.put(card.into_secret()).await
	}

	/// Ask the server to delete record `uid` of `kind`.
	pub async fn delete(&self, kind: SecretKind, uid: &str) -> Result<()> {
		let body = serde_json::json!({ "uid": uid, "event": Event::Delete.as_str() });
		let secret = Secret::from_json(kind, &serde_json::to_vec(&body)?)?;
		self.put(secret).await?;
		Ok(())
	}

	async fn put(&self, secret: Secret) -> Result<String> {
		secret.validate()?;
		self.api()?.put(&secret).await?;
		Ok(secret.uid().to_string())
	}

	/// Register the file's metadata, then stream its content.
	#[instrument(skip(self), fields(path = %path.display()))]
	pub async fn upload(&self, path: &Path, uid: Option<String>) -> Result<(String, TransferSummary)> {
		let cipher = self.config.cipher()?;
		let token = self.token()?;
		let size = tokio::fs::metadata(path).await?.len();
		let absolute = std::path::absolute(path)?;

		let blob = FileBlob {
			owner: String::new(),
			uid: uid.unwrap_or_else(new_uid),
			path: absolute.display().to_string(),
			download_path: None,
			name: file_part(path.file_stem()),
			extension: file_part(path.extension()),
			size,
			event: Event::Upsert,
		};
		let uid = self.put(blob.into_secret()).await?;
		let summary = transfer::upload(&self.config, &token, &cipher, &uid, path).await?;
		Ok((uid, summary))
	}

	/// Fetch file `uid` into `dest`, sized from its metadata when the server
	/// already has it.
	#[instrument(skip(self), fields(dest = %dest.display()))]
	pub async fn download(&self, uid: &str, dest: &Path) -> Result<TransferSummary> {
		let cipher = self.config.cipher()?;
		let token = self.token()?;
		let size = self.snapshot().await?.find(SecretKind::FileBlob, uid).and_then(|s| match s {
			Secret::FileBlob(blob) => Some(blob.size),
			_ => None,
		});
		transfer::download(&self.config, &token, &cipher, uid, dest, size).await
	}

	/// One full sync batch.
	pub async fn snapshot(&self) -> Result<Mirror> {
		let token = self.token()?;
		let mut channel = SyncChannel::connect(&self.config).await?;
		let mut mirror = Mirror::new();
		channel.refresh(&token, &mut mirror).await?;
		channel.close().await?;
		Ok(mirror)
	}

	pub fn cipher(&self) -> Result<FieldCipher> {
		self.config.cipher()
	}
}

fn new_uid() -> String {
	uuid::Uuid::new_v4().to_string()
}

fn file_part(part: Option<&std::ffi::OsStr>) -> String {
	part.map(|p| p.to_string_lossy().into_owned()).unwrap_or_default()
}
