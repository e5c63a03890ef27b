// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP client for account and record endpoints.
//!
//! Request bodies go out gzip-compressed. Tokens come back in the
//! `Authorization` response header.

use keeper_common_crypto::{compress, SecretString};
use keeper_common_vault::Secret;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

#[derive(Serialize)]
struct Credentials<'a> {
	login: &'a str,
	password: &'a str,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
	#[serde(default)]
	error: String,
	#[serde(default)]
	message: String,
}

pub struct ApiClient {
	config: ClientConfig,
	http: reqwest::Client,
	token: Option<SecretString>,
}

impl ApiClient {
	pub fn new(config: ClientConfig) -> Self {
		Self {
			config,
			http: reqwest::Client::new(),
			token: None,
		}
	}

	pub fn with_token(mut self, token: SecretString) -> Self {
		self.token = Some(token);
		self
	}

	#[instrument(skip(self, password))]
	pub async fn register(&self, login: &str, password: &str) -> Result<SecretString> {
		let response = self
			.send(Method::POST, "/api/user/register", &Credentials { login, password }, false)
			.await?;
		token_header(&response)
	}

	#[instrument(skip(self, password))]
	pub async fn login(&self, login: &str, password: &str) -> Result<SecretString> {
		let response = self
			.send(Method::POST, "/api/user/login", &Credentials { login, password }, false)
			.await?;
		token_header(&response)
	}

	#[instrument(skip(self, password))]
	pub async fn delete_account(&self, login: &str, password: &str) -> Result<()> {
		self.send(Method::DELETE, "/api/user", &Credentials { login, password }, false)
			.await?;
		Ok(())
	}

	/// Send a record write or deletion for staging.
	#[instrument(skip(self, secret), fields(kind = %secret.kind(), uid = %secret.uid(), event = %secret.event()))]
	pub async fn put(&self, secret: &Secret) -> Result<()> {
		let path = format!("/api/user/{}", secret.kind().endpoint());
		self.send(Method::POST, &path, secret, true).await?;
		Ok(())
	}

	async fn send<T: Serialize + ?Sized>(
		&self,
		method: Method,
		path: &str,
		body: &T,
		authorized: bool,
	) -> Result<Response> {
		let url = self.config.http_url(path)?;
		let payload = compress(&serde_json::to_vec(body)?)?;

		let mut request = self
			.http
			.request(method, url)
			.header(CONTENT_TYPE, "application/json")
			.body(payload);
		if authorized {
			let token = self.token.as_ref().ok_or(ClientError::NotLoggedIn)?;
			request = request.header(AUTHORIZATION, token.expose().as_str());
		}

		let response = request.send().await?;
		let status = response.status();
		if status.is_success() {
			debug!(status = status.as_u16(), path, "request accepted");
			return Ok(response);
		}

		let body: ErrorBody = response.json().await.unwrap_or_default();
		Err(ClientError::Rejected {
			status: status.as_u16(),
			error: body.error,
			message: body.message,
		})
	}
}

fn token_header(response: &Response) -> Result<SecretString> {
	response
		.headers()
		.get(AUTHORIZATION)
		.and_then(|v| v.to_str().ok())
		.filter(|v| !v.is_empty())
		.map(SecretString::from)
		.ok_or(ClientError::MissingToken)
}
