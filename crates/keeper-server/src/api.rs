// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Application state and router.

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use keeper_common_vault::{SecretKind, StagingCache};
use keeper_server_auth::{PasswordHasher, TokenIssuer};
use keeper_server_config::ServerConfig;
use keeper_server_db::{ChunkRepository, SecretRepository, SecretStore, UserRepository};
use keeper_server_jobs::JobScheduler;
use sqlx::sqlite::SqlitePool;
use tokio::sync::Mutex;

use crate::error::KeeperError;
use crate::rate_limit::LoginRateLimiter;
use crate::{routes, websocket};

#[derive(Clone)]
pub struct AppState {
	pub pool: SqlitePool,
	pub store: Arc<dyn SecretStore>,
	pub users: Arc<UserRepository>,
	pub chunks: Arc<ChunkRepository>,
	/// The one lock every mutating handler and the flush sweep take.
	pub staging: Arc<Mutex<StagingCache>>,
	pub hasher: Arc<PasswordHasher>,
	pub tokens: Arc<TokenIssuer>,
	pub login_limiter: LoginRateLimiter,
	pub config: Arc<ServerConfig>,
	pub job_scheduler: Option<Arc<JobScheduler>>,
}

impl AppState {
	/// Owner of the file with this uid, looking at staged metadata first.
	pub async fn file_owner(&self, uid: &str) -> Result<Option<String>, KeeperError> {
		if let Some(staged) = self.staging.lock().await.get(SecretKind::FileBlob, uid) {
			return Ok(Some(staged.owner().to_string()));
		}
		Ok(self.chunks.file_owner(uid).await?)
	}
}

pub fn create_app_state(pool: SqlitePool, config: &ServerConfig) -> AppState {
	AppState {
		store: Arc::new(SecretRepository::new(pool.clone())),
		users: Arc::new(UserRepository::new(pool.clone())),
		chunks: Arc::new(ChunkRepository::new(pool.clone())),
		staging: Arc::new(Mutex::new(StagingCache::with_dead_letter_capacity(
			config.flush.dead_letter_capacity,
		))),
		hasher: Arc::new(PasswordHasher::new(config.auth.hash_key.clone())),
		tokens: Arc::new(TokenIssuer::new(&config.auth.jwt_secret, config.auth.token_ttl)),
		login_limiter: LoginRateLimiter::per_minute(config.auth.login_attempts_per_minute),
		config: Arc::new(config.clone()),
		job_scheduler: None,
		pool,
	}
}

pub fn create_router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(routes::health::health_check))
		.route("/api/version", get(routes::health::version))
		.route("/api/user/register", post(routes::user::register))
		.route("/api/user/login", post(routes::user::login))
		.route("/api/user", delete(routes::user::delete_account))
		.route("/api/user/pairs", post(routes::secrets::put_pair))
		.route("/api/user/text", post(routes::secrets::put_note))
		.route("/api/user/binary", post(routes::secrets::put_file))
		.route("/api/user/card", post(routes::secrets::put_card))
		.route("/socket", get(websocket::sync::sync_upgrade_handler))
		.route("/socket_file", get(websocket::transfer::upload_upgrade_handler))
		.route(
			"/socket_download_file",
			get(websocket::transfer::download_upgrade_handler),
		)
		.with_state(state)
}
