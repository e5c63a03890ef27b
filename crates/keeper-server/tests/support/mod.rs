// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
	body::Body,
	http::{header::AUTHORIZATION, Method, Request, StatusCode},
	response::Response,
	Router,
};
use keeper_server::jobs::{create_scheduler, FLUSH_JOB_ID};
use keeper_server::{create_app_state, create_router, AppState, ServerConfig};
use keeper_server_jobs::{JobScheduler, TriggerSource};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub struct TestApp {
	pub router: Router,
	pub state: AppState,
	pub scheduler: Arc<JobScheduler>,
	_temp_dir: TempDir,
}

impl TestApp {
	pub async fn new() -> Self {
		Self::with_config(ServerConfig::default()).await
	}

	pub async fn with_config(config: ServerConfig) -> Self {
		let temp_dir = tempfile::tempdir().unwrap();
		let db_path = temp_dir.path().join("keeper.db");
		let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
		let pool = keeper_server_db::create_pool(&db_url).await.unwrap();
		keeper_server_db::run_migrations(&pool).await.unwrap();

		let mut state = create_app_state(pool, &config);
		let scheduler = Arc::new(create_scheduler(&state));
		state.job_scheduler = Some(Arc::clone(&scheduler));

		Self {
			router: create_router(state.clone()),
			state,
			scheduler,
			_temp_dir: temp_dir,
		}
	}

	/// Run one flush sweep now.
	pub async fn flush(&self) {
		let _ = self.scheduler.trigger_job(FLUSH_JOB_ID, TriggerSource::Manual).await;
	}

	/// Serve on an ephemeral port with the periodic flush running.
	pub async fn spawn(&self) -> SocketAddr {
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		let router = self.router.clone();
		tokio::spawn(async move {
			axum::serve(listener, router).await.unwrap();
		});
		self.scheduler.start().await.unwrap();
		addr
	}

	pub async fn request(&self, method: Method, path: &str, body: Body, token: Option<&str>) -> Response {
		let mut builder = Request::builder()
			.method(method)
			.uri(path)
			.header("content-type", "application/json");
		if let Some(token) = token {
			builder = builder.header(AUTHORIZATION, token);
		}
		self.router.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
	}

	pub async fn post_json(&self, path: &str, body: Value, token: Option<&str>) -> Response {
		self.request(Method::POST, path, Body::from(body.to_string()), token).await
	}

	/// POST with a gzip body, the way the client sends it.
	pub async fn post_gzip(&self, path: &str, body: Value, token: Option<&str>) -> Response {
		let compressed = keeper_common_crypto::compress(body.to_string().as_bytes()).unwrap();
		self.request(Method::POST, path, Body::from(compressed), token).await
	}

	pub async fn register(&self, login: &str, password: &str) -> String {
		let response = self
			.post_json(
				"/api/user/register",
				serde_json::json!({ "login": login, "password": password }),
				None,
			)
			.await;
		assert_eq!(response.status(), StatusCode::OK);
		token_of(&response)
	}
}

pub fn token_of(response: &Response) -> String {
	response
		.headers()
		.get(AUTHORIZATION)
		.expect("authorization header")
		.to_str()
		.unwrap()
		.to_string()
}

pub async fn body_json(response: Response) -> Value {
	let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
	serde_json::from_slice(&bytes).unwrap()
}
