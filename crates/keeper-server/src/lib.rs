// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Keeper secret storage server.
//!
//! Accepts record writes over HTTP into a staging cache, persists them to
//! SQLite on a short periodic flush, serves per-owner snapshots over the
//! sync websocket and moves encrypted file blocks over the transfer sockets.

pub mod api;
pub mod api_response;
pub mod auth_middleware;
pub mod error;
pub mod extract;
pub mod health;
pub mod jobs;
pub mod rate_limit;
pub mod routes;
pub mod websocket;

pub use api::{create_app_state, create_router, AppState};
pub use error::KeeperError;
pub use keeper_server_config::ServerConfig;
