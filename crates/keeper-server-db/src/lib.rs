// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite persistence for the Keeper server.
//!
//! [`SecretRepository`] is the generic executor behind the [`SecretStore`]
//! trait: it runs whatever [`keeper_common_vault::Instruction`] a record
//! produces, so it has no per-kind code. Users and file chunks have their
//! own small repositories.

pub mod chunk;
pub mod error;
pub mod executor;
pub mod pool;
pub mod store;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod user;

pub use chunk::ChunkRepository;
pub use error::{DbError, Result};
pub use pool::{create_pool, run_migrations};
pub use store::{SecretRepository, SecretStore};
pub use user::{UserRecord, UserRepository};
