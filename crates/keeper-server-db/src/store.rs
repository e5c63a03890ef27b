// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;

use async_trait::async_trait;
use keeper_common_vault::{Event, Secret, SecretKind};
use sqlx::sqlite::SqlitePool;
use tracing::instrument;

use crate::error::{DbError, Result};
use crate::executor;

/// Persistent home of secret records.
///
/// Every method performs exactly one logical store operation for one
/// record, or one select for one `(kind, owner)`.
#[async_trait]
pub trait SecretStore: Send + Sync {
	async fn check_existence(&self, secret: &Secret) -> Result<bool>;
	async fn insert(&self, secret: &Secret) -> Result<()>;
	async fn update(&self, secret: &Secret) -> Result<()>;

	/// Insert or replace in a single statement.
	async fn upsert(&self, secret: &Secret) -> Result<()>;

	/// Remove the record and anything hanging off it, all or nothing.
	async fn delete(&self, secret: &Secret) -> Result<()>;

	/// Every record of `kind` owned by `owner`, keyed by uid.
	async fn select(&self, kind: SecretKind, owner: &str) -> Result<BTreeMap<String, Secret>>;

	/// Carry out the record's event.
	async fn apply(&self, secret: &Secret) -> Result<()> {
		match secret.event() {
			Event::Delete => self.delete(secret).await,
			Event::Upsert => self.upsert(secret).await,
		}
	}
}

#[derive(Clone)]
pub struct SecretRepository {
	pool: SqlitePool,
}

impl SecretRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}

	/// Existence probe followed by update or insert. Not atomic against
	/// concurrent writers of the same key; [`SecretStore::upsert`] is.
	#[instrument(skip(self, secret), fields(kind = %secret.kind(), uid = %secret.uid()))]
	pub async fn insert_or_update(&self, secret: &Secret) -> Result<()> {
		if self.check_existence(secret).await? {
			self.update(secret).await
		} else {
			self.insert(secret).await
		}
	}
}

#[async_trait]
impl SecretStore for SecretRepository {
	#[instrument(skip(self, secret), fields(kind = %secret.kind(), uid = %secret.uid()))]
	async fn check_existence(&self, secret: &Secret) -> Result<bool> {
		executor::exists(&self.pool, &secret.check_existence()).await
	}

	#[instrument(skip(self, secret), fields(kind = %secret.kind(), uid = %secret.uid()))]
	async fn insert(&self, secret: &Secret) -> Result<()> {
		executor::execute(&self.pool, &secret.instructions_insert())
			.await
			.map_err(|e| {
				if e.is_unique_violation() {
					DbError::Conflict(format!("{} {} already exists", secret.kind(), secret.uid()))
				} else {
					e
				}
			})?;
		Ok(())
	}

	#[instrument(skip(self, secret), fields(kind = %secret.kind(), uid = %secret.uid()))]
	async fn update(&self, secret: &Secret) -> Result<()> {
		let affected = executor::execute(&self.pool, &secret.instructions_update()).await?;
		if affected == 0 {
			return Err(DbError::NotFound(format!("{} {}", secret.kind(), secret.uid())));
		}
		Ok(())
	}

	#[instrument(skip(self, secret), fields(kind = %secret.kind(), uid = %secret.uid()))]
	async fn upsert(&self, secret: &Secret) -> Result<()> {
		executor::execute(&self.pool, &secret.instructions_upsert()).await?;
		Ok(())
	}

	#[instrument(skip(self, secret), fields(kind = %secret.kind(), uid = %secret.uid()))]
	async fn delete(&self, secret: &Secret) -> Result<()> {
		let mut tx = self.pool.begin().await?;
		for statement in secret.instructions_delete() {
			executor::execute(&mut *tx, &statement).await?;
		}
		tx.commit().await?;
		Ok(())
	}

	#[instrument(skip(self))]
	async fn select(&self, kind: SecretKind, owner: &str) -> Result<BTreeMap<String, Secret>> {
		let rows = executor::fetch_rows(&self.pool, &kind.instructions_select(owner)).await?;
		rows.into_iter()
			.map(|row| {
				let secret = kind.decode_row(row)?;
				Ok((secret.uid().to_string(), secret))
			})
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::chunk::ChunkRepository;
	use crate::testing::create_test_pool;
	use keeper_common_vault::{
		CredentialPair, FileBlob, FileChunk, Note, PaymentCard, SecretRecord,
	};

	fn pair(owner: &str, uid: &str, name: &str, event: Event) -> Secret {
		CredentialPair {
			owner: owner.to_string(),
			uid: uid.to_string(),
			type_pair: "t".to_string(),
			name: name.to_string(),
			password: "p".to_string(),
			event,
		}
		.into_secret()
	}

	fn blob(owner: &str, uid: &str) -> FileBlob {
		FileBlob {
			owner: owner.to_string(),
			uid: uid.to_string(),
			path: "/tmp/a.bin".to_string(),
			download_path: None,
			name: "a".to_string(),
			extension: "bin".to_string(),
			size: 3,
			event: Event::Upsert,
		}
	}

	fn chunk(uid: &str, portion: u64) -> FileChunk {
		FileChunk {
			file_uid: uid.to_string(),
			portion,
			len: 1,
			body: format!("body-{portion}"),
		}
	}

	#[tokio::test]
	async fn upsert_is_idempotent() {
		let repo = SecretRepository::new(create_test_pool().await);
		let secret = pair("test", "u1", "first", Event::Upsert);

		repo.apply(&secret).await.unwrap();
		let once = repo.select(SecretKind::CredentialPair, "test").await.unwrap();
		repo.apply(&secret).await.unwrap();
		let twice = repo.select(SecretKind::CredentialPair, "test").await.unwrap();

		assert_eq!(once, twice);
		assert_eq!(twice.len(), 1);
		assert_eq!(twice["u1"], secret);
	}

	#[tokio::test]
	async fn upsert_replaces_columns() {
		let repo = SecretRepository::new(create_test_pool().await);
		repo.upsert(&pair("test", "u1", "first", Event::Upsert)).await.unwrap();
		repo.upsert(&pair("test", "u1", "second", Event::Upsert)).await.unwrap();

		let rows = repo.select(SecretKind::CredentialPair, "test").await.unwrap();
		match &rows["u1"] {
			Secret::CredentialPair(p) => assert_eq!(p.name, "second"),
			other => panic!("unexpected record {other:?}"),
		}
	}

	#[tokio::test]
	async fn check_then_act_path_matches_upsert() {
		let repo = SecretRepository::new(create_test_pool().await);
		let first = pair("test", "u1", "first", Event::Upsert);
		assert!(!repo.check_existence(&first).await.unwrap());

		repo.insert_or_update(&first).await.unwrap();
		assert!(repo.check_existence(&first).await.unwrap());

		repo.insert_or_update(&pair("test", "u1", "second", Event::Upsert)).await.unwrap();
		assert_eq!(repo.select(SecretKind::CredentialPair, "test").await.unwrap().len(), 1);
	}

	#[tokio::test]
	async fn duplicate_insert_is_conflict_and_missing_update_is_not_found() {
		let repo = SecretRepository::new(create_test_pool().await);
		let secret = pair("test", "u1", "n", Event::Upsert);
		repo.insert(&secret).await.unwrap();
		assert!(matches!(repo.insert(&secret).await, Err(DbError::Conflict(_))));
		assert!(matches!(
			repo.update(&pair("test", "u2", "n", Event::Upsert)).await,
			Err(DbError::NotFound(_))
		));
	}

	#[tokio::test]
	async fn select_is_scoped_to_owner() {
		let repo = SecretRepository::new(create_test_pool().await);
		repo.upsert(&pair("alice", "a1", "n", Event::Upsert)).await.unwrap();
		repo.upsert(&pair("bob", "b1", "n", Event::Upsert)).await.unwrap();

		let alice = repo.select(SecretKind::CredentialPair, "alice").await.unwrap();
		assert_eq!(alice.keys().collect::<Vec<_>>(), vec!["a1"]);
	}

	#[tokio::test]
	async fn delete_event_removes_record() {
		let repo = SecretRepository::new(create_test_pool().await);
		repo.apply(&pair("test", "u1", "n", Event::Upsert)).await.unwrap();
		repo.apply(&pair("test", "u1", "n", Event::Delete)).await.unwrap();
		assert!(repo.select(SecretKind::CredentialPair, "test").await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn every_kind_roundtrips_through_select() {
		let repo = SecretRepository::new(create_test_pool().await);
		let records = vec![
			pair("test", "p1", "n", Event::Upsert),
			Note {
				owner: "test".to_string(),
				uid: "n1".to_string(),
				text: "enc".to_string(),
				event: Event::Upsert,
			}
			.into_secret(),
			blob("test", "f1").into_secret(),
			PaymentCard {
				owner: "test".to_string(),
				uid: "c1".to_string(),
				number: "n".to_string(),
				cvc: "c".to_string(),
				expiry: Some("12/27".to_string()),
				event: Event::Upsert,
			}
			.into_secret(),
		];

		for record in &records {
			repo.apply(record).await.unwrap();
		}
		for record in records {
			let rows = repo.select(record.kind(), "test").await.unwrap();
			assert_eq!(rows.get(record.uid()), Some(&record));
		}
	}

	#[tokio::test]
	async fn file_delete_takes_chunks_with_it() {
		let pool = create_test_pool().await;
		let repo = SecretRepository::new(pool.clone());
		let chunks = ChunkRepository::new(pool);

		repo.upsert(&blob("test", "f1").into_secret()).await.unwrap();
		chunks.insert_chunk(&chunk("f1", 0)).await.unwrap();
		chunks.insert_chunk(&chunk("f1", 1)).await.unwrap();

		let mut delete = blob("test", "f1");
		delete.event = Event::Delete;
		repo.apply(&delete.into_secret()).await.unwrap();

		assert!(chunks.select_chunks("f1").await.unwrap().is_empty());
		assert!(repo.select(SecretKind::FileBlob, "test").await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn file_delete_by_another_owner_leaves_chunks() {
		let pool = create_test_pool().await;
		let repo = SecretRepository::new(pool.clone());
		let chunks = ChunkRepository::new(pool);

		repo.upsert(&blob("alice", "f1").into_secret()).await.unwrap();
		chunks.insert_chunk(&chunk("f1", 0)).await.unwrap();

		let mut delete = blob("mallory", "f1");
		delete.event = Event::Delete;
		repo.apply(&delete.into_secret()).await.unwrap();

		assert_eq!(chunks.select_chunks("f1").await.unwrap().len(), 1);
		assert_eq!(repo.select(SecretKind::FileBlob, "alice").await.unwrap().len(), 1);
	}
}
