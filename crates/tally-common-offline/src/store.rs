// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{
	SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{OfflineError, Result};
use crate::model::{Collection, EntityRecord, RecordKey};

/// Schema version written to `PRAGMA user_version`.
pub const SCHEMA_VERSION: i64 = 1;

pub(crate) const QUEUE_TABLE: &str = "sync_queue";

/// Pool size used unless [`SqliteStore::with_max_connections`] overrides it.
const DEFAULT_MAX_CONNECTIONS: u32 = 4;

/// Durable, per-collection keyed record storage.
#[async_trait]
pub trait DurableStore: Send + Sync {
	/// Open the backing medium and create missing collections. Idempotent.
	async fn initialize(&self) -> Result<()>;

	/// Release the backing medium. Later calls fail until re-initialized.
	async fn close(&self);

	async fn put(&self, collection: Collection, record: &EntityRecord) -> Result<RecordKey>;
	async fn get(&self, collection: Collection, key: &RecordKey) -> Result<Option<EntityRecord>>;
	async fn get_all(&self, collection: Collection) -> Result<Vec<EntityRecord>>;

	/// Delete a record. Absent keys are not an error.
	async fn remove(&self, collection: Collection, key: &RecordKey) -> Result<()>;
}

/// SQLite-backed store holding every collection and the pending-operation queue.
pub struct SqliteStore {
	options: SqliteConnectOptions,
	max_connections: u32,
	in_memory: bool,
	pool: RwLock<Option<SqlitePool>>,
}

impl SqliteStore {
	/// Prepare a store for `database_url` (e.g. `sqlite:./tally-offline.db`).
	///
	/// Nothing is opened until [`DurableStore::initialize`] runs.
	pub fn new(database_url: &str) -> Result<Self> {
		let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
		let options = SqliteConnectOptions::from_str(database_url)
			.map_err(|e| OfflineError::StorageUnavailable(format!("invalid database URL: {e}")))?;
		Ok(Self::with_options(options, in_memory))
	}

	/// A private database that lives as long as the store stays initialized.
	pub fn in_memory() -> Result<Self> {
		Self::new("sqlite::memory:")
	}

	/// Store backed by the file at `path`, taken verbatim rather than parsed as a URL.
	pub fn at_path(path: impl AsRef<Path>) -> Self {
		let options = SqliteConnectOptions::new().filename(path);
		Self::with_options(options, false)
	}

	fn with_options(options: SqliteConnectOptions, in_memory: bool) -> Self {
		let mut options = options
			.synchronous(SqliteSynchronous::Normal)
			.create_if_missing(true);
		if !in_memory {
			options = options.journal_mode(SqliteJournalMode::Wal);
		}

		Self {
			options,
			max_connections: if in_memory { 1 } else { DEFAULT_MAX_CONNECTIONS },
			in_memory,
			pool: RwLock::new(None),
		}
	}

	/// Cap the pool size. In-memory stores always use a single connection.
	pub fn with_max_connections(mut self, max_connections: u32) -> Self {
		if !self.in_memory {
			self.max_connections = max_connections.max(1);
		}
		self
	}

	pub async fn is_initialized(&self) -> bool {
		self.pool.read().await.is_some()
	}

	pub(crate) async fn pool(&self) -> Result<SqlitePool> {
		self
			.pool
			.read()
			.await
			.clone()
			.ok_or_else(OfflineError::not_initialized)
	}

	async fn connect(&self) -> Result<SqlitePool> {
		let mut pool_options = SqlitePoolOptions::new().max_connections(self.max_connections);
		if self.in_memory {
			// Dropping the only connection would drop the database with it.
			pool_options = pool_options
				.min_connections(1)
				.idle_timeout(None)
				.max_lifetime(None);
		}

		pool_options
			.connect_with(self.options.clone())
			.await
			.map_err(|e| OfflineError::StorageUnavailable(format!("failed to open store: {e}")))
	}
}

/// Create missing tables and stamp the schema version.
async fn migrate(pool: &SqlitePool) -> Result<()> {
	let (version,): (i64,) = sqlx::query_as("PRAGMA user_version")
		.fetch_one(pool)
		.await?;

	if version > SCHEMA_VERSION {
		return Err(OfflineError::StorageUnavailable(format!(
			"store schema version {version} is newer than supported version {SCHEMA_VERSION}"
		)));
	}

	let mut tx = pool.begin().await?;

	for collection in Collection::ALL {
		let sql = format!(
			r#"CREATE TABLE IF NOT EXISTS "{}" (
				id TEXT PRIMARY KEY NOT NULL,
				data TEXT NOT NULL
			)"#,
			collection.as_str()
		);
		sqlx::query(&sql).execute(&mut *tx).await?;
	}

	let sql = format!(
		r#"CREATE TABLE IF NOT EXISTS "{QUEUE_TABLE}" (
			seq INTEGER PRIMARY KEY AUTOINCREMENT,
			op_type TEXT NOT NULL,
			payload TEXT NOT NULL,
			endpoint TEXT NOT NULL,
			method TEXT NOT NULL,
			timestamp TEXT NOT NULL
		)"#
	);
	sqlx::query(&sql).execute(&mut *tx).await?;

	if version < SCHEMA_VERSION {
		sqlx::query(&format!("PRAGMA user_version = {SCHEMA_VERSION}"))
			.execute(&mut *tx)
			.await?;
		info!(from = version, to = SCHEMA_VERSION, "migrated offline store schema");
	}

	tx.commit().await?;
	Ok(())
}

#[async_trait]
impl DurableStore for SqliteStore {
	async fn initialize(&self) -> Result<()> {
		let mut guard = self.pool.write().await;
		if guard.is_some() {
			debug!("offline store already initialized");
			return Ok(());
		}

		let pool = self.connect().await?;
		if let Err(e) = migrate(&pool).await {
			warn!(error = %e, "offline store schema check failed");
			pool.close().await;
			return Err(e);
		}

		*guard = Some(pool);
		info!(in_memory = self.in_memory, "initialized offline store");
		Ok(())
	}

	async fn close(&self) {
		if let Some(pool) = self.pool.write().await.take() {
			pool.close().await;
			info!("closed offline store");
		}
	}

	async fn put(&self, collection: Collection, record: &EntityRecord) -> Result<RecordKey> {
		let pool = self.pool().await?;
		let data = serde_json::to_string(record)?;

		let sql = format!(
			r#"INSERT INTO "{}" (id, data) VALUES (?, ?)
			ON CONFLICT(id) DO UPDATE SET data = excluded.data"#,
			collection.as_str()
		);
		sqlx::query(&sql)
			.bind(record.key().as_str())
			.bind(&data)
			.execute(&pool)
			.await?;

		debug!(collection = %collection, key = %record.key(), "stored record");
		Ok(record.key().clone())
	}

	async fn get(&self, collection: Collection, key: &RecordKey) -> Result<Option<EntityRecord>> {
		let pool = self.pool().await?;

		let sql = format!(r#"SELECT data FROM "{}" WHERE id = ?"#, collection.as_str());
		let row: Option<(String,)> = sqlx::query_as(&sql)
			.bind(key.as_str())
			.fetch_optional(&pool)
			.await?;

		match row {
			Some((data,)) => Ok(Some(serde_json::from_str(&data)?)),
			None => {
				debug!(collection = %collection, key = %key, "record not found");
				Ok(None)
			}
		}
	}

	async fn get_all(&self, collection: Collection) -> Result<Vec<EntityRecord>> {
		let pool = self.pool().await?;

		let sql = format!(r#"SELECT data FROM "{}" ORDER BY id"#, collection.as_str());
		let rows: Vec<(String,)> = sqlx::query_as(&sql).fetch_all(&pool).await?;

		let records = rows
			.into_iter()
			.map(|(data,)| serde_json::from_str(&data))
			.collect::<std::result::Result<Vec<EntityRecord>, _>>()?;

		debug!(collection = %collection, count = records.len(), "listed records");
		Ok(records)
	}

	async fn remove(&self, collection: Collection, key: &RecordKey) -> Result<()> {
		let pool = self.pool().await?;

		let sql = format!(r#"DELETE FROM "{}" WHERE id = ?"#, collection.as_str());
		let result = sqlx::query(&sql).bind(key.as_str()).execute(&pool).await?;

		debug!(
				collection = %collection,
				key = %key,
				removed = result.rows_affected(),
				"removed record"
		);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use tempfile::TempDir;

	async fn create_test_store() -> (SqliteStore, TempDir) {
		let tmp = TempDir::new().unwrap();
		let store = SqliteStore::at_path(tmp.path().join("offline.db"));
		store.initialize().await.unwrap();
		(store, tmp)
	}

	fn project(id: &str, name: &str) -> EntityRecord {
		EntityRecord::new(json!({"id": id, "name": name, "budget": 1200})).unwrap()
	}

	#[tokio::test]
	async fn test_put_then_get_returns_equal_record() {
		let (store, _tmp) = create_test_store().await;
		let record = project("p-1", "X");

		let key = store.put(Collection::Projects, &record).await.unwrap();
		assert_eq!(key, RecordKey::from("p-1"));

		let loaded = store.get(Collection::Projects, &key).await.unwrap();
		assert_eq!(loaded, Some(record));
	}

	#[tokio::test]
	async fn test_get_missing_returns_none() {
		let (store, _tmp) = create_test_store().await;
		let loaded = store
			.get(Collection::Billing, &RecordKey::from("nope"))
			.await
			.unwrap();
		assert!(loaded.is_none());
	}

	#[tokio::test]
	async fn test_put_overwrites_same_identifier() {
		let (store, _tmp) = create_test_store().await;
		store
			.put(Collection::Projects, &project("p-1", "First"))
			.await
			.unwrap();
		store
			.put(Collection::Projects, &project("p-1", "Second"))
			.await
			.unwrap();

		let all = store.get_all(Collection::Projects).await.unwrap();
		assert_eq!(all.len(), 1);
		assert_eq!(all[0].get("name"), Some(&json!("Second")));
	}

	#[tokio::test]
	async fn test_collections_are_isolated() {
		let (store, _tmp) = create_test_store().await;
		store
			.put(Collection::Revenue, &project("shared", "revenue"))
			.await
			.unwrap();

		let key = RecordKey::from("shared");
		assert!(store.get(Collection::Expenses, &key).await.unwrap().is_none());
		assert!(store.get(Collection::Revenue, &key).await.unwrap().is_some());
	}

	#[tokio::test]
	async fn test_remove_then_get_returns_none_and_is_idempotent() {
		let (store, _tmp) = create_test_store().await;
		let record = project("p-1", "X");
		let key = store.put(Collection::Projects, &record).await.unwrap();

		store.remove(Collection::Projects, &key).await.unwrap();
		assert!(store.get(Collection::Projects, &key).await.unwrap().is_none());

		store.remove(Collection::Projects, &key).await.unwrap();
	}

	#[tokio::test]
	async fn test_initialize_is_idempotent() {
		let (store, _tmp) = create_test_store().await;
		store
			.put(Collection::Collections, &project("c-1", "X"))
			.await
			.unwrap();

		store.initialize().await.unwrap();
		assert_eq!(store.get_all(Collection::Collections).await.unwrap().len(), 1);
	}

	#[tokio::test]
	async fn test_operations_before_initialize_fail() {
		let tmp = TempDir::new().unwrap();
		let store = SqliteStore::at_path(tmp.path().join("offline.db"));

		let result = store.put(Collection::Projects, &project("p-1", "X")).await;
		assert!(matches!(result, Err(OfflineError::StorageUnavailable(_))));
		let result = store.get_all(Collection::Projects).await;
		assert!(matches!(result, Err(OfflineError::StorageUnavailable(_))));
	}

	#[tokio::test]
	async fn test_close_then_reinitialize_keeps_data() {
		let (store, _tmp) = create_test_store().await;
		let key = store
			.put(Collection::Expenses, &project("e-1", "X"))
			.await
			.unwrap();

		store.close().await;
		assert!(!store.is_initialized().await);
		assert!(matches!(
			store.get(Collection::Expenses, &key).await,
			Err(OfflineError::StorageUnavailable(_))
		));

		store.initialize().await.unwrap();
		assert!(store.get(Collection::Expenses, &key).await.unwrap().is_some());
	}

	#[tokio::test]
	async fn test_newer_schema_version_is_rejected() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join("offline.db");

		let store = SqliteStore::at_path(&path);
		store.initialize().await.unwrap();
		let pool = store.pool().await.unwrap();
		sqlx::query(&format!("PRAGMA user_version = {}", SCHEMA_VERSION + 1))
			.execute(&pool)
			.await
			.unwrap();
		store.close().await;

		let reopened = SqliteStore::at_path(&path);
		let result = reopened.initialize().await;
		assert!(matches!(result, Err(OfflineError::StorageUnavailable(_))));
		assert!(!reopened.is_initialized().await);
	}

	#[tokio::test]
	async fn test_path_with_url_syntax_is_used_verbatim() {
		let tmp = TempDir::new().unwrap();
		for dir_name in ["acme%20corp", "what?now", "a#b"] {
			let dir = tmp.path().join(dir_name);
			std::fs::create_dir(&dir).unwrap();
			let path = dir.join("offline.db");

			let store = SqliteStore::at_path(&path);
			store.initialize().await.unwrap();
			store
				.put(Collection::Projects, &project("p-1", dir_name))
				.await
				.unwrap();
			store.close().await;

			assert!(path.is_file(), "expected database at {}", path.display());
		}
	}

	#[tokio::test]
	async fn test_initialize_fails_when_medium_cannot_be_opened() {
		let tmp = TempDir::new().unwrap();
		let not_a_file = tmp.path().join("offline.db");
		std::fs::create_dir(&not_a_file).unwrap();

		let store = SqliteStore::at_path(&not_a_file);
		let result = store.initialize().await;
		assert!(matches!(result, Err(OfflineError::StorageUnavailable(_))));
		assert!(!store.is_initialized().await);

		let missing_parent = SqliteStore::at_path(tmp.path().join("missing/dir/offline.db"));
		assert!(matches!(
			missing_parent.initialize().await,
			Err(OfflineError::StorageUnavailable(_))
		));
	}

	#[test]
	fn test_pool_size_defaults_and_overrides() {
		let store = SqliteStore::at_path("/tmp/unused.db");
		assert_eq!(store.max_connections, DEFAULT_MAX_CONNECTIONS);
		assert_eq!(store.with_max_connections(0).max_connections, 1);

		let memory = SqliteStore::in_memory().unwrap().with_max_connections(8);
		assert_eq!(memory.max_connections, 1);
	}

	#[tokio::test]
	async fn test_in_memory_store_keeps_data_across_calls() {
		let store = SqliteStore::in_memory().unwrap();
		store.initialize().await.unwrap();

		let key = store
			.put(Collection::Billing, &project("b-1", "X"))
			.await
			.unwrap();
		assert!(store.get(Collection::Billing, &key).await.unwrap().is_some());
	}

	#[tokio::test]
	async fn test_get_all_is_ordered_by_key() {
		let (store, _tmp) = create_test_store().await;
		for id in ["c", "a", "b"] {
			store.put(Collection::Projects, &project(id, id)).await.unwrap();
		}

		let keys: Vec<String> = store
			.get_all(Collection::Projects)
			.await
			.unwrap()
			.iter()
			.map(|r| r.key().to_string())
			.collect();
		assert_eq!(keys, vec!["a", "b", "c"]);
	}
}
