// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Durable log of mutations waiting to be replayed against the server.
//!
//! Entries are numbered by SQLite `AUTOINCREMENT`, so a sequence id is never
//! handed out twice, even after the entry holding it was cleared.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, error};

use crate::error::{OfflineError, Result};
use crate::model::{OperationMethod, PendingOperation};
use crate::store::{SqliteStore, QUEUE_TABLE};

#[async_trait]
pub trait OperationQueue: Send + Sync {
	/// Append an operation stamped with a fresh sequence id and the current time.
	async fn enqueue(
		&self,
		op_type: &str,
		payload: Value,
		endpoint: &str,
		method: OperationMethod,
	) -> Result<PendingOperation>;

	/// Every queued operation, ascending by sequence id.
	///
	/// Entries that can no longer be decoded are logged and skipped so they
	/// cannot stall the rest of the queue. They stay stored, are still
	/// counted by [`pending_count`](Self::pending_count), and can be dropped
	/// with [`clear`](Self::clear).
	async fn list_pending(&self) -> Result<Vec<PendingOperation>>;

	/// Drop one entry. Unknown ids are ignored.
	async fn clear(&self, sequence_id: i64) -> Result<()>;

	async fn pending_count(&self) -> Result<u64>;
}

type QueueRow = (i64, String, String, String, String, String);

fn to_pending_operation(row: QueueRow) -> Result<PendingOperation> {
	let (sequence_id, op_type, payload, endpoint, method, timestamp) = row;

	let method: OperationMethod = method.parse()?;
	let timestamp = DateTime::parse_from_rfc3339(&timestamp)
		.map_err(|e| {
			OfflineError::StorageUnavailable(format!(
				"queue entry {sequence_id} has a corrupt timestamp: {e}"
			))
		})?
		.with_timezone(&Utc);

	Ok(PendingOperation {
		sequence_id,
		op_type,
		payload: serde_json::from_str(&payload)?,
		endpoint,
		method,
		timestamp,
	})
}

#[async_trait]
impl OperationQueue for SqliteStore {
	async fn enqueue(
		&self,
		op_type: &str,
		payload: Value,
		endpoint: &str,
		method: OperationMethod,
	) -> Result<PendingOperation> {
		let pool = self.pool().await?;
		let timestamp = Utc::now();
		let encoded = serde_json::to_string(&payload)?;

		let sql = format!(
			r#"INSERT INTO "{QUEUE_TABLE}" (op_type, payload, endpoint, method, timestamp)
			VALUES (?, ?, ?, ?, ?)"#
		);
		let result = sqlx::query(&sql)
			.bind(op_type)
			.bind(&encoded)
			.bind(endpoint)
			.bind(method.http_verb())
			.bind(timestamp.to_rfc3339())
			.execute(&pool)
			.await?;

		let sequence_id = result.last_insert_rowid();
		debug!(
				sequence_id,
				op_type,
				endpoint,
				method = %method,
				"enqueued pending operation"
		);

		Ok(PendingOperation {
			sequence_id,
			op_type: op_type.to_string(),
			payload,
			endpoint: endpoint.to_string(),
			method,
			timestamp,
		})
	}

	async fn list_pending(&self) -> Result<Vec<PendingOperation>> {
		let pool = self.pool().await?;

		let sql = format!(
			r#"SELECT seq, op_type, payload, endpoint, method, timestamp
			FROM "{QUEUE_TABLE}" ORDER BY seq ASC"#
		);
		let rows: Vec<QueueRow> = sqlx::query_as(&sql).fetch_all(&pool).await?;

		let mut operations = Vec::with_capacity(rows.len());
		for row in rows {
			let sequence_id = row.0;
			match to_pending_operation(row) {
				Ok(op) => operations.push(op),
				Err(e) => error!(sequence_id, error = %e, "skipping unreadable queue entry"),
			}
		}

		debug!(count = operations.len(), "listed pending operations");
		Ok(operations)
	}

	async fn clear(&self, sequence_id: i64) -> Result<()> {
		let pool = self.pool().await?;

		let sql = format!(r#"DELETE FROM "{QUEUE_TABLE}" WHERE seq = ?"#);
		let result = sqlx::query(&sql).bind(sequence_id).execute(&pool).await?;

		debug!(
			sequence_id,
			removed = result.rows_affected(),
			"cleared pending operation"
		);
		Ok(())
	}

	async fn pending_count(&self) -> Result<u64> {
		let pool = self.pool().await?;

		let sql = format!(r#"SELECT COUNT(*) FROM "{QUEUE_TABLE}""#);
		let (count,): (i64,) = sqlx::query_as(&sql).fetch_one(&pool).await?;
		Ok(count.max(0) as u64)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::store::DurableStore;
	use proptest::prelude::*;
	use serde_json::json;

	async fn create_test_queue() -> SqliteStore {
		let store = SqliteStore::in_memory().unwrap();
		store.initialize().await.unwrap();
		store
	}

	#[tokio::test]
	async fn test_enqueue_assigns_increasing_ids() {
		let queue = create_test_queue().await;

		let first = queue
			.enqueue("project", json!({"name": "X"}), "/projects", OperationMethod::Create)
			.await
			.unwrap();
		let second = queue
			.enqueue("expense", json!({"id": 3}), "/expenses/3", OperationMethod::Delete)
			.await
			.unwrap();

		assert!(second.sequence_id > first.sequence_id);
		assert_eq!(queue.pending_count().await.unwrap(), 2);
	}

	#[tokio::test]
	async fn test_list_pending_round_trips_fields() {
		let queue = create_test_queue().await;
		let enqueued = queue
			.enqueue("project", json!({"name": "X"}), "/projects", OperationMethod::Create)
			.await
			.unwrap();

		let pending = queue.list_pending().await.unwrap();
		assert_eq!(pending, vec![enqueued]);
	}

	#[tokio::test]
	async fn test_clear_removes_entry_and_ignores_unknown_ids() {
		let queue = create_test_queue().await;
		let op = queue
			.enqueue("billing", json!({"id": "b-1"}), "/billing", OperationMethod::Update)
			.await
			.unwrap();

		queue.clear(op.sequence_id).await.unwrap();
		queue.clear(op.sequence_id).await.unwrap();
		queue.clear(9_999).await.unwrap();

		let pending = queue.list_pending().await.unwrap();
		assert!(pending.iter().all(|p| p.sequence_id != op.sequence_id));
		assert_eq!(queue.pending_count().await.unwrap(), 0);
	}

	#[tokio::test]
	async fn test_cleared_ids_are_never_reused() {
		let queue = create_test_queue().await;
		let first = queue
			.enqueue("project", json!({}), "/projects", OperationMethod::Create)
			.await
			.unwrap();
		queue.clear(first.sequence_id).await.unwrap();

		let second = queue
			.enqueue("project", json!({}), "/projects", OperationMethod::Create)
			.await
			.unwrap();
		assert!(second.sequence_id > first.sequence_id);
	}

	#[tokio::test]
	async fn test_queue_requires_initialized_store() {
		let store = SqliteStore::in_memory().unwrap();
		let result = store
			.enqueue("project", json!({}), "/projects", OperationMethod::Create)
			.await;
		assert!(matches!(result, Err(OfflineError::StorageUnavailable(_))));
	}

	#[tokio::test]
	async fn test_unreadable_entries_are_skipped_not_fatal() {
		let queue = create_test_queue().await;
		let first = queue
			.enqueue("project", json!({}), "/projects", OperationMethod::Create)
			.await
			.unwrap();

		let pool = queue.pool().await.unwrap();
		let insert = format!(
			r#"INSERT INTO "{QUEUE_TABLE}" (op_type, payload, endpoint, method, timestamp)
			VALUES (?, ?, ?, ?, ?)"#
		);
		sqlx::query(&insert)
			.bind("project")
			.bind("{}")
			.bind("/projects/1")
			.bind("PATCH")
			.bind(Utc::now().to_rfc3339())
			.execute(&pool)
			.await
			.unwrap();
		sqlx::query(&insert)
			.bind("project")
			.bind("{}")
			.bind("/projects/2")
			.bind("PUT")
			.bind("yesterday")
			.execute(&pool)
			.await
			.unwrap();

		let last = queue
			.enqueue("project", json!({}), "/projects/3", OperationMethod::Delete)
			.await
			.unwrap();

		let pending = queue.list_pending().await.unwrap();
		assert_eq!(pending, vec![first, last]);
		assert_eq!(queue.pending_count().await.unwrap(), 4);
	}

	proptest! {
		#![proptest_config(ProptestConfig::with_cases(16))]

		/// listPending order equals insertion order, with strictly increasing ids.
		#[test]
		fn test_list_pending_preserves_insertion_order(
			endpoints in proptest::collection::vec("/[a-z]{1,8}", 1..20)
		) {
			let runtime = tokio::runtime::Builder::new_current_thread()
				.enable_all()
				.build()
				.unwrap();

			let (inserted, listed) = runtime.block_on(async {
				let queue = create_test_queue().await;
				let mut inserted = Vec::new();
				for endpoint in &endpoints {
					let op = queue
						.enqueue("project", json!({}), endpoint, OperationMethod::Update)
						.await
						.unwrap();
					inserted.push(op.sequence_id);
				}
				let listed: Vec<(i64, String)> = queue
					.list_pending()
					.await
					.unwrap()
					.into_iter()
					.map(|op| (op.sequence_id, op.endpoint))
					.collect();
				(inserted, listed)
			});

			prop_assert!(inserted.windows(2).all(|w| w[0] < w[1]));
			let listed_ids: Vec<i64> = listed.iter().map(|(id, _)| *id).collect();
			prop_assert_eq!(listed_ids, inserted);
			let listed_endpoints: Vec<String> = listed.into_iter().map(|(_, e)| e).collect();
			prop_assert_eq!(listed_endpoints, endpoints);
		}
	}
}
