// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Write path used by UI action handlers: apply the change to the local
//! store right away, then queue the matching server mutation.

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use crate::error::Result;
use crate::model::{Collection, EntityRecord, OperationMethod, PendingOperation, RecordKey};
use crate::queue::OperationQueue;
use crate::store::{DurableStore, SqliteStore};

pub struct OfflineActions {
	store: Arc<dyn DurableStore>,
	queue: Arc<dyn OperationQueue>,
}

impl OfflineActions {
	pub fn new(store: Arc<dyn DurableStore>, queue: Arc<dyn OperationQueue>) -> Self {
		Self { store, queue }
	}

	/// Both halves backed by one SQLite store.
	pub fn from_store(store: Arc<SqliteStore>) -> Self {
		Self::new(store.clone(), store)
	}

	pub async fn create(
		&self,
		collection: Collection,
		op_type: &str,
		record: &EntityRecord,
		endpoint: &str,
	) -> Result<PendingOperation> {
		self
			.write(collection, op_type, record, endpoint, OperationMethod::Create)
			.await
	}

	pub async fn update(
		&self,
		collection: Collection,
		op_type: &str,
		record: &EntityRecord,
		endpoint: &str,
	) -> Result<PendingOperation> {
		self
			.write(collection, op_type, record, endpoint, OperationMethod::Update)
			.await
	}

	/// Remove locally and queue a DELETE whose payload carries the identifier.
	pub async fn delete(
		&self,
		collection: Collection,
		op_type: &str,
		key: &RecordKey,
		endpoint: &str,
	) -> Result<PendingOperation> {
		self.store.remove(collection, key).await?;
		let op = self
			.queue
			.enqueue(
				op_type,
				json!({ "id": key.as_str() }),
				endpoint,
				OperationMethod::Delete,
			)
			.await?;

		info!(
				collection = %collection,
				key = %key,
				sequence_id = op.sequence_id,
				"deleted record offline"
		);
		Ok(op)
	}

	async fn write(
		&self,
		collection: Collection,
		op_type: &str,
		record: &EntityRecord,
		endpoint: &str,
		method: OperationMethod,
	) -> Result<PendingOperation> {
		let key = self.store.put(collection, record).await?;
		let op = self
			.queue
			.enqueue(op_type, record.clone().into_value(), endpoint, method)
			.await?;

		info!(
				collection = %collection,
				key = %key,
				method = %method,
				sequence_id = op.sequence_id,
				"saved record offline"
		);
		Ok(op)
	}
}
