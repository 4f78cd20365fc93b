// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::io::Write;
use std::sync::Arc;

use anyhow::{bail, Context};
use serde_json::Value;
use tally_common_offline::{
	Collection, DurableStore, EntityRecord, HttpApiClient, OperationMethod, OperationQueue,
	RecordKey, SqliteStore, StaticConnectivity, SyncEngine, SyncOutcome, SCHEMA_VERSION,
};
use tally_offline_config::{StoreConfig, SyncConfig};
use tracing::info;

pub async fn open_store(config: &StoreConfig) -> anyhow::Result<Arc<SqliteStore>> {
	let store = match &config.database_url {
		Some(url) => SqliteStore::new(url)?,
		None => {
			let path = &config.database_path;
			if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
				std::fs::create_dir_all(parent)
					.with_context(|| format!("failed to create {}", parent.display()))?;
			}
			SqliteStore::at_path(path)
		}
	};
	let store = match config.max_connections {
		Some(max) => store.with_max_connections(max),
		None => store,
	};

	store.initialize().await?;
	Ok(Arc::new(store))
}

pub async fn close(store: &SqliteStore) {
	store.close().await;
}

pub async fn init(_store: &SqliteStore, out: &mut impl Write) -> anyhow::Result<()> {
	writeln!(out, "store ready (schema version {SCHEMA_VERSION})")?;
	for collection in Collection::ALL {
		writeln!(out, "  {collection}")?;
	}
	Ok(())
}

pub async fn put(
	store: &SqliteStore,
	collection: Collection,
	record: &str,
	out: &mut impl Write,
) -> anyhow::Result<()> {
	let value: Value = serde_json::from_str(record).context("record is not valid JSON")?;
	let record = EntityRecord::new(value)?;
	let key = store.put(collection, &record).await?;
	writeln!(out, "{collection}/{key}")?;
	Ok(())
}

pub async fn get(
	store: &SqliteStore,
	collection: Collection,
	id: Option<&str>,
	out: &mut impl Write,
) -> anyhow::Result<()> {
	match id {
		Some(id) => {
			let key = RecordKey::from(id);
			let Some(record) = store.get(collection, &key).await? else {
				bail!("no record {key} in {collection}");
			};
			writeln!(out, "{}", serde_json::to_string_pretty(&record)?)?;
		}
		None => {
			let records = store.get_all(collection).await?;
			writeln!(out, "{}", serde_json::to_string_pretty(&records)?)?;
		}
	}
	Ok(())
}

pub async fn remove(
	store: &SqliteStore,
	collection: Collection,
	id: &str,
	out: &mut impl Write,
) -> anyhow::Result<()> {
	let key = RecordKey::from(id);
	store.remove(collection, &key).await?;
	writeln!(out, "removed {collection}/{key}")?;
	Ok(())
}

pub async fn enqueue(
	store: &SqliteStore,
	op_type: &str,
	method: OperationMethod,
	endpoint: &str,
	payload: &str,
	out: &mut impl Write,
) -> anyhow::Result<()> {
	let payload: Value = serde_json::from_str(payload).context("payload is not valid JSON")?;
	let op = store.enqueue(op_type, payload, endpoint, method).await?;
	writeln!(out, "{}", serde_json::to_string_pretty(&op)?)?;
	Ok(())
}

pub async fn pending(store: &SqliteStore, out: &mut impl Write) -> anyhow::Result<()> {
	let ops = store.list_pending().await?;
	writeln!(out, "{}", serde_json::to_string_pretty(&ops)?)?;
	Ok(())
}

pub async fn clear(store: &SqliteStore, sequence_id: i64, out: &mut impl Write) -> anyhow::Result<()> {
	store.clear(sequence_id).await?;
	writeln!(out, "cleared #{sequence_id}")?;
	Ok(())
}

pub async fn sync(
	store: Arc<SqliteStore>,
	config: &SyncConfig,
	offline: bool,
	out: &mut impl Write,
) -> anyhow::Result<()> {
	let mut api = HttpApiClient::from_base_url(&config.api_base_url, config.request_timeout)?;
	if let Some(token) = &config.auth_token {
		api = api.with_auth_token(token.clone());
	}

	let connectivity = if offline {
		StaticConnectivity::offline()
	} else {
		StaticConnectivity::online()
	};
	let engine = SyncEngine::new(store, Arc::new(connectivity), Arc::new(api));

	match engine.run().await? {
		SyncOutcome::OfflineSkipped => writeln!(out, "offline, sync skipped")?,
		SyncOutcome::AlreadyRunning => writeln!(out, "a sync run is already in progress")?,
		SyncOutcome::Completed(report) => {
			writeln!(
				out,
				"attempted {}, delivered {}, failed {}",
				report.attempted,
				report.delivered.len(),
				report.failed.len()
			)?;
			for failure in &report.failed {
				writeln!(
					out,
					"  #{} {} {}: {}",
					failure.sequence_id, failure.method, failure.endpoint, failure.reason
				)?;
			}
			info!(
				duration_ms = report.duration.as_millis() as u64,
				"sync command finished"
			);
			if !report.is_clean() {
				bail!(
					"{} pending operation(s) failed and remain queued",
					report.failed.len()
				);
			}
		}
	}
	Ok(())
}
