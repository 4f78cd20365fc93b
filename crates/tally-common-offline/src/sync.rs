// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Replays the pending-operation queue against the remote API.
//!
//! A run drains a snapshot of the queue taken when it starts. Entries are
//! dispatched one at a time in sequence order, each exactly once, and an
//! entry is cleared only after the server acknowledged it with a 2xx status.
//! A failed entry stays queued and does not stop the entries after it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::api::ApiClient;
use crate::connectivity::ConnectivityOracle;
use crate::error::{Result, SyncDispatchFailure};
use crate::model::{OperationMethod, PendingOperation};
use crate::queue::OperationQueue;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
	Idle,
	Draining,
}

/// Result of dispatching one queued operation.
#[derive(Debug)]
pub enum EntryOutcome {
	Delivered { status: u16 },
	Failed(SyncDispatchFailure),
}

#[derive(Debug)]
pub struct EntryFailure {
	pub sequence_id: i64,
	pub endpoint: String,
	pub method: OperationMethod,
	pub reason: SyncDispatchFailure,
}

/// Summary of one drained snapshot.
#[derive(Debug, Default)]
pub struct SyncReport {
	pub attempted: usize,
	pub delivered: Vec<i64>,
	pub failed: Vec<EntryFailure>,
	pub duration: Duration,
}

impl SyncReport {
	pub fn is_clean(&self) -> bool {
		self.failed.is_empty()
	}
}

#[derive(Debug)]
pub enum SyncOutcome {
	/// Host reported no connectivity; nothing was touched.
	OfflineSkipped,
	/// Another run was draining; this one did nothing.
	AlreadyRunning,
	Completed(SyncReport),
}

impl SyncOutcome {
	pub fn report(&self) -> Option<&SyncReport> {
		match self {
			Self::Completed(report) => Some(report),
			_ => None,
		}
	}
}

/// Resets the draining flag when a run ends, including by panic.
struct DrainGuard<'a>(&'a AtomicBool);

impl<'a> DrainGuard<'a> {
	fn acquire(flag: &'a AtomicBool) -> Option<Self> {
		flag
			.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.ok()
			.map(|_| Self(flag))
	}
}

impl Drop for DrainGuard<'_> {
	fn drop(&mut self) {
		self.0.store(false, Ordering::Release);
	}
}

pub struct SyncEngine {
	queue: Arc<dyn OperationQueue>,
	connectivity: Arc<dyn ConnectivityOracle>,
	api: Arc<dyn ApiClient>,
	draining: AtomicBool,
}

impl SyncEngine {
	pub fn new(
		queue: Arc<dyn OperationQueue>,
		connectivity: Arc<dyn ConnectivityOracle>,
		api: Arc<dyn ApiClient>,
	) -> Self {
		Self {
			queue,
			connectivity,
			api,
			draining: AtomicBool::new(false),
		}
	}

	pub fn state(&self) -> SyncState {
		if self.draining.load(Ordering::Acquire) {
			SyncState::Draining
		} else {
			SyncState::Idle
		}
	}

	/// Drain the queue once.
	///
	/// Only storage failures are returned as errors; per-entry dispatch
	/// failures are reported in the [`SyncReport`].
	pub async fn run(&self) -> Result<SyncOutcome> {
		if !self.connectivity.is_online() {
			debug!("offline, skipping sync run");
			return Ok(SyncOutcome::OfflineSkipped);
		}

		let Some(_guard) = DrainGuard::acquire(&self.draining) else {
			debug!("sync run already in progress, rejecting");
			return Ok(SyncOutcome::AlreadyRunning);
		};

		let started = Instant::now();
		let snapshot = self.queue.list_pending().await.map_err(|e| {
			error!(error = %e, "failed to read pending operations");
			e
		})?;

		let mut report = SyncReport {
			attempted: snapshot.len(),
			..Default::default()
		};

		if snapshot.is_empty() {
			debug!("no pending operations");
			report.duration = started.elapsed();
			return Ok(SyncOutcome::Completed(report));
		}

		info!(count = snapshot.len(), "draining pending operations");

		for op in snapshot {
			match self.dispatch(&op).await {
				EntryOutcome::Delivered { status } => {
					self.queue.clear(op.sequence_id).await.map_err(|e| {
						error!(
								sequence_id = op.sequence_id,
								error = %e,
								"delivered operation could not be cleared"
						);
						e
					})?;
					debug!(
							sequence_id = op.sequence_id,
							status,
							"pending operation delivered"
					);
					report.delivered.push(op.sequence_id);
				}
				EntryOutcome::Failed(reason) => {
					warn!(
							sequence_id = op.sequence_id,
							op_type = %op.op_type,
							endpoint = %op.endpoint,
							method = %op.method,
							error = %reason,
							"pending operation failed, keeping it queued"
					);
					report.failed.push(EntryFailure {
						sequence_id: op.sequence_id,
						endpoint: op.endpoint,
						method: op.method,
						reason,
					});
				}
			}
		}

		report.duration = started.elapsed();
		info!(
			attempted = report.attempted,
			delivered = report.delivered.len(),
			failed = report.failed.len(),
			duration_ms = report.duration.as_millis() as u64,
			"sync run finished"
		);

		Ok(SyncOutcome::Completed(report))
	}

	async fn dispatch(&self, op: &PendingOperation) -> EntryOutcome {
		let result = match op.method {
			OperationMethod::Create => self.api.post(&op.endpoint, &op.payload).await,
			OperationMethod::Update => self.api.put(&op.endpoint, &op.payload).await,
			OperationMethod::Delete => self.api.delete(&op.endpoint).await,
		};

		match result {
			Ok(response) if response.is_success() => EntryOutcome::Delivered {
				status: response.status,
			},
			Ok(response) => EntryOutcome::Failed(SyncDispatchFailure::Status(response.status)),
			Err(e) => EntryOutcome::Failed(SyncDispatchFailure::Network(e)),
		}
	}
}
