// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::connectivity::ConnectivityMonitor;
use crate::sync::{SyncEngine, SyncOutcome};

/// Runs the sync engine each time connectivity comes back.
///
/// Runs are keyed on the monitor's reconnect counter, so a reconnect that
/// lands while a run is draining triggers one more run afterwards. Going
/// offline never triggers a run and there is no timer. The background task
/// stops when the listener is dropped.
pub struct ReconnectListener {
	handle: JoinHandle<()>,
}

impl ReconnectListener {
	pub fn spawn(engine: Arc<SyncEngine>, monitor: &ConnectivityMonitor) -> Self {
		let mut rx = monitor.subscribe();
		// Captured before spawning so a reconnect racing the first poll still counts.
		let mut handled = rx.borrow_and_update().reconnects;

		let handle = tokio::spawn(async move {
			while rx.changed().await.is_ok() {
				let state = *rx.borrow_and_update();
				if state.reconnects == handled {
					continue;
				}
				handled = state.reconnects;

				info!(
					reconnects = state.reconnects,
					"connectivity restored, draining pending operations"
				);
				match engine.run().await {
					Ok(SyncOutcome::Completed(report)) => {
						debug!(
							delivered = report.delivered.len(),
							failed = report.failed.len(),
							"reconnect sync finished"
						);
					}
					Ok(outcome) => debug!(?outcome, "reconnect sync did no work"),
					Err(e) => error!(error = %e, "reconnect sync failed"),
				}
			}

			debug!("connectivity monitor closed, reconnect listener exiting");
		});

		Self { handle }
	}

	pub fn is_running(&self) -> bool {
		!self.handle.is_finished()
	}
}

impl Drop for ReconnectListener {
	fn drop(&mut self) {
		self.handle.abort();
	}
}
