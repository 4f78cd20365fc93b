// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Host-reported network reachability.
//!
//! The flag is advisory: `true` does not promise the next request succeeds.
//! Sync only uses it to skip runs while definitely offline.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

pub trait ConnectivityOracle: Send + Sync {
	fn is_online(&self) -> bool;
}

/// Fixed reachability, for hosts without a live signal and for tests.
#[derive(Clone, Copy, Debug)]
pub struct StaticConnectivity(bool);

impl StaticConnectivity {
	pub fn online() -> Self {
		Self(true)
	}

	pub fn offline() -> Self {
		Self(false)
	}
}

impl ConnectivityOracle for StaticConnectivity {
	fn is_online(&self) -> bool {
		self.0
	}
}

/// Snapshot published to [`ConnectivityMonitor`] subscribers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConnectivityState {
	pub online: bool,
	/// Count of offline to online transitions since the monitor was created.
	pub reconnects: u64,
}

/// Settable reachability flag that host integrations update as events arrive.
///
/// Subscribers only see the latest value; `reconnects` still moves when an
/// offline to online flap happened between two reads.
#[derive(Clone, Debug)]
pub struct ConnectivityMonitor {
	tx: Arc<watch::Sender<ConnectivityState>>,
}

impl ConnectivityMonitor {
	pub fn new(initially_online: bool) -> Self {
		let (tx, _rx) = watch::channel(ConnectivityState {
			online: initially_online,
			reconnects: 0,
		});
		Self { tx: Arc::new(tx) }
	}

	/// Record the host's current reachability. Returns whether it changed.
	pub fn set_online(&self, online: bool) -> bool {
		let changed = self.tx.send_if_modified(|current| {
			if current.online == online {
				return false;
			}
			current.online = online;
			if online {
				current.reconnects += 1;
			}
			true
		});

		if changed {
			if online {
				info!(reconnects = self.state().reconnects, "network: online");
			} else {
				warn!("network: offline");
			}
		}
		changed
	}

	pub fn state(&self) -> ConnectivityState {
		*self.tx.borrow()
	}

	pub fn subscribe(&self) -> watch::Receiver<ConnectivityState> {
		self.tx.subscribe()
	}
}

impl Default for ConnectivityMonitor {
	fn default() -> Self {
		Self::new(true)
	}
}

impl ConnectivityOracle for ConnectivityMonitor {
	fn is_online(&self) -> bool {
		self.tx.borrow().online
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_static_connectivity() {
		assert!(StaticConnectivity::online().is_online());
		assert!(!StaticConnectivity::offline().is_online());
	}

	#[test]
	fn test_set_online_reports_changes_only() {
		let monitor = ConnectivityMonitor::new(false);
		assert!(!monitor.is_online());

		assert!(monitor.set_online(true));
		assert!(monitor.is_online());
		assert!(!monitor.set_online(true));
	}

	#[tokio::test]
	async fn test_subscribers_see_transitions() {
		let monitor = ConnectivityMonitor::new(true);
		let mut rx = monitor.subscribe();

		monitor.set_online(false);
		rx.changed().await.unwrap();
		assert!(!rx.borrow_and_update().online);

		let clone = monitor.clone();
		clone.set_online(true);
		rx.changed().await.unwrap();
		assert_eq!(
			*rx.borrow_and_update(),
			ConnectivityState {
				online: true,
				reconnects: 1
			}
		);
	}

	#[test]
	fn test_reconnects_count_only_offline_to_online() {
		let monitor = ConnectivityMonitor::new(true);
		assert_eq!(monitor.state().reconnects, 0);

		monitor.set_online(false);
		assert_eq!(monitor.state().reconnects, 0);

		monitor.set_online(true);
		monitor.set_online(true);
		monitor.set_online(false);
		monitor.set_online(true);
		assert_eq!(monitor.state().reconnects, 2);
	}

	#[tokio::test]
	async fn test_flap_between_reads_is_not_lost() {
		let monitor = ConnectivityMonitor::new(true);
		let mut rx = monitor.subscribe();
		let seen = rx.borrow_and_update().reconnects;

		monitor.set_online(false);
		monitor.set_online(true);

		rx.changed().await.unwrap();
		let state = *rx.borrow_and_update();
		assert!(state.online);
		assert!(state.reconnects > seen);
	}
}
