// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Offline persistence and synchronization for the Tally dashboard.
//!
//! - [`SqliteStore`]: durable per-collection record store, also hosting the
//!   pending-operation queue
//! - [`OfflineActions`]: optimistic local write plus queued server mutation
//! - [`SyncEngine`]: replays the queue against an [`ApiClient`] when online
//! - [`ReconnectListener`]: triggers a sync run when connectivity returns

pub mod actions;
pub mod api;
pub mod connectivity;
pub mod error;
pub mod http;
pub mod model;
pub mod queue;
pub mod reconnect;
pub mod store;
pub mod sync;

pub use actions::OfflineActions;
pub use api::{ApiClient, ApiResponse};
pub use connectivity::{
	ConnectivityMonitor, ConnectivityOracle, ConnectivityState, StaticConnectivity,
};
pub use error::*;
pub use http::HttpApiClient;
pub use model::*;
pub use queue::OperationQueue;
pub use reconnect::ReconnectListener;
pub use store::{DurableStore, SqliteStore, SCHEMA_VERSION};
pub use sync::{EntryFailure, EntryOutcome, SyncEngine, SyncOutcome, SyncReport, SyncState};
