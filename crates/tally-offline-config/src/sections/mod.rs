// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

mod logging;
mod store;
mod sync;

pub use logging::{LoggingConfig, LoggingConfigLayer};
pub use store::{default_database_path, StoreConfig, StoreConfigLayer};
pub use sync::{
	SyncConfig, SyncConfigLayer, DEFAULT_API_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS,
};
