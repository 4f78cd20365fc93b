// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Partial configuration produced by each source before merging.

use serde::Deserialize;

use crate::sections::{LoggingConfigLayer, StoreConfigLayer, SyncConfigLayer};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OfflineConfigLayer {
	#[serde(default)]
	pub store: Option<StoreConfigLayer>,
	#[serde(default)]
	pub sync: Option<SyncConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

impl OfflineConfigLayer {
	/// Overlay `other` on top of `self`; fields set in `other` win.
	pub fn merge(&mut self, other: OfflineConfigLayer) {
		if let Some(store) = other.store {
			self.store.get_or_insert_with(Default::default).merge(store);
		}
		if let Some(sync) = other.sync {
			self.sync.get_or_insert_with(Default::default).merge(sync);
		}
		if let Some(logging) = other.logging {
			self
				.logging
				.get_or_insert_with(Default::default)
				.merge(logging);
		}
	}
}
