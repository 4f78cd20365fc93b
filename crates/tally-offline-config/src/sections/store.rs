// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Durable store configuration.

use std::path::PathBuf;

use serde::Deserialize;

/// Store configuration (runtime, fully resolved).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
	/// Explicit `sqlite:` URL; wins over `database_path` when set.
	pub database_url: Option<String>,
	/// Database file, used as a plain filesystem path.
	pub database_path: PathBuf,
	/// Pool size override; the store's own default applies when unset.
	pub max_connections: Option<u32>,
}

impl Default for StoreConfig {
	fn default() -> Self {
		StoreConfigLayer::default().finalize()
	}
}

impl StoreConfig {
	/// Human-readable location for logs.
	pub fn location(&self) -> String {
		match &self.database_url {
			Some(url) => url.clone(),
			None => self.database_path.display().to_string(),
		}
	}
}

/// Store configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfigLayer {
	#[serde(default)]
	pub database_url: Option<String>,
	#[serde(default)]
	pub database_path: Option<PathBuf>,
	#[serde(default)]
	pub max_connections: Option<u32>,
}

impl StoreConfigLayer {
	pub fn merge(&mut self, other: StoreConfigLayer) {
		if other.database_url.is_some() {
			self.database_url = other.database_url;
		}
		if other.database_path.is_some() {
			self.database_path = other.database_path;
		}
		if other.max_connections.is_some() {
			self.max_connections = other.max_connections;
		}
	}

	pub fn finalize(self) -> StoreConfig {
		StoreConfig {
			database_url: self.database_url,
			database_path: self.database_path.unwrap_or_else(default_database_path),
			max_connections: self.max_connections,
		}
	}
}

/// `$XDG_DATA_HOME/tally/offline.db`, or a file in the working directory
/// when no data directory can be resolved.
pub fn default_database_path() -> PathBuf {
	dirs::data_dir()
		.map(|dir| dir.join("tally").join("offline.db"))
		.unwrap_or_else(|| PathBuf::from("tally-offline.db"))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults_use_xdg_path() {
		let config = StoreConfigLayer::default().finalize();
		assert!(config.database_url.is_none());
		assert_eq!(config.database_path, default_database_path());
		assert!(config.database_path.ends_with("offline.db"));
		assert!(config.max_connections.is_none());
	}

	#[test]
	fn test_merge_keeps_unset_fields() {
		let mut base = StoreConfigLayer {
			database_url: Some("sqlite::memory:".to_string()),
			max_connections: Some(2),
			..Default::default()
		};
		base.merge(StoreConfigLayer {
			max_connections: Some(8),
			..Default::default()
		});

		let config = base.finalize();
		assert_eq!(config.database_url.as_deref(), Some("sqlite::memory:"));
		assert_eq!(config.max_connections, Some(8));
	}

	#[test]
	fn test_location_prefers_url() {
		let config = StoreConfig {
			database_url: Some("sqlite::memory:".to_string()),
			database_path: PathBuf::from("/var/lib/tally/offline.db"),
			max_connections: None,
		};
		assert_eq!(config.location(), "sqlite::memory:");

		let config = StoreConfig {
			database_url: None,
			..config
		};
		assert_eq!(config.location(), "/var/lib/tally/offline.db");
	}
}
