// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Configuration for the Tally offline sync tooling.
//!
//! - Layered configuration from defaults, a TOML file and the environment
//! - Environment variables follow `TALLY_OFFLINE_<SECTION>_<FIELD>`
//!
//! # Usage
//!
//! ```ignore
//! use tally_offline_config::load_config;
//!
//! let config = load_config()?;
//! println!("queue lives in {}", config.store.location());
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::OfflineConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use std::path::PathBuf;

use tracing::{debug, info};

/// Fully resolved configuration.
#[derive(Debug, Clone, Default)]
pub struct OfflineConfig {
	pub store: StoreConfig,
	pub sync: SyncConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`TALLY_OFFLINE_*`)
/// 2. Config file (`$XDG_CONFIG_HOME/tally/offline.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<OfflineConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::user()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(config_path: impl Into<PathBuf>) -> Result<OfflineConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

/// Merge the given sources in precedence order and resolve the result.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<OfflineConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = OfflineConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

/// Resolve a merged layer, filling defaults and validating.
pub fn finalize(layer: OfflineConfigLayer) -> Result<OfflineConfig, ConfigError> {
	let store = layer.store.unwrap_or_default().finalize();
	let sync = layer.sync.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	validate(&store, &sync)?;

	info!(
		database = %store.location(),
		max_connections = ?store.max_connections,
		api_base_url = %sync.api_base_url,
		request_timeout_secs = sync.request_timeout.as_secs(),
		auth_configured = sync.auth_token.is_some(),
		"offline configuration loaded"
	);

	Ok(OfflineConfig {
		store,
		sync,
		logging,
	})
}

fn validate(store: &StoreConfig, sync: &SyncConfig) -> Result<(), ConfigError> {
	if store.max_connections == Some(0) {
		return Err(ConfigError::validation(
			"store.max_connections must be at least 1",
		));
	}
	if sync.request_timeout.is_zero() {
		return Err(ConfigError::validation(
			"sync.request_timeout_secs must be greater than 0",
		));
	}
	if !(sync.api_base_url.starts_with("http://") || sync.api_base_url.starts_with("https://")) {
		return Err(ConfigError::invalid_value(
			"sync.api_base_url",
			format!("expected an http(s) URL, got '{}'", sync.api_base_url),
		));
	}
	Ok(())
}
