// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Configuration sources: built-in defaults, a TOML file and environment
//! variables.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::OfflineConfigLayer;
use crate::sections::{LoggingConfigLayer, StoreConfigLayer, SyncConfigLayer};

/// Source precedence levels (higher overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<OfflineConfigLayer, ConfigError>;
}

pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<OfflineConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(OfflineConfigLayer::default())
	}
}

pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	/// `$XDG_CONFIG_HOME/tally/offline.toml`.
	pub fn user() -> Self {
		let dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
		Self::new(dir.join("tally").join("offline.toml"))
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<OfflineConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(OfflineConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: OfflineConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: TALLY_OFFLINE_<SECTION>_<FIELD>
pub struct EnvSource;

impl EnvSource {
	/// Build a layer from an arbitrary variable lookup.
	pub fn load_with<F>(lookup: F) -> Result<OfflineConfigLayer, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let var = |name: &str| lookup(name).filter(|v| !v.is_empty());

		let store = StoreConfigLayer {
			database_url: var("TALLY_OFFLINE_STORE_DATABASE_URL"),
			database_path: var("TALLY_OFFLINE_STORE_DATABASE_PATH").map(PathBuf::from),
			max_connections: parse_var(&var, "TALLY_OFFLINE_STORE_MAX_CONNECTIONS")?,
		};
		let sync = SyncConfigLayer {
			api_base_url: var("TALLY_OFFLINE_SYNC_API_BASE_URL"),
			request_timeout_secs: parse_var(&var, "TALLY_OFFLINE_SYNC_REQUEST_TIMEOUT_SECS")?,
			auth_token: var("TALLY_OFFLINE_SYNC_AUTH_TOKEN"),
		};
		let logging = LoggingConfigLayer {
			level: var("TALLY_OFFLINE_LOGGING_LEVEL"),
		};

		Ok(OfflineConfigLayer {
			store: Some(store),
			sync: Some(sync),
			logging: Some(logging),
		})
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<OfflineConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Self::load_with(|name| std::env::var(name).ok())
	}
}

fn parse_var<T, F>(var: &F, name: &str) -> Result<Option<T>, ConfigError>
where
	T: std::str::FromStr,
	F: Fn(&str) -> Option<String>,
{
	match var(name) {
		Some(v) => v.trim().parse().map(Some).map_err(|_| {
			ConfigError::invalid_value(
				name,
				format!("invalid {} value '{v}'", std::any::type_name::<T>()),
			)
		}),
		None => Ok(None),
	}
}
