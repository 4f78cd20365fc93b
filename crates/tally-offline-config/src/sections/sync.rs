// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Remote API configuration used when replaying the queue.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Sync configuration (runtime, fully resolved).
#[derive(Clone, PartialEq, Eq)]
pub struct SyncConfig {
	pub api_base_url: String,
	pub request_timeout: Duration,
	pub auth_token: Option<String>,
}

impl Default for SyncConfig {
	fn default() -> Self {
		SyncConfigLayer::default().finalize()
	}
}

impl fmt::Debug for SyncConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SyncConfig")
			.field("api_base_url", &self.api_base_url)
			.field("request_timeout", &self.request_timeout)
			.field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
			.finish()
	}
}

/// Sync configuration layer (partial, for merging).
#[derive(Clone, Default, Deserialize)]
pub struct SyncConfigLayer {
	#[serde(default)]
	pub api_base_url: Option<String>,
	#[serde(default)]
	pub request_timeout_secs: Option<u64>,
	#[serde(default)]
	pub auth_token: Option<String>,
}

impl fmt::Debug for SyncConfigLayer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SyncConfigLayer")
			.field("api_base_url", &self.api_base_url)
			.field("request_timeout_secs", &self.request_timeout_secs)
			.field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
			.finish()
	}
}

impl SyncConfigLayer {
	pub fn merge(&mut self, other: SyncConfigLayer) {
		if other.api_base_url.is_some() {
			self.api_base_url = other.api_base_url;
		}
		if other.request_timeout_secs.is_some() {
			self.request_timeout_secs = other.request_timeout_secs;
		}
		if other.auth_token.is_some() {
			self.auth_token = other.auth_token;
		}
	}

	pub fn finalize(self) -> SyncConfig {
		SyncConfig {
			api_base_url: self
				.api_base_url
				.unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
			request_timeout: Duration::from_secs(
				self
					.request_timeout_secs
					.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
			),
			auth_token: self.auth_token,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = SyncConfigLayer::default().finalize();
		assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
		assert_eq!(config.request_timeout, Duration::from_secs(30));
		assert!(config.auth_token.is_none());
	}

	#[test]
	fn test_debug_redacts_token() {
		let config = SyncConfigLayer {
			auth_token: Some("s3cr3t".to_string()),
			..Default::default()
		}
		.finalize();

		let rendered = format!("{config:?}");
		assert!(!rendered.contains("s3cr3t"));
		assert!(rendered.contains("[REDACTED]"));
	}
}
