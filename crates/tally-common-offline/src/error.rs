// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OfflineError {
	#[error("storage unavailable: {0}")]
	StorageUnavailable(String),

	#[error("invalid record: {0}")]
	InvalidRecord(String),

	#[error("unknown collection: {0}")]
	InvalidCollection(String),

	#[error("unknown operation method: {0}")]
	InvalidMethod(String),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

impl OfflineError {
	pub fn not_initialized() -> Self {
		Self::StorageUnavailable("store is not initialized".to_string())
	}
}

impl From<sqlx::Error> for OfflineError {
	fn from(e: sqlx::Error) -> Self {
		Self::StorageUnavailable(e.to_string())
	}
}

pub type Result<T> = std::result::Result<T, OfflineError>;

/// Failure of the transport underneath an [`ApiClient`](crate::api::ApiClient) call.
#[derive(Debug, Error)]
pub enum ApiError {
	#[error("network error: {0}")]
	Network(#[from] reqwest::Error),

	#[error("invalid URL: {0}")]
	InvalidUrl(String),

	#[error("request timeout")]
	Timeout,

	#[error("transport error: {0}")]
	Transport(String),
}

/// Why a single queued operation was not delivered during a sync run.
///
/// These never escape a run; the entry stays queued for the next one.
#[derive(Debug, Error)]
pub enum SyncDispatchFailure {
	#[error("dispatch failed: {0}")]
	Network(#[from] ApiError),

	#[error("server answered with non-success status {0}")]
	Status(u16),
}

impl SyncDispatchFailure {
	/// HTTP status when the server answered at all.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Status(status) => Some(*status),
			Self::Network(_) => None,
		}
	}
}
